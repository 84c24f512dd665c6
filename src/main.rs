// src/main.rs
use std::path::PathBuf;
use anyhow::Context;
use log::info;
use neurostream::config::DemoConfig;
use neurostream::engine;
// 入口函数
fn main() -> anyhow::Result<()> {
    // 默认 info，可用 RUST_LOG 覆盖
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    // 第一个参数是可选的 JSON 配置文件
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => DemoConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => DemoConfig::default(),
    };
    info!(
        "streaming {} channels @ {} Hz for {} s ({} samples per batch)",
        config.channels, config.sample_rate, config.run_seconds, config.samples_per_batch
    );
    let summary = engine::run(&config).context("stream run failed")?;
    let perf = &summary.performance;
    info!(
        "done: {} batches produced, {} consumed, {} dropped, {} out of order",
        summary.batches_produced, perf.total_batches, perf.dropped_batches, perf.out_of_order_batches
    );
    info!(
        "spectra: {} computed, {} applied, {} skipped, {} synced, {} zero-filled, {} evicted",
        summary.worker.spectra,
        perf.spectra_applied,
        summary.spectra_skipped,
        summary.synced_pairs,
        summary.zero_filled,
        summary.sync_evicted
    );
    info!("frames rendered: {}", perf.frames_rendered);
    for path in &summary.snapshots {
        info!("snapshot: {}", path.display());
    }
    Ok(())
}
