// src/types.rs
use std::path::PathBuf;
use crate::stream::monitor::PerformanceSnapshot;
use crate::stream::worker::WorkerStats;
// 生产者线程发给消费者的消息
#[derive(Clone, Debug)]
pub enum StreamMessage {
    Batch(Vec<u8>),
    Finished,
}
// 一次运行结束后的汇总
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub batches_produced: u64,
    pub performance: PerformanceSnapshot,
    pub worker: WorkerStats,
    /// Batches the worker was too busy to take.
    pub spectra_skipped: u64,
    /// Batches released by the synchronizer with both domains present.
    pub synced_pairs: u64,
    /// Batches released with a zero-filled spectrum.
    pub zero_filled: u64,
    pub sync_evicted: u64,
    pub reinitializations: u64,
    pub snapshots: Vec<PathBuf>,
}
