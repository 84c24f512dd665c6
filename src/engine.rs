// src/engine.rs
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use crate::config::DemoConfig;
use crate::stream::error::StreamError;
use crate::stream::frame::Frame;
use crate::stream::pipeline::StreamPipeline;
use crate::stream::plot::{render_spectrum_png, render_waveform_png, PlotStyle};
use crate::stream::source::{FrameSource, SyntheticSource};
use crate::stream::spectrum;
use crate::stream::spectrum_view::SpectrumRenderState;
use crate::stream::sync::FrameSynchronizer;
use crate::stream::wavefront::ChannelSelection;
use crate::stream::worker::{SpectrumResponse, SpectrumWorker, WorkerSettings};
use crate::types::{RunSummary, StreamMessage};
// 生产者和消费者之间最多积压的批次
const FRAME_QUEUE_DEPTH: usize = 64;
// 结束时等待频谱 worker 收尾的最长时间
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);
/// Runs a synthetic producer against the full consumer stack until the
/// producer finishes, then tears everything down.
pub fn run(config: &DemoConfig) -> Result<RunSummary, StreamError> {
    config.validate()?;
    let (frame_tx, frame_rx) = bounded::<StreamMessage>(FRAME_QUEUE_DEPTH);
    let producer = spawn_producer(config, frame_tx)?;
    let (spectrum_tx, spectrum_rx) = unbounded::<String>();
    let mut consumer = Consumer::new(config);
    let poll = config.pipeline.frame_interval().max(Duration::from_millis(1));
    loop {
        match frame_rx.recv_timeout(poll) {
            Ok(StreamMessage::Batch(bytes)) => consumer.on_batch(&bytes)?,
            Ok(StreamMessage::Finished) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => debug!("no batch within {poll:?}"),
        }
        consumer.drain_worker(&spectrum_tx)?;
        consumer.drain_spectra(&spectrum_rx);
    }
    consumer.finish_worker(&spectrum_tx)?;
    consumer.drain_spectra(&spectrum_rx);
    let batches_produced = match producer.join() {
        Ok(sent) => sent,
        Err(_) => {
            warn!("frame producer panicked");
            0
        }
    };
    let mut summary = consumer.shutdown(config)?;
    summary.batches_produced = batches_produced;
    Ok(summary)
}
fn spawn_producer(
    config: &DemoConfig,
    tx: Sender<StreamMessage>,
) -> Result<JoinHandle<u64>, StreamError> {
    let mut source = SyntheticSource::new(
        config.channels as usize,
        config.sample_rate,
        config.samples_per_batch as usize,
        config.seed,
    )
    .with_limit(config.batch_count());
    let interval = config.batch_interval();
    let realtime = config.realtime;
    let handle = thread::Builder::new()
        .name("frame-producer".into())
        .spawn(move || {
            let mut sent = 0u64;
            let mut next_due = Instant::now();
            loop {
                let bytes = match source.next_frame() {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => break,
                    Err(err) => {
                        warn!("producer stopped: {err}");
                        break;
                    }
                };
                if tx.send(StreamMessage::Batch(bytes)).is_err() {
                    break;
                }
                sent += 1;
                if realtime {
                    next_due += interval;
                    thread::sleep(next_due.saturating_duration_since(Instant::now()));
                }
            }
            tx.send(StreamMessage::Finished).ok();
            info!("producer finished after {sent} batches");
            sent
        })?;
    Ok(handle)
}
/// Consumer side: the time-domain pipeline, the spectrum worker feeding the
/// spectrum view through its JSON wire form, and the batch synchronizer.
struct Consumer {
    pipeline: StreamPipeline,
    selection: ChannelSelection,
    hidden: Vec<usize>,
    selected: Vec<usize>,
    worker: Option<SpectrumWorker>,
    spare_lanes: Vec<Vec<f32>>,
    in_flight: u64,
    spectrum_view: SpectrumRenderState,
    sync: FrameSynchronizer,
    summary: RunSummary,
    fft_size: usize,
    freq_range: (u32, u32),
    queue_depth: usize,
    sync_retention: usize,
}
impl Consumer {
    fn new(config: &DemoConfig) -> Self {
        let pipeline_config = &config.pipeline;
        Self {
            pipeline: StreamPipeline::new(pipeline_config.clone()),
            selection: build_selection(
                config.channels as usize,
                &config.hidden_channels,
                &config.selected_channels,
            ),
            hidden: config.hidden_channels.clone(),
            selected: config.selected_channels.clone(),
            worker: None,
            spare_lanes: Vec::new(),
            in_flight: 0,
            spectrum_view: SpectrumRenderState::new(
                pipeline_config.spectrum_bins,
                pipeline_config.reference_amplitude,
            ),
            sync: FrameSynchronizer::new(pipeline_config.sync_retention),
            summary: RunSummary::default(),
            fft_size: pipeline_config.fft_size,
            freq_range: (pipeline_config.freq_min_hz, pipeline_config.freq_max_hz),
            queue_depth: pipeline_config.worker_queue_depth,
            sync_retention: pipeline_config.sync_retention,
        }
    }
    fn on_batch(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        let mut lanes = std::mem::take(&mut self.spare_lanes);
        let mut owned = None;
        let result = self
            .pipeline
            .ingest_bytes_with(bytes, &self.selection, |frame| {
                fill_lanes(&mut lanes, frame);
                owned = Some(frame.to_owned_frame());
            });
        let outcome = match result {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return Ok(()),
            // Already logged and counted by the pipeline.
            Err(err) if err.is_recoverable() => return Ok(()),
            Err(err) => return Err(err),
        };
        if outcome.reinitialized {
            self.reinitialize()?;
        }
        if let Some(frame) = owned {
            self.sync.add_time_data(frame);
        }
        if let Some(worker) = &self.worker {
            if worker.submit(outcome.batch_id, lanes)? {
                self.in_flight += 1;
            } else {
                self.summary.spectra_skipped += 1;
            }
        }
        Ok(())
    }
    fn reinitialize(&mut self) -> Result<(), StreamError> {
        let Some(buffer) = self.pipeline.buffer() else {
            return Ok(());
        };
        let channels = buffer.channels();
        let sample_rate = buffer.sample_rate();
        self.summary.reinitializations += 1;
        // 旧 worker 在 drop 时 join
        self.worker = None;
        self.in_flight = 0;
        self.spare_lanes.clear();
        self.selection = build_selection(channels, &self.hidden, &self.selected);
        self.spectrum_view.configure(channels);
        // 批次号随新连接重新计数，旧的待配对数据全部作废
        self.summary.sync_evicted += self.sync.evicted();
        self.sync = FrameSynchronizer::new(self.sync_retention);
        let (min_hz, max_hz) = self.freq_range;
        self.worker = Some(SpectrumWorker::spawn(WorkerSettings {
            channels,
            sample_rate,
            fft_size: self.fft_size,
            min_hz,
            max_hz,
            queue_depth: self.queue_depth,
        })?);
        Ok(())
    }
    fn drain_worker(&mut self, wire: &Sender<String>) -> Result<(), StreamError> {
        while let Some(response) = self.worker.as_ref().and_then(SpectrumWorker::try_recv) {
            self.on_response(response, wire)?;
        }
        Ok(())
    }
    /// Waits for responses to batches still inside the worker.
    fn finish_worker(&mut self, wire: &Sender<String>) -> Result<(), StreamError> {
        while self.in_flight > 0 {
            let Some(worker) = &self.worker else {
                break;
            };
            match worker.recv_timeout(DRAIN_TIMEOUT)? {
                Some(response) => self.on_response(response, wire)?,
                None => {
                    warn!("{} spectrum responses never arrived", self.in_flight);
                    break;
                }
            }
        }
        Ok(())
    }
    fn on_response(&mut self, response: SpectrumResponse, wire: &Sender<String>) -> Result<(), StreamError> {
        self.in_flight = self.in_flight.saturating_sub(1);
        let SpectrumResponse {
            batch_id,
            entries,
            recycled,
        } = response;
        self.spare_lanes = recycled;
        if entries.is_empty() {
            // FFT window not full yet
            let (min_hz, max_hz) = self.freq_range;
            if self.sync.take_next(min_hz, max_hz).is_some() {
                self.summary.zero_filled += 1;
            }
            return Ok(());
        }
        let message = spectrum::encode(&entries)?;
        if wire.send(message).is_err() {
            return Err(StreamError::WorkerDisconnected);
        }
        self.sync.add_freq_data(batch_id, entries);
        if let Some(pair) = self.sync.take(batch_id) {
            if pair.time.is_some() {
                self.summary.synced_pairs += 1;
            }
        }
        Ok(())
    }
    fn drain_spectra(&mut self, wire: &Receiver<String>) {
        for message in wire.try_iter() {
            match spectrum::decode(&message) {
                Ok(entries) => {
                    if self.spectrum_view.apply(&entries) > 0 {
                        self.pipeline.monitor_mut().record_spectrum();
                    }
                }
                Err(err) => warn!("spectrum message dropped: {err}"),
            }
        }
    }
    fn shutdown(mut self, config: &DemoConfig) -> Result<RunSummary, StreamError> {
        if let Some(dir) = &config.snapshot_dir {
            self.summary.snapshots = self.write_snapshots(dir)?;
        }
        if let Some(worker) = self.worker.take() {
            self.summary.worker = worker.shutdown();
        }
        self.summary.performance = self.pipeline.monitor().snapshot();
        self.summary.sync_evicted += self.sync.evicted();
        self.pipeline.teardown();
        self.spectrum_view.teardown();
        Ok(self.summary)
    }
    fn write_snapshots(&self, dir: &Path) -> Result<Vec<PathBuf>, StreamError> {
        let style = PlotStyle::default();
        if self.pipeline.wavefront().channels() == 0 {
            warn!("no stream configured; skipping snapshots");
            return Ok(Vec::new());
        }
        std::fs::create_dir_all(dir)?;
        let wave_path = dir.join("wavefront.png");
        std::fs::write(
            &wave_path,
            render_waveform_png(self.pipeline.wavefront(), &self.selection, &style)?,
        )?;
        let spectrum_path = dir.join("spectrum.png");
        std::fs::write(
            &spectrum_path,
            render_spectrum_png(&self.spectrum_view, &self.selection, &style)?,
        )?;
        info!("snapshots written to {}", dir.display());
        Ok(vec![wave_path, spectrum_path])
    }
}
fn build_selection(channels: usize, hidden: &[usize], selected: &[usize]) -> ChannelSelection {
    let mut selection = ChannelSelection::all_visible(channels);
    for &ch in hidden {
        if let Some(visible) = selection.visible.get_mut(ch) {
            *visible = false;
        }
    }
    selection
        .selected
        .extend(selected.iter().copied().filter(|&ch| ch < channels));
    selection
}
/// Copies a frame into per-channel lanes, reusing their allocations.
fn fill_lanes(lanes: &mut Vec<Vec<f32>>, frame: &Frame<'_>) {
    lanes.resize_with(frame.header().channels_count as usize, Vec::new);
    for lane in lanes.iter_mut() {
        lane.clear();
    }
    for block in frame.channels() {
        if let Some(lane) = lanes.get_mut(block.index as usize) {
            lane.extend(block.samples.iter());
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::stream::frame::{decode_frame, encode_frame};
    fn fast_config(channels: u32) -> DemoConfig {
        DemoConfig {
            channels,
            sample_rate: 100.0,
            samples_per_batch: 10,
            run_seconds: 1.0,
            realtime: false,
            hidden_channels: vec![1],
            selected_channels: vec![0, 99],
            pipeline: PipelineConfig {
                fft_size: 16,
                freq_min_hz: 1,
                freq_max_hz: 20,
                spectrum_bins: 20,
                display_seconds: 0.5,
                ..PipelineConfig::default()
            },
            ..DemoConfig::default()
        }
    }
    #[test]
    fn fill_lanes_reuses_and_resizes() {
        let bytes = encode_frame(0, 0.0, 10.0, &[vec![1.0f32, 2.0], vec![3.0, 4.0]]);
        let frame = decode_frame(&bytes).unwrap();
        let mut lanes = vec![Vec::with_capacity(16); 3];
        fill_lanes(&mut lanes, &frame);
        assert_eq!(lanes, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert!(lanes[0].capacity() >= 16);
    }
    #[test]
    fn selection_ignores_out_of_range_channels() {
        let selection = build_selection(3, &[1, 7], &[0, 99]);
        assert_eq!(selection.visible, vec![true, false, true]);
        assert!(selection.is_selected(0));
        assert!(!selection.is_selected(99));
    }
    #[test]
    fn stream_change_discards_pending_batches() {
        let mut consumer = Consumer::new(&fast_config(2));
        let two = encode_frame(5, 0.0, 100.0, &[vec![1.0f32; 10], vec![2.0; 10]]);
        consumer.on_batch(&two).unwrap();
        assert!(consumer.sync.contains(5));
        // Same id space restarts on the new connection.
        let three = encode_frame(0, 0.0, 100.0, &[vec![1.0f32; 10], vec![2.0; 10], vec![3.0; 10]]);
        consumer.on_batch(&three).unwrap();
        assert_eq!(consumer.summary.reinitializations, 2);
        assert!(!consumer.sync.contains(5));
        assert!(consumer.sync.contains(0));
        assert_eq!(consumer.sync.len(), 1);
        let (min_hz, max_hz) = consumer.freq_range;
        let released = consumer.sync.take_next(min_hz, max_hz).unwrap();
        assert_eq!(released.batch_id, 0);
        assert_eq!(released.time.unwrap().header.channels_count, 3);
        assert_eq!(released.freq.unwrap().len(), 3);
    }
    #[test]
    fn rejected_batch_keeps_the_worker_and_pending_data() {
        let mut consumer = Consumer::new(&fast_config(2));
        let good = encode_frame(1, 0.0, 100.0, &[vec![1.0f32; 10], vec![2.0; 10]]);
        consumer.on_batch(&good).unwrap();
        let zero_rate = encode_frame(2, 0.0, 0.0, &[vec![1.0f32; 10], vec![2.0; 10]]);
        consumer.on_batch(&zero_rate).unwrap();
        let next = encode_frame(3, 0.0, 100.0, &[vec![1.0f32; 10], vec![2.0; 10]]);
        consumer.on_batch(&next).unwrap();
        assert_eq!(consumer.summary.reinitializations, 1);
        assert!(consumer.sync.contains(1));
        assert!(consumer.sync.contains(3));
        assert!(!consumer.sync.contains(2));
    }
    #[test]
    fn unpaced_run_consumes_every_batch() {
        let summary = run(&fast_config(3)).unwrap();
        assert_eq!(summary.batches_produced, 10);
        assert_eq!(summary.performance.total_batches, 10);
        assert_eq!(summary.performance.dropped_batches, 0);
        assert_eq!(summary.reinitializations, 1);
        assert_eq!(
            summary.worker.requests + summary.spectra_skipped,
            summary.batches_produced
        );
        assert!(summary.performance.frames_rendered >= 1);
        assert!(summary.snapshots.is_empty());
    }
    #[test]
    fn paced_run_pairs_spectra_and_writes_snapshots() {
        let dir = std::env::temp_dir().join(format!("neurostream-engine-{}", std::process::id()));
        let config = DemoConfig {
            realtime: true,
            run_seconds: 0.5,
            snapshot_dir: Some(dir.clone()),
            ..fast_config(2)
        };
        let summary = run(&config).unwrap();
        assert_eq!(summary.batches_produced, 5);
        // 16-point window fills on the second batch of 10.
        assert_eq!(summary.zero_filled, 1);
        assert_eq!(summary.synced_pairs, 4);
        assert_eq!(summary.performance.spectra_applied, 4);
        assert_eq!(summary.snapshots.len(), 2);
        for path in &summary.snapshots {
            assert!(std::fs::metadata(path).unwrap().len() > 0);
        }
        std::fs::remove_dir_all(&dir).ok();
    }
    #[test]
    fn invalid_config_fails_before_spawning() {
        let config = DemoConfig {
            samples_per_batch: 0,
            ..DemoConfig::default()
        };
        assert!(matches!(run(&config), Err(StreamError::InvalidConfig(_))));
    }
}
