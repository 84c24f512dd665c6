use std::time::Instant;
use log::{debug, info, trace, warn};
use crate::config::PipelineConfig;
use crate::stream::buffer::ChannelRingBuffer;
use crate::stream::error::StreamError;
use crate::stream::frame::{decode_frame, Frame, FrameHeader};
use crate::stream::monitor::{FramePacer, PerformanceMonitor};
use crate::stream::wavefront::{ChannelSelection, WavefrontRenderState};
/// What one ingested batch did to the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch_id: u64,
    pub samples_per_channel: usize,
    /// Buffers were (re)built for this batch: first batch or a stream
    /// configuration change.
    pub reinitialized: bool,
    /// `batch_id` did not exceed the previous one. The batch was still applied.
    pub out_of_order: bool,
    /// The wavefront moved.
    pub advanced: bool,
    /// The pacer let a frame-rendered notification through.
    pub frame_ready: bool,
}
/// Time-domain consumer: decodes batches, keeps the ring buffer and the
/// wavefront in step, and tracks throughput.
pub struct StreamPipeline {
    config: PipelineConfig,
    buffer: Option<ChannelRingBuffer>,
    wavefront: WavefrontRenderState,
    last_batch_id: Option<u64>,
    monitor: PerformanceMonitor,
    pacer: FramePacer,
    torn_down: bool,
}
impl StreamPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let wavefront = WavefrontRenderState::new(config.display_seconds, config.assumed_signal_range);
        let monitor = PerformanceMonitor::new(config.monitor_window(), config.report_interval());
        let pacer = FramePacer::new(config.frame_interval());
        Self {
            config,
            buffer: None,
            wavefront,
            last_batch_id: None,
            monitor,
            pacer,
            torn_down: false,
        }
    }
    pub fn buffer(&self) -> Option<&ChannelRingBuffer> {
        self.buffer.as_ref()
    }
    pub fn wavefront(&self) -> &WavefrontRenderState {
        &self.wavefront
    }
    pub fn wavefront_mut(&mut self) -> &mut WavefrontRenderState {
        &mut self.wavefront
    }
    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }
    pub fn monitor_mut(&mut self) -> &mut PerformanceMonitor {
        &mut self.monitor
    }
    pub fn last_batch_id(&self) -> Option<u64> {
        self.last_batch_id
    }
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
    pub fn ingest_bytes(
        &mut self,
        bytes: &[u8],
        selection: &ChannelSelection,
    ) -> Result<Option<BatchOutcome>, StreamError> {
        self.ingest_bytes_with(bytes, selection, |_| {})
    }
    /// Decodes and applies one batch, then hands the decoded frame to
    /// `on_frame` while it still borrows `bytes`.
    ///
    /// Returns `Ok(None)` after [`teardown`](Self::teardown). A batch that
    /// fails to decode is counted as dropped and its error returned; the
    /// pipeline stays usable.
    pub fn ingest_bytes_with<F>(
        &mut self,
        bytes: &[u8],
        selection: &ChannelSelection,
        on_frame: F,
    ) -> Result<Option<BatchOutcome>, StreamError>
    where
        F: FnOnce(&Frame<'_>),
    {
        if self.torn_down {
            debug!("pipeline torn down; {} byte batch ignored", bytes.len());
            return Ok(None);
        }
        let started = Instant::now();
        let frame = match decode_frame(bytes) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("dropping batch: {err}");
                self.monitor.record_drop();
                return Err(err.into());
            }
        };
        let header = *frame.header();
        trace!(
            "batch {} ({} ch x {} samples)",
            header.batch_id,
            header.channels_count,
            header.samples_per_channel
        );
        let reinitialized = match self.ensure_stream(&header) {
            Ok(rebuilt) => rebuilt,
            Err(err) => {
                warn!("dropping batch {}: {err}", header.batch_id);
                self.monitor.record_drop();
                return Err(err);
            }
        };
        let out_of_order = self.check_order(header.batch_id);
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.ingest_batch(&frame)?;
        }
        let advanced = self.wavefront.advance(&frame, selection);
        on_frame(&frame);
        let now = Instant::now();
        let samples = header.channels_count as usize * frame.samples_per_channel();
        self.monitor
            .record_batch_at(now, samples, bytes.len(), now.saturating_duration_since(started));
        let frame_ready = advanced && self.pacer.ready(now);
        if frame_ready {
            self.monitor.record_frame();
        }
        if self.monitor.should_report(now) {
            let snap = self.monitor.snapshot_at(now);
            info!(
                "throughput: {:.1} batches/s, {:.0} samples/s, {:.1} KiB/s, latency mean {:?} max {:?}, dropped {}, out of order {}",
                snap.batches_per_sec,
                snap.samples_per_sec,
                snap.bytes_per_sec / 1024.0,
                snap.mean_latency,
                snap.max_latency,
                snap.dropped_batches,
                snap.out_of_order_batches
            );
        }
        Ok(Some(BatchOutcome {
            batch_id: header.batch_id,
            samples_per_channel: frame.samples_per_channel(),
            reinitialized,
            out_of_order,
            advanced,
            frame_ready,
        }))
    }
    /// Stops consuming and releases every buffer. Irreversible.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.buffer = None;
        self.wavefront.teardown();
        info!(
            "pipeline torn down after {} batches",
            self.monitor.snapshot().total_batches
        );
    }
    /// Makes the ring buffer and wavefront match `header`. Returns `true` when
    /// they were rebuilt. A rejected header leaves every piece of state as it was.
    fn ensure_stream(&mut self, header: &FrameHeader) -> Result<bool, StreamError> {
        let channels = header.channels_count as usize;
        let rate = header.sample_rate;
        match &self.buffer {
            Some(buffer) if buffer.channels() == channels && buffer.sample_rate() == rate => {
                return Ok(false)
            }
            _ => {}
        }
        self.config.check_stream(channels, rate)?;
        let buffer =
            ChannelRingBuffer::with_history_seconds(channels, rate, self.config.ring_window_seconds)?;
        match &self.buffer {
            Some(old) => info!(
                "stream changed from {} ch @ {} Hz to {channels} ch @ {rate} Hz; reinitializing",
                old.channels(),
                old.sample_rate()
            ),
            None => info!("stream started: {channels} ch @ {rate} Hz"),
        }
        self.wavefront.configure(channels, rate)?;
        self.buffer = Some(buffer);
        self.last_batch_id = None;
        Ok(true)
    }
    fn check_order(&mut self, batch_id: u64) -> bool {
        let out_of_order = matches!(self.last_batch_id, Some(last) if batch_id <= last);
        if out_of_order {
            warn!(
                "batch {batch_id} arrived after batch {}; applying in arrival order",
                self.last_batch_id.unwrap_or_default()
            );
            self.monitor.record_out_of_order();
        }
        self.last_batch_id = Some(batch_id);
        out_of_order
    }
}
