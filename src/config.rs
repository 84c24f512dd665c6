// src/config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::stream::error::StreamError;
/// Tunables for one pipeline instance. Every field has a default, so a
/// config file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seconds of history kept per channel in the ring buffer.
    pub ring_window_seconds: f64,
    /// Seconds shown across the wavefront display.
    pub display_seconds: f64,
    /// Amplitude (µV) that fills 80% of a channel's band.
    pub assumed_signal_range: f32,
    /// Spectrum magnitude drawn at the top of a channel's band.
    pub reference_amplitude: f64,
    pub spectrum_bins: usize,
    pub fft_size: usize,
    pub freq_min_hz: u32,
    pub freq_max_hz: u32,
    pub sync_retention: usize,
    pub worker_queue_depth: usize,
    pub frame_interval_ms: u64,
    pub monitor_window_ms: u64,
    pub report_interval_ms: u64,
    /// Streams above these limits are refused before anything is allocated.
    pub max_sample_rate: f64,
    pub max_channels: usize,
    /// Cap on ring plus display samples summed over all channels.
    pub max_buffered_samples: usize,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ring_window_seconds: 10.0,
            display_seconds: 5.0,
            assumed_signal_range: 200.0,
            reference_amplitude: 20.0,
            spectrum_bins: 50,
            fft_size: 256,
            freq_min_hz: 1,
            freq_max_hz: 50,
            sync_retention: 10,
            worker_queue_depth: 4,
            frame_interval_ms: 33,
            monitor_window_ms: 1000,
            report_interval_ms: 5000,
            max_sample_rate: 100_000.0,
            max_channels: 1024,
            max_buffered_samples: 16 * 1024 * 1024,
        }
    }
}
impl PipelineConfig {
    pub fn validate(&self) -> Result<(), StreamError> {
        let bad = |msg: String| Err(StreamError::InvalidConfig(msg));
        if !(self.ring_window_seconds > 0.0) {
            return bad(format!("ring_window_seconds must be > 0, got {}", self.ring_window_seconds));
        }
        if !(self.display_seconds > 0.0) {
            return bad(format!("display_seconds must be > 0, got {}", self.display_seconds));
        }
        if !(self.assumed_signal_range > 0.0) {
            return bad(format!(
                "assumed_signal_range must be > 0, got {}",
                self.assumed_signal_range
            ));
        }
        if !(self.reference_amplitude > 0.0) {
            return bad(format!(
                "reference_amplitude must be > 0, got {}",
                self.reference_amplitude
            ));
        }
        if self.spectrum_bins == 0 {
            return bad("spectrum_bins must be at least 1".into());
        }
        if self.fft_size < 2 {
            return bad(format!("fft_size must be at least 2, got {}", self.fft_size));
        }
        if self.freq_min_hz > self.freq_max_hz {
            return bad(format!(
                "frequency range {}-{} Hz is empty",
                self.freq_min_hz, self.freq_max_hz
            ));
        }
        if self.sync_retention == 0 {
            return bad("sync_retention must be at least 1".into());
        }
        if !(self.max_sample_rate > 0.0) || self.max_channels == 0 || self.max_buffered_samples == 0 {
            return bad("stream limits must be positive".into());
        }
        Ok(())
    }
    /// Checks a stream's shape against the limits. Only the sample rate and
    /// the channel count come from the wire, so this runs before any buffer
    /// for them is sized.
    pub fn check_stream(&self, channels: usize, sample_rate: f64) -> Result<(), StreamError> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(StreamError::InvalidSampleRate);
        }
        if sample_rate > self.max_sample_rate {
            return Err(StreamError::LimitExceeded(format!(
                "sample rate {sample_rate} Hz above {} Hz",
                self.max_sample_rate
            )));
        }
        if channels > self.max_channels {
            return Err(StreamError::LimitExceeded(format!(
                "{channels} channels above {}",
                self.max_channels
            )));
        }
        let per_channel = (sample_rate * self.ring_window_seconds).ceil()
            + (sample_rate * self.display_seconds).ceil();
        let total = per_channel * channels as f64;
        if total > self.max_buffered_samples as f64 {
            return Err(StreamError::LimitExceeded(format!(
                "{channels} ch @ {sample_rate} Hz needs {total} buffered samples, limit {}",
                self.max_buffered_samples
            )));
        }
        Ok(())
    }
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
    pub fn monitor_window(&self) -> Duration {
        Duration::from_millis(self.monitor_window_ms)
    }
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}
/// Synthetic producer settings for the demo binary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub channels: u32,
    pub sample_rate: f64,
    pub samples_per_batch: u32,
    pub run_seconds: f64,
    pub seed: u64,
    /// Pace the producer at the sample rate; otherwise it runs flat out.
    pub realtime: bool,
    /// Channels hidden from the wavefront at start.
    pub hidden_channels: Vec<usize>,
    pub selected_channels: Vec<usize>,
    /// Where PNG snapshots of both views are written at the end, if set.
    pub snapshot_dir: Option<PathBuf>,
    pub pipeline: PipelineConfig,
}
impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            channels: 8,
            sample_rate: 250.0,
            samples_per_batch: 8,
            run_seconds: 5.0,
            seed: 7,
            realtime: true,
            hidden_channels: Vec::new(),
            selected_channels: Vec::new(),
            snapshot_dir: None,
            pipeline: PipelineConfig::default(),
        }
    }
}
impl DemoConfig {
    pub fn from_json_str(text: &str) -> Result<Self, StreamError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| StreamError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
    pub fn load(path: &Path) -> Result<Self, StreamError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
    pub fn validate(&self) -> Result<(), StreamError> {
        if !(self.sample_rate > 0.0) || !self.sample_rate.is_finite() {
            return Err(StreamError::InvalidSampleRate);
        }
        if self.samples_per_batch == 0 {
            return Err(StreamError::InvalidConfig(
                "samples_per_batch must be at least 1".into(),
            ));
        }
        self.pipeline.validate()?;
        self.pipeline
            .check_stream(self.channels as usize, self.sample_rate)
            .map_err(|err| StreamError::InvalidConfig(err.to_string()))
    }
    /// Wall-clock time between batches at the configured rate.
    pub fn batch_interval(&self) -> Duration {
        Duration::from_secs_f64(self.samples_per_batch as f64 / self.sample_rate)
    }
    /// Batches needed to cover `run_seconds`, at least one.
    pub fn batch_count(&self) -> u64 {
        let batches = (self.run_seconds * self.sample_rate / self.samples_per_batch as f64).ceil();
        if batches.is_finite() && batches >= 1.0 {
            batches as u64
        } else {
            1
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
        assert!(DemoConfig::default().validate().is_ok());
        assert_eq!(DemoConfig::default().batch_interval(), Duration::from_millis(32));
        // 5 s at 250 Hz in batches of 8.
        assert_eq!(DemoConfig::default().batch_count(), 157);
    }
    #[test]
    fn stream_limits_guard_buffer_sizes() {
        let config = PipelineConfig::default();
        assert!(config.check_stream(8, 250.0).is_ok());
        assert!(matches!(
            config.check_stream(2, 0.0),
            Err(StreamError::InvalidSampleRate)
        ));
        assert!(matches!(
            config.check_stream(2, f64::INFINITY),
            Err(StreamError::InvalidSampleRate)
        ));
        assert!(matches!(
            config.check_stream(1, 1e15),
            Err(StreamError::LimitExceeded(_))
        ));
        assert!(matches!(
            config.check_stream(5000, 1.0),
            Err(StreamError::LimitExceeded(_))
        ));
        // 1024 ch @ 100 kHz over 15 s of buffers is far past the sample cap.
        assert!(matches!(
            config.check_stream(1024, 100_000.0),
            Err(StreamError::LimitExceeded(_))
        ));
        assert!(matches!(
            DemoConfig::from_json_str(r#"{ "channels": 4096 }"#),
            Err(StreamError::InvalidConfig(_))
        ));
    }
    #[test]
    fn partial_json_keeps_defaults() {
        let config = DemoConfig::from_json_str(
            r#"{ "channels": 4, "pipeline": { "display_seconds": 2.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.channels, 4);
        assert_eq!(config.sample_rate, 250.0);
        assert_eq!(config.pipeline.display_seconds, 2.5);
        assert_eq!(config.pipeline.fft_size, 256);
        assert!(config.snapshot_dir.is_none());
    }
    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            DemoConfig::from_json_str(r#"{ "sample_rate": 0 }"#),
            Err(StreamError::InvalidSampleRate)
        ));
        assert!(matches!(
            DemoConfig::from_json_str(r#"{ "pipeline": { "freq_min_hz": 60 } }"#),
            Err(StreamError::InvalidConfig(_))
        ));
        assert!(matches!(
            DemoConfig::from_json_str("not json"),
            Err(StreamError::InvalidConfig(_))
        ));
    }
}
