use thiserror::Error;
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("buffer too short for frame header: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error(
        "frame truncated: expected {expected} bytes, got {actual} ({parsed_channels} channels parsed)"
    )]
    Truncated {
        expected: usize,
        actual: usize,
        parsed_channels: usize,
    },
    #[error("channel index {index} out of range for {channels} channels")]
    ChannelOutOfRange { index: u32, channels: u32 },
    #[error("spectrum for channel {channel} has {spectrum} magnitudes but {bins} frequency bins")]
    SpectrumLengthMismatch {
        channel: u32,
        spectrum: usize,
        bins: usize,
    },
    #[error("spectrum for channel {channel} has invalid magnitude {value} at bin {bin}")]
    InvalidMagnitude { channel: u32, bin: usize, value: f64 },
    #[error("malformed spectrum message: {0}")]
    Json(#[from] serde_json::Error),
}
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("frame size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(
        "stream configuration changed: {expected_channels} ch @ {expected_rate} Hz -> {actual_channels} ch @ {actual_rate} Hz"
    )]
    ConfigMismatch {
        expected_channels: usize,
        expected_rate: f64,
        actual_channels: usize,
        actual_rate: f64,
    },
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("stream exceeds configured limits: {0}")]
    LimitExceeded(String),
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("spectrum worker disconnected")]
    WorkerDisconnected,
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl StreamError {
    /// Errors that only cost the current batch; the pipeline keeps running.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StreamError::Decode(_)
                | StreamError::Validation(_)
                | StreamError::ConfigMismatch { .. }
                | StreamError::InvalidSampleRate
                | StreamError::LimitExceeded(_)
        )
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for StreamError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        StreamError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for StreamError {
    fn from(value: image::ImageError) -> Self {
        StreamError::Plot(value.to_string())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn batch_level_errors_are_recoverable() {
        let short = StreamError::from(DecodeError::TooShort {
            needed: 32,
            actual: 20,
        });
        assert!(short.is_recoverable());
        assert!(StreamError::InvalidSampleRate.is_recoverable());
        assert!(StreamError::LimitExceeded("too wide".into()).is_recoverable());
        assert!(!StreamError::WorkerDisconnected.is_recoverable());
        assert!(!StreamError::InvalidConfig("x".into()).is_recoverable());
    }
    #[test]
    fn messages_carry_sizes() {
        let err = StreamError::from(ValidationError::SizeMismatch {
            expected: 72,
            actual: 70,
        });
        assert_eq!(err.to_string(), "frame size mismatch: expected 72 bytes, got 70");
    }
}
