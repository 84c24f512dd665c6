// src/stream/mod.rs
// 声明同级目录下的子模块文件
pub mod buffer;
pub mod error;
pub mod fft;
pub mod frame;
pub mod monitor;
pub mod pipeline;
pub mod plot;
pub mod source;
pub mod spectrum;
pub mod spectrum_view;
pub mod sync;
pub mod wavefront;
pub mod worker;
// 公开导出这些模块里的结构体，方便外部调用
pub use buffer::{ChannelRingBuffer, WindowView};
pub use error::{DecodeError, StreamError, ValidationError};
pub use fft::SpectrumBuilder;
pub use frame::{
    decode_frame, decode_frame_partial, decode_header, encode_frame, extract_channel,
    validate_frame, Frame, FrameHeader, FrameValidation, OwnedFrame, SampleView,
};
pub use monitor::{FramePacer, PerformanceMonitor, PerformanceSnapshot};
pub use pipeline::{BatchOutcome, StreamPipeline};
pub use plot::{render_spectrum_png, render_waveform_png, PlotStyle};
pub use source::{FrameSource, ManualSource, SyntheticSource};
pub use spectrum::SpectrumEntry;
pub use spectrum_view::SpectrumRenderState;
pub use sync::{FrameSynchronizer, SyncedFrame};
pub use wavefront::{line_color, ChannelSelection, RenderPhase, Rgb, WavefrontRenderState};
pub use worker::{SpectrumWorker, WorkerSettings, WorkerStats};
