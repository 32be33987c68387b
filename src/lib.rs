//! Frame-by-frame video upscaling: bilinear resampling, 3x3 sharpening, and
//! a cooperative driver that moves frames from a source to a sink.

pub mod arguments;
pub mod error;
pub mod frame;
pub mod pipeline;
mod process;
pub mod resample;
pub mod sharpen;
pub mod video;

pub use error::{Error, Result};
pub use frame::{Dimensions, Frame, PixelBuffer, ScaleFactor};
pub use pipeline::{
    Artifact, CancelHandle, FrameSink, FrameSource, JobOptions, JobOutcome, JobState, Pipeline, ProgressObserver,
    ProgressReport, Pull, SourceMetadata, Step,
};
pub use resample::{resample_bilinear, upscale};
pub use sharpen::sharpen;
