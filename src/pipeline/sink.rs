use crate::error::Result;
use crate::frame::{Dimensions, Frame};

use std::path::PathBuf;

/// What a finalized sink hands back to the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum Artifact {
    File(PathBuf),
    Memory(Vec<u8>),
}

/// Consumes processed frames.
///
/// `arm` is always called before the first `push`. A job ends with exactly
/// one of `finalize` (the output is complete) or `discard` (throw away
/// whatever was written).
pub trait FrameSink {
    fn arm(&mut self, dimensions: Dimensions, frame_rate: f64) -> Result<()>;

    fn push(&mut self, frame: Frame) -> Result<()>;

    fn finalize(&mut self) -> Result<Artifact>;

    fn discard(&mut self) -> Result<()>;
}
