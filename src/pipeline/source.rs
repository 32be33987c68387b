use crate::error::Result;
use crate::frame::{Dimensions, Frame};

/// Stream-level facts a source reports once, before any frame is pulled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceMetadata {
    pub dimensions: Dimensions,
    pub duration: f64,
    pub frame_rate: f64,
}

pub enum Pull {
    Frame(Frame),
    EndOfStream,
    Paused,
}

/// Supplies raw frames in presentation order, one per `pull`.
pub trait FrameSource {
    /// Called once at the start of every job. The next `pull` yields the
    /// first frame of the stream, whatever an earlier job consumed.
    fn metadata(&mut self) -> Result<SourceMetadata>;

    fn pull(&mut self) -> Result<Pull>;
}
