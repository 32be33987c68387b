use image::error::ImageError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("malformed frame: {0}")]
    FrameFormat(String),

    #[error("frame sink failed: {0}")]
    Sink(String),

    #[error("frame source failed: {0}")]
    Source(String),

    #[error("invalid pipeline state: {0}")]
    InvalidState(String),

    #[error("failed to process image: {0}")]
    Image(#[from] ImageError),

    #[error("I/O operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("FFmpeg is not available on this system")]
    FfmpegNotAvailable,

    #[error("the encoder is not supported: {0}")]
    UnsupportedEncoder(String),

    #[error("invalid argument provided: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn invalid_dimensions(msg: impl Into<String>) -> Self {
        Self::InvalidDimensions(msg.into())
    }

    pub fn frame_format(msg: impl Into<String>) -> Self {
        Self::FrameFormat(msg.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}
