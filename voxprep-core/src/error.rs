use thiserror::Error;

/// All errors produced by voxprep-core.
#[derive(Debug, Error)]
pub enum VoxprepError {
    #[error("audio decode error: {0}")]
    Decode(String),

    #[error("resample error: {0}")]
    Resample(String),

    #[error("empty audio buffer, nothing to process")]
    EmptyBuffer,

    #[error("malformed feature set: {0}")]
    MalformedFeatures(String),

    #[error("clip write error: {0}")]
    ClipWrite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VoxprepError>;
