use crate::config::ConfigError;
use crate::finder::FinderError;
use crate::frame::DecodeError;
use crate::transport::TransportError;

/// Fatal errors: the node must not accept frames after any of these.
#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown target finder type '{name}' (registered: {available})")]
    UnknownFinder { name: String, available: String },

    #[error("failed to construct target finder '{name}': {source}")]
    FinderConstruction {
        name: String,
        #[source]
        source: FinderError,
    },

    #[error("failed to advertise topic '{topic}': {source}")]
    Advertise {
        topic: String,
        #[source]
        source: TransportError,
    },
}

/// Recoverable errors scoped to a single frame. The frame is dropped.
#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("image conversion failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("target detection failed: {0}")]
    Detection(#[source] FinderError),

    #[error("annotation failed: {0}")]
    Annotation(#[source] FinderError),
}
