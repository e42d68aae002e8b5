//! Error types for cloudscope.

use thiserror::Error;

use crate::volume::VolumeId;

/// The main error type for cloudscope operations.
#[derive(Error, Debug)]
pub enum CloudscopeError {
    /// A volume kind name did not match any supported shape.
    #[error("unknown volume kind '{0}' (expected one of: box, sphere)")]
    UnknownVolumeKind(String),

    /// A volume with the given id was not found in the scene.
    #[error("volume {0} not found")]
    VolumeNotFound(VolumeId),

    /// Rendering error.
    #[error("render error: {0}")]
    RenderError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for cloudscope operations.
pub type Result<T> = std::result::Result<T, CloudscopeError>;
