//! Error type shared by the session, the harness and the backends.

use std::path::PathBuf;

use thiserror::Error;

use crate::{core::types::BodyHandle, model::ModelError};

/// Anything that can abort a drop sweep.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The backend could not be reached.
    #[error("failed to connect to {backend} backend: {message}")]
    Connection { backend: String, message: String },

    /// A call was made on a session whose connection is closed.
    #[error("backend is not connected")]
    NotConnected,

    /// Stepping or loading was attempted before `configure`.
    #[error("simulation has not been configured")]
    NotConfigured,

    /// A model file could not be resolved or turned into a body.
    #[error("failed to load model {}: {}", .path.display(), .message)]
    ModelLoad { path: PathBuf, message: String },

    /// A model file was found but its description is malformed.
    #[error("malformed model: {0}")]
    Model(#[from] ModelError),

    /// The handle does not name a body loaded in this backend.
    #[error("unknown body handle {0}")]
    UnknownBody(BodyHandle),

    /// Any other failure reported by the backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// Invalid harness configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    pub fn connection(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn model_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_load_names_the_path() {
        let err = HarnessError::model_load("objects/cube.urdf", "file not found");
        let text = err.to_string();
        assert!(text.contains("objects/cube.urdf"));
        assert!(text.contains("file not found"));
    }

    #[test]
    fn unknown_body_displays_handle() {
        let err = HarnessError::UnknownBody(BodyHandle(7));
        assert!(err.to_string().contains("body#7"));
    }
}
