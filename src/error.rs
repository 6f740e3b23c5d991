//! # Error Types
//!
//! Custom error types for Analog Fly using `thiserror`.

use thiserror::Error;

use crate::fly::axis::Dof;

/// Main error type for Analog Fly
#[derive(Debug, Error)]
pub enum AnalogFlyError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// A single axis mapping is malformed (fatal at construction)
    #[error("Invalid mapping for axis {axis}: {reason}")]
    InvalidAxis { axis: Dof, reason: String },

    /// A named analog or button source could not be bound
    #[error("Input source '{name}' unavailable: {reason}")]
    SourceUnavailable { name: String, reason: String },

    /// Input device failed while pumping events
    #[error("Input device error: {0}")]
    Device(String),

    /// Report could not be handed to subscribers
    #[error("Publish error: {0}")]
    Publish(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Analog Fly
pub type Result<T> = std::result::Result<T, AnalogFlyError>;
