//! Error types for hop-client

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for hop-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hop-client
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from hop-client-core
    #[error("Core error: {0}")]
    Core(#[from] hop_client_core::Error),

    /// Error from hop-client-kafka
    #[error("Kafka client error: {0}")]
    Kafka(#[from] hop_client_kafka::Error),

    /// `start` was called while a producer is already running
    #[error("Kafka producer already started.")]
    AlreadyStarted,

    /// The read loop stopped with an error
    #[error("Error reading/sending scimma topic: {message}")]
    ReadTopic {
        /// Rendered cause
        message: String,
    },

    /// Invalid configuration file or value
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// Invalid combination of command-line arguments
    #[error("{message}")]
    Usage {
        /// Message shown to the user
        message: String,
    },

    /// I/O error with the file that caused it
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a usage error.
    pub fn usage<S: Into<String>>(message: S) -> Self {
        Error::Usage {
            message: message.into(),
        }
    }

    /// Creates an I/O error tagged with the path involved.
    pub fn io_with_path(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
