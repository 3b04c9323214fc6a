//! Error types for hop-client-kafka.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for hop-client-kafka operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur talking to Kafka, the Schema Registry or the
/// Hopskotch credential store.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from hop-client-core (schemas, encoding)
    #[error("Core error: {0}")]
    Core(#[from] hop_client_core::Error),

    /// Invalid Kafka or stream configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// Hopskotch credentials are missing or ambiguous
    #[error("Auth error: {message}")]
    Auth {
        /// What went wrong
        message: String,
    },

    /// Error reported by librdkafka
    #[error("Kafka error: {message}")]
    Kafka {
        /// Rendered Kafka error
        message: String,
    },

    /// The Schema Registry rejected a request
    #[error(
        "Schema Registry error ({}): {message}",
        .status.map(|s| s.to_string()).unwrap_or_else(|| "no status".to_string())
    )]
    Registry {
        /// HTTP status, if a response was received
        status: Option<u16>,
        /// Response body or description
        message: String,
    },

    /// HTTP transport error talking to the Schema Registry
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A message payload could not be decoded
    #[error("Malformed message: {message}")]
    Message {
        /// What was wrong with it
        message: String,
    },

    /// I/O error with the file that caused it
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error
    #[error("TOML error in {}: {source}", .path.display())]
    Toml {
        /// File being parsed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },
}

impl Error {
    /// Returns whether the failed operation may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kafka { .. } => true,
            Error::Http(_) => true,
            Error::Registry { status, .. } => status.is_none_or(|s| s >= 500),
            Error::Io { .. } => true,
            Error::Core(_) => false,
            Error::Config { .. } => false,
            Error::Auth { .. } => false,
            Error::Message { .. } => false,
            Error::Toml { .. } => false,
        }
    }

    /// Returns `true` for errors caused by a single bad message rather than
    /// by the connection.
    pub fn is_malformed_message(&self) -> bool {
        matches!(self, Error::Message { .. })
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates an auth error.
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Error::Auth {
            message: message.into(),
        }
    }

    /// Creates a Kafka error from a description.
    pub fn kafka<S: Into<String>>(message: S) -> Self {
        Error::Kafka {
            message: message.into(),
        }
    }

    /// Creates a Schema Registry error.
    pub fn registry<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        Error::Registry {
            status,
            message: message.into(),
        }
    }

    /// Creates a malformed message error.
    pub fn message<S: Into<String>>(message: S) -> Self {
        Error::Message {
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

impl From<rdkafka::error::KafkaError> for Error {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Error::kafka(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::kafka("broker transport failure").is_retryable());
        assert!(Error::registry(Some(503), "unavailable").is_retryable());
        assert!(Error::registry(None, "connection reset").is_retryable());
        assert!(!Error::registry(Some(422), "incompatible schema").is_retryable());
        assert!(!Error::config("bad").is_retryable());
        assert!(!Error::auth("no credentials").is_retryable());
        assert!(!Error::message("not json").is_retryable());
    }

    #[test]
    fn test_registry_error_display() {
        let err = Error::registry(Some(409), "conflict");
        assert_eq!(err.to_string(), "Schema Registry error (409): conflict");
        let err = Error::registry(None, "timeout");
        assert_eq!(err.to_string(), "Schema Registry error (no status): timeout");
    }

    #[test]
    fn test_core_error_conversion() {
        let err: Error = hop_client_core::Error::schema("not a record").into();
        assert_eq!(err.to_string(), "Core error: Schema error: not a record");
    }

    #[test]
    fn test_malformed_message_predicate() {
        assert!(Error::message("empty payload").is_malformed_message());
        assert!(!Error::kafka("down").is_malformed_message());
    }

    #[test]
    fn test_io_error_with_path() {
        let err = Error::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            "/etc/hop/auth.toml",
        );
        assert!(err.to_string().contains("/etc/hop/auth.toml"));
    }

    #[test]
    fn test_error_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
