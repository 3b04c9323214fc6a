//! Error types for hop-client-core.

/// Errors raised while building schemas, encoding records or tracking
/// service state.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A schema could not be built, or content does not fit a schema.
    #[error("Schema error{}: {message}", field_suffix(.field))]
    Schema {
        /// Field the problem relates to, if any
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// Error reported by the Avro library while parsing or encoding.
    #[error("Avro error: {message}")]
    Avro {
        /// Rendered Avro error
        message: String,
    },

    /// A Confluent-framed payload could not be decoded.
    #[error("Decode error: {message}")]
    Decode {
        /// What went wrong
        message: String,
    },

    /// A service did not reach the expected lifecycle state.
    #[error("Service '{name}' {message}")]
    Service {
        /// Service name
        name: String,
        /// What happened
        message: String,
    },
}

fn field_suffix(field: &Option<String>) -> String {
    field
        .as_ref()
        .map(|f| format!(" in field '{f}'"))
        .unwrap_or_default()
}

/// Convenience `Result` type alias for hop-client-core operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a schema error that is not tied to a field.
    pub fn schema<S: Into<String>>(message: S) -> Self {
        Error::Schema {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a schema error for a named field.
    pub fn schema_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Schema {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Error::Decode {
            message: message.into(),
        }
    }

    /// Creates a service lifecycle error.
    pub fn service<N, M>(name: N, message: M) -> Self
    where
        N: Into<String>,
        M: Into<String>,
    {
        Error::Service {
            name: name.into(),
            message: message.into(),
        }
    }
}

// Avro errors carry schema and value trees; keep only the rendered text so
// `Error` stays `Send + Sync` and cheap to move between tasks.
impl From<apache_avro::Error> for Error {
    fn from(err: apache_avro::Error) -> Self {
        Error::Avro {
            message: err.to_string(),
        }
    }
}
