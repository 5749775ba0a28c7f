use std::error::Error as StdError;

/// Crate-wide result type for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed gateway errors shared across the collaborator traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid gateway input: {message}")]
    InvalidInput { message: String },

    /// The referenced message, conversation or member does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// The bot lacks the platform permission to perform the operation.
    #[error("missing permission: {message}")]
    Forbidden { message: String },

    /// Operation is currently unavailable (not connected/ready).
    #[error("gateway operation unavailable: {message}")]
    Unavailable { message: String },

    /// Wrapped source error from the platform SDK.
    #[error("gateway operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    /// Snowflake/integer parsing failed.
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what: what.to_string(),
        }
    }

    #[must_use]
    pub fn forbidden(message: impl std::fmt::Display) -> Self {
        Self::Forbidden {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
