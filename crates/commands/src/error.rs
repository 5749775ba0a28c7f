use std::error::Error as StdError;

use thiserror::Error;

/// Failures of the dispatch core.
///
/// Usage errors and permission denials are not errors here: they are
/// ordinary [`crate::Outcome`]s that end the pipeline with a message.
#[derive(Debug, Error)]
pub enum Error {
    /// A name or alias is already owned by another command. Fatal at startup.
    #[error("command key `{key}` is already registered by `{owner}`")]
    DuplicateCommand { key: String, owner: String },

    /// A definition that can never be invoked (empty name, blank alias, ...).
    #[error("invalid command definition: {message}")]
    InvalidDefinition { message: String },

    /// A generator or post-hook returned an error or panicked.
    #[error("command `{command}` failed: {source}")]
    HandlerFault {
        command: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The gateway rejected an outbound call the pipeline depends on.
    #[error(transparent)]
    Channel(#[from] ivebot_channels::Error),
}

impl Error {
    #[must_use]
    pub fn duplicate(key: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::DuplicateCommand {
            key: key.into(),
            owner: owner.into(),
        }
    }

    #[must_use]
    pub fn invalid_definition(message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn handler_fault(
        command: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::HandlerFault {
            command: command.into(),
            source: source.into(),
        }
    }

    /// Whether this error must abort startup.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateCommand { .. } | Self::InvalidDefinition { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
