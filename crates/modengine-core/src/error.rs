//! Error handling for the module engine.
//!
//! Every fallible engine operation returns [`Result`]. Discovery errors carry
//! the offending file and symbol so a broken module directory can be fixed
//! without attaching a debugger.

use std::path::PathBuf;

use crate::paths::PathKind;

/// Engine error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The host platform cannot load dynamic libraries at all.
    #[error("Dynamic loading is not supported on this platform")]
    DynamicLoadingUnsupported,

    /// Looking up a required symbol failed.
    #[error("{file}:{symbol}: {reason}")]
    LoadingModule {
        file: String,
        symbol: String,
        reason: String,
    },

    /// A required symbol was found but resolved to null.
    #[error("{file}:{symbol} symbol is not defined")]
    SymbolNotDefined { file: String, symbol: String },

    /// A supplied path failed existence or kind validation.
    #[error("Invalid {kind} path {}: {reason}", path.display())]
    PathInvalid {
        kind: PathKind,
        path: PathBuf,
        reason: String,
    },

    /// The modules directory could not be listed.
    #[error("Failed to read modules directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file or environment override is malformed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn path_invalid(
        kind: PathKind,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::PathInvalid {
            kind,
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for the two errors a discovery pass aborts with.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::LoadingModule { .. } | Self::SymbolNotDefined { .. }
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
