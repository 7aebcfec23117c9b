//! Validation of the three engine paths.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Which engine path is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Module configuration file; must be a regular file.
    Config,
    /// Module setup file; must be a regular file.
    Setup,
    /// Directory scanned for modules.
    Modules,
}

impl PathKind {
    pub fn expects_directory(self) -> bool {
        matches!(self, PathKind::Modules)
    }
}

impl Display for PathKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::Config => write!(f, "config file"),
            PathKind::Setup => write!(f, "setup file"),
            PathKind::Modules => write!(f, "modules directory"),
        }
    }
}

/// Check that `path` exists and is of the right kind for `kind`.
///
/// Paths are also rejected when they contain a NUL byte, since modules
/// receive them as C strings.
pub fn validate(kind: PathKind, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();

    if path.as_os_str().is_empty() {
        return Err(Error::path_invalid(kind, path, "path is empty"));
    }

    if path.as_os_str().as_encoded_bytes().contains(&0) {
        return Err(Error::path_invalid(kind, path, "path contains a NUL byte"));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| Error::path_invalid(kind, path, format!("not accessible: {}", e)))?;

    if kind.expects_directory() {
        if !metadata.is_dir() {
            return Err(Error::path_invalid(kind, path, "not a directory"));
        }
    } else if !metadata.is_file() {
        return Err(Error::path_invalid(kind, path, "not a regular file"));
    }

    Ok(path.to_path_buf())
}
