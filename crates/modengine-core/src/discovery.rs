//! Discovery pass.
//!
//! Scans a directory and turns every file that opens as a dynamic library
//! into a [`LoadedModule`]. Files that do not open are skipped. A library that
//! opens but misses any required symbol aborts the whole pass: the caller gets
//! the error together with everything accumulated so far and must unwind it.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EntryOrder;
use crate::error::{Error, Result};
use crate::library::{LibraryHandle, LibraryLoader};
use crate::module::{Module, ModuleDescriptor};

/// A validated module together with the library backing it.
///
/// The module borrows from the record, so it cannot be called once the
/// library is closed:
///
/// ```compile_fail
/// use modengine_core::{LoadedModule, Module};
/// fn detach(loaded: LoadedModule) {
///     let module = loaded.module();
///     loaded.close();
///     module.logic_run();
/// }
/// ```
#[derive(Debug)]
pub struct LoadedModule {
    descriptor: ModuleDescriptor,
    library: LibraryHandle,
    loaded_at: DateTime<Utc>,
}

impl LoadedModule {
    fn new(descriptor: ModuleDescriptor, library: LibraryHandle) -> Self {
        Self {
            descriptor,
            library,
            loaded_at: Utc::now(),
        }
    }

    pub fn module(&self) -> &dyn Module {
        &self.descriptor
    }

    pub fn path(&self) -> &Path {
        self.library.path()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn info(&self) -> ModuleInfo {
        ModuleInfo {
            name: self.descriptor.name(),
            version: self.descriptor.version(),
            file: self.path().to_path_buf(),
            loaded_at: self.loaded_at,
        }
    }

    /// Close the backing library without running any module routine.
    pub fn close(self) {
        self.library.close();
    }
}

/// Read-only snapshot of a loaded module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    pub version: String,
    pub file: PathBuf,
    pub loaded_at: DateTime<Utc>,
}

impl Display for ModuleInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{} ({})", self.name, self.version, self.file.display())
    }
}

/// A discovery pass that stopped early.
#[derive(Debug)]
pub struct DiscoveryFailure {
    pub error: Error,
    /// Modules accepted before the failing entry, in discovery order.
    pub partial: Vec<LoadedModule>,
}

impl DiscoveryFailure {
    /// Close every partially accumulated library and hand back the error.
    pub fn unwind(self) -> Error {
        let count = self.partial.len();
        for loaded in self.partial {
            loaded.close();
        }
        if count > 0 {
            tracing::debug!("Unwound {} partially discovered module(s)", count);
        }
        self.error
    }
}

impl From<Error> for DiscoveryFailure {
    fn from(error: Error) -> Self {
        Self {
            error,
            partial: Vec::new(),
        }
    }
}

/// Scan `directory` for modules.
///
/// With [`EntryOrder::Filesystem`] the result follows the platform's directory
/// listing, which is unspecified; callers needing a stable order should pass
/// [`EntryOrder::FileName`].
pub fn discover(
    loader: &dyn LibraryLoader,
    directory: &Path,
    order: EntryOrder,
) -> std::result::Result<Vec<LoadedModule>, DiscoveryFailure> {
    let entries = list_entries(directory, order)?;
    let mut loaded = Vec::new();

    for path in entries {
        let library = match LibraryHandle::open(loader, &path) {
            Ok(library) => library,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        // SAFETY: the descriptor is stored next to `library` in the same
        // `LoadedModule` and dropped with it.
        match unsafe { ModuleDescriptor::resolve(&library) } {
            Ok(descriptor) => {
                tracing::info!("Discovered module {}", path.display());
                loaded.push(LoadedModule::new(descriptor, library));
            }
            Err(error) => {
                tracing::warn!("Rejecting {}: {}", path.display(), error);
                library.close();
                return Err(DiscoveryFailure {
                    error,
                    partial: loaded,
                });
            }
        }
    }

    Ok(loaded)
}

/// Candidate files in `directory`. Sub-directories are skipped.
fn list_entries(directory: &Path, order: EntryOrder) -> Result<Vec<PathBuf>> {
    let read_dir = std::fs::read_dir(directory).map_err(|source| Error::ReadDir {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Unreadable entry in {}: {}", directory.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        entries.push(path);
    }

    if order == EntryOrder::FileName {
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }

    Ok(entries)
}
