//! Library handles and symbol resolution.
//!
//! [`LibraryLoader`] and [`ModuleLibrary`] abstract the platform loader so the
//! discovery pass can be driven by `libloading` in production and by an
//! in-memory symbol table in tests. [`LibraryHandle`] owns one opened library
//! and closes it exactly once.

use std::ffi::c_void;
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::{Error, Result};

/// A candidate file could not be opened as a dynamic library.
#[derive(Debug, thiserror::Error)]
#[error("Failed to load library {}: {reason}", path.display())]
pub struct LoadError {
    pub path: PathBuf,
    pub reason: String,
}

/// The symbol lookup call itself failed.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SymbolError(pub String);

/// One opened dynamic library.
///
/// # Safety
///
/// Every non-null address returned by [`symbol`](Self::symbol) for a name in
/// [`REQUIRED_SYMBOLS`](crate::abi::REQUIRED_SYMBOLS) must be a function with
/// the signature the module ABI assigns to that name, callable until
/// [`close`](Self::close) runs.
pub unsafe trait ModuleLibrary {
    /// Path the library was opened from.
    fn path(&self) -> &Path;

    /// Address of an exported symbol. `Ok(null)` means the symbol exists but
    /// has no value.
    fn symbol(&self, name: &str) -> std::result::Result<*const c_void, SymbolError>;

    /// Unload the library.
    fn close(self: Box<Self>) -> std::result::Result<(), String>;
}

/// Opens files as [`ModuleLibrary`] instances.
///
/// # Safety
///
/// Libraries returned by [`open`](Self::open) must uphold the
/// [`ModuleLibrary`] contract.
///
/// ```compile_fail
/// use std::path::Path;
/// use modengine_core::library::{LibraryLoader, LoadError, ModuleLibrary};
///
/// struct Loose;
///
/// impl LibraryLoader for Loose {
///     fn is_supported(&self) -> bool {
///         true
///     }
///
///     fn open(&self, path: &Path) -> Result<Box<dyn ModuleLibrary>, LoadError> {
///         Err(LoadError { path: path.to_path_buf(), reason: String::new() })
///     }
/// }
/// ```
pub unsafe trait LibraryLoader {
    /// Whether this host can load dynamic libraries at all.
    fn is_supported(&self) -> bool;

    fn open(&self, path: &Path) -> std::result::Result<Box<dyn ModuleLibrary>, LoadError>;
}

/// Platform loader backed by `libloading`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

// SAFETY: symbols come from the platform loader and the library stays mapped
// until `NativeLibrary::close`; matching signatures is the module author's
// side of the ABI.
unsafe impl LibraryLoader for NativeLoader {
    fn is_supported(&self) -> bool {
        cfg!(any(unix, windows))
    }

    fn open(&self, path: &Path) -> std::result::Result<Box<dyn ModuleLibrary>, LoadError> {
        // SAFETY: loading a library runs its initializers. Modules are trusted
        // code by contract; there is no sandboxing.
        let library = unsafe { Library::new(path) }.map_err(|e| LoadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Box::new(NativeLibrary {
            path: path.to_path_buf(),
            library,
        }))
    }
}

/// A library opened through `libloading`.
#[derive(Debug)]
pub struct NativeLibrary {
    path: PathBuf,
    library: Library,
}

unsafe impl ModuleLibrary for NativeLibrary {
    fn path(&self) -> &Path {
        &self.path
    }

    fn symbol(&self, name: &str) -> std::result::Result<*const c_void, SymbolError> {
        // SAFETY: the symbol is read as an untyped address; it is only cast to
        // a function type by `ModuleDescriptor` after the null check.
        let symbol = unsafe { self.library.get::<*const c_void>(name.as_bytes()) }
            .map_err(|e| SymbolError(e.to_string()))?;
        Ok(*symbol)
    }

    fn close(self: Box<Self>) -> std::result::Result<(), String> {
        self.library.close().map_err(|e| e.to_string())
    }
}

/// Owned handle to one opened module file.
///
/// Dropping the handle closes the library; [`LibraryHandle::close`] does the
/// same explicitly. Either way the underlying library is closed once and a
/// failure is logged, never raised.
pub struct LibraryHandle {
    path: PathBuf,
    library: Option<Box<dyn ModuleLibrary>>,
}

impl LibraryHandle {
    pub fn open(loader: &dyn LibraryLoader, path: &Path) -> std::result::Result<Self, LoadError> {
        let library = loader.open(path)?;
        Ok(Self {
            path: library.path().to_path_buf(),
            library: Some(library),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used in error messages.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Resolve a required symbol to a non-null address.
    pub fn resolve(&self, symbol: &str) -> Result<*const c_void> {
        let library = self.library.as_ref().ok_or_else(|| Error::LoadingModule {
            file: self.file_name(),
            symbol: symbol.to_string(),
            reason: "library already closed".to_string(),
        })?;

        let address = library.symbol(symbol).map_err(|e| Error::LoadingModule {
            file: self.file_name(),
            symbol: symbol.to_string(),
            reason: e.0,
        })?;

        if address.is_null() {
            return Err(Error::SymbolNotDefined {
                file: self.file_name(),
                symbol: symbol.to_string(),
            });
        }

        Ok(address)
    }

    /// Close the library now.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(library) = self.library.take() {
            match library.close() {
                Ok(()) => tracing::debug!("Closed library {}", self.path.display()),
                Err(e) => tracing::warn!("Failed to close library {}: {}", self.path.display(), e),
            }
        }
    }
}

impl Drop for LibraryHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for LibraryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryHandle")
            .field("path", &self.path)
            .field("open", &self.library.is_some())
            .finish()
    }
}
