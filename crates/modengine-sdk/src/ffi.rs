//! Conversions used by the code [`export_module!`](crate::export_module)
//! generates. Not a stable API.

use std::ffi::{c_char, c_int, CStr};
use std::path::{Path, PathBuf};

use crate::{GraphicControls, HostedModule, Mode};

/// Forward `mod_setup` to `module`.
///
/// A null `controls` is treated as a headless host and an unknown mode value
/// as [`Mode::Normal`].
///
/// # Safety
///
/// `controls` must be null or point to a valid [`GraphicControls`].
pub unsafe fn setup<M: HostedModule>(module: &M, controls: *const GraphicControls, mode: c_int) {
    let controls = if controls.is_null() {
        GraphicControls::headless()
    } else {
        *controls
    };
    let mode = Mode::from_raw(mode).unwrap_or_else(|| {
        tracing::warn!("Unknown engine mode {}, using normal", mode);
        Mode::Normal
    });
    module.setup(&controls, mode);
}

/// Forward a path-taking entry point. Null paths are ignored.
///
/// # Safety
///
/// `path` must be null or a valid NUL-terminated string.
pub unsafe fn with_path<M: HostedModule>(module: &M, path: *const c_char, hook: fn(&M, &Path)) {
    if path.is_null() {
        tracing::warn!("Module hook called with a null path");
        return;
    }
    let path = path_from_c(CStr::from_ptr(path));
    hook(module, &path);
}

pub fn flag(value: c_int) -> bool {
    value != 0
}

#[cfg(unix)]
fn path_from_c(path: &CStr) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    PathBuf::from(OsStr::from_bytes(path.to_bytes()))
}

#[cfg(not(unix))]
fn path_from_c(path: &CStr) -> PathBuf {
    PathBuf::from(path.to_string_lossy().into_owned())
}
