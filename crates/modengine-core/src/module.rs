//! Module descriptors.
//!
//! A [`ModuleDescriptor`] is built once per library by resolving every entry
//! of [`abi::REQUIRED_SYMBOLS`]. After that, the engine only talks to modules
//! through the [`Module`] trait and never touches raw symbols again.

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::fmt::{self, Debug, Formatter};
use std::path::Path;

use crate::abi::{self, FormClosingFn, GetStringFn, GraphicControls, PathFn, RoutineFn, SetupFn};
use crate::config::Mode;
use crate::error::{Error, Result};
use crate::library::LibraryHandle;
use crate::paths::PathKind;

/// The thirteen operations every module provides.
pub trait Module {
    fn name(&self) -> String;
    fn version(&self) -> String;

    /// Hand the module the shared controls and the engine mode.
    fn setup(&self, controls: &GraphicControls, mode: Mode);

    fn logic_run(&self);
    fn logic_close(&self);
    fn graphic_run(&self);
    fn graphic_close(&self);

    fn save_config(&self, path: &Path) -> Result<()>;
    fn load_config(&self, path: &Path) -> Result<()>;
    fn save_setup(&self, path: &Path) -> Result<()>;
    fn load_setup(&self, path: &Path) -> Result<()>;

    /// The configuration form is closing; `save_requested` tells the module
    /// whether the user asked to keep the changes.
    fn config_form_closing(&self, save_requested: bool);
    fn setup_form_closing(&self, save_requested: bool);
}

/// Typed entry points resolved from one library.
///
/// The function pointers are only valid while the [`LibraryHandle`] they came
/// from is open, so descriptors are only built by the discovery pass and only
/// reachable through the [`LoadedModule`](crate::discovery::LoadedModule)
/// that owns both.
///
/// ```compile_fail
/// use modengine_core::module::ModuleDescriptor;
/// use modengine_core::LibraryHandle;
///
/// fn detach(library: &LibraryHandle) -> ModuleDescriptor {
///     unsafe { ModuleDescriptor::resolve(library) }.unwrap()
/// }
/// ```
pub struct ModuleDescriptor {
    get_name: GetStringFn,
    get_version: GetStringFn,
    setup: SetupFn,
    logic_run: RoutineFn,
    logic_close: RoutineFn,
    graphic_run: RoutineFn,
    graphic_close: RoutineFn,
    conf_save_config: PathFn,
    conf_load_config: PathFn,
    conf_save_setup: PathFn,
    conf_load_setup: PathFn,
    conf_config_form_closing: FormClosingFn,
    conf_setup_form_closing: FormClosingFn,
}

impl ModuleDescriptor {
    /// Resolve the full symbol contract from `library`.
    ///
    /// Symbols are resolved in [`abi::REQUIRED_SYMBOLS`] order and the first
    /// failure is returned as is.
    ///
    /// # Safety
    ///
    /// The descriptor must not be used after `library` is closed.
    pub(crate) unsafe fn resolve(library: &LibraryHandle) -> Result<Self> {
        let mut table = [std::ptr::null::<c_void>(); abi::SYMBOL_COUNT];
        for (slot, symbol) in table.iter_mut().zip(abi::REQUIRED_SYMBOLS) {
            *slot = library.resolve(symbol)?;
        }

        // SAFETY: every address is non-null and, per the `ModuleLibrary`
        // contract, a function with the signature its name is assigned.
        unsafe {
            Ok(Self {
                get_name: entry(table[0]),
                get_version: entry(table[1]),
                setup: entry(table[2]),
                logic_run: entry(table[3]),
                logic_close: entry(table[4]),
                graphic_run: entry(table[5]),
                graphic_close: entry(table[6]),
                conf_save_config: entry(table[7]),
                conf_load_config: entry(table[8]),
                conf_save_setup: entry(table[9]),
                conf_load_setup: entry(table[10]),
                conf_config_form_closing: entry(table[11]),
                conf_setup_form_closing: entry(table[12]),
            })
        }
    }

    fn call_with_path(&self, f: PathFn, kind: PathKind, path: &Path) -> Result<()> {
        let c_path = c_path(kind, path)?;
        unsafe { f(c_path.as_ptr()) };
        Ok(())
    }
}

impl Module for ModuleDescriptor {
    fn name(&self) -> String {
        unsafe { owned_string((self.get_name)()) }
    }

    fn version(&self) -> String {
        unsafe { owned_string((self.get_version)()) }
    }

    fn setup(&self, controls: &GraphicControls, mode: Mode) {
        unsafe { (self.setup)(controls as *const GraphicControls, mode.as_raw()) }
    }

    fn logic_run(&self) {
        unsafe { (self.logic_run)() }
    }

    fn logic_close(&self) {
        unsafe { (self.logic_close)() }
    }

    fn graphic_run(&self) {
        unsafe { (self.graphic_run)() }
    }

    fn graphic_close(&self) {
        unsafe { (self.graphic_close)() }
    }

    fn save_config(&self, path: &Path) -> Result<()> {
        self.call_with_path(self.conf_save_config, PathKind::Config, path)
    }

    fn load_config(&self, path: &Path) -> Result<()> {
        self.call_with_path(self.conf_load_config, PathKind::Config, path)
    }

    fn save_setup(&self, path: &Path) -> Result<()> {
        self.call_with_path(self.conf_save_setup, PathKind::Setup, path)
    }

    fn load_setup(&self, path: &Path) -> Result<()> {
        self.call_with_path(self.conf_load_setup, PathKind::Setup, path)
    }

    fn config_form_closing(&self, save_requested: bool) {
        unsafe { (self.conf_config_form_closing)(save_requested as c_int) }
    }

    fn setup_form_closing(&self, save_requested: bool) {
        unsafe { (self.conf_setup_form_closing)(save_requested as c_int) }
    }
}

impl Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("get_name", &(self.get_name as *const c_void))
            .finish_non_exhaustive()
    }
}

/// Reinterpret a resolved symbol address as a function pointer.
unsafe fn entry<F: Copy>(address: *const c_void) -> F {
    debug_assert_eq!(
        std::mem::size_of::<F>(),
        std::mem::size_of::<*const c_void>()
    );
    std::mem::transmute_copy(&address)
}

/// Copy a module-owned C string. Null reads as empty.
unsafe fn owned_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

fn c_path(kind: PathKind, path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_encoded_bytes())
        .map_err(|_| Error::path_invalid(kind, path, "path contains a NUL byte"))
}
