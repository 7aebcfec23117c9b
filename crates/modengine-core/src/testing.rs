//! In-memory loader for unit tests.
//!
//! Mock libraries hand out real `extern "C"` functions, so descriptors built
//! from them go through the same transmute-and-call path as native modules.
//! Each registered module occupies one function family ("slot"); every call
//! is appended to a thread-local log as `"<name>:<symbol>"`.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::abi::{self, GraphicControls};
use crate::library::{LibraryLoader, LoadError, ModuleLibrary, SymbolError};

thread_local! {
    static SLOT_NAMES: RefCell<Vec<CString>> = const { RefCell::new(Vec::new()) };
    static SLOT_VERSIONS: RefCell<Vec<CString>> = const { RefCell::new(Vec::new()) };
    static CALLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static CONTROLS_SEEN: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

fn slot_string(
    table: &'static std::thread::LocalKey<RefCell<Vec<CString>>>,
    slot: usize,
) -> *const c_char {
    table.with(|t| t.borrow()[slot].as_ptr())
}

fn slot_label(slot: usize) -> String {
    SLOT_NAMES.with(|t| t.borrow()[slot].to_string_lossy().into_owned())
}

fn record(slot: usize, call: String) {
    let entry = format!("{}:{}", slot_label(slot), call);
    CALLS.with(|c| c.borrow_mut().push(entry));
}

unsafe fn lossy(ptr: *const c_char) -> String {
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// Calls recorded on this thread since the last [`MockLoader::new`].
pub fn calls() -> Vec<String> {
    CALLS.with(|c| c.borrow().clone())
}

/// Calls recorded for one module, without the name prefix.
pub fn calls_for(name: &str) -> Vec<String> {
    let prefix = format!("{}:", name);
    calls()
        .into_iter()
        .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
        .collect()
}

pub fn reset_calls() {
    CALLS.with(|c| c.borrow_mut().clear());
    CONTROLS_SEEN.with(|c| c.borrow_mut().clear());
}

/// Addresses of the controls each `mod_setup` call received.
pub fn controls_seen() -> Vec<usize> {
    CONTROLS_SEEN.with(|c| c.borrow().clone())
}

macro_rules! mock_family {
    ($family:ident, $slot:expr) => {
        mod $family {
            use super::*;

            unsafe extern "C" fn mod_get_name() -> *const c_char {
                slot_string(&SLOT_NAMES, $slot)
            }
            unsafe extern "C" fn mod_get_version() -> *const c_char {
                slot_string(&SLOT_VERSIONS, $slot)
            }
            unsafe extern "C" fn mod_setup(controls: *const GraphicControls, mode: c_int) {
                CONTROLS_SEEN.with(|c| c.borrow_mut().push(controls as usize));
                record($slot, format!("mod_setup({})", mode));
            }
            unsafe extern "C" fn logic_run() {
                record($slot, "logic_run".to_string());
            }
            unsafe extern "C" fn logic_close() {
                record($slot, "logic_close".to_string());
            }
            unsafe extern "C" fn graphic_run() {
                record($slot, "graphic_run".to_string());
            }
            unsafe extern "C" fn graphic_close() {
                record($slot, "graphic_close".to_string());
            }
            unsafe extern "C" fn conf_save_config(path: *const c_char) {
                record($slot, format!("conf_save_config({})", lossy(path)));
            }
            unsafe extern "C" fn conf_load_config(path: *const c_char) {
                record($slot, format!("conf_load_config({})", lossy(path)));
            }
            unsafe extern "C" fn conf_save_setup(path: *const c_char) {
                record($slot, format!("conf_save_setup({})", lossy(path)));
            }
            unsafe extern "C" fn conf_load_setup(path: *const c_char) {
                record($slot, format!("conf_load_setup({})", lossy(path)));
            }
            unsafe extern "C" fn conf_config_form_closing(save: c_int) {
                record($slot, format!("conf_config_form_closing({})", save));
            }
            unsafe extern "C" fn conf_setup_form_closing(save: c_int) {
                record($slot, format!("conf_setup_form_closing({})", save));
            }

            pub fn table() -> HashMap<&'static str, *const c_void> {
                HashMap::from([
                    (abi::MOD_GET_NAME, mod_get_name as *const c_void),
                    (abi::MOD_GET_VERSION, mod_get_version as *const c_void),
                    (abi::MOD_SETUP, mod_setup as *const c_void),
                    (abi::LOGIC_RUN, logic_run as *const c_void),
                    (abi::LOGIC_CLOSE, logic_close as *const c_void),
                    (abi::GRAPHIC_RUN, graphic_run as *const c_void),
                    (abi::GRAPHIC_CLOSE, graphic_close as *const c_void),
                    (abi::CONF_SAVE_CONFIG, conf_save_config as *const c_void),
                    (abi::CONF_LOAD_CONFIG, conf_load_config as *const c_void),
                    (abi::CONF_SAVE_SETUP, conf_save_setup as *const c_void),
                    (abi::CONF_LOAD_SETUP, conf_load_setup as *const c_void),
                    (abi::CONF_CONFIG_FORM_CLOSING, conf_config_form_closing as *const c_void),
                    (abi::CONF_SETUP_FORM_CLOSING, conf_setup_form_closing as *const c_void),
                ])
            }
        }
    };
}

mock_family!(slot0, 0);
mock_family!(slot1, 1);
mock_family!(slot2, 2);
mock_family!(slot3, 3);
mock_family!(slot4, 4);
mock_family!(slot5, 5);

const SLOTS: [fn() -> HashMap<&'static str, *const c_void>; 6] = [
    slot0::table,
    slot1::table,
    slot2::table,
    slot3::table,
    slot4::table,
    slot5::table,
];

/// Shape of one fake module library.
#[derive(Debug, Clone)]
pub struct MockModule {
    name: String,
    version: String,
    missing: HashSet<&'static str>,
    null: HashSet<&'static str>,
    fail_close: bool,
}

impl MockModule {
    /// A module exporting all thirteen symbols.
    pub fn complete(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "1.0".to_string(),
            missing: HashSet::new(),
            null: HashSet::new(),
            fail_close: false,
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Do not export `symbol` at all.
    pub fn without(mut self, symbol: &'static str) -> Self {
        self.missing.insert(symbol);
        self
    }

    /// Export `symbol` with a null address.
    pub fn with_null(mut self, symbol: &'static str) -> Self {
        self.null.insert(symbol);
        self
    }

    /// Make closing the library report an error.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

#[derive(Default)]
struct LoaderState {
    registered: RefCell<HashMap<String, (MockModule, usize)>>,
    open: Cell<usize>,
    opened: RefCell<Vec<String>>,
    closed: RefCell<Vec<String>>,
}

/// Loader resolving file names against registered [`MockModule`]s.
///
/// Files that were not registered fail to open, like unrelated files in a
/// real modules directory. Clones share state.
#[derive(Clone)]
pub struct MockLoader {
    state: Rc<LoaderState>,
    supported: bool,
}

impl MockLoader {
    /// Fresh loader. Resets this thread's slots and call log.
    pub fn new() -> Self {
        SLOT_NAMES.with(|t| t.borrow_mut().clear());
        SLOT_VERSIONS.with(|t| t.borrow_mut().clear());
        reset_calls();
        Self {
            state: Rc::new(LoaderState::default()),
            supported: true,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// Register `module` under `file_name`.
    pub fn add(&self, file_name: &str, module: MockModule) {
        let slot = SLOT_NAMES.with(|t| {
            let mut names = t.borrow_mut();
            names.push(CString::new(module.name.clone()).unwrap());
            names.len() - 1
        });
        assert!(slot < SLOTS.len(), "mock loader supports {} modules", SLOTS.len());
        SLOT_VERSIONS.with(|t| {
            t.borrow_mut()
                .push(CString::new(module.version.clone()).unwrap())
        });

        self.state
            .registered
            .borrow_mut()
            .insert(file_name.to_string(), (module, slot));
    }

    /// Register `module` and create its file inside `dir`.
    pub fn install(&self, dir: &Path, file_name: &str, module: MockModule) {
        std::fs::write(dir.join(file_name), b"").unwrap();
        self.add(file_name, module);
    }

    /// Libraries currently open.
    pub fn open_count(&self) -> usize {
        self.state.open.get()
    }

    /// File names in the order they were opened.
    pub fn opened(&self) -> Vec<String> {
        self.state.opened.borrow().clone()
    }

    /// File names in the order they were closed.
    pub fn closed(&self) -> Vec<String> {
        self.state.closed.borrow().clone()
    }
}

// SAFETY: every table entry is one of the `extern "C"` functions above, typed
// per the symbol it is registered under.
unsafe impl LibraryLoader for MockLoader {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ModuleLibrary>, LoadError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let registered = self.state.registered.borrow();
        let (module, slot) = registered.get(&file_name).ok_or_else(|| LoadError {
            path: path.to_path_buf(),
            reason: "invalid ELF header".to_string(),
        })?;

        let mut symbols = SLOTS[*slot]();
        for symbol in &module.missing {
            symbols.remove(symbol);
        }
        for symbol in &module.null {
            symbols.insert(*symbol, std::ptr::null());
        }

        self.state.open.set(self.state.open.get() + 1);
        self.state.opened.borrow_mut().push(file_name.clone());

        Ok(Box::new(MockLibrary {
            path: path.to_path_buf(),
            file_name,
            symbols,
            fail_close: module.fail_close,
            state: Rc::clone(&self.state),
        }))
    }
}

struct MockLibrary {
    path: PathBuf,
    file_name: String,
    symbols: HashMap<&'static str, *const c_void>,
    fail_close: bool,
    state: Rc<LoaderState>,
}

unsafe impl ModuleLibrary for MockLibrary {
    fn path(&self) -> &Path {
        &self.path
    }

    fn symbol(&self, name: &str) -> Result<*const c_void, SymbolError> {
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| SymbolError(format!("{}: undefined symbol: {}", self.file_name, name)))
    }

    fn close(self: Box<Self>) -> Result<(), String> {
        self.state.open.set(self.state.open.get() - 1);
        self.state.closed.borrow_mut().push(self.file_name.clone());
        if self.fail_close {
            Err("mock close failure".to_string())
        } else {
            Ok(())
        }
    }
}
