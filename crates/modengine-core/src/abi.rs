//! Module ABI.
//!
//! Every module is a dynamic library exporting the thirteen C-ABI entry points
//! listed in [`REQUIRED_SYMBOLS`]. The engine resolves them in exactly that
//! order; the first one that is missing rejects the whole discovery pass.

use std::ffi::{c_char, c_int, c_void};

pub const MOD_GET_NAME: &str = "mod_get_name";
pub const MOD_GET_VERSION: &str = "mod_get_version";
pub const MOD_SETUP: &str = "mod_setup";
pub const LOGIC_RUN: &str = "logic_run";
pub const LOGIC_CLOSE: &str = "logic_close";
pub const GRAPHIC_RUN: &str = "graphic_run";
pub const GRAPHIC_CLOSE: &str = "graphic_close";
pub const CONF_SAVE_CONFIG: &str = "conf_save_config";
pub const CONF_LOAD_CONFIG: &str = "conf_load_config";
pub const CONF_SAVE_SETUP: &str = "conf_save_setup";
pub const CONF_LOAD_SETUP: &str = "conf_load_setup";
pub const CONF_CONFIG_FORM_CLOSING: &str = "conf_config_form_closing";
pub const CONF_SETUP_FORM_CLOSING: &str = "conf_setup_form_closing";

/// Number of entry points a module must export.
pub const SYMBOL_COUNT: usize = 13;

/// Required symbols, in resolution order.
pub const REQUIRED_SYMBOLS: [&str; SYMBOL_COUNT] = [
    MOD_GET_NAME,
    MOD_GET_VERSION,
    MOD_SETUP,
    LOGIC_RUN,
    LOGIC_CLOSE,
    GRAPHIC_RUN,
    GRAPHIC_CLOSE,
    CONF_SAVE_CONFIG,
    CONF_LOAD_CONFIG,
    CONF_SAVE_SETUP,
    CONF_LOAD_SETUP,
    CONF_CONFIG_FORM_CLOSING,
    CONF_SETUP_FORM_CLOSING,
];

/// User interface controls shared with every module at setup.
///
/// The engine never looks inside; it hands the same pointer to each module's
/// `mod_setup`. All fields may be null when running headless.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GraphicControls {
    pub main_control: *const c_void,
    pub config_control: *const c_void,
    pub setup_control: *const c_void,
    pub test_control: *const c_void,
}

impl GraphicControls {
    /// Controls with every window left null.
    pub const fn headless() -> Self {
        Self {
            main_control: std::ptr::null(),
            config_control: std::ptr::null(),
            setup_control: std::ptr::null(),
            test_control: std::ptr::null(),
        }
    }
}

impl Default for GraphicControls {
    fn default() -> Self {
        Self::headless()
    }
}

/// `mod_get_name` / `mod_get_version`
pub type GetStringFn = unsafe extern "C" fn() -> *const c_char;

/// `mod_setup`
pub type SetupFn = unsafe extern "C" fn(controls: *const GraphicControls, mode: c_int);

/// `logic_run`, `logic_close`, `graphic_run`, `graphic_close`
pub type RoutineFn = unsafe extern "C" fn();

/// `conf_save_config`, `conf_load_config`, `conf_save_setup`, `conf_load_setup`
pub type PathFn = unsafe extern "C" fn(filepath: *const c_char);

/// `conf_config_form_closing`, `conf_setup_form_closing`
pub type FormClosingFn = unsafe extern "C" fn(save_requested: c_int);
