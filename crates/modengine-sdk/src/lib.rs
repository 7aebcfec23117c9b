//! SDK for writing modengine modules.
//!
//! Implement [`HostedModule`] for a type and export it with
//! [`export_module!`]:
//!
//! ```rust,ignore
//! use std::ffi::CStr;
//! use modengine_sdk::prelude::*;
//!
//! struct Clock;
//!
//! impl HostedModule for Clock {
//!     fn name(&self) -> &CStr {
//!         c"Clock"
//!     }
//!
//!     fn version(&self) -> &CStr {
//!         c"0.3"
//!     }
//! }
//!
//! export_module!(Clock, || Clock);
//! ```

use std::ffi::CStr;
use std::path::Path;

pub use modengine_core::abi;
pub use modengine_core::abi::GraphicControls;
pub use modengine_core::config::Mode;

mod macros;

#[doc(hidden)]
pub mod ffi;

/// [`GraphicControls`] a module can keep after `setup`.
///
/// `GraphicControls` holds raw pointers and so cannot live in the module's
/// static instance directly. The host keeps the controls alive until every
/// module is closed and calls modules from a single thread; dereferencing the
/// pointers stays `unsafe` and is the module's business.
#[derive(Debug, Clone, Copy)]
pub struct SharedControls(GraphicControls);

// SAFETY: the wrapper only carries the addresses; nothing here reads through
// them.
unsafe impl Send for SharedControls {}
unsafe impl Sync for SharedControls {}

impl SharedControls {
    pub fn new(controls: &GraphicControls) -> Self {
        Self(*controls)
    }

    pub fn get(&self) -> &GraphicControls {
        &self.0
    }
}

/// A module as seen from inside its own library.
///
/// Only the name and version are required; every lifecycle hook defaults to
/// doing nothing. The instance lives in a static, so hooks take `&self` and
/// mutable state needs interior mutability.
pub trait HostedModule: Send + Sync + 'static {
    /// Display name. Must not be empty.
    fn name(&self) -> &CStr;

    fn version(&self) -> &CStr;

    /// Called once before any other lifecycle hook. Wrap `controls` in
    /// [`SharedControls`] to keep them.
    fn setup(&self, _controls: &GraphicControls, _mode: Mode) {}

    fn logic_run(&self) {}

    fn logic_close(&self) {}

    fn graphic_run(&self) {}

    fn graphic_close(&self) {}

    fn save_config(&self, _path: &Path) {}

    fn load_config(&self, _path: &Path) {}

    fn save_setup(&self, _path: &Path) {}

    fn load_setup(&self, _path: &Path) {}

    fn config_form_closing(&self, _save_requested: bool) {}

    fn setup_form_closing(&self, _save_requested: bool) {}
}

/// Re-exports for module authors.
pub mod prelude {
    pub use crate::export_module;
    pub use crate::{GraphicControls, HostedModule, Mode, SharedControls};
}
