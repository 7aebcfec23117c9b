//! "Test Module" v1.0.
//!
//! Implements every hook and records what the host asked it to do.

use std::ffi::CStr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use modengine_sdk::prelude::*;

#[derive(Debug, Default)]
struct State {
    controls: Option<SharedControls>,
    mode: Option<Mode>,
    config_path: Option<PathBuf>,
    setup_path: Option<PathBuf>,
    running: bool,
    visible: bool,
}

#[derive(Debug, Default)]
pub struct TestModule {
    state: Mutex<State>,
}

impl TestModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state(&self, f: impl FnOnce(&mut State)) {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl HostedModule for TestModule {
    fn name(&self) -> &CStr {
        c"Test Module"
    }

    fn version(&self) -> &CStr {
        c"1.0"
    }

    fn setup(&self, controls: &GraphicControls, mode: Mode) {
        tracing::debug!("Test Module setup in {} mode", mode);
        self.with_state(|s| {
            s.controls = Some(SharedControls::new(controls));
            s.mode = Some(mode);
        });
    }

    fn logic_run(&self) {
        self.with_state(|s| s.running = true);
    }

    fn logic_close(&self) {
        self.with_state(|s| s.running = false);
    }

    fn graphic_run(&self) {
        self.with_state(|s| s.visible = true);
    }

    fn graphic_close(&self) {
        self.with_state(|s| s.visible = false);
    }

    fn save_config(&self, path: &Path) {
        tracing::debug!("Test Module saving config to {}", path.display());
    }

    fn load_config(&self, path: &Path) {
        self.with_state(|s| s.config_path = Some(path.to_path_buf()));
    }

    fn save_setup(&self, path: &Path) {
        tracing::debug!("Test Module saving setup to {}", path.display());
    }

    fn load_setup(&self, path: &Path) {
        self.with_state(|s| s.setup_path = Some(path.to_path_buf()));
    }
}

export_module!(TestModule, TestModule::new);
