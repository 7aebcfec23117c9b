//! The module engine.
//!
//! [`Engine`] owns every loaded module together with its library, the three
//! engine paths, the mode and the capability bundle handed to modules at
//! setup. It drives the synchronous lifecycle:
//!
//! ```text
//! new:  discover -> setup -> conf_load_config -> conf_load_setup -> logic_run -> graphic_run
//! free: graphic_close -> logic_close (every module) -> close every library
//! ```
//!
//! The engine is single-threaded; modules run on the thread that owns it.

use std::path::{Path, PathBuf};

use crate::abi::GraphicControls;
use crate::config::{EngineConfig, EntryOrder, Mode};
use crate::discovery::{self, LoadedModule, ModuleInfo};
use crate::error::{Error, Result};
use crate::library::{LibraryLoader, NativeLoader};
use crate::paths::{self, PathKind};

/// Lifecycle state of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    /// Scanning the modules directory.
    Discovering,
    /// Running setup, configuration load and the run routines.
    Initializing,
    /// All modules are running; accessors are available.
    Ready,
    /// Close routines are running.
    Closing,
    Closed,
}

/// Plugin engine instance.
pub struct Engine {
    state: EngineState,
    mode: Mode,
    config_path: PathBuf,
    setup_path: PathBuf,
    modules_dir: PathBuf,
    entry_order: EntryOrder,
    // Declared before `controls` so modules are released first on drop.
    modules: Vec<LoadedModule>,
    controls: Box<GraphicControls>,
    loader: Box<dyn LibraryLoader>,
}

impl Engine {
    /// Build an engine loading modules through the platform loader.
    pub fn new(controls: GraphicControls, config: EngineConfig) -> Result<Self> {
        Self::with_loader(controls, config, Box::new(NativeLoader))
    }

    /// Build an engine with an explicit library loader.
    ///
    /// Fails without producing an engine if dynamic loading is unavailable,
    /// if any path is invalid, or if any library in the modules directory
    /// misses a required symbol. In the last case every library opened by the
    /// pass is closed before returning.
    pub fn with_loader(
        controls: GraphicControls,
        config: EngineConfig,
        loader: Box<dyn LibraryLoader>,
    ) -> Result<Self> {
        if !loader.is_supported() {
            tracing::error!("Dynamic library loading is not available");
            return Err(Error::DynamicLoadingUnsupported);
        }

        let config_path = paths::validate(PathKind::Config, &config.config_path)?;
        let setup_path = paths::validate(PathKind::Setup, &config.setup_path)?;
        let modules_dir = paths::validate(PathKind::Modules, &config.modules_dir)?;

        let mut engine = Self {
            state: EngineState::Uninitialized,
            mode: config.mode,
            config_path,
            setup_path,
            modules_dir,
            entry_order: config.entry_order,
            modules: Vec::new(),
            controls: Box::new(controls),
            loader,
        };

        engine.load()?;

        tracing::info!(
            "Engine ready with {} module(s) from {} (mode: {})",
            engine.modules.len(),
            engine.modules_dir.display(),
            engine.mode
        );
        Ok(engine)
    }

    /// Discover the current modules directory and initialize what was found.
    fn load(&mut self) -> Result<()> {
        self.state = EngineState::Discovering;
        let loaded = match discovery::discover(
            self.loader.as_ref(),
            &self.modules_dir,
            self.entry_order,
        ) {
            Ok(loaded) => loaded,
            Err(failure) => {
                let error = failure.unwind();
                tracing::error!("Module discovery failed: {}", error);
                self.state = EngineState::Uninitialized;
                return Err(error);
            }
        };

        self.state = EngineState::Initializing;
        self.modules = loaded;
        let failure = self.modules.iter().enumerate().find_map(|(index, loaded)| {
            self.start(loaded).err().map(|error| (index, error))
        });

        if let Some((started, error)) = failure {
            tracing::error!("Module initialization failed: {}", error);
            self.unload_started(started);
            self.state = EngineState::Uninitialized;
            return Err(error);
        }

        self.state = EngineState::Ready;
        Ok(())
    }

    fn start(&self, loaded: &LoadedModule) -> Result<()> {
        let module = loaded.module();
        tracing::debug!("Initializing module from {}", loaded.path().display());

        module.setup(&self.controls, self.mode);
        module.load_config(&self.config_path)?;
        module.load_setup(&self.setup_path)?;
        module.logic_run();
        module.graphic_run();
        Ok(())
    }

    /// Run the close routines of every module, then close every library.
    fn unload(&mut self) {
        self.unload_started(self.modules.len());
    }

    /// Run the close routines of the first `started` modules, then close
    /// every library.
    fn unload_started(&mut self, started: usize) {
        self.state = EngineState::Closing;
        for loaded in &self.modules[..started] {
            tracing::debug!("Closing module from {}", loaded.path().display());
            loaded.module().graphic_close();
            loaded.module().logic_close();
        }
        for loaded in self.modules.drain(..) {
            loaded.close();
        }
    }

    /// Close every module and library and consume the engine.
    pub fn free(mut self) {
        self.assert_ready();
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let count = self.modules.len();
        self.unload();
        self.state = EngineState::Closed;
        tracing::info!("Engine closed ({} module(s) released)", count);
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    fn assert_ready(&self) {
        assert!(
            self.state == EngineState::Ready,
            "engine is not initialized (state: {:?})",
            self.state
        );
    }

    pub fn mode(&self) -> Mode {
        self.assert_ready();
        self.mode
    }

    pub fn is_demo(&self) -> bool {
        self.mode() == Mode::Demo
    }

    pub fn is_debug(&self) -> bool {
        self.mode() == Mode::Debug
    }

    pub fn config_path(&self) -> &Path {
        self.assert_ready();
        &self.config_path
    }

    /// Replace the config file path. Rejected paths leave the current one.
    pub fn set_config_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.assert_ready();
        self.config_path = paths::validate(PathKind::Config, path)?;
        Ok(())
    }

    pub fn setup_path(&self) -> &Path {
        self.assert_ready();
        &self.setup_path
    }

    /// Replace the setup file path. Rejected paths leave the current one.
    pub fn set_setup_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.assert_ready();
        self.setup_path = paths::validate(PathKind::Setup, path)?;
        Ok(())
    }

    pub fn modules_dir(&self) -> &Path {
        self.assert_ready();
        &self.modules_dir
    }

    /// Replace the modules directory. Loaded modules stay loaded; the new
    /// directory is scanned on the next [`rescan`](Self::rescan).
    pub fn set_modules_dir(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.assert_ready();
        self.modules_dir = paths::validate(PathKind::Modules, path)?;
        Ok(())
    }

    pub fn module_count(&self) -> usize {
        self.assert_ready();
        self.modules.len()
    }

    /// Module names in discovery order.
    ///
    /// # Panics
    ///
    /// Panics if a module reports an empty name.
    pub fn module_names(&self) -> Vec<String> {
        self.assert_ready();
        self.modules
            .iter()
            .map(|loaded| {
                let name = loaded.module().name();
                assert!(
                    !name.is_empty(),
                    "module {} reported an empty name",
                    loaded.path().display()
                );
                name
            })
            .collect()
    }

    pub fn module_infos(&self) -> Vec<ModuleInfo> {
        self.assert_ready();
        self.modules.iter().map(LoadedModule::info).collect()
    }

    /// Ask every module to write its configuration to the config path.
    pub fn save_config(&self) -> Result<()> {
        self.assert_ready();
        for loaded in &self.modules {
            loaded.module().save_config(&self.config_path)?;
        }
        Ok(())
    }

    /// Ask every module to write its setup to the setup path.
    pub fn save_setup(&self) -> Result<()> {
        self.assert_ready();
        for loaded in &self.modules {
            loaded.module().save_setup(&self.setup_path)?;
        }
        Ok(())
    }

    pub fn config_form_closing(&self, save_requested: bool) {
        self.assert_ready();
        for loaded in &self.modules {
            loaded.module().config_form_closing(save_requested);
        }
    }

    pub fn setup_form_closing(&self, save_requested: bool) {
        self.assert_ready();
        for loaded in &self.modules {
            loaded.module().setup_form_closing(save_requested);
        }
    }

    /// Close every module and load the modules directory again.
    ///
    /// On error the engine stays usable with no modules loaded.
    pub fn rescan(&mut self) -> Result<()> {
        self.assert_ready();
        self.unload();

        match self.load() {
            Ok(()) => {
                tracing::info!("Rescan loaded {} module(s)", self.modules.len());
                Ok(())
            }
            Err(e) => {
                self.state = EngineState::Ready;
                Err(e)
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.state == EngineState::Ready {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("config_path", &self.config_path)
            .field("setup_path", &self.setup_path)
            .field("modules_dir", &self.modules_dir)
            .field("modules", &self.modules.len())
            .finish_non_exhaustive()
    }
}
