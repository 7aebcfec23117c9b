//! Core of the modengine plugin host.
//!
//! This crate discovers dynamically loaded modules in a directory, checks that
//! each exports the thirteen-symbol module ABI and drives them through their
//! lifecycle.

pub mod abi;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod library;
pub mod module;
pub mod paths;

#[cfg(test)]
mod testing;

pub use abi::GraphicControls;
pub use config::{EngineConfig, EntryOrder, Mode};
pub use discovery::{discover, DiscoveryFailure, LoadedModule, ModuleInfo};
pub use engine::{Engine, EngineState};
pub use error::{Error, Result};
pub use library::{LibraryHandle, LibraryLoader, NativeLoader};
pub use module::Module;

/// Re-exports commonly used types.
pub mod prelude {
    // Configuration
    pub use crate::config::{defaults, env_vars, EngineConfig, EntryOrder, Mode};

    // Error handling
    pub use crate::error::{Error, Result};

    // Engine
    pub use crate::abi::GraphicControls;
    pub use crate::engine::{Engine, EngineState};
    pub use crate::module::Module;
}
