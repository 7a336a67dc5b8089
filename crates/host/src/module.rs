pub mod builder;
pub mod wasmer_sys;

pub use builder::ModuleBuilder;
pub use wasmer_sys::WASM_METERING_LIMIT;

use crate::session::RuntimeSession;
use guestcall_common::*;
use std::sync::Arc;
use wasmer::Engine;
use wasmer::Module;

/// A compiled guest, ready to be instantiated into any number of independent sessions.
///
/// Cloning is cheap, the engine and module are both reference counted.
#[derive(Clone)]
pub struct GuestModule {
    pub(crate) engine: Engine,
    pub(crate) module: Arc<Module>,
    pub(crate) metering_limit: u64,
}

impl GuestModule {
    /// open a fresh session with its own linear memory
    /// fails if the guest does not export everything `target` needs, see RuntimeSession::open
    pub fn instantiate(&self, target: &str) -> Result<RuntimeSession, WasmError> {
        RuntimeSession::from_module(self, target)
    }

    pub fn metering_limit(&self) -> u64 {
        self.metering_limit
    }
}

impl std::fmt::Debug for GuestModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestModule")
            .field("name", &self.module.name())
            .field("metering_limit", &self.metering_limit)
            .finish_non_exhaustive()
    }
}
