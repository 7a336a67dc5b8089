use super::wasmer_sys::make_engine;
use super::GuestModule;
use crate::config::InvokeConfig;
use guestcall_common::*;
use std::sync::Arc;
use wasmer::Engine;
use wasmer::Module;

/// Responsible for storing the wasmer Engine used to build wasmer Modules.
///
/// Modules built by the same builder share the engine, so a builder should live as long as the
/// modules it builds are in use.
#[derive(Clone)]
pub struct ModuleBuilder {
    engine: Engine,
    metering_limit: u64,
}

impl ModuleBuilder {
    pub fn new(config: &InvokeConfig) -> Self {
        Self {
            engine: make_engine(config.metering_limit),
            metering_limit: config.metering_limit,
        }
    }

    /// compile a wasm binary
    /// a binary that does not even compile can never be instantiated so this is reported as
    /// InstantiationFailed, export checks happen later when a session is opened
    pub fn from_binary(&self, wasm: &[u8]) -> Result<GuestModule, WasmError> {
        let module = Module::new(&self.engine, wasm).map_err(|e| {
            wasm_error!(WasmErrorInner::InstantiationFailed(format!(
                "could not compile guest: {e}"
            )))
        })?;
        tracing::debug!(bytes = wasm.len(), "compiled guest module");
        Ok(GuestModule {
            engine: self.engine.clone(),
            module: Arc::new(module),
            metering_limit: self.metering_limit,
        })
    }
}

impl std::fmt::Debug for ModuleBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleBuilder")
            .field("metering_limit", &self.metering_limit)
            .finish_non_exhaustive()
    }
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        Self::new(&InvokeConfig::default())
    }
}
