use crate::allocation::AllocationStats;
use crate::config::InvokeConfig;
use crate::module::GuestModule;
use crate::module::ModuleBuilder;
use guestcall_common::*;
use wasmer::imports;
use wasmer::Instance;
use wasmer::Memory;
use wasmer::Store;
use wasmer::TypedFunction;
use wasmer_middlewares::metering::set_remaining_points;

/// Everything that dies with the guest instance.
/// Dropping this drops the store, which releases the whole linear memory in one go.
pub(crate) struct SessionInner {
    pub(crate) store: Store,
    pub(crate) instance: Instance,
    pub(crate) memory: Memory,
    pub(crate) allocate: TypedFunction<GuestPtr, GuestPtr>,
    pub(crate) deallocate: TypedFunction<(GuestPtr, Len), ()>,
    pub(crate) metering_limit: u64,
}

impl SessionInner {
    /// every entry into the guest gets a full metering budget
    pub(crate) fn refill(&mut self) {
        set_remaining_points(&mut self.store, &self.instance, self.metering_limit);
    }
}

/// One guest instance with its own linear memory, owned by whoever is making calls into it.
///
/// There is no shared runtime anywhere, two sessions never see each other's memory so they can
/// run on different threads without any locking.
///
/// The session is closed when it is dropped, so every exit path tears the instance down even if
/// the caller forgets to (or cannot) call close.
pub struct RuntimeSession {
    pub(crate) inner: Option<SessionInner>,
    pub(crate) target: String,
    pub(crate) stats: AllocationStats,
    pub(crate) poisoned: bool,
    pub(crate) last_release_failure: Option<WasmError>,
    pub(crate) pending_release_failures: Vec<String>,
}

impl RuntimeSession {
    /// compile and instantiate a wasm binary in one step
    ///
    /// the binary must export
    /// - a linear memory named `memory`
    /// - `allocate(size: u32) -> u32`
    /// - `deallocate(ptr: u32, size: u32)`
    /// - `target(ptr: u32, len: u32) -> u64`
    ///
    /// anything missing or with the wrong signature fails with InstantiationFailed before any
    /// guest code runs
    pub fn open(wasm: &[u8], target: &str) -> Result<Self, WasmError> {
        Self::open_with_config(wasm, target, &InvokeConfig::default())
    }

    pub fn open_with_config(
        wasm: &[u8],
        target: &str,
        config: &InvokeConfig,
    ) -> Result<Self, WasmError> {
        ModuleBuilder::new(config)
            .from_binary(wasm)?
            .instantiate(target)
    }

    pub(crate) fn from_module(module: &GuestModule, target: &str) -> Result<Self, WasmError> {
        let instantiation_failed =
            |what: String| wasm_error!(WasmErrorInner::InstantiationFailed(what));

        let mut store = Store::new(module.engine.clone());
        let instance = Instance::new(&mut store, &module.module, &imports! {})
            .map_err(|e| instantiation_failed(format!("could not instantiate guest: {e}")))?;

        let memory = instance
            .exports
            .get_memory(MEMORY_EXPORT)
            .map_err(|e| instantiation_failed(format!("export `{MEMORY_EXPORT}`: {e}")))?
            .clone();
        let allocate = instance
            .exports
            .get_typed_function::<GuestPtr, GuestPtr>(&store, ALLOCATE_EXPORT)
            .map_err(|e| instantiation_failed(format!("export `{ALLOCATE_EXPORT}`: {e}")))?;
        let deallocate = instance
            .exports
            .get_typed_function::<(GuestPtr, Len), ()>(&store, DEALLOCATE_EXPORT)
            .map_err(|e| instantiation_failed(format!("export `{DEALLOCATE_EXPORT}`: {e}")))?;
        instance
            .exports
            .get_typed_function::<(GuestPtr, Len), GuestPtrLen>(&store, target)
            .map_err(|e| instantiation_failed(format!("export `{target}`: {e}")))?;

        tracing::debug!(target_function = target, "opened runtime session");

        Ok(Self {
            inner: Some(SessionInner {
                store,
                instance,
                memory,
                allocate,
                deallocate,
                metering_limit: module.metering_limit,
            }),
            target: target.to_string(),
            stats: AllocationStats::default(),
            poisoned: false,
            last_release_failure: None,
            pending_release_failures: Vec::new(),
        })
    }

    /// the function this session was opened for
    pub fn target(&self) -> &str {
        &self.target
    }

    /// tear down the guest instance and its linear memory
    /// calling this more than once is fine, everything after the first call is a noop
    pub fn close(&mut self) {
        if let Some(inner) = self.inner.take() {
            drop(inner);
            let live = self.stats.live();
            if live != 0 {
                tracing::warn!(
                    live,
                    "closed runtime session with guest buffers still reserved"
                );
            }
            tracing::debug!(target_function = %self.target, "closed runtime session");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// a poisoned session has seen an error that leaves the guest in an unknown state
    /// (trap, allocator failure, failed release, timeout) and must not be reused
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub(crate) fn poison(&mut self) {
        self.poisoned = true;
    }

    /// how many buffers this session has reserved and released so far
    pub fn stats(&self) -> AllocationStats {
        self.stats
    }

    /// the aggregated release failure of the most recent invoke, if there was one
    /// release failures never replace the result of the call so this is the only place they
    /// surface other than the logs
    pub fn take_release_failure(&mut self) -> Option<WasmError> {
        self.last_release_failure.take()
    }

    /// current size of the guest linear memory in bytes
    pub fn memory_size(&self) -> Result<u64, WasmError> {
        let inner = self.inner()?;
        Ok(inner.memory.view(&inner.store).data_size())
    }

    pub(crate) fn inner(&self) -> Result<&SessionInner, WasmError> {
        self.inner
            .as_ref()
            .ok_or_else(|| wasm_error!(WasmErrorInner::SessionClosed))
    }

    pub(crate) fn inner_mut(&mut self) -> Result<&mut SessionInner, WasmError> {
        self.inner
            .as_mut()
            .ok_or_else(|| wasm_error!(WasmErrorInner::SessionClosed))
    }
}

impl Drop for RuntimeSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RuntimeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeSession")
            .field("target", &self.target)
            .field("closed", &self.is_closed())
            .field("poisoned", &self.poisoned)
            .field("stats", &self.stats)
            .finish()
    }
}
