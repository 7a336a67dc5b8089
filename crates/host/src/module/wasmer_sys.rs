use std::sync::Arc;
use wasmer::sys::CompilerConfig;
use wasmer::wasmparser;
use wasmer::Engine;
use wasmer_middlewares::Metering;

#[cfg(not(test))]
/// ten giga ops
pub const WASM_METERING_LIMIT: u64 = 10_000_000_000;

#[cfg(test)]
/// ten mega ops.
/// We don't want tests to run forever, a spinning guest should trap quickly.
pub const WASM_METERING_LIMIT: u64 = 10_000_000;

/// Generate an engine with a wasm compiler
/// and Metering (use limits) in place.
///
/// every module compiled with this engine carries the metering globals, which is what lets a
/// session refill the points before each call
pub(crate) fn make_engine(metering_limit: u64) -> Engine {
    let cost_function = |_operator: &wasmparser::Operator| -> u64 { 1 };
    let metering = Arc::new(Metering::new(metering_limit, cost_function));

    // the only place where the wasm compiler engine is set
    #[cfg(feature = "wasmer_sys_dev")]
    let mut compiler = wasmer::sys::Cranelift::default();
    #[cfg(feature = "wasmer_sys_prod")]
    let mut compiler = wasmer::sys::LLVM::default();

    compiler.canonicalize_nans(true);
    compiler.push_middleware(metering);

    Engine::from(compiler)
}
