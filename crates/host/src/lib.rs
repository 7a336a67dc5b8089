#[cfg(all(feature = "wasmer_sys_dev", feature = "wasmer_sys_prod"))]
compile_error!(
    "feature \"wasmer_sys_dev\" and feature \"wasmer_sys_prod\" cannot be enabled at the same time"
);

#[cfg(all(not(feature = "wasmer_sys_dev"), not(feature = "wasmer_sys_prod")))]
compile_error!(
    "One of: `wasmer_sys_dev`, `wasmer_sys_prod` features must be enabled. Please, pick one."
);

pub mod allocation;
pub mod config;
pub mod invoke;
pub mod marshal;
pub mod module;
pub mod pool;
pub mod prelude;
pub mod session;
pub mod timeout;

#[cfg(test)]
pub(crate) mod fixtures;
