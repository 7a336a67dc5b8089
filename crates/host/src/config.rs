use crate::module::WASM_METERING_LIMIT;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

/// default number of idle sessions a pool keeps around
pub const DEFAULT_POOL_CAPACITY: usize = 4;

/// Knobs for compiling guests and running calls against them.
///
/// Deserializable so that it can be embedded in whatever config file the embedding process
/// already has, every field falls back to its default when missing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokeConfig {
    /// number of wasm operators a single guest call may execute before it traps
    pub metering_limit: u64,
    /// wall clock deadline for a single call, `None` runs the call on the current thread with no
    /// deadline other than the metering limit
    pub timeout_ms: Option<u64>,
    /// maximum number of idle sessions a SessionPool holds on to
    pub pool_capacity: usize,
}

impl Default for InvokeConfig {
    fn default() -> Self {
        Self {
            metering_limit: WASM_METERING_LIMIT,
            timeout_ms: None,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl InvokeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    pub fn with_metering_limit(mut self, metering_limit: u64) -> Self {
        self.metering_limit = metering_limit;
        self
    }

    pub fn with_pool_capacity(mut self, pool_capacity: usize) -> Self {
        self.pool_capacity = pool_capacity;
        self
    }
}
