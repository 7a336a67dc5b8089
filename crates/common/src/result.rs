use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Everything that can go wrong while moving bytes across the host/guest boundary.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Error)]
#[rustfmt::skip]
pub enum WasmErrorInner {
    /// the wasm binary could not be compiled or instantiated, or it is missing one of the exports
    /// the ABI requires (or exports it with the wrong signature)
    /// there is no usable session after this
    #[error("instantiation failed: {0}")]
    InstantiationFailed(String),
    /// the guest allocator trapped or otherwise refused to hand out memory
    /// the session that produced this should be discarded
    #[error("allocation failed: {0}")]
    AllocationFailed(String),
    /// a read or write addressed bytes outside the current size of guest memory, or the bytes
    /// being written do not match the length of the buffer they are written to
    /// this means a decode or size mismatch somewhere but the session itself is still usable
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// the target function trapped, ran out of metering points, or does not exist
    /// the guest allocator state after a trap is anybody's guess so the session must be discarded
    #[error("guest call failed: {0}")]
    GuestCallFailed(String),
    /// one or more calls to the guest deallocator failed
    /// every failure is listed, cleanup carries on past the first one
    #[error("release failed: {}", .0.join("; "))]
    ReleaseFailed(Vec<String>),
    /// the guest did not return before the caller supplied deadline
    #[error("guest call timed out after {0}ms")]
    Timeout(u64),
    /// the session was already closed when something tried to use it
    #[error("session closed")]
    SessionClosed,
    /// while converting pointers and lengths between host sizes and u32 we hit a number that
    /// does not fit
    /// a host buffer over 4GB can never be copied into a wasm32 guest
    #[error("pointer map: {0}")]
    PointerMap(String),
}

impl WasmErrorInner {
    /// true if the guest state can no longer be trusted after this error
    /// sessions that hit one of these must be closed rather than reused
    pub fn poisons_session(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailed(_)
                | Self::GuestCallFailed(_)
                | Self::ReleaseFailed(_)
                | Self::Timeout(_)
                | Self::SessionClosed
        )
    }
}

impl From<std::num::TryFromIntError> for WasmErrorInner {
    fn from(e: std::num::TryFromIntError) -> Self {
        Self::PointerMap(e.to_string())
    }
}

/// Wraps a WasmErrorInner with a file and line number.
/// The easiest way to generate this is with the `wasm_error!` macro that will
/// insert the correct file/line and can create strings by forwarding args to
/// the `format!` macro.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Error)]
#[error("{error} at {file}:{line}")]
pub struct WasmError {
    pub file: String,
    pub line: u32,
    pub error: WasmErrorInner,
}

impl WasmError {
    pub fn inner(&self) -> &WasmErrorInner {
        &self.error
    }

    pub fn poisons_session(&self) -> bool {
        self.error.poisons_session()
    }
}

#[macro_export]
macro_rules! wasm_error {
    ($e:expr) => {
        $crate::WasmError {
            // On Windows the `file!()` macro returns a path with inconsistent formatting:
            // from the workspace to the package root it uses backwards-slashes,
            // then within the package it uses forwards-slashes.
            // To remedy this we normalize the formatting here.
            file: file!().replace('\\', "/").to_string(),
            line: line!(),
            error: $e.into(),
        }
    };
}
