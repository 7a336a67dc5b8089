use crate::session::RuntimeSession;
use guestcall_common::*;
use std::mem::ManuallyDrop;

/// A region of guest memory the host is responsible for releasing.
///
/// GuestBuffer intentionally does not implement Clone or Copy.
/// Every buffer comes from exactly one successful `reserve` (or from decoding the packed return
/// value of a guest call) and is consumed by exactly one `release`, so releasing twice does not
/// compile. Dropping a buffer without releasing it leaks the guest bytes until the session
/// closes, which is logged.
#[derive(Debug, PartialEq, Eq)]
pub struct GuestBuffer {
    guest_ptr: GuestPtr,
    len: Len,
}

impl GuestBuffer {
    /// decode the packed pointer/length a guest function returned
    ///
    /// nothing is validated here, a zero length buffer is a perfectly good return value and the
    /// bounds are checked when the bytes are read
    pub fn decode(packed: GuestPtrLen) -> Self {
        let (guest_ptr, len) = split_u64(packed);
        Self { guest_ptr, len }
    }

    pub fn guest_ptr(&self) -> GuestPtr {
        self.guest_ptr
    }

    pub fn len(&self) -> Len {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// give up responsibility for the buffer without the leak warning
    fn disarm(self) -> (GuestPtr, Len) {
        let buffer = ManuallyDrop::new(self);
        (buffer.guest_ptr, buffer.len)
    }
}

impl Drop for GuestBuffer {
    fn drop(&mut self) {
        tracing::warn!(
            guest_ptr = self.guest_ptr,
            len = self.len,
            "guest buffer dropped without being released"
        );
    }
}

/// Reserve and release counters for one session.
/// A session that is done with all its calls has `reserved == released`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocationStats {
    /// successful `reserve` calls plus guest return buffers adopted by the host
    pub reserved: u64,
    /// `release` attempts, successful or not, each buffer is only ever released once
    pub released: u64,
}

impl AllocationStats {
    pub fn live(&self) -> u64 {
        self.reserved.saturating_sub(self.released)
    }
}

impl RuntimeSession {
    /// ask the guest allocator for `len` bytes
    ///
    /// zero is a legal size and the resulting buffer still has to be released, the guest
    /// allocator may well account for it
    /// if this fails nothing is held so there is nothing to release
    pub fn reserve(&mut self, len: Len) -> Result<GuestBuffer, WasmError> {
        let inner = self.inner_mut()?;
        inner.refill();
        let guest_ptr = inner
            .allocate
            .call(&mut inner.store, len)
            .map_err(|e| wasm_error!(WasmErrorInner::AllocationFailed(e.to_string())));
        let guest_ptr = match guest_ptr {
            Ok(guest_ptr) => guest_ptr,
            Err(e) => {
                self.poison();
                return Err(e);
            }
        };
        self.stats.reserved += 1;
        tracing::debug!(guest_ptr, len, "reserved guest buffer");
        Ok(GuestBuffer { guest_ptr, len })
    }

    /// hand a buffer back to the guest allocator
    ///
    /// the buffer is consumed whatever happens, a failed release is reported but never retried
    pub fn release(&mut self, buffer: GuestBuffer) -> Result<(), WasmError> {
        let (guest_ptr, len) = buffer.disarm();
        self.stats.released += 1;
        let result = match self.inner_mut() {
            Ok(inner) => {
                inner.refill();
                inner
                    .deallocate
                    .call(&mut inner.store, guest_ptr, len)
                    .map_err(|e| e.to_string())
            }
            // the whole linear memory went with the session, nothing left to release
            Err(_) => return Ok(()),
        };
        match result {
            Ok(()) => {
                tracing::debug!(guest_ptr, len, "released guest buffer");
                Ok(())
            }
            Err(message) => {
                self.poison();
                Err(wasm_error!(WasmErrorInner::ReleaseFailed(vec![format!(
                    "deallocate({guest_ptr}, {len}): {message}"
                )])))
            }
        }
    }

    /// reserve `len` bytes, run `f` with them and release them again
    ///
    /// the release happens whether `f` succeeds or not, and a failed release never replaces the
    /// result of `f`, it is queued up for the caller to aggregate instead
    pub fn with_reserved<T>(
        &mut self,
        len: Len,
        f: impl FnOnce(&mut Self, &GuestBuffer) -> Result<T, WasmError>,
    ) -> Result<T, WasmError> {
        let buffer = self.reserve(len)?;
        self.with_buffer(buffer, f)
    }

    /// take responsibility for a buffer the guest allocated (typically a decoded return value),
    /// run `f` with it and release it, with the same guarantees as with_reserved
    pub fn with_adopted<T>(
        &mut self,
        buffer: GuestBuffer,
        f: impl FnOnce(&mut Self, &GuestBuffer) -> Result<T, WasmError>,
    ) -> Result<T, WasmError> {
        self.stats.reserved += 1;
        self.with_buffer(buffer, f)
    }

    fn with_buffer<T>(
        &mut self,
        buffer: GuestBuffer,
        f: impl FnOnce(&mut Self, &GuestBuffer) -> Result<T, WasmError>,
    ) -> Result<T, WasmError> {
        let result = f(self, &buffer);
        if let Err(e) = self.release(buffer) {
            match e.error {
                WasmErrorInner::ReleaseFailed(messages) => {
                    self.pending_release_failures.extend(messages)
                }
                other => self.pending_release_failures.push(other.to_string()),
            }
        }
        result
    }

    /// turn every release failure queued since the last call into a single error
    pub(crate) fn aggregate_release_failures(&mut self) -> Option<WasmError> {
        if self.pending_release_failures.is_empty() {
            None
        } else {
            Some(wasm_error!(WasmErrorInner::ReleaseFailed(std::mem::take(
                &mut self.pending_release_failures
            ))))
        }
    }
}
