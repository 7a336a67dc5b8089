use crate::allocation::GuestBuffer;
use crate::session::RuntimeSession;
use guestcall_common::*;
use wasmer::MemoryView;

/// check that [guest_ptr, guest_ptr + len) lies inside the guest memory as it is right now
///
/// the size must be queried fresh for every read and write, the guest can grow its memory during
/// any call into it and a size cached before that is meaningless
fn check_bounds(view: &MemoryView, guest_ptr: GuestPtr, len: Len) -> Result<(), WasmError> {
    let memory_size = view.data_size();
    // u64 so that pointer plus length cannot wrap
    let end = guest_ptr as u64 + len as u64;
    if end > memory_size {
        return Err(wasm_error!(WasmErrorInner::OutOfRange(format!(
            "[{guest_ptr}, {end}) is outside guest memory of {memory_size} bytes"
        ))));
    }
    Ok(())
}

/// Write a slice of bytes to the guest in a safe-ish way.
///
/// The guest_ptr typically comes from the guest allocator, but a malicious or buggy guest can
/// hand out anything at all, so the region is bounds checked before a single byte is copied.
/// An out of range write is rejected outright, never clamped.
pub fn write_bytes(view: &MemoryView, guest_ptr: GuestPtr, slice: &[u8]) -> Result<(), WasmError> {
    let len = Len::try_from(slice.len()).map_err(|e| wasm_error!(e))?;
    check_bounds(view, guest_ptr, len)?;
    view.write(guest_ptr as u64, slice)
        .map_err(|e| wasm_error!(WasmErrorInner::OutOfRange(e.to_string())))
}

/// Read a slice of bytes from the guest in a safe-ish way.
///
/// Same bounds discipline as write_bytes.
pub fn read_bytes(view: &MemoryView, guest_ptr: GuestPtr, len: Len) -> Result<Vec<u8>, WasmError> {
    check_bounds(view, guest_ptr, len)?;
    let mut bytes = vec![0; len as usize];
    view.read(guest_ptr as u64, &mut bytes)
        .map_err(|e| wasm_error!(WasmErrorInner::OutOfRange(e.to_string())))?;
    Ok(bytes)
}

impl RuntimeSession {
    /// copy `data` into a reserved buffer
    /// the data has to fill the buffer exactly, anything else is a size mismatch upstream
    pub fn write(&self, buffer: &GuestBuffer, data: &[u8]) -> Result<(), WasmError> {
        if data.len() != buffer.len() as usize {
            return Err(wasm_error!(WasmErrorInner::OutOfRange(format!(
                "{} bytes do not fit a buffer of {} bytes",
                data.len(),
                buffer.len()
            ))));
        }
        let inner = self.inner()?;
        write_bytes(&inner.memory.view(&inner.store), buffer.guest_ptr(), data)?;
        tracing::debug!(
            guest_ptr = buffer.guest_ptr(),
            len = buffer.len(),
            "wrote guest buffer"
        );
        Ok(())
    }

    /// copy the whole of a buffer out of the guest
    pub fn read(&self, buffer: &GuestBuffer) -> Result<Vec<u8>, WasmError> {
        let inner = self.inner()?;
        let bytes = read_bytes(
            &inner.memory.view(&inner.store),
            buffer.guest_ptr(),
            buffer.len(),
        )?;
        tracing::debug!(
            guest_ptr = buffer.guest_ptr(),
            len = buffer.len(),
            "read guest buffer"
        );
        Ok(bytes)
    }
}
