use guestcall_common::*;
use std::mem::ManuallyDrop;

/// leak a byte vector so that it survives after the current function returns
/// the vector is shrunk first so that the length is also the capacity, which is what
/// deallocate expects when it reconstitutes the vector
pub(crate) fn leak_bytes(bytes: Vec<u8>) -> (*mut u8, usize) {
    let mut boxed = ManuallyDrop::new(bytes.into_boxed_slice());
    (boxed.as_mut_ptr(), boxed.len())
}

/// take back ownership of bytes previously leaked with leak_bytes (or allocate)
///
/// # Safety
///
/// ptr and len must describe exactly one leaked allocation that has not been reclaimed yet
pub(crate) unsafe fn reclaim_bytes(ptr: *mut u8, len: usize) -> Vec<u8> {
    Vec::from_raw_parts(ptr, len, len)
}

#[no_mangle]
/// allocate a length of bytes that won't be dropped by the allocator
/// return the pointer to it so bytes can be written to the allocation
///
/// the bytes are zeroed so the host never sees stale guest data in a buffer it reserved
/// a zero length allocation is fine, it is a dangling but aligned pointer that deallocate accepts
pub extern "C" fn allocate(len: Len) -> GuestPtr {
    let (ptr, _) = leak_bytes(vec![0; len as usize]);
    ptr as GuestPtr
}

#[no_mangle]
/// restore an allocation so that it is dropped immediately
/// this needs to be called on anything allocated above as the allocator
/// will never free the memory otherwise
///
/// the host is responsible for only ever passing back pointer/length pairs it got from allocate
/// or from a packed return value
pub extern "C" fn deallocate(guest_ptr: GuestPtr, len: Len) {
    let _: Vec<u8> = unsafe { reclaim_bytes(guest_ptr as usize as *mut u8, len as usize) };
}
