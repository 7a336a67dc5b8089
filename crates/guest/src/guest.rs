pub mod allocation;

pub use allocation::allocate;
pub use allocation::deallocate;
pub use guestcall_common::*;

/// copy the bytes the host wrote into this guest
///
/// the host owns the input buffer and deallocates it after the call returns, so the guest takes
/// a copy rather than ownership
///
/// # Safety
///
/// guest_ptr and len must be the arguments the host passed to the exported function
pub unsafe fn host_bytes(guest_ptr: GuestPtr, len: Len) -> Vec<u8> {
    if len == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(guest_ptr as usize as *const u8, len as usize).to_vec()
}

/// hand bytes back to the host
/// the bytes are leaked and their location packed into a single u64, the host reads them and
/// then calls deallocate with the same pointer and length
pub fn return_bytes(bytes: Vec<u8>) -> GuestPtrLen {
    let (ptr, len) = allocation::leak_bytes(bytes);
    merge_u64(ptr as usize as GuestPtr, len as Len)
}

#[macro_export]
/// export a `fn(&[u8]) -> Vec<u8>` as a target function of the ABI
///
/// ```ignore
/// fn shout(input: &[u8]) -> Vec<u8> {
///     input.to_ascii_uppercase()
/// }
/// guest_fn!(shout_export, shout);
/// ```
///
/// produces `shout_export(guest_ptr: u32, len: u32) -> u64` with the input copied in from the
/// host and the output leaked and packed for the host to read
macro_rules! guest_fn {
    ( $export:ident, $inner:path ) => {
        #[no_mangle]
        pub extern "C" fn $export(
            guest_ptr: $crate::GuestPtr,
            len: $crate::Len,
        ) -> $crate::GuestPtrLen {
            let input = unsafe { $crate::host_bytes(guest_ptr, len) };
            $crate::return_bytes($inner(&input))
        }
    };
}
