use crate::GuestPtr;
use crate::GuestPtrLen;
use crate::Len;

/// pack a guest pointer and a length into a single u64
/// the pointer goes in the high bits so that the layout matches every guest already built against
/// this ABI
#[cfg_attr(feature = "fuzzing", test_fuzz::test_fuzz)]
pub fn merge_u64(guest_ptr: GuestPtr, len: Len) -> GuestPtrLen {
    ((guest_ptr as u64) << 32) | len as u64
}

/// inverse of merge_u64
///
/// both halves are taken with unsigned widening, a pointer or length with the top bit set is
/// perfectly legal and must not be sign extended
#[cfg_attr(feature = "fuzzing", test_fuzz::test_fuzz)]
pub fn split_u64(packed: GuestPtrLen) -> (GuestPtr, Len) {
    ((packed >> 32) as GuestPtr, (packed & 0xFFFF_FFFF) as Len)
}
