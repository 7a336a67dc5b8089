use guestcall_guest::*;

fn echo(input: &[u8]) -> Vec<u8> {
    input.to_vec()
}

fn reverse(input: &[u8]) -> Vec<u8> {
    input.iter().rev().copied().collect()
}

fn nothing(_: &[u8]) -> Vec<u8> {
    Vec::new()
}

/// big enough that the guest has to grow its memory while building the result
fn big(input: &[u8]) -> Vec<u8> {
    input.iter().copied().cycle().take(3 * 1024 * 1024).collect()
}

fn panics(_: &[u8]) -> Vec<u8> {
    panic!("oh no!")
}

guest_fn!(echo_bytes, echo);
guest_fn!(reverse_bytes, reverse);
guest_fn!(empty_bytes, nothing);
guest_fn!(big_bytes, big);
guest_fn!(panic_bytes, panics);

#[no_mangle]
/// a real allocation with a length that runs way past the end of guest memory
/// the length stays below isize::MAX so that deallocate can still hand the pointer back to the
/// allocator, which only looks at the pointer
pub extern "C" fn oversized_bytes(_guest_ptr: GuestPtr, _len: Len) -> GuestPtrLen {
    let guest_ptr = allocate(8);
    merge_u64(guest_ptr, 0x7FFF_0000)
}

#[no_mangle]
/// loops until the metering points run out
pub extern "C" fn spin_bytes(_guest_ptr: GuestPtr, len: Len) -> GuestPtrLen {
    let mut i: u64 = 0;
    loop {
        i = std::hint::black_box(i.wrapping_add(len as u64));
        if i == u64::MAX {
            break;
        }
    }
    return_bytes(i.to_le_bytes().to_vec())
}
