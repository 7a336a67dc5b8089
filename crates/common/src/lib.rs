pub mod packing;
pub mod result;

pub use packing::*;
pub use result::*;

/// something like usize for wasm
/// wasm has a memory limit of 4GB so offsets and lengths fit in u32
///
/// the host needs to directly read and write to the guest's memory so we need a predictable number
/// of bytes to represent offsets and lengths
/// we don't want to have to recompile every wasm as u32 and u64 to match different `usize` sizes
/// on the host, especially considering that u64 offsets/lengths would add no value to wasm
///
/// wasmer itself uses u32 in the WasmPtr abstraction etc.
pub type WasmSize = u32;

/// a length of bytes in guest memory, never a count of items
pub type Len = WasmSize;

/// an offset into the linear memory of one specific guest instance
/// it is meaningless for any other instance, even one built from the same wasm
pub type GuestPtr = WasmSize;

/// a GuestPtr and a Len packed into a single u64
/// the pointer occupies the high 32 bits and the length the low 32 bits
/// this is the only way a guest function can return variable length data as wasm functions can
/// only return fixed width integers
pub type GuestPtrLen = u64;

/// name of the guest export that reserves bytes for the host
pub const ALLOCATE_EXPORT: &str = "allocate";

/// name of the guest export that frees bytes previously reserved with ALLOCATE_EXPORT
pub const DEALLOCATE_EXPORT: &str = "deallocate";

/// name of the exported linear memory
pub const MEMORY_EXPORT: &str = "memory";
