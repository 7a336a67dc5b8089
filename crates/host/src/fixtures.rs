//! Hand written guests for exercising the host side of the ABI.
//!
//! They use a bump allocator that never reuses memory and counts live allocations in an exported
//! `live` global, so tests can see exactly what the host handed back.

use crate::session::RuntimeSession;

const ALLOCATE: &str = r#"
  (func $allocate (export "allocate") (param $size i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $next))
    (global.set $next (i32.add (global.get $next) (local.get $size)))
    (global.set $live (i32.add (global.get $live) (i32.const 1)))
    (local.get $ptr))
"#;

const DEALLOCATE: &str = r#"
  (func (export "deallocate") (param i32 i32)
    (global.set $live (i32.sub (global.get $live) (i32.const 1))))
"#;

const TRAPPING_ALLOCATE: &str = r#"
  (func $allocate (export "allocate") (param i32) (result i32)
    unreachable)
"#;

const TRAPPING_DEALLOCATE: &str = r#"
  (func (export "deallocate") (param i32 i32)
    unreachable)
"#;

const WRONG_SIGNATURE_DEALLOCATE: &str = r#"
  (func (export "deallocate") (param i32)
    (global.set $live (i32.sub (global.get $live) (i32.const 1))))
"#;

const MEMORY: &str = r#"
  (memory (export "memory") 1)
"#;

/// echo copies its input into a fresh allocation
/// empty returns a zero length allocation
/// trap traps
/// oversized returns ptr 1024 len 65536, which runs past the single page of memory
/// spin never returns on its own
const TARGETS: &str = r#"
  (func (export "echo") (param $ptr i32) (param $len i32) (result i64)
    (local $out i32)
    (local $i i32)
    (local.set $out (call $allocate (local.get $len)))
    (block $done
      (loop $copy
        (br_if $done (i32.ge_u (local.get $i) (local.get $len)))
        (i32.store8
          (i32.add (local.get $out) (local.get $i))
          (i32.load8_u (i32.add (local.get $ptr) (local.get $i))))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $copy)))
    (i64.or
      (i64.shl (i64.extend_i32_u (local.get $out)) (i64.const 32))
      (i64.extend_i32_u (local.get $len))))

  (func (export "empty") (param i32 i32) (result i64)
    (i64.shl (i64.extend_i32_u (call $allocate (i32.const 0))) (i64.const 32)))

  (func (export "trap") (param i32 i32) (result i64)
    unreachable)

  (func (export "oversized") (param i32 i32) (result i64)
    (i64.const 0x0000040000010000))

  (func (export "spin") (param i32 i32) (result i64)
    (loop $forever
      (br $forever))
    (i64.const 0))
"#;

fn guest(memory: &str, allocate: &str, deallocate: &str) -> Vec<u8> {
    let wat = format!(
        r#"(module
  (global $next (mut i32) (i32.const 1024))
  (global $live (export "live") (mut i32) (i32.const 0))
  {memory}
  {allocate}
  {deallocate}
  {TARGETS}
)"#
    );
    wat::parse_str(wat).unwrap()
}

pub fn echo_wasm() -> Vec<u8> {
    guest(MEMORY, ALLOCATE, DEALLOCATE)
}

pub fn missing_deallocate_wasm() -> Vec<u8> {
    guest(MEMORY, ALLOCATE, "")
}

pub fn wrong_signature_wasm() -> Vec<u8> {
    guest(MEMORY, ALLOCATE, WRONG_SIGNATURE_DEALLOCATE)
}

pub fn no_memory_wasm() -> Vec<u8> {
    guest("(memory 1)", ALLOCATE, DEALLOCATE)
}

pub fn failing_allocate_wasm() -> Vec<u8> {
    guest(MEMORY, TRAPPING_ALLOCATE, DEALLOCATE)
}

pub fn failing_deallocate_wasm() -> Vec<u8> {
    guest(MEMORY, ALLOCATE, TRAPPING_DEALLOCATE)
}

/// allocations the guest thinks are still live
pub fn guest_live(session: &mut RuntimeSession) -> i32 {
    let inner = session.inner_mut().unwrap();
    let live = inner.instance.exports.get_global("live").unwrap();
    live.get(&mut inner.store).i32().unwrap()
}
