//! Fixed physical registers, reserved as the first [`PHYSICAL_REGISTER_COUNT`]
//! vreg ids (§4.5, §3.3's "first ids are reserved" note on `AirModule`).
//! Numbering follows the x86-64 ModRM encoding order for the sixteen
//! general-purpose registers, followed by the sixteen XMM registers, so a
//! later register allocator can recover the encoding bits directly from the
//! id instead of going through a second lookup table.

use crate::air::insn::Vreg;

pub const RAX: Vreg = 0;
pub const RCX: Vreg = 1;
pub const RDX: Vreg = 2;
pub const RBX: Vreg = 3;
pub const RSP: Vreg = 4;
pub const RBP: Vreg = 5;
pub const RSI: Vreg = 6;
pub const RDI: Vreg = 7;
pub const R8: Vreg = 8;
pub const R9: Vreg = 9;
pub const R10: Vreg = 10;
pub const R11: Vreg = 11;
pub const R12: Vreg = 12;
pub const R13: Vreg = 13;
pub const R14: Vreg = 14;
pub const R15: Vreg = 15;
pub const XMM0: Vreg = 16;
pub const XMM1: Vreg = 17;
pub const XMM2: Vreg = 18;
pub const XMM3: Vreg = 19;
pub const XMM4: Vreg = 20;
pub const XMM5: Vreg = 21;
pub const XMM6: Vreg = 22;
pub const XMM7: Vreg = 23;

/// Maps one of [`super::call::INTEGER_ARG_REGISTERS`]' names to its fixed
/// vreg id.
pub fn integer_register_vreg(name: &str) -> Vreg {
    match name {
        "rax" => RAX,
        "rcx" => RCX,
        "rdx" => RDX,
        "rbx" => RBX,
        "rsp" => RSP,
        "rbp" => RBP,
        "rsi" => RSI,
        "rdi" => RDI,
        "r8" => R8,
        "r9" => R9,
        "r10" => R10,
        "r11" => R11,
        "r12" => R12,
        "r13" => R13,
        "r14" => R14,
        "r15" => R15,
        other => panic!("not an integer argument register: {other}"),
    }
}

/// Maps one of [`super::call::SSE_ARG_REGISTERS`]' names to its fixed vreg id.
pub fn sse_register_vreg(name: &str) -> Vreg {
    let n: u32 = name.strip_prefix("xmm").and_then(|s| s.parse().ok()).unwrap_or_else(|| panic!("not an SSE register: {name}"));
    XMM0 + n
}
