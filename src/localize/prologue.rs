//! Routine entry sequences (§4.5, ABI §3.2.3): move each incoming
//! eightbyte out of its fixed register (or stack slot, for overflow
//! arguments) into the parameter's named storage, and set up the hidden
//! `sret` local for aggregate returns larger than two eightbytes.

use crate::air::insn::{AirInsn, AirOp, AirOperand, InsnList};
use crate::air::module::AirRoutine;
use crate::common::types::{CType, Kind};

use super::call::{classify_call, ArgLocation};
use super::classify::{classify, return_eightbyte_registers};
use super::regs::{integer_register_vreg, sse_register_vreg, RBP};

/// Name of the hidden pointer local holding the caller-supplied return slot,
/// read back by [`localize_returns`].
pub fn sret_local_name(routine_symbol: &str) -> String {
    format!("__sret_{routine_symbol}__")
}

/// Eightbyte-sized integer type used to shuttle a register's bytes into a
/// struct/union's backing storage a chunk at a time. Also reused by the
/// lowerer for automatic-aggregate initializers (§4.4), which shuttle
/// compile-time bytes the same way the localizer shuttles register bytes.
pub(crate) fn eightbyte_carrier_type(remaining: u64) -> CType {
    match remaining {
        1 => CType::basic(Kind::UnsignedChar),
        2 => CType::basic(Kind::UShort),
        3..=4 => CType::basic(Kind::UInt),
        _ => CType::basic(Kind::ULong),
    }
}

/// Builds the instruction prefix a routine needs before its own body runs:
/// binding each declared parameter name to the register (or stack slot) the
/// ABI actually delivered it in.
pub fn build_prologue(routine: &AirRoutine, param_names: &[String]) -> InsnList {
    let mut list = InsnList::new();
    let shape = classify_call(&routine.param_types, &routine.return_type);

    if shape.return_sret {
        let name = sret_local_name(&routine.symbol);
        let ptr_ty = CType::pointer_to(routine.return_type.clone());
        list.push_back(AirInsn::new(AirOp::Declare, ptr_ty.clone(), vec![AirOperand::Symbol(name.clone())]));
        list.push_back(AirInsn::new(AirOp::Load, ptr_ty, vec![AirOperand::Symbol(name), AirOperand::Register(integer_register_vreg("rdi"))]));
    }

    let mut stack_offset: i64 = 16; // above the saved return address and frame pointer
    for (name, (ty, location)) in param_names.iter().zip(routine.param_types.iter().zip(shape.arg_locations.iter())) {
        list.push_back(AirInsn::new(AirOp::Declare, ty.clone(), vec![AirOperand::Symbol(name.clone())]));

        let size = ty.size().unwrap_or(8);
        if ty.is_scalar() {
            let reg = match location {
                ArgLocation::Integer(regs) => integer_register_vreg(regs[0]),
                ArgLocation::Sse(regs) => sse_register_vreg(regs[0]),
                ArgLocation::Memory => {
                    list.push_back(AirInsn::new(
                        AirOp::Load,
                        ty.clone(),
                        vec![AirOperand::Symbol(name.clone()), AirOperand::IndirectRegister { base: RBP, disp: stack_offset, index: None, scale: 1 }],
                    ));
                    stack_offset += 8;
                    continue;
                }
            };
            list.push_back(AirInsn::new(AirOp::Load, ty.clone(), vec![AirOperand::Symbol(name.clone()), AirOperand::Register(reg)]));
            continue;
        }

        // Aggregate parameter: shuttle one eightbyte at a time from wherever
        // it landed into the parameter's backing storage.
        let regs: Vec<crate::air::insn::Vreg> = match location {
            ArgLocation::Integer(regs) => regs.iter().map(|r| integer_register_vreg(r)).collect(),
            ArgLocation::Sse(regs) => regs.iter().map(|r| sse_register_vreg(r)).collect(),
            ArgLocation::Memory => {
                let mut copied = 0u64;
                while copied < size {
                    let chunk_ty = eightbyte_carrier_type(size - copied);
                    let chunk_size = chunk_ty.size().unwrap_or(8);
                    list.push_back(AirInsn::new(
                        AirOp::Assign,
                        chunk_ty,
                        vec![
                            AirOperand::IndirectSymbol { symbol: name.clone(), offset: copied as i64 },
                            AirOperand::IndirectRegister { base: RBP, disp: stack_offset, index: None, scale: 1 },
                        ],
                    ));
                    copied += chunk_size;
                    stack_offset += 8;
                }
                continue;
            }
        };

        let mut copied = 0u64;
        for reg in regs {
            let remaining = size - copied;
            let chunk_ty = eightbyte_carrier_type(remaining);
            let chunk_size = chunk_ty.size().unwrap_or(8);
            list.push_back(AirInsn::new(
                AirOp::Assign,
                chunk_ty,
                vec![AirOperand::IndirectSymbol { symbol: name.clone(), offset: copied as i64 }, AirOperand::Register(reg)],
            ));
            copied += chunk_size;
        }
    }

    list
}

/// Splices `prologue` ahead of `body`; `InsnList` only grows from the tail,
/// so the prologue becomes the new list and the body is appended after it.
pub fn prepend(prologue: InsnList, body: InsnList) -> InsnList {
    let mut combined = prologue;
    combined.append(body);
    combined
}

/// Rewrites every `Return` into the fixed-register convention its type
/// demands: RAX for integers/pointers, XMM0 for SSE floats, RAX:RDX (or
/// straight through `__sret_*__`) for aggregates (§4.5, ABI §3.2.3
/// "Returning of Values").
pub fn localize_returns(routine: &AirRoutine, list: InsnList) -> InsnList {
    use super::regs::{RAX, XMM0};
    let ret_ty = &routine.return_type;
    let mut out = InsnList::new();

    for (_, insn) in list.iter() {
        if insn.op != AirOp::Return || insn.operands.is_empty() {
            out.push_back(insn.clone());
            continue;
        }
        let AirOperand::Register(src) = insn.operands[0].clone() else {
            out.push_back(insn.clone());
            continue;
        };

        if ret_ty.is_struct_or_union() && ret_ty.size().map_or(false, |s| s > 16) {
            // `src` already holds the returned object's address; the
            // caller's hidden pointer (stashed in `__sret_*__` by the
            // prologue) tells us where to copy it to, and the ABI says the
            // callee must also hand that same pointer back in RAX. The
            // whole-object `Assign` here is a block copy, sized from its
            // operand type rather than chunked into eightbytes.
            let sret = sret_local_name(&routine.symbol);
            out.push_back(AirInsn::new(
                AirOp::Assign,
                ret_ty.clone(),
                vec![AirOperand::IndirectSymbol { symbol: sret.clone(), offset: 0 }, AirOperand::IndirectRegister { base: src, disp: 0, index: None, scale: 1 }],
            ));
            out.push_back(AirInsn::new(AirOp::Load, CType::pointer_to(ret_ty.clone()), vec![AirOperand::Register(RAX), AirOperand::Symbol(sret)]));
            out.push_back(AirInsn::new(AirOp::Return, ret_ty.clone(), vec![]));
        } else if ret_ty.is_struct_or_union() {
            // Small aggregate: copy each eightbyte into the register its own
            // class calls for — INTEGER into RAX/RDX, SSE into XMM0/XMM1
            // independently, so `struct { int x; double y; }` (classes
            // `[Integer, Sse]`) ends up `%rax = x, %xmm0 = y` rather than
            // both eightbytes packed into RAX:RDX.
            let size = ret_ty.size().unwrap_or(0);
            let classes = classify(ret_ty);
            let regs = return_eightbyte_registers(&classes);
            let mut copied = 0u64;
            for reg in regs {
                if copied >= size {
                    break;
                }
                let chunk_ty = eightbyte_carrier_type(size - copied);
                let chunk_size = chunk_ty.size().unwrap_or(8);
                out.push_back(AirInsn::new(
                    AirOp::Load,
                    chunk_ty,
                    vec![AirOperand::Register(reg), AirOperand::IndirectRegister { base: src, disp: copied as i64, index: None, scale: 1 }],
                ));
                copied += chunk_size;
            }
            out.push_back(AirInsn::new(AirOp::Return, ret_ty.clone(), vec![]));
        } else if ret_ty.is_real_float() || ret_ty.is_complex() {
            out.push_back(AirInsn::new(AirOp::Load, ret_ty.clone(), vec![AirOperand::Register(XMM0), AirOperand::Register(src)]));
            out.push_back(AirInsn::new(AirOp::Return, ret_ty.clone(), vec![]));
        } else {
            out.push_back(AirInsn::new(AirOp::Load, ret_ty.clone(), vec![AirOperand::Register(RAX), AirOperand::Register(src)]));
            out.push_back(AirInsn::new(AirOp::Return, ret_ty.clone(), vec![]));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::air::module::AirRoutine;

    #[test]
    fn scalar_parameter_loads_from_its_argument_register() {
        let routine = AirRoutine::new("add", CType::basic(Kind::Int), vec![CType::basic(Kind::Int), CType::basic(Kind::Int)]);
        let list = build_prologue(&routine, &["a".into(), "b".into()]);
        let ops: Vec<&AirOp> = list.iter().map(|(_, insn)| &insn.op).collect();
        assert_eq!(ops, vec![&AirOp::Declare, &AirOp::Load, &AirOp::Declare, &AirOp::Load]);
    }

    #[test]
    fn large_aggregate_return_declares_a_hidden_sret_local() {
        use crate::common::types::AggregateShape;
        let big = CType::new(Kind::Struct(AggregateShape {
            tag: None,
            member_names: vec!["buf".into()],
            member_types: vec![CType::array_of(CType::basic(Kind::Char), Some(32), None)],
            member_bitfields: vec![None],
        }));
        let routine = AirRoutine::new("make_big", big, vec![]);
        let list = build_prologue(&routine, &[]);
        let (_, first) = list.iter().next().unwrap();
        assert_eq!(first.op, AirOp::Declare);
        assert_eq!(first.operands[0], AirOperand::Symbol(sret_local_name("make_big")));
    }

    #[test]
    fn mixed_class_small_aggregate_returns_through_rax_and_xmm0_not_rax_and_rdx() {
        use crate::common::types::AggregateShape;
        let p = CType::new(Kind::Struct(AggregateShape {
            tag: None,
            member_names: vec!["x".into(), "y".into()],
            member_types: vec![CType::basic(Kind::Int), CType::basic(Kind::Double)],
            member_bitfields: vec![None, None],
        }));
        let routine = AirRoutine::new("make_p", p.clone(), vec![]);
        let mut list = InsnList::new();
        list.push_back(AirInsn::new(AirOp::Return, p, vec![AirOperand::Register(70)]));
        let localized = localize_returns(&routine, list);
        let ops: Vec<&AirInsn> = localized.iter().map(|(_, i)| i).collect();

        let loads: Vec<&&AirInsn> = ops.iter().filter(|i| i.op == AirOp::Load).collect();
        assert!(loads.iter().any(|i| i.operands[0] == AirOperand::Register(super::super::regs::RAX)));
        assert!(loads.iter().any(|i| i.operands[0] == AirOperand::Register(super::super::regs::XMM0)));
        assert!(!loads.iter().any(|i| i.operands[0] == AirOperand::Register(super::super::regs::RDX)));
    }
}
