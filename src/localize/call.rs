//! Argument and return-value placement for calls and routine prologues
//! (§4.5, ABI §3.2.3 "Passing"). Walks the integer/SSE register pools in
//! order, spilling to the stack once a pool or the eightbyte-count limit for
//! aggregates is exhausted.

use super::classify::{classify, return_eightbyte_registers, EightbyteClass};
use super::prologue::eightbyte_carrier_type;
use super::regs::{integer_register_vreg, sse_register_vreg, RAX, RDX, XMM0};
use crate::air::insn::{AirInsn, AirOp, AirOperand, InsnList, Vreg};
use crate::common::types::CType;
use crate::support::map::Map;

pub const INTEGER_ARG_REGISTERS: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];
pub const SSE_ARG_REGISTERS: [&str; 8] = ["xmm0", "xmm1", "xmm2", "xmm3", "xmm4", "xmm5", "xmm6", "xmm7"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgLocation {
    Integer(Vec<&'static str>),
    Sse(Vec<&'static str>),
    Memory,
}

/// A register-pool cursor, mirroring the ABI's "next available" allocation
/// rule: once a class can't fit in the remaining registers, the whole
/// argument (not just its overflow eightbytes) goes to memory.
#[derive(Default)]
struct Pools {
    next_int: usize,
    next_sse: usize,
}

impl Pools {
    fn place(&mut self, classes: &[EightbyteClass]) -> ArgLocation {
        let ints_needed = classes.iter().filter(|c| **c == EightbyteClass::Integer).count();
        let sses_needed = classes.iter().filter(|c| matches!(c, EightbyteClass::Sse | EightbyteClass::SseUp)).count();
        let has_memory = classes.iter().any(|c| *c == EightbyteClass::Memory);
        if has_memory || self.next_int + ints_needed > INTEGER_ARG_REGISTERS.len() || self.next_sse + sses_needed > SSE_ARG_REGISTERS.len() {
            if !has_memory && ints_needed == 0 && sses_needed == 0 {
                return ArgLocation::Memory;
            }
            if has_memory {
                return ArgLocation::Memory;
            }
        }
        let mut int_regs = Vec::new();
        let mut sse_regs = Vec::new();
        for class in classes {
            match class {
                EightbyteClass::Integer => {
                    if self.next_int >= INTEGER_ARG_REGISTERS.len() {
                        return ArgLocation::Memory;
                    }
                    int_regs.push(INTEGER_ARG_REGISTERS[self.next_int]);
                    self.next_int += 1;
                }
                EightbyteClass::Sse | EightbyteClass::SseUp => {
                    if self.next_sse >= SSE_ARG_REGISTERS.len() {
                        return ArgLocation::Memory;
                    }
                    sse_regs.push(SSE_ARG_REGISTERS[self.next_sse]);
                    self.next_sse += 1;
                }
                _ => return ArgLocation::Memory,
            }
        }
        if !int_regs.is_empty() {
            ArgLocation::Integer(int_regs)
        } else {
            ArgLocation::Sse(sse_regs)
        }
    }
}

/// Placement plan for one call site or routine prologue: one location per
/// parameter, plus whether the return value needs a hidden `sret` pointer
/// (aggregates over two eightbytes, per ABI §3.2.3 rule 1).
pub struct CallShape {
    pub arg_locations: Vec<ArgLocation>,
    pub return_sret: bool,
    pub return_location: Option<ArgLocation>,
}

/// Rewrites every `FuncCall` in `list` to move each argument into its
/// ABI-assigned register (or push it for stack-class eightbytes) ahead of
/// the call, then pull the return value back out of RAX/XMM0 afterward.
/// Argument types come from whichever earlier instruction in the same
/// routine last defined that vreg — every vreg here is single-assignment,
/// so "last" is also "only".
pub fn localize_calls(list: InsnList) -> InsnList {
    let mut vreg_types: Map<Vreg, CType> = Map::new();
    let mut out = InsnList::new();

    for (_, insn) in list.iter() {
        if insn.op == AirOp::FuncCall {
            localize_one_call(&mut out, insn, &vreg_types);
        } else {
            out.push_back(insn.clone());
        }
        if let Some(v) = insn.dest_vreg() {
            vreg_types.insert(v, insn.operand_type.clone());
        }
    }
    out
}

fn localize_one_call(out: &mut InsnList, insn: &AirInsn, vreg_types: &Map<Vreg, CType>) {
    let dest = insn.operands[0].clone();
    let callee = insn.operands[1].clone();
    let arg_regs: Vec<Vreg> = insn.operands[2..]
        .iter()
        .map(|op| match op {
            AirOperand::Register(r) => *r,
            other => panic!("call argument must be a register operand, got {other:?}"),
        })
        .collect();

    let mut pools = Pools::default();
    let mut stack_args = Vec::new();
    for &reg in &arg_regs {
        let ty = vreg_types.get(&reg).cloned().unwrap_or_else(|| CType::basic(crate::common::types::Kind::Long));
        let classes = classify(&ty);
        match pools.place(&classes) {
            ArgLocation::Integer(regs) => {
                out.push_back(AirInsn::new(AirOp::Load, ty, vec![AirOperand::Register(integer_register_vreg(regs[0])), AirOperand::Register(reg)]));
            }
            ArgLocation::Sse(regs) => {
                out.push_back(AirInsn::new(AirOp::Load, ty, vec![AirOperand::Register(sse_register_vreg(regs[0])), AirOperand::Register(reg)]));
            }
            ArgLocation::Memory => stack_args.push((reg, ty)),
        }
    }
    // Pushed right-to-left so the first stack argument ends up at the
    // lowest address once the callee's frame is set up (System V ABI
    // §3.2.3 "Stack").
    for (reg, ty) in stack_args.into_iter().rev() {
        out.push_back(AirInsn::new(AirOp::Push, ty, vec![AirOperand::Register(reg)]));
    }

    out.push_back(AirInsn::new(AirOp::FuncCall, insn.operand_type.clone(), vec![callee]));

    for reg in [RAX, RDX, integer_register_vreg("rdi"), integer_register_vreg("rsi"), integer_register_vreg("rcx")] {
        out.push_back(AirInsn::new(AirOp::Blip, insn.operand_type.clone(), vec![AirOperand::Register(reg)]));
    }

    if insn.operand_type.is_void() {
        return;
    }

    if insn.operand_type.is_struct_or_union() {
        load_call_result_aggregate(out, &insn.operand_type, dest, insn.dest_vreg());
    } else if insn.operand_type.is_real_float() || insn.operand_type.is_complex() {
        out.push_back(AirInsn::new(AirOp::Load, insn.operand_type.clone(), vec![dest, AirOperand::Register(XMM0)]));
    } else {
        out.push_back(AirInsn::new(AirOp::Load, insn.operand_type.clone(), vec![dest, AirOperand::Register(RAX)]));
    }
}

/// Recovers a small (<= two-eightbyte) struct/union call result: each
/// eightbyte comes back in the integer or SSE register its own class calls
/// for (e.g. `struct { int x; double y; }` returns `%rax`/`%xmm0`, not
/// `%rax`/`%rdx`), so this declares a stack-local buffer, copies each
/// register into its eightbyte per `classify`, and hands `dest` the buffer's
/// address — matching the address-holding convention every other
/// struct/union-typed `Place` uses in this crate.
fn load_call_result_aggregate(out: &mut InsnList, ret_ty: &CType, dest: AirOperand, dest_vreg: Option<Vreg>) {
    let local = format!("__callret_{}__", dest_vreg.unwrap_or(0));
    out.push_back(AirInsn::new(AirOp::Declare, ret_ty.clone(), vec![AirOperand::Symbol(local.clone())]));

    let size = ret_ty.size().unwrap_or(0);
    let classes = classify(ret_ty);
    if !classes.iter().any(|c| *c == EightbyteClass::Memory) {
        let regs = return_eightbyte_registers(&classes);
        let mut copied = 0u64;
        for reg in regs {
            if copied >= size {
                break;
            }
            let chunk_ty = eightbyte_carrier_type(size - copied);
            let chunk_size = chunk_ty.size().unwrap_or(8);
            out.push_back(AirInsn::new(
                AirOp::Assign,
                chunk_ty,
                vec![AirOperand::IndirectSymbol { symbol: local.clone(), offset: copied as i64 }, AirOperand::Register(reg)],
            ));
            copied += chunk_size;
        }
    }

    out.push_back(AirInsn::new(AirOp::LoadAddr, ret_ty.clone(), vec![dest, AirOperand::Symbol(local)]));
}

pub fn classify_call(param_types: &[CType], return_type: &CType) -> CallShape {
    let return_classes = classify(return_type);
    let return_sret = return_type.is_struct_or_union() && return_classes.iter().any(|c| *c == EightbyteClass::Memory);

    let mut pools = Pools::default();
    if return_sret {
        // The hidden sret pointer consumes the first integer argument
        // register (ABI §3.2.3 rule "If the type has class MEMORY... the
        // caller provides space... rdi contains the address").
        pools.next_int += 1;
    }

    let arg_locations = param_types.iter().map(|ty| pools.place(&classify(ty))).collect();
    let return_location = if return_type.is_void() || return_sret {
        None
    } else {
        Some(Pools::default().place(&return_classes))
    };

    CallShape { arg_locations, return_sret, return_location }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Kind;

    #[test]
    fn scalar_params_take_successive_integer_registers() {
        let shape = classify_call(&[CType::basic(Kind::Int), CType::basic(Kind::Long)], &CType::basic(Kind::Int));
        assert_eq!(shape.arg_locations[0], ArgLocation::Integer(vec!["rdi"]));
        assert_eq!(shape.arg_locations[1], ArgLocation::Integer(vec!["rsi"]));
    }

    #[test]
    fn seventh_integer_argument_spills_to_memory() {
        let params: Vec<CType> = (0..7).map(|_| CType::basic(Kind::Int)).collect();
        let shape = classify_call(&params, &CType::basic(Kind::Void));
        assert_eq!(shape.arg_locations[6], ArgLocation::Memory);
    }

    #[test]
    fn large_aggregate_return_uses_sret_and_steals_rdi() {
        let shape = classify_call(
            &[CType::basic(Kind::Int)],
            &CType::new(Kind::Struct(crate::common::types::AggregateShape {
                tag: None,
                member_names: vec!["buf".into()],
                member_types: vec![CType::array_of(CType::basic(Kind::Char), Some(32), None)],
                member_bitfields: vec![None],
            })),
        );
        assert!(shape.return_sret);
        assert_eq!(shape.arg_locations[0], ArgLocation::Integer(vec!["rsi"]));
    }

    #[test]
    fn call_site_moves_arguments_into_argument_registers() {
        let mut list = InsnList::new();
        list.push_back(AirInsn::new(AirOp::Load, CType::basic(Kind::Int), vec![AirOperand::Register(50), AirOperand::IntegerConstant(7)]));
        list.push_back(AirInsn::new(AirOp::Load, CType::basic(Kind::Int), vec![AirOperand::Register(51), AirOperand::IntegerConstant(9)]));
        list.push_back(AirInsn::new(
            AirOp::FuncCall,
            CType::basic(Kind::Int),
            vec![AirOperand::Register(52), AirOperand::Symbol("add".into()), AirOperand::Register(50), AirOperand::Register(51)],
        ));
        let localized = localize_calls(list);
        let ops: Vec<&AirInsn> = localized.iter().map(|(_, i)| i).collect();
        assert_eq!(ops[2].operands[0], AirOperand::Register(integer_register_vreg("rdi")));
        assert_eq!(ops[3].operands[0], AirOperand::Register(integer_register_vreg("rsi")));
        assert!(ops.iter().any(|i| i.op == AirOp::FuncCall && i.operands.len() == 1));
        assert!(ops.last().unwrap().op == AirOp::Load && ops.last().unwrap().operands[0] == AirOperand::Register(52));
    }

    #[test]
    fn mixed_class_small_aggregate_result_copies_rax_and_xmm0_not_rax_and_rdx() {
        use crate::common::types::AggregateShape;
        let p = CType::new(Kind::Struct(AggregateShape {
            tag: None,
            member_names: vec!["x".into(), "y".into()],
            member_types: vec![CType::basic(Kind::Int), CType::basic(Kind::Double)],
            member_bitfields: vec![None, None],
        }));
        let mut list = InsnList::new();
        list.push_back(AirInsn::new(AirOp::FuncCall, p.clone(), vec![AirOperand::Register(60), AirOperand::Symbol("make_p".into())]));
        let localized = localize_calls(list);
        let ops: Vec<&AirInsn> = localized.iter().map(|(_, i)| i).collect();

        let assigns: Vec<&&AirInsn> = ops.iter().filter(|i| i.op == AirOp::Assign).collect();
        assert!(assigns.iter().any(|i| i.operands[1] == AirOperand::Register(RAX)));
        assert!(assigns.iter().any(|i| i.operands[1] == AirOperand::Register(XMM0)));
        assert!(!assigns.iter().any(|i| i.operands[1] == AirOperand::Register(super::super::regs::RDX)));

        let last = ops.last().unwrap();
        assert_eq!(last.op, AirOp::LoadAddr);
        assert_eq!(last.operands[0], AirOperand::Register(60));
    }
}
