//! Fixed-register opcode legalization (§4.5): division, unsigned
//! multiplication, variable shifts, and comparisons all pin an operand to a
//! specific physical register on x86-64, which the generic three-operand AIR
//! form doesn't express. Each rewrite consumes the routine's instruction
//! list and produces a new one, since splicing only ever needs to look at
//! instructions already emitted in order.

use crate::air::insn::{AirInsn, AirOp, AirOperand, InsnList};

use super::regs::{RAX, RCX, RDX};

/// Rewrites every fixed-register-constrained instruction in `list` into the
/// register-move + op + register-move sequence x86-64 actually requires.
pub fn localize_fixed_ops(list: InsnList) -> InsnList {
    let mut out = InsnList::new();
    for (_, insn) in list.iter() {
        match insn.op {
            AirOp::Div | AirOp::Mod | AirOp::UDiv | AirOp::UMod => localize_divide_modulo(&mut out, insn),
            AirOp::DirectDiv | AirOp::DirectMod => localize_direct_divide_modulo(&mut out, insn),
            AirOp::UMul => localize_unsigned_multiply(&mut out, insn),
            AirOp::DirectMul => localize_direct_multiply(&mut out, insn),
            AirOp::Shl | AirOp::ShrArith | AirOp::ShrLogical => localize_shift(&mut out, insn, 2),
            AirOp::DirectShl | AirOp::DirectShr => localize_shift(&mut out, insn, 1),
            AirOp::CmpLt | AirOp::CmpGt | AirOp::CmpLe | AirOp::CmpGe | AirOp::CmpEq | AirOp::CmpNe => localize_comparison(&mut out, insn),
            _ => {
                out.push_back(insn.clone());
            }
        }
    }
    out
}

fn push_move(out: &mut InsnList, insn: &AirInsn, dest: AirOperand, src: AirOperand) {
    out.push_back(AirInsn::new(AirOp::Load, insn.operand_type.clone(), vec![dest, src]));
}

/// `dest = lhs / rhs` (or `%`): the dividend must sit in RAX with RDX
/// zeroed (sign-extended for signed division is handled by instruction
/// selection, not here), the result comes back in RAX for `/` or RDX for
/// `%`.
fn localize_divide_modulo(out: &mut InsnList, insn: &AirInsn) {
    let dest = insn.operands[0].clone();
    let lhs = insn.operands[1].clone();
    let rhs = insn.operands[2].clone();
    let result_reg = if matches!(insn.op, AirOp::Div | AirOp::UDiv) { RAX } else { RDX };

    push_move(out, insn, AirOperand::Register(RAX), lhs);
    out.push_back(AirInsn::new(AirOp::Load, insn.operand_type.clone(), vec![AirOperand::Register(RDX), AirOperand::IntegerConstant(0)]));
    let divide_op = if matches!(insn.op, AirOp::UDiv | AirOp::UMod) { AirOp::UDiv } else { AirOp::Div };
    out.push_back(AirInsn::new(divide_op, insn.operand_type.clone(), vec![AirOperand::Register(result_reg), AirOperand::Register(RAX), rhs]));
    push_move(out, insn, dest, AirOperand::Register(result_reg));
}

/// `lhs /= rhs` (or `%=`) in place: same register dance, but the result is
/// written back to the original in-place operand instead of a fresh dest.
fn localize_direct_divide_modulo(out: &mut InsnList, insn: &AirInsn) {
    let place = insn.operands[0].clone();
    let rhs = insn.operands[1].clone();
    let result_reg = if insn.op == AirOp::DirectDiv { RAX } else { RDX };

    push_move(out, insn, AirOperand::Register(RAX), place.clone());
    out.push_back(AirInsn::new(AirOp::Load, insn.operand_type.clone(), vec![AirOperand::Register(RDX), AirOperand::IntegerConstant(0)]));
    out.push_back(AirInsn::new(AirOp::Div, insn.operand_type.clone(), vec![AirOperand::Register(result_reg), AirOperand::Register(RAX), rhs]));
    push_move(out, insn, place, AirOperand::Register(result_reg));
}

/// `dest = lhs * rhs` unsigned: the one-operand `mul` form always writes the
/// low half to RAX and clobbers RDX with the high half, so RDX needs a
/// liveness `Blip` even though nothing reads it.
fn localize_unsigned_multiply(out: &mut InsnList, insn: &AirInsn) {
    let dest = insn.operands[0].clone();
    let lhs = insn.operands[1].clone();
    let rhs = insn.operands[2].clone();

    push_move(out, insn, AirOperand::Register(RAX), lhs);
    out.push_back(AirInsn::new(AirOp::UMul, insn.operand_type.clone(), vec![AirOperand::Register(RAX), AirOperand::Register(RAX), rhs]));
    push_move(out, insn, dest, AirOperand::Register(RAX));
    out.push_back(AirInsn::new(AirOp::Blip, insn.operand_type.clone(), vec![AirOperand::Register(RDX)]));
}

fn localize_direct_multiply(out: &mut InsnList, insn: &AirInsn) {
    let place = insn.operands[0].clone();
    let rhs = insn.operands[1].clone();

    push_move(out, insn, AirOperand::Register(RAX), place.clone());
    out.push_back(AirInsn::new(AirOp::DirectMul, insn.operand_type.clone(), vec![AirOperand::Register(RAX), rhs]));
    push_move(out, insn, place, AirOperand::Register(RAX));
    out.push_back(AirInsn::new(AirOp::Blip, insn.operand_type.clone(), vec![AirOperand::Register(RDX)]));
}

/// Variable-count shifts need the count in CL; constant counts need nothing.
fn localize_shift(out: &mut InsnList, insn: &AirInsn, count_index: usize) {
    match &insn.operands[count_index] {
        AirOperand::IntegerConstant(n) if *n <= 0xFF => {
            out.push_back(insn.clone());
        }
        count_operand => {
            let count_operand = count_operand.clone();
            push_move(out, insn, AirOperand::Register(RCX), count_operand);
            let mut rewritten = insn.clone();
            rewritten.operands[count_index] = AirOperand::Register(RCX);
            out.push_back(rewritten);
        }
    }
}

/// `setcc` only ever writes the destination's low byte; the upper bytes may
/// still hold whatever the register held before, so mask them off.
fn localize_comparison(out: &mut InsnList, insn: &AirInsn) {
    let dest = insn.operands[0].clone();
    out.push_back(insn.clone());
    out.push_back(AirInsn::new(AirOp::DirectBitAnd, insn.operand_type.clone(), vec![dest, AirOperand::IntegerConstant(1)]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{CType, Kind};

    fn int_insn(op: AirOp, operands: Vec<AirOperand>) -> AirInsn {
        AirInsn::new(op, CType::basic(Kind::Int), operands)
    }

    #[test]
    fn division_moves_dividend_into_rax_and_zeroes_rdx() {
        let mut list = InsnList::new();
        list.push_back(int_insn(AirOp::Div, vec![AirOperand::Register(10), AirOperand::Register(11), AirOperand::Register(12)]));
        let localized = localize_fixed_ops(list);
        let ops: Vec<&AirInsn> = localized.iter().map(|(_, i)| i).collect();
        assert_eq!(ops[0].op, AirOp::Load);
        assert_eq!(ops[0].operands[0], AirOperand::Register(RAX));
        assert_eq!(ops[1].operands[0], AirOperand::Register(RDX));
        assert_eq!(ops[2].op, AirOp::Div);
        assert_eq!(ops[2].operands[0], AirOperand::Register(RAX));
        assert_eq!(ops[3].operands[0], AirOperand::Register(10));
    }

    #[test]
    fn modulo_reads_back_from_rdx() {
        let mut list = InsnList::new();
        list.push_back(int_insn(AirOp::Mod, vec![AirOperand::Register(10), AirOperand::Register(11), AirOperand::Register(12)]));
        let localized = localize_fixed_ops(list);
        let ops: Vec<&AirInsn> = localized.iter().map(|(_, i)| i).collect();
        assert_eq!(ops[2].operands[0], AirOperand::Register(RDX));
        assert_eq!(ops[3].operands[1], AirOperand::Register(RDX));
    }

    #[test]
    fn constant_shift_count_is_left_untouched() {
        let mut list = InsnList::new();
        list.push_back(int_insn(AirOp::Shl, vec![AirOperand::Register(1), AirOperand::Register(2), AirOperand::IntegerConstant(3)]));
        let localized = localize_fixed_ops(list);
        assert_eq!(localized.iter().count(), 1);
    }

    #[test]
    fn register_shift_count_is_moved_into_cl() {
        let mut list = InsnList::new();
        list.push_back(int_insn(AirOp::Shl, vec![AirOperand::Register(1), AirOperand::Register(2), AirOperand::Register(9)]));
        let localized = localize_fixed_ops(list);
        let ops: Vec<&AirInsn> = localized.iter().map(|(_, i)| i).collect();
        assert_eq!(ops[0].operands[0], AirOperand::Register(RCX));
        assert_eq!(ops[1].operands[2], AirOperand::Register(RCX));
    }

    #[test]
    fn comparison_gets_a_trailing_mask() {
        let mut list = InsnList::new();
        list.push_back(int_insn(AirOp::CmpEq, vec![AirOperand::Register(1), AirOperand::Register(2), AirOperand::Register(3)]));
        let localized = localize_fixed_ops(list);
        let ops: Vec<&AirInsn> = localized.iter().map(|(_, i)| i).collect();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1].op, AirOp::DirectBitAnd);
        assert_eq!(ops[1].operands[1], AirOperand::IntegerConstant(1));
    }
}
