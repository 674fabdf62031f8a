//! Phi removal (§4.4, §4.5): the lowerer emits both arms of a short-circuit
//! or conditional expression into the same linear stream and marks their
//! join with a `Phi` instruction naming the two branch-local result
//! registers. Because the branches are mutually exclusive at runtime (each
//! is reached only through its own `Jz`/`Jnz`), coalescing both source
//! registers into the Phi's destination is sound: whichever branch actually
//! ran already computed its result into what becomes the shared register.

use crate::air::insn::{AirOperand, InsnList, Vreg};
use crate::support::map::Map;

/// Rewrites every register operand that names one of a `Phi`'s sources to
/// the `Phi`'s destination, then drops the `Phi` instruction itself.
pub fn remove_phis(list: InsnList) -> InsnList {
    let mut renames: Map<Vreg, Vreg> = Map::new();
    for (_, insn) in list.iter() {
        if insn.op == crate::air::insn::AirOp::Phi {
            let AirOperand::Register(dest) = insn.operands[0] else { continue };
            for source in &insn.operands[1..] {
                if let AirOperand::Register(src) = source {
                    renames.insert(*src, dest);
                }
            }
        }
    }

    let resolve = |mut r: Vreg| {
        // Follow the chain in case a source register was itself later
        // coalesced into another Phi's destination.
        let mut seen = std::collections::HashSet::new();
        while let Some(&next) = renames.get(&r) {
            if !seen.insert(r) {
                break;
            }
            r = next;
        }
        r
    };

    let mut out = InsnList::new();
    for (_, insn) in list.iter() {
        if insn.op == crate::air::insn::AirOp::Phi {
            continue;
        }
        let mut rewritten = insn.clone();
        for operand in &mut rewritten.operands {
            match operand {
                AirOperand::Register(r) => *r = resolve(*r),
                AirOperand::IndirectRegister { base, index, .. } => {
                    *base = resolve(*base);
                    if let Some(idx) = index {
                        *idx = resolve(*idx);
                    }
                }
                _ => {}
            }
        }
        out.push_back(rewritten);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::air::insn::{AirInsn, AirOp};
    use crate::common::types::{CType, Kind};

    #[test]
    fn phi_sources_coalesce_into_its_destination() {
        let ty = CType::basic(Kind::Int);
        let mut list = InsnList::new();
        list.push_back(AirInsn::new(AirOp::Load, ty.clone(), vec![AirOperand::Register(40), AirOperand::IntegerConstant(1)]));
        list.push_back(AirInsn::new(AirOp::Load, ty.clone(), vec![AirOperand::Register(41), AirOperand::IntegerConstant(2)]));
        list.push_back(AirInsn::new(AirOp::Phi, ty.clone(), vec![AirOperand::Register(42), AirOperand::Register(40), AirOperand::Register(41)]));
        list.push_back(AirInsn::new(AirOp::Add, ty, vec![AirOperand::Register(43), AirOperand::Register(42), AirOperand::IntegerConstant(1)]));

        let result = remove_phis(list);
        assert_eq!(result.iter().count(), 3);
        let ops: Vec<&AirInsn> = result.iter().map(|(_, i)| i).collect();
        assert_eq!(ops[0].operands[0], AirOperand::Register(42));
        assert_eq!(ops[1].operands[0], AirOperand::Register(42));
        assert_eq!(ops[2].operands[1], AirOperand::Register(42));
    }
}
