//! x86-64 System V ABI localization (§4.5): the pass that turns
//! architecture-neutral AIR into AIR whose register and stack placements
//! already match what the target machine's calling convention demands,
//! ready for straight-line instruction selection.

pub mod call;
pub mod classify;
pub mod fixed_ops;
pub mod phi;
pub mod prologue;
pub mod regs;

pub use classify::{classify, EightbyteClass};

use crate::air::module::{AirModule, Locale};

/// Localizes every routine of `module` in place and marks it as targeting
/// x86-64, mirroring `localize_x86_64`'s routine loop: prologue first (it
/// needs the routine's original symbol-addressed parameter references
/// intact), then phi removal so every later pass only ever sees
/// single-definition vregs, then the ABI-specific fixups.
pub fn localize_module(module: &mut AirModule) {
    for routine in &mut module.routines {
        let prologue = prologue::build_prologue(routine, &routine.param_names.clone());
        let body = std::mem::replace(&mut routine.insns, crate::air::insn::InsnList::new());
        let body = phi::remove_phis(body);
        let body = call::localize_calls(body);
        let body = fixed_ops::localize_fixed_ops(body);
        let body = prologue::localize_returns(routine, body);
        routine.insns = prologue::prepend(prologue, body);
    }
    module.locale = Locale::X86_64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::air::insn::{AirInsn, AirOp, AirOperand};
    use crate::air::module::AirRoutine;
    use crate::common::types::{CType, Kind};

    #[test]
    fn localizing_a_module_marks_its_locale_as_x86_64() {
        let mut module = AirModule::new(Locale::Neutral);
        let mut routine = AirRoutine::new("identity", CType::basic(Kind::Int), vec![CType::basic(Kind::Int)]);
        routine.param_names = vec!["x".into()];
        routine.insns.push_back(AirInsn::new(AirOp::Load, CType::basic(Kind::Int), vec![AirOperand::Register(40), AirOperand::Symbol("x".into())]));
        routine.insns.push_back(AirInsn::new(AirOp::Return, CType::basic(Kind::Int), vec![AirOperand::Register(40)]));
        module.push_routine(routine);

        localize_module(&mut module);

        assert_eq!(module.locale, Locale::X86_64);
        let ops: Vec<&AirOp> = module.routines[0].insns.iter().map(|(_, i)| &i.op).collect();
        assert!(ops.contains(&&AirOp::Declare));
        assert!(ops.contains(&&AirOp::Return));
    }
}
