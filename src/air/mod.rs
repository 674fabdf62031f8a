//! The Abstract Intermediate Representation (§3.3, §3.4, §4.4): a linear
//! three-address virtual-register IR sitting between the analyzed AST and
//! the x86-64 localizer.

pub mod insn;
pub mod lowering;
pub mod module;

pub use insn::{AirInsn, AirOp, AirOperand, InsnList, InsnMetadata, InsnRef, LabelNamespace, Vreg};
pub use lowering::Lowerer;
pub use module::{AirData, AirModule, AirRoutine, Locale, Relocation, PHYSICAL_REGISTER_COUNT};
