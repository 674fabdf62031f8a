//! Middle- and back-end of a C compiler: semantic analysis and type
//! construction, lowering to the Abstract Intermediate Representation
//! (AIR), and x86-64 System V ABI localization of that AIR.
//!
//! The lexer, preprocessor, parser, the textual assembly emitter, and CLI
//! wiring are out of scope; this crate picks up once a translation unit has
//! been parsed into an [`ast::Ast`] and hands back AIR ready for a
//! syntax-directed printer to turn into GNU-AS text.

pub mod air;
pub mod ast;
pub mod common;
pub mod localize;
pub mod sema;
pub mod support;

pub use common::diagnostics::{CompileError, Diagnostic, DiagnosticEngine};
pub use sema::Sema;

/// Target instruction-set locale an [`air::AirModule`] is laid out for.
///
/// Re-exported at the crate root since it is the one `air` type a driver
/// needs without reaching into the module tree: "did localization run yet".
pub use air::Locale;

/// Runs semantic analysis, lowers the result to AIR, and localizes that AIR
/// for x86-64, in the order the three subsystems are specified to run.
///
/// `root` is the translation unit's node in `sema.ast`, produced by a parser
/// upstream of this crate. Diagnostics accumulate in `sema.diags` as a side
/// effect; a caller checks [`DiagnosticEngine::has_errors`] on it before
/// trusting the returned module, since a fatal error still leaves behind
/// whatever partial AIR was built before it was raised.
pub fn compile(sema: &mut Sema, root: common::types::AstRef) -> air::AirModule {
    sema::analyzer::Analyzer::run(sema, root);

    let mut lowerer = air::Lowerer::new(Locale::Neutral);
    lowerer.lower_translation_unit(sema, root);
    let mut module = lowerer.module;
    localize::localize_module(&mut module);

    module
}
