//! Semantic analysis and type construction (§4.1–§4.3).
//!
//! Type construction, constant-expression evaluation, and the analyzer
//! itself are implemented as separate `impl Sema` blocks across
//! `type_constructor.rs`, `const_eval.rs`, and `analyzer.rs`, the same way a
//! single mutable context can be split across several files when its
//! methods call into each other (array-length constants need type
//! construction for casts; type construction needs constant evaluation for
//! array lengths and enumerator values) — one struct with its logic spread
//! out, rather than two structs fighting over mutable borrows of the same
//! AST.

pub mod analyzer;
pub mod const_eval;
pub mod type_constructor;

use crate::ast::nodes::Ast;
use crate::ast::symbol::SymbolTable;
use crate::common::diagnostics::DiagnosticEngine;

pub use analyzer::Analyzer;
pub use const_eval::{ConstKind, ConstValue};

/// Shared context for the three subsystems of §4: type construction,
/// constant folding, and the analyzer's per-expression rules.
pub struct Sema {
    pub ast: Ast,
    pub symbols: SymbolTable,
    pub diags: DiagnosticEngine,
}

impl Sema {
    pub fn new(ast: Ast, symbols: SymbolTable) -> Self {
        Self { ast, symbols, diags: DiagnosticEngine::new() }
    }
}
