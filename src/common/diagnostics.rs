//! Diagnostic collection (§7: Error Handling Design).
//!
//! Diagnostics accumulate in source order across the analyzer, the constant
//! evaluator, and the lowerer; a `warning = false` entry fails the
//! compilation but never stops the analyzer from collecting more.

use crate::common::source::{SourceLocation, SourceManager, Span};
use thiserror::Error;

/// The taxonomy of §7: constraint violations, unsupported features, and
/// internal invariant failures are distinguished so that callers can choose
/// to keep compiling (the first two accumulate) or abort immediately (the
/// third always indicates a bug in an earlier pass).
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{0}")]
    Constraint(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("internal compiler error: {0}")]
    Internal(String),
}

/// A single diagnostic with source location, mirroring the `{row, col,
/// message, warning}` linked-list record of §4.3/§6.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub span: Span,
    pub message: String,
    pub warning: bool,
    pub notes: Vec<(Span, String)>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self { span, message: message.into(), warning: false, notes: Vec::new() }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self { span, message: message.into(), warning: true, notes: Vec::new() }
    }

    pub fn with_note(mut self, span: Span, message: impl Into<String>) -> Self {
        self.notes.push((span, message.into()));
        self
    }

    pub fn render(&self, sources: &SourceManager) -> String {
        let SourceLocation { row, col } = sources.resolve(self.span);
        let kind = if self.warning { "warning" } else { "error" };
        let mut out = format!("{}:{}: {}: {}", row, col, kind, self.message);
        for (span, note) in &self.notes {
            let loc = sources.resolve(*span);
            out.push_str(&format!("\n{}:{}: note: {}", loc.row, loc.col, note));
        }
        out
    }
}

/// Accumulates diagnostics produced by the analyzer, constant evaluator, and
/// lowerer. Internal invariant failures (§7) are never appended here; they
/// are surfaced directly as a fatal [`CompileError::Internal`] because the
/// lowerer and localizer trust that the analyzer has already rejected
/// ill-typed programs.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: u32,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diag: Diagnostic) {
        if !diag.warning {
            self.error_count += 1;
        }
        log::debug!("diagnostic: {}", diag.message);
        self.diagnostics.push(diag);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn render_all(&self, sources: &SourceManager) -> String {
        self.diagnostics.iter().map(|d| d.render(sources)).collect::<Vec<_>>().join("\n")
    }
}

/// Fatal internal-compiler-error helper (§7: "implementations must surface
/// these as a distinct internal compiler error kind rather than silently
/// miscompile"). Mirrors the source's `report_return` macro.
pub fn ice(message: impl Into<String>) -> CompileError {
    CompileError::Internal(message.into())
}
