//! Generic pre-/post-order AST walk, generalized from `traverse.c`'s
//! `BEFORE`/`AFTER`-dispatched traversal. The source keys a per-`syn->type`
//! callback table and falls back to `default_before`/`default_after`; here
//! the closed node-kind set is a `match`, which gets Rust's exhaustiveness
//! checking in place of the table's fallback case, but the shape — visit,
//! recurse into children, leave — is the same.

use crate::ast::nodes::{Ast, DeclaratorPiece, ExprKind, Initializer, NodeKind, StmtKind};
use crate::common::types::AstRef;

/// Walks every reachable node under `root`, calling `before` on entry and
/// `after` on exit. Array-length and bitfield-width expressions reachable
/// only through a [`CType`](crate::common::types::CType) are not visited —
/// they belong to the type, not the syntax tree, once sema has run.
pub fn walk<B, A>(ast: &Ast, root: AstRef, before: &mut B, after: &mut A)
where
    B: FnMut(&Ast, AstRef),
    A: FnMut(&Ast, AstRef),
{
    before(ast, root);
    match ast.kind(root).clone() {
        NodeKind::Expr(e) => walk_expr(ast, &e, before, after),
        NodeKind::Stmt(s) => walk_stmt(ast, &s, before, after),
        NodeKind::VarDecl(decl) => {
            if let Some(init) = &decl.initializer {
                walk_initializer(ast, init, before, after);
            }
            for piece in &decl.pieces {
                walk_piece(ast, piece, before, after);
            }
        }
        NodeKind::FunctionDef(def) => walk(ast, def.body, before, after),
        NodeKind::TranslationUnit(decls) => {
            for d in decls {
                walk(ast, d, before, after);
            }
        }
        NodeKind::StaticAssert(condition, _) => walk(ast, condition, before, after),
        NodeKind::TypeName(_) | NodeKind::StructSpecifier(_) | NodeKind::EnumSpecifier(_) => {}
    }
    after(ast, root);
}

fn walk_piece<B: FnMut(&Ast, AstRef), A: FnMut(&Ast, AstRef)>(ast: &Ast, piece: &DeclaratorPiece, before: &mut B, after: &mut A) {
    if let DeclaratorPiece::Array { size_expr: Some(e), .. } = piece {
        walk(ast, *e, before, after);
    }
}

fn walk_initializer<B: FnMut(&Ast, AstRef), A: FnMut(&Ast, AstRef)>(ast: &Ast, init: &Initializer, before: &mut B, after: &mut A) {
    match init {
        Initializer::Expr(e) => walk(ast, *e, before, after),
        Initializer::List(items) => {
            for (_, inner) in items {
                walk_initializer(ast, inner, before, after);
            }
        }
    }
}

fn walk_expr<B: FnMut(&Ast, AstRef), A: FnMut(&Ast, AstRef)>(ast: &Ast, e: &ExprKind, before: &mut B, after: &mut A) {
    let mut go = |r: AstRef| walk(ast, r, before, after);
    match e {
        ExprKind::IntLiteral(..) | ExprKind::CharLiteral(..) | ExprKind::FloatLiteral(..) | ExprKind::StringLiteral(..) | ExprKind::Identifier(..) => {}
        ExprKind::Subscript(a, b) => {
            go(*a);
            go(*b);
        }
        ExprKind::Member(a, _) | ExprKind::Arrow(a, _) => go(*a),
        ExprKind::Call(callee, args) => {
            go(*callee);
            for a in args {
                go(*a);
            }
        }
        ExprKind::Unary(_, a) | ExprKind::PreIncDec(_, a) | ExprKind::PostIncDec(_, a) | ExprKind::AddrOf(a) | ExprKind::Deref(a) => go(*a),
        ExprKind::Cast(_, a) | ExprKind::SizeofExpr(a) => go(*a),
        ExprKind::SizeofType(_) => {}
        ExprKind::Binary(_, a, b) | ExprKind::Assign(_, a, b) | ExprKind::Comma(a, b) => {
            go(*a);
            go(*b);
        }
        ExprKind::Conditional(a, b, c) => {
            go(*a);
            go(*b);
            go(*c);
        }
        ExprKind::CompoundLiteral(_, init) => walk_initializer(ast, init, before, after),
    }
}

fn walk_stmt<B: FnMut(&Ast, AstRef), A: FnMut(&Ast, AstRef)>(ast: &Ast, s: &StmtKind, before: &mut B, after: &mut A) {
    let mut go = |r: AstRef| walk(ast, r, before, after);
    match s {
        StmtKind::Compound(items) => {
            for item in items {
                go(*item);
            }
        }
        StmtKind::ExprStmt(e) => {
            if let Some(e) = e {
                go(*e);
            }
        }
        StmtKind::If(cond, then, els) => {
            go(*cond);
            go(*then);
            if let Some(els) = els {
                go(*els);
            }
        }
        StmtKind::While(cond, body) | StmtKind::DoWhile(cond, body) => {
            go(*cond);
            go(*body);
        }
        StmtKind::For(init, cond, step, body) => {
            if let Some(init) = init {
                go(*init);
            }
            if let Some(cond) = cond {
                go(*cond);
            }
            if let Some(step) = step {
                go(*step);
            }
            go(*body);
        }
        StmtKind::Return(e) => {
            if let Some(e) = e {
                go(*e);
            }
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Goto(_) => {}
        StmtKind::Label(_, inner) => go(*inner),
        StmtKind::Switch(subject, body) => {
            go(*subject);
            go(*body);
        }
        StmtKind::Case(value, inner) => {
            go(*value);
            go(*inner);
        }
        StmtKind::Default(inner) => go(*inner),
        StmtKind::Decl(d) => go(*d),
    }
}

/// Collects `(label_name, span)` for every `Label` statement and every
/// `goto` target under `root`, for the analyzer's unresolved-label check
/// (§4.3, ISO §6.8.6.1: "the identifier in a goto statement shall name a
/// label located somewhere in the enclosing function").
pub fn collect_labels_and_gotos(ast: &Ast, root: AstRef) -> (Vec<String>, Vec<(String, AstRef)>) {
    let mut labels = Vec::new();
    let mut gotos = Vec::new();
    walk(
        ast,
        root,
        &mut |ast, r| match ast.kind(r) {
            NodeKind::Stmt(StmtKind::Label(name, _)) => labels.push(name.clone()),
            NodeKind::Stmt(StmtKind::Goto(name)) => gotos.push((name.clone(), r)),
            _ => {}
        },
        &mut |_, _| {},
    );
    (labels, gotos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::source::Span;

    fn push(ast: &mut Ast, kind: NodeKind) -> AstRef {
        ast.push(kind, Span::dummy())
    }

    #[test]
    fn finds_a_goto_with_no_matching_label() {
        let mut ast = Ast::new();
        let goto = push(&mut ast, NodeKind::Stmt(StmtKind::Goto("done".into())));
        let body = push(&mut ast, NodeKind::Stmt(StmtKind::Compound(vec![goto])));
        let (labels, gotos) = collect_labels_and_gotos(&ast, body);
        assert!(labels.is_empty());
        assert_eq!(gotos.len(), 1);
        assert_eq!(gotos[0].0, "done");
    }

    #[test]
    fn matches_a_goto_against_its_label() {
        let mut ast = Ast::new();
        let target = push(&mut ast, NodeKind::Stmt(StmtKind::ExprStmt(None)));
        let label = push(&mut ast, NodeKind::Stmt(StmtKind::Label("done".into(), target)));
        let goto = push(&mut ast, NodeKind::Stmt(StmtKind::Goto("done".into())));
        let body = push(&mut ast, NodeKind::Stmt(StmtKind::Compound(vec![label, goto])));
        let (labels, gotos) = collect_labels_and_gotos(&ast, body);
        assert!(gotos.iter().all(|(name, _)| labels.contains(name)));
    }
}
