//! The AST arena this crate consumes (§6 "Inbound collaborators": the
//! parser/symbol table provide this shape). The lexer, preprocessor, and
//! parser that actually build one of these are out of scope (§1); this
//! module only defines the node shapes the analyzer, constant evaluator,
//! and lowerer are syntax-directed over.
//!
//! Nodes are stored in a flat arena and referenced by [`AstRef`] handles
//! (§9 "cyclic AST references") rather than owned trees, so that a child
//! can be visited from multiple places (e.g. a declarator's array-length
//! expression is both part of the type and independently constant-folded)
//! without fighting the borrow checker.

use crate::common::source::Span;
use crate::common::types::{AstRef, CType, Qualifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    BitNot,
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    None,
    Auto,
    Register,
    Static,
    Extern,
    Typedef,
}

/// One piece of a declarator chain, applied outermost-first during type
/// construction (§4.1): `int *(*f)(int)[3]` is a `Function` piece wrapping a
/// `Pointer` piece wrapping... peeled innermost-to-outermost from the
/// parser's nesting, then applied in that order by the type constructor.
#[derive(Debug, Clone)]
pub enum DeclaratorPiece {
    Pointer(Qualifiers),
    Array { size_expr: Option<AstRef>, unspecified: bool },
    Function { params: Vec<ParamDecl>, variadic: bool },
}

#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub specifiers: Vec<Specifier>,
    pub name: Option<String>,
    pub pieces: Vec<DeclaratorPiece>,
    pub span: Span,
}

/// A raw declaration-specifier token, counted by the type constructor's
/// table-driven matcher (§4.1) rather than pre-interpreted here.
#[derive(Debug, Clone)]
pub enum Specifier {
    Void,
    Char,
    Short,
    Int,
    Long,
    Signed,
    Unsigned,
    Float,
    Double,
    Bool,
    Complex,
    Imaginary,
    Struct(AstRef),
    Union(AstRef),
    Enum(AstRef),
    TypedefName(String),
    Qualifier(Qualifiers),
    Storage(StorageClass),
    Inline,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub specifiers: Vec<Specifier>,
    pub name: Option<String>,
    pub pieces: Vec<DeclaratorPiece>,
    pub bitfield: Option<AstRef>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructSpecifierNode {
    pub tag: Option<String>,
    pub is_union: bool,
    pub fields: Option<Vec<FieldDecl>>,
}

#[derive(Debug, Clone)]
pub struct EnumSpecifierNode {
    pub tag: Option<String>,
    pub enumerators: Option<Vec<(String, Option<AstRef>, Span)>>,
}

/// A (possibly nested) initializer: either a single expression or a braced
/// list of (designation, initializer) pairs (§4.3 static initializers).
#[derive(Debug, Clone)]
pub enum Initializer {
    Expr(AstRef),
    List(Vec<(Vec<Designator>, Initializer)>),
}

#[derive(Debug, Clone)]
pub enum Designator {
    Index(AstRef),
    Member(String),
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLiteral(i64, CType),
    CharLiteral(i64),
    FloatLiteral(f64, CType),
    StringLiteral(Vec<u8>),
    Identifier(String),
    Subscript(AstRef, AstRef),
    Member(AstRef, String),
    Arrow(AstRef, String),
    Call(AstRef, Vec<AstRef>),
    Unary(UnaryOp, AstRef),
    PreIncDec(IncDecOp, AstRef),
    PostIncDec(IncDecOp, AstRef),
    AddrOf(AstRef),
    Deref(AstRef),
    Cast(AstRef, AstRef),
    SizeofExpr(AstRef),
    SizeofType(AstRef),
    Binary(BinOp, AstRef, AstRef),
    Conditional(AstRef, AstRef, AstRef),
    Assign(AssignOp, AstRef, AstRef),
    Comma(AstRef, AstRef),
    CompoundLiteral(AstRef, Initializer),
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Compound(Vec<AstRef>),
    ExprStmt(Option<AstRef>),
    If(AstRef, AstRef, Option<AstRef>),
    While(AstRef, AstRef),
    DoWhile(AstRef, AstRef),
    For(Option<AstRef>, Option<AstRef>, Option<AstRef>, AstRef),
    Return(Option<AstRef>),
    Break,
    Continue,
    Goto(String),
    Label(String, AstRef),
    Switch(AstRef, AstRef),
    Case(AstRef, AstRef),
    Default(AstRef),
    Decl(AstRef),
}

#[derive(Debug, Clone)]
pub struct TypeName {
    pub specifiers: Vec<Specifier>,
    pub pieces: Vec<DeclaratorPiece>,
}

#[derive(Debug, Clone)]
pub struct VarDeclNode {
    pub specifiers: Vec<Specifier>,
    pub name: String,
    pub pieces: Vec<DeclaratorPiece>,
    pub initializer: Option<Initializer>,
}

#[derive(Debug, Clone)]
pub struct FunctionDefNode {
    pub specifiers: Vec<Specifier>,
    pub name: String,
    pub pieces: Vec<DeclaratorPiece>,
    pub body: AstRef,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Expr(ExprKind),
    Stmt(StmtKind),
    TypeName(TypeName),
    StructSpecifier(StructSpecifierNode),
    EnumSpecifier(EnumSpecifierNode),
    VarDecl(VarDeclNode),
    FunctionDef(FunctionDefNode),
    TranslationUnit(Vec<AstRef>),
    /// `_Static_assert(condition, "message")`; the message is optional
    /// since C23 allows a one-argument form.
    StaticAssert(AstRef, Option<String>),
}

/// A single arena node: kind plus sema-filled side channels (`ctype`,
/// `expr_reg`). `ctype` corresponds to §4.3's "assigning `ctype` to every
/// expression"; `expr_reg` is the §4.4 "linearization" field recording an
/// expression's destination virtual register once lowered.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<AstRef>,
    pub ctype: Option<CType>,
    pub expr_reg: Option<u32>,
    pub is_lvalue: bool,
}

/// The AST arena (§9). `AstRef` indices are stable for the arena's lifetime;
/// nodes are never removed, only appended.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn push(&mut self, kind: NodeKind, span: Span) -> AstRef {
        let idx = self.nodes.len() as AstRef;
        self.nodes.push(Node { kind, span, parent: None, ctype: None, expr_reg: None, is_lvalue: false });
        idx
    }

    pub fn set_parent(&mut self, child: AstRef, parent: AstRef) {
        self.nodes[child as usize].parent = Some(parent);
    }

    pub fn get(&self, r: AstRef) -> &Node {
        &self.nodes[r as usize]
    }

    pub fn get_mut(&mut self, r: AstRef) -> &mut Node {
        &mut self.nodes[r as usize]
    }

    pub fn kind(&self, r: AstRef) -> &NodeKind {
        &self.nodes[r as usize].kind
    }

    pub fn ctype(&self, r: AstRef) -> Option<&CType> {
        self.nodes[r as usize].ctype.as_ref()
    }

    pub fn set_ctype(&mut self, r: AstRef, ty: CType) {
        self.nodes[r as usize].ctype = Some(ty);
    }

    pub fn expr(&self, r: AstRef) -> &ExprKind {
        match &self.nodes[r as usize].kind {
            NodeKind::Expr(e) => e,
            _ => panic!("ast node {r} is not an expression"),
        }
    }

    pub fn stmt(&self, r: AstRef) -> &StmtKind {
        match &self.nodes[r as usize].kind {
            NodeKind::Stmt(s) => s,
            _ => panic!("ast node {r} is not a statement"),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
