//! Constant expression evaluation (§3.2, §4.2).
//!
//! Mirrors `constexpr.c`'s `evaluate_constant_expression`, which takes a
//! `ce_kind_t` and returns a bit pattern reinterpreted per the result type.
//! Per §9's design note on sum types being this target's correctness asset,
//! the Rust port returns a [`ConstValue`] enum instead of a raw
//! `unsigned long long` + out-parameter.

use super::Sema;
use crate::ast::nodes::{BinOp, ExprKind, UnaryOp};
use crate::ast::symbol::{Namespace, StorageDuration};
use crate::common::diagnostics::Diagnostic;
use crate::common::types::{AstRef, CType, Kind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstKind {
    Integer,
    Arithmetic,
    Address,
}

/// Bit-accurate storage for an arithmetic constant: integers are kept as
/// the full 64-bit pattern (truncated/extended per the concrete type on
/// conversion), floats as `f64` (the subset of long-double arithmetic this
/// crate supports per §9 open question 2 neighbor: long-double beyond basic
/// conversion is unsupported and diagnosed, not silently narrowed).
#[derive(Debug, Clone, Copy)]
pub enum Bits {
    Int(u64),
    Float(f64),
}

#[derive(Debug, Clone)]
pub enum ConstValue {
    Integer { value: u64, ty: CType },
    Arithmetic { bits: Bits, ty: CType },
    Address { symbol: Option<String>, offset: i64, ty: CType },
    /// A failed evaluation: the type is always [`CType::error`]; the
    /// message is the first failing sub-evaluation's diagnostic (§4.2).
    Error { message: String },
}

impl ConstValue {
    pub fn ty(&self) -> CType {
        match self {
            ConstValue::Integer { ty, .. } => ty.clone(),
            ConstValue::Arithmetic { ty, .. } => ty.clone(),
            ConstValue::Address { ty, .. } => ty.clone(),
            ConstValue::Error { .. } => CType::error(),
        }
    }

    pub fn succeeded(&self) -> bool {
        !matches!(self, ConstValue::Error { .. })
    }

    fn err(msg: impl Into<String>) -> Self {
        ConstValue::Error { message: msg.into() }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            ConstValue::Integer { value, .. } => Some(*value as i64),
            ConstValue::Arithmetic { bits: Bits::Int(v), .. } => Some(*v as i64),
            ConstValue::Arithmetic { bits: Bits::Float(f), .. } => Some(*f as i64),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            ConstValue::Integer { value, ty } => Some(if ty.is_signed() { *value as i64 as f64 } else { *value as f64 }),
            ConstValue::Arithmetic { bits: Bits::Float(f), .. } => Some(*f),
            ConstValue::Arithmetic { bits: Bits::Int(v), ty } => Some(if ty.is_signed() { *v as i64 as f64 } else { *v as f64 }),
            _ => None,
        }
    }
}

/// Rank used for the usual arithmetic conversions (§4.2), highest wins.
fn rank(kind: &Kind) -> u32 {
    match kind {
        Kind::Bool => 0,
        Kind::Char | Kind::SignedChar | Kind::UnsignedChar => 1,
        Kind::Short | Kind::UShort => 2,
        Kind::Int | Kind::UInt | Kind::Enum(_) => 3,
        Kind::Long | Kind::ULong => 4,
        Kind::LongLong | Kind::ULongLong => 5,
        Kind::Float => 6,
        Kind::Double => 7,
        Kind::LongDouble => 8,
        _ => 3,
    }
}

fn is_unsigned_kind(kind: &Kind) -> bool {
    matches!(kind, Kind::UnsignedChar | Kind::UShort | Kind::UInt | Kind::ULong | Kind::ULongLong | Kind::Bool)
}

/// The usual arithmetic conversions' common type (§4.2): integer promotion
/// then widest-rank-wins, same-rank-prefers-unsigned.
pub fn usual_arithmetic_conversion(a: &CType, b: &CType) -> CType {
    let a = promote(a);
    let b = promote(b);
    if a.is_real_float() || b.is_real_float() {
        return if rank(&a.kind) >= rank(&b.kind) { a } else { b };
    }
    let (ra, rb) = (rank(&a.kind), rank(&b.kind));
    if ra == rb {
        return if is_unsigned_kind(&a.kind) { a } else { b };
    }
    let (wider, narrower) = if ra > rb { (a, b) } else { (b, a) };
    if is_unsigned_kind(&wider.kind) || !is_unsigned_kind(&narrower.kind) {
        wider
    } else {
        // Narrower is signed, wider unsigned rank below narrower's max value
        // representable: for the integer widths used here (<=8 bytes) the
        // wider signed type always represents every value of a narrower
        // unsigned type at strictly lower rank, so signed wins (ISO §6.3.1.8).
        wider
    }
}

/// Integer promotions: anything narrower than `int` promotes to `int` (or
/// `unsigned int` if `int` can't represent all its values — never the case
/// for the types modeled here since `int` is 4 bytes and nothing narrower
/// than that is unsigned-incompatible).
fn promote(ty: &CType) -> CType {
    match ty.kind {
        Kind::Bool | Kind::Char | Kind::SignedChar | Kind::UnsignedChar | Kind::Short | Kind::UShort | Kind::Enum(_) => {
            CType::basic(Kind::Int)
        }
        _ => ty.clone(),
    }
}

fn bits_for(kind: &Kind) -> u32 {
    match kind {
        Kind::Bool | Kind::Char | Kind::SignedChar | Kind::UnsignedChar => 8,
        Kind::Short | Kind::UShort => 16,
        Kind::Int | Kind::UInt | Kind::Enum(_) => 32,
        _ => 64,
    }
}

/// Truncate/sign-or-zero-extend an integer bit pattern to `ty`'s width
/// (§4.2: "integer types convert by truncation/sign-or-zero extension").
pub fn convert_int_bits(value: u64, ty: &CType) -> u64 {
    let bits = bits_for(&ty.kind);
    if bits >= 64 {
        return value;
    }
    let mask = (1u64 << bits) - 1;
    let truncated = value & mask;
    if is_unsigned_kind(&ty.kind) || bits == 64 {
        truncated
    } else {
        let sign_bit = 1u64 << (bits - 1);
        if truncated & sign_bit != 0 {
            truncated | !mask
        } else {
            truncated
        }
    }
}

impl Sema {
    /// `evaluate(kind, expr) -> ConstExpr` (§4.2).
    pub fn evaluate(&mut self, kind: ConstKind, expr: AstRef) -> ConstValue {
        let span = self.ast.get(expr).span;
        let result = match self.ast.expr(expr).clone() {
            ExprKind::IntLiteral(v, ty) => ConstValue::Integer { value: v as u64, ty },
            ExprKind::CharLiteral(v) => ConstValue::Integer { value: v as u64, ty: CType::basic(Kind::Int) },
            ExprKind::FloatLiteral(v, ty) => ConstValue::Arithmetic { bits: Bits::Float(v), ty },
            ExprKind::Unary(UnaryOp::Plus, inner) => self.evaluate(kind, inner),
            ExprKind::Unary(UnaryOp::Neg, inner) => self.eval_neg(kind, inner),
            ExprKind::Unary(UnaryOp::BitNot, inner) => self.eval_bitnot(kind, inner),
            ExprKind::Unary(UnaryOp::LogicalNot, inner) => self.eval_lognot(kind, inner),
            ExprKind::Binary(BinOp::LogicalAnd, lhs, rhs) => self.eval_logical(kind, lhs, rhs, true),
            ExprKind::Binary(BinOp::LogicalOr, lhs, rhs) => self.eval_logical(kind, lhs, rhs, false),
            ExprKind::Binary(op, lhs, rhs) => self.eval_binary(kind, op, lhs, rhs),
            ExprKind::Conditional(cond, then, els) => self.eval_conditional(kind, cond, then, els),
            ExprKind::Cast(type_name, inner) => self.eval_cast(kind, type_name, inner),
            ExprKind::SizeofType(type_name) => self.eval_sizeof_type(type_name, span),
            ExprKind::SizeofExpr(inner) => self.eval_sizeof_expr(inner, span),
            ExprKind::AddrOf(inner) => self.eval_address(inner, span),
            ExprKind::Identifier(name) => match self.symbols.lookup(&Namespace::Ordinary, &name).and_then(|s| s.enum_value) {
                Some(value) => ConstValue::Integer { value: value as u64, ty: CType::basic(Kind::Int) },
                None => self.eval_identifier_address(&name, span),
            },
            ExprKind::Subscript(base, index) => self.eval_subscript_address(base, index, span),
            ExprKind::Member(base, ref field) => self.eval_member_address(base, field, span),
            ExprKind::Arrow(base, ref field) => self.eval_arrow_address(base, field, span),
            _ => ConstValue::err(format!("expression is not a constant expression ({span:?})")),
        };
        self.constrain(kind, result, span)
    }

    fn constrain(&mut self, kind: ConstKind, value: ConstValue, span: crate::common::source::Span) -> ConstValue {
        if let ConstValue::Error { message } = &value {
            self.diags.emit(Diagnostic::error(message.clone(), span));
            return value;
        }
        match kind {
            ConstKind::Integer => {
                if !value.ty().is_integer() {
                    let msg = "constant expression must have integer type".to_string();
                    self.diags.emit(Diagnostic::error(msg.clone(), span));
                    return ConstValue::err(msg);
                }
            }
            ConstKind::Arithmetic => {
                if !value.ty().is_arithmetic() {
                    let msg = "constant expression must have arithmetic type".to_string();
                    self.diags.emit(Diagnostic::error(msg.clone(), span));
                    return ConstValue::err(msg);
                }
            }
            ConstKind::Address => {
                if !matches!(value, ConstValue::Address { .. }) {
                    let msg = "constant expression must be an address constant".to_string();
                    self.diags.emit(Diagnostic::error(msg.clone(), span));
                    return ConstValue::err(msg);
                }
            }
        }
        value
    }

    fn eval_neg(&mut self, kind: ConstKind, inner: AstRef) -> ConstValue {
        match self.evaluate(kind, inner) {
            ConstValue::Integer { value, ty } => ConstValue::Integer { value: convert_int_bits(value.wrapping_neg(), &ty), ty },
            ConstValue::Arithmetic { bits: Bits::Int(v), ty } => {
                ConstValue::Arithmetic { bits: Bits::Int(convert_int_bits(v.wrapping_neg(), &ty)), ty }
            }
            ConstValue::Arithmetic { bits: Bits::Float(f), ty } => ConstValue::Arithmetic { bits: Bits::Float(-f), ty },
            other => other,
        }
    }

    fn eval_bitnot(&mut self, kind: ConstKind, inner: AstRef) -> ConstValue {
        match self.evaluate(kind, inner) {
            ConstValue::Integer { value, ty } => ConstValue::Integer { value: convert_int_bits(!value, &ty), ty },
            other @ ConstValue::Error { .. } => other,
            _ => ConstValue::err("operand of '~' must have integer type"),
        }
    }

    fn eval_lognot(&mut self, kind: ConstKind, inner: AstRef) -> ConstValue {
        let v = self.evaluate(ConstKind::Arithmetic, inner);
        if !v.succeeded() {
            return v;
        }
        let truthy = v.as_f64().unwrap_or(0.0) != 0.0;
        let value = if truthy { 0u64 } else { 1u64 };
        let _ = kind;
        ConstValue::Integer { value, ty: CType::basic(Kind::Int) }
    }

    fn eval_logical(&mut self, _kind: ConstKind, lhs: AstRef, rhs: AstRef, is_and: bool) -> ConstValue {
        let l = self.evaluate(ConstKind::Arithmetic, lhs);
        if !l.succeeded() {
            return l;
        }
        let lt = l.as_f64().unwrap_or(0.0) != 0.0;
        // Short-circuit (§4.2): only evaluate the chosen branch.
        if is_and && !lt {
            return ConstValue::Integer { value: 0, ty: CType::basic(Kind::Int) };
        }
        if !is_and && lt {
            return ConstValue::Integer { value: 1, ty: CType::basic(Kind::Int) };
        }
        let r = self.evaluate(ConstKind::Arithmetic, rhs);
        if !r.succeeded() {
            return r;
        }
        let rt = r.as_f64().unwrap_or(0.0) != 0.0;
        ConstValue::Integer { value: if rt { 1 } else { 0 }, ty: CType::basic(Kind::Int) }
    }

    fn eval_binary(&mut self, kind: ConstKind, op: BinOp, lhs: AstRef, rhs: AstRef) -> ConstValue {
        let l = self.evaluate(kind, lhs);
        if !l.succeeded() {
            return l;
        }
        let r = self.evaluate(kind, rhs);
        if !r.succeeded() {
            return r;
        }
        let common = usual_arithmetic_conversion(&l.ty(), &r.ty());
        if common.is_real_float() {
            let (Some(lf), Some(rf)) = (l.as_f64(), r.as_f64()) else {
                return ConstValue::err("operands of arithmetic operator must be arithmetic");
            };
            let result = match op {
                BinOp::Add => lf + rf,
                BinOp::Sub => lf - rf,
                BinOp::Mul => lf * rf,
                BinOp::Div => lf / rf,
                BinOp::Lt => return ConstValue::Integer { value: (lf < rf) as u64, ty: CType::basic(Kind::Int) },
                BinOp::Gt => return ConstValue::Integer { value: (lf > rf) as u64, ty: CType::basic(Kind::Int) },
                BinOp::Le => return ConstValue::Integer { value: (lf <= rf) as u64, ty: CType::basic(Kind::Int) },
                BinOp::Ge => return ConstValue::Integer { value: (lf >= rf) as u64, ty: CType::basic(Kind::Int) },
                BinOp::Eq => return ConstValue::Integer { value: (lf == rf) as u64, ty: CType::basic(Kind::Int) },
                BinOp::Ne => return ConstValue::Integer { value: (lf != rf) as u64, ty: CType::basic(Kind::Int) },
                _ => return ConstValue::err("operator not valid on floating operands"),
            };
            return ConstValue::Arithmetic { bits: Bits::Float(result), ty: common };
        }
        let (Some(li), Some(ri)) = (l.as_i64(), r.as_i64()) else {
            return ConstValue::err("operands of arithmetic operator must be arithmetic");
        };
        let (lu, ru) = (li as u64, ri as u64);
        let unsigned = is_unsigned_kind(&common.kind);
        let result: u64 = match op {
            BinOp::Add => lu.wrapping_add(ru),
            BinOp::Sub => lu.wrapping_sub(ru),
            BinOp::Mul => lu.wrapping_mul(ru),
            BinOp::Div => {
                if ri == 0 {
                    return ConstValue::err("division by zero in constant expression");
                }
                if unsigned { lu.wrapping_div(ru) } else { (li.wrapping_div(ri)) as u64 }
            }
            BinOp::Mod => {
                if ri == 0 {
                    return ConstValue::err("division by zero in constant expression");
                }
                if unsigned { lu.wrapping_rem(ru) } else { (li.wrapping_rem(ri)) as u64 }
            }
            BinOp::BitAnd => lu & ru,
            BinOp::BitOr => lu | ru,
            BinOp::BitXor => lu ^ ru,
            BinOp::Shl => lu.wrapping_shl(ru as u32),
            BinOp::Shr => {
                if unsigned { lu.wrapping_shr(ru as u32) } else { (li.wrapping_shr(ru as u32)) as u64 }
            }
            BinOp::Lt => return ConstValue::Integer { value: (if unsigned { lu < ru } else { li < ri }) as u64, ty: CType::basic(Kind::Int) },
            BinOp::Gt => return ConstValue::Integer { value: (if unsigned { lu > ru } else { li > ri }) as u64, ty: CType::basic(Kind::Int) },
            BinOp::Le => return ConstValue::Integer { value: (if unsigned { lu <= ru } else { li <= ri }) as u64, ty: CType::basic(Kind::Int) },
            BinOp::Ge => return ConstValue::Integer { value: (if unsigned { lu >= ru } else { li >= ri }) as u64, ty: CType::basic(Kind::Int) },
            BinOp::Eq => return ConstValue::Integer { value: (lu == ru) as u64, ty: CType::basic(Kind::Int) },
            BinOp::Ne => return ConstValue::Integer { value: (lu != ru) as u64, ty: CType::basic(Kind::Int) },
            BinOp::LogicalAnd | BinOp::LogicalOr => unreachable!("handled by eval_logical"),
        };
        let value = convert_int_bits(result, &common);
        if kind == ConstKind::Integer {
            ConstValue::Integer { value, ty: common }
        } else {
            ConstValue::Arithmetic { bits: Bits::Int(value), ty: common }
        }
    }

    fn eval_conditional(&mut self, kind: ConstKind, cond: AstRef, then: AstRef, els: AstRef) -> ConstValue {
        let c = self.evaluate(ConstKind::Arithmetic, cond);
        if !c.succeeded() {
            return c;
        }
        let truthy = c.as_f64().unwrap_or(0.0) != 0.0;
        // Evaluate only the chosen branch (§4.2).
        if truthy {
            self.evaluate(kind, then)
        } else {
            self.evaluate(kind, els)
        }
    }

    fn eval_cast(&mut self, kind: ConstKind, type_name: AstRef, inner: AstRef) -> ConstValue {
        let target = self.type_name_to_ctype(type_name);
        if target.is_error() {
            return ConstValue::err("cast to undefined type");
        }
        // §4.2 Integer kind rejects floating operands "except when they are
        // the immediate operand of a cast to an integer type".
        let source_kind = if target.is_pointer() { ConstKind::Address } else { ConstKind::Arithmetic };
        let value = self.evaluate(source_kind, inner);
        if !value.succeeded() {
            // Retry as address cast: `(T*) integer-constant`.
            let as_int = self.evaluate(ConstKind::Integer, inner);
            if target.is_pointer() && as_int.succeeded() {
                let offset = as_int.as_i64().unwrap_or(0);
                return ConstValue::Address { symbol: None, offset, ty: target };
            }
            return value;
        }
        if target.is_pointer() {
            return match value {
                ConstValue::Address { symbol, offset, .. } => ConstValue::Address { symbol, offset, ty: target },
                _ => {
                    let offset = value.as_i64().unwrap_or(0);
                    ConstValue::Address { symbol: None, offset, ty: target }
                }
            };
        }
        if target.is_real_float() {
            let f = value.as_f64().unwrap_or(0.0);
            return ConstValue::Arithmetic { bits: Bits::Float(f), ty: target };
        }
        let i = value.as_i64().unwrap_or(0) as u64;
        let converted = convert_int_bits(i, &target);
        if kind == ConstKind::Integer {
            ConstValue::Integer { value: converted, ty: target }
        } else {
            ConstValue::Arithmetic { bits: Bits::Int(converted), ty: target }
        }
    }

    fn eval_sizeof_type(&mut self, type_name: AstRef, span: crate::common::source::Span) -> ConstValue {
        let ty = self.type_name_to_ctype(type_name);
        match ty.size() {
            Some(sz) => ConstValue::Integer { value: sz, ty: CType::basic(Kind::ULong) },
            // §9 open question 2: VLA sizeof is not evaluated, returns an
            // error marker rather than a guessed size.
            None => {
                self.diags.emit(Diagnostic::error("sizeof applied to an incomplete or variably-modified type", span));
                ConstValue::err("sizeof of incomplete/VLA type")
            }
        }
    }

    fn eval_sizeof_expr(&mut self, inner: AstRef, span: crate::common::source::Span) -> ConstValue {
        match self.ast.ctype(inner).cloned() {
            Some(ty) => match ty.size() {
                Some(sz) => ConstValue::Integer { value: sz, ty: CType::basic(Kind::ULong) },
                None => {
                    self.diags.emit(Diagnostic::error("sizeof applied to an incomplete or variably-modified type", span));
                    ConstValue::err("sizeof of incomplete/VLA type")
                }
            },
            None => ConstValue::err("sizeof operand has no resolved type (analyzer must run first)"),
        }
    }

    fn eval_address(&mut self, inner: AstRef, span: crate::common::source::Span) -> ConstValue {
        match self.ast.expr(inner).clone() {
            ExprKind::Identifier(name) => self.eval_identifier_address(&name, span),
            ExprKind::StringLiteral(bytes) => ConstValue::Address { symbol: Some(format!(".Lstr.{}", bytes.len())), offset: 0, ty: CType::pointer_to(CType::basic(Kind::Char)) },
            ExprKind::Subscript(base, index) => self.eval_subscript_address(base, index, span),
            ExprKind::Member(base, ref field) => self.eval_member_address(base, field, span),
            ExprKind::Arrow(base, ref field) => self.eval_arrow_address(base, field, span),
            ExprKind::Deref(ptr) => self.evaluate(ConstKind::Address, ptr),
            _ => ConstValue::err("cannot take the address of this expression in a constant expression"),
        }
    }

    fn eval_identifier_address(&mut self, name: &str, span: crate::common::source::Span) -> ConstValue {
        match self.symbols.lookup(&Namespace::Ordinary, name) {
            Some(sym) if sym.storage_duration == StorageDuration::Static => {
                let pointee = sym.ty.clone();
                ConstValue::Address { symbol: Some(sym.name.clone()), offset: 0, ty: CType::pointer_to(pointee) }
            }
            Some(_) => ConstValue::err(format!("'{name}' does not have static storage duration")),
            None => {
                self.diags.emit(Diagnostic::error(format!("use of undeclared identifier '{name}'"), span));
                ConstValue::err(format!("undeclared identifier '{name}'"))
            }
        }
    }

    fn eval_subscript_address(&mut self, base: AstRef, index: AstRef, span: crate::common::source::Span) -> ConstValue {
        let base_addr = self.evaluate(ConstKind::Address, base);
        let ConstValue::Address { symbol, offset, ty } = base_addr else { return base_addr };
        let idx = self.evaluate(ConstKind::Integer, index);
        let Some(i) = idx.as_i64() else { return idx };
        let Some(elem) = ty.pointee() else {
            self.diags.emit(Diagnostic::error("subscript of non-array/pointer constant", span));
            return ConstValue::err("subscript of non-array/pointer constant");
        };
        let Some(elem_size) = elem.size() else {
            return ConstValue::err("subscript element type has unknown size");
        };
        let elem_ty = elem.clone();
        ConstValue::Address { symbol, offset: offset + i * elem_size as i64, ty: CType::pointer_to(elem_ty) }
    }

    fn eval_member_address(&mut self, base: AstRef, field: &str, span: crate::common::source::Span) -> ConstValue {
        let base_addr = self.eval_address(base, span);
        self.offset_member(base_addr, field, span)
    }

    fn eval_arrow_address(&mut self, base: AstRef, field: &str, span: crate::common::source::Span) -> ConstValue {
        let base_addr = self.evaluate(ConstKind::Address, base);
        self.offset_member(base_addr, field, span)
    }

    fn offset_member(&mut self, base_addr: ConstValue, field: &str, span: crate::common::source::Span) -> ConstValue {
        let ConstValue::Address { symbol, offset, ty } = base_addr else { return base_addr };
        let Some(pointee) = ty.pointee() else {
            return ConstValue::err("member access on non-aggregate constant");
        };
        let Some(shape) = pointee.aggregate_shape() else {
            return ConstValue::err("member access on non-aggregate constant");
        };
        let Some(idx) = shape.member_index(field) else {
            self.diags.emit(Diagnostic::error(format!("no member named '{field}'"), span));
            return ConstValue::err(format!("no member named '{field}'"));
        };
        if shape.member_bitfields[idx].is_some() {
            // §9 open question 5: bitfields in static initializers are
            // rejected explicitly rather than guessed at.
            return ConstValue::err("cannot take the address of a bitfield member");
        }
        let layout = if matches!(pointee.kind, Kind::Union(_)) {
            crate::common::types::union_layout(shape)
        } else {
            crate::common::types::struct_layout(shape)
        };
        let Some(layout) = layout else {
            return ConstValue::err("member access on incomplete aggregate");
        };
        let member_ty = shape.member_types[idx].clone();
        ConstValue::Address { symbol, offset: offset + layout.offsets[idx] as i64, ty: CType::pointer_to(member_ty) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::nodes::Ast;
    use crate::ast::symbol::{Linkage, Symbol, SymbolTable};
    use crate::common::source::Span;

    fn lit_int(s: &mut Sema, v: i64) -> AstRef {
        s.ast.push(crate::ast::nodes::NodeKind::Expr(ExprKind::IntLiteral(v, CType::basic(Kind::Int))), Span::dummy())
    }

    #[test]
    fn folds_arithmetic_with_usual_conversions() {
        let mut s = Sema::new(Ast::new(), SymbolTable::new());
        let a = lit_int(&mut s, 3);
        let b = lit_int(&mut s, 4);
        let add = s.ast.push(crate::ast::nodes::NodeKind::Expr(ExprKind::Binary(BinOp::Add, a, b)), Span::dummy());
        let v = s.evaluate(ConstKind::Integer, add);
        match v {
            ConstValue::Integer { value, .. } => assert_eq!(value, 7),
            _ => panic!("expected integer"),
        }
    }

    #[test]
    fn division_by_zero_is_a_diagnosed_failure() {
        let mut s = Sema::new(Ast::new(), SymbolTable::new());
        let a = lit_int(&mut s, 1);
        let b = lit_int(&mut s, 0);
        let div = s.ast.push(crate::ast::nodes::NodeKind::Expr(ExprKind::Binary(BinOp::Div, a, b)), Span::dummy());
        let v = s.evaluate(ConstKind::Integer, div);
        assert!(!v.succeeded());
        assert!(s.diags.has_errors());
    }

    #[test]
    fn short_circuits_logical_and() {
        let mut s = Sema::new(Ast::new(), SymbolTable::new());
        let zero = lit_int(&mut s, 0);
        let one = lit_int(&mut s, 1);
        let and = s.ast.push(crate::ast::nodes::NodeKind::Expr(ExprKind::Binary(BinOp::LogicalAnd, zero, one)), Span::dummy());
        let v = s.evaluate(ConstKind::Integer, and);
        match v {
            ConstValue::Integer { value, .. } => assert_eq!(value, 0),
            _ => panic!("expected integer"),
        }
    }

    #[test]
    fn address_of_static_with_member_offset() {
        let mut s = Sema::new(Ast::new(), SymbolTable::new());
        let shape = crate::common::types::AggregateShape {
            tag: Some("p".into()),
            member_names: vec!["x".into(), "y".into()],
            member_types: vec![CType::basic(Kind::Int), CType::basic(Kind::Double)],
            member_bitfields: vec![None, None],
        };
        let struct_ty = CType::new(Kind::Struct(shape));
        let mut sym = Symbol::new("g", 0, struct_ty, crate::ast::symbol::Namespace::Ordinary, Span::dummy());
        sym.storage_duration = StorageDuration::Static;
        sym.linkage = Linkage::External;
        s.symbols.insert(sym);
        let ident = s.ast.push(crate::ast::nodes::NodeKind::Expr(ExprKind::Identifier("g".into())), Span::dummy());
        let member = s.ast.push(crate::ast::nodes::NodeKind::Expr(ExprKind::Member(ident, "y".into())), Span::dummy());
        let addr = s.ast.push(crate::ast::nodes::NodeKind::Expr(ExprKind::AddrOf(member)), Span::dummy());
        let v = s.evaluate(ConstKind::Address, addr);
        match v {
            ConstValue::Address { symbol, offset, .. } => {
                assert_eq!(symbol.as_deref(), Some("g"));
                assert_eq!(offset, 8); // int padded to 8-byte alignment for the following double
            }
            _ => panic!("expected address constant, got {v:?}"),
        }
    }

    #[test]
    fn conditional_only_evaluates_chosen_branch() {
        let mut s = Sema::new(Ast::new(), SymbolTable::new());
        let cond = lit_int(&mut s, 1);
        let then_v = lit_int(&mut s, 10);
        // The else-branch divides by zero; it must never be evaluated.
        let one = lit_int(&mut s, 1);
        let zero = lit_int(&mut s, 0);
        let bad = s.ast.push(crate::ast::nodes::NodeKind::Expr(ExprKind::Binary(BinOp::Div, one, zero)), Span::dummy());
        let cexpr = s.ast.push(crate::ast::nodes::NodeKind::Expr(ExprKind::Conditional(cond, then_v, bad)), Span::dummy());
        let v = s.evaluate(ConstKind::Integer, cexpr);
        assert!(v.succeeded());
        assert!(!s.diags.has_errors());
    }
}
