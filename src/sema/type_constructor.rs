//! Type construction (§4.1): turns declaration specifiers + a declarator
//! chain into a [`CType`]. Specifier interpretation is table-driven, as in
//! the source's `bts_counter`/`check_array` match table in `type.c`.

use super::Sema;
use crate::ast::nodes::{DeclaratorPiece, NodeKind, ParamDecl, Specifier};
use crate::ast::symbol::Namespace;
use crate::common::diagnostics::Diagnostic;
use crate::common::source::Span;
use crate::common::types::{AggregateShape, AstRef, CType, EnumShape, Kind, Qualifiers};

/// Per-keyword occurrence counts, mirroring `bts_counter` in the source.
#[derive(Debug, Default, Clone, Copy)]
struct BasicCounts {
    void: u32,
    char_: u32,
    short: u32,
    int: u32,
    long: u32,
    signed: u32,
    unsigned: u32,
    float: u32,
    double: u32,
    bool_: u32,
    complex: u32,
    imaginary: u32,
}

/// The canonical combinations a C99 basic-type specifier sequence may take
/// (§4.1: "a canonical match table maps the full multiset to one of the
/// named scalar types").
fn match_basic(c: BasicCounts) -> Option<Kind> {
    let tally = (c.void, c.char_, c.short, c.int, c.long, c.signed, c.unsigned, c.float, c.double, c.bool_, c.complex, c.imaginary);
    Some(match tally {
        (1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0) => Kind::Void,
        (0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0) => Kind::Bool,
        (0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0) => Kind::Char,
        (0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0) => Kind::SignedChar,
        (0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0) => Kind::UnsignedChar,
        (0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0) => Kind::Short,
        (0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0) => Kind::Short,
        (0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0) => Kind::Short,
        (0, 0, 1, 1, 0, 1, 0, 0, 0, 0, 0, 0) => Kind::Short,
        (0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0) => Kind::UShort,
        (0, 0, 1, 1, 0, 0, 1, 0, 0, 0, 0, 0) => Kind::UShort,
        (0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0) => Kind::Int,
        (0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0) => Kind::Int,
        (0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0) => Kind::Int,
        (0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0) => Kind::UInt,
        (0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 0) => Kind::UInt,
        (0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0) => Kind::Long,
        (0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0) => Kind::Long,
        (0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0) => Kind::Long,
        (0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0) => Kind::Long,
        (0, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0) => Kind::ULong,
        (0, 0, 0, 1, 1, 0, 1, 0, 0, 0, 0, 0) => Kind::ULong,
        (0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0) => Kind::LongLong,
        (0, 0, 0, 0, 2, 1, 0, 0, 0, 0, 0, 0) => Kind::LongLong,
        (0, 0, 0, 1, 2, 0, 0, 0, 0, 0, 0, 0) => Kind::LongLong,
        (0, 0, 0, 1, 2, 1, 0, 0, 0, 0, 0, 0) => Kind::LongLong,
        (0, 0, 0, 0, 2, 0, 1, 0, 0, 0, 0, 0) => Kind::ULongLong,
        (0, 0, 0, 1, 2, 0, 1, 0, 0, 0, 0, 0) => Kind::ULongLong,
        (0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0) => Kind::Float,
        (0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0) => Kind::FloatComplex,
        (0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1) => Kind::FloatImaginary,
        (0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0) => Kind::Double,
        (0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1, 0) => Kind::DoubleComplex,
        (0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1) => Kind::DoubleImaginary,
        (0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0) => Kind::LongDouble,
        (0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0) => Kind::LongDoubleComplex,
        (0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 1) => Kind::LongDoubleImaginary,
        _ => return None,
    })
}

impl Sema {
    /// §4.1's public contract: `create_type(decl_specifiers, declarator)`.
    pub fn create_type(&mut self, specifiers: &[Specifier], pieces: &[DeclaratorPiece], span: Span) -> CType {
        let base = self.base_type_from_specifiers(specifiers, span);
        self.apply_declarator(base, pieces)
    }

    fn base_type_from_specifiers(&mut self, specifiers: &[Specifier], span: Span) -> CType {
        let mut counts = BasicCounts::default();
        let mut qualifiers = Qualifiers::empty();
        let mut tagged: Option<CType> = None;
        let mut typedef_name: Option<String> = None;

        for spec in specifiers {
            match spec {
                Specifier::Void => counts.void += 1,
                Specifier::Char => counts.char_ += 1,
                Specifier::Short => counts.short += 1,
                Specifier::Int => counts.int += 1,
                Specifier::Long => counts.long += 1,
                Specifier::Signed => counts.signed += 1,
                Specifier::Unsigned => counts.unsigned += 1,
                Specifier::Float => counts.float += 1,
                Specifier::Double => counts.double += 1,
                Specifier::Bool => counts.bool_ += 1,
                Specifier::Complex => counts.complex += 1,
                Specifier::Imaginary => counts.imaginary += 1,
                Specifier::Qualifier(q) => qualifiers |= *q,
                Specifier::Storage(_) | Specifier::Inline => {}
                Specifier::Struct(node) => tagged = Some(self.build_struct_or_union(*node, false)),
                Specifier::Union(node) => tagged = Some(self.build_struct_or_union(*node, true)),
                Specifier::Enum(node) => tagged = Some(self.build_enum(*node)),
                Specifier::TypedefName(name) => typedef_name = Some(name.clone()),
            }
        }

        if let Some(mut ty) = tagged {
            ty.qualifiers |= qualifiers;
            return ty;
        }

        if let Some(name) = typedef_name {
            return match self.symbols.lookup(&Namespace::Ordinary, &name) {
                Some(sym) => sym.ty.clone().with_qualifiers(qualifiers),
                None => {
                    self.diags.emit(Diagnostic::error(format!("type not defined in this context: '{name}'"), span));
                    CType::error()
                }
            };
        }

        match match_basic(counts) {
            Some(kind) => CType::new(kind).with_qualifiers(qualifiers),
            None => {
                self.diags.emit(Diagnostic::error("invalid combination of type specifiers", span));
                CType::error()
            }
        }
    }

    fn build_struct_or_union(&mut self, node: AstRef, is_union: bool) -> CType {
        let NodeKind::StructSpecifier(spec) = self.ast.kind(node).clone() else {
            self.diags.emit(Diagnostic::error("internal: expected struct specifier node", self.ast.get(node).span));
            return CType::error();
        };
        let shape = match spec.fields {
            None => {
                // A bodyless reference must resolve against an existing tag
                // (§4.1); a genuine forward declaration is distinguished by
                // the caller inserting the incomplete symbol *before*
                // calling `create_type` again for any later use.
                let tag = spec.tag.clone().unwrap_or_default();
                let ns = if is_union { Namespace::Union } else { Namespace::Struct };
                match self.symbols.lookup(&ns, &tag) {
                    Some(sym) => return sym.ty.clone(),
                    None => {
                        self.diags.emit(Diagnostic::error(
                            format!("type not defined in this context: '{tag}'"),
                            self.ast.get(node).span,
                        ));
                        return CType::error();
                    }
                }
            }
            Some(fields) => {
                let mut member_names = Vec::with_capacity(fields.len());
                let mut member_types = Vec::with_capacity(fields.len());
                let mut member_bitfields = Vec::with_capacity(fields.len());
                for field in &fields {
                    let ty = self.create_type(&field.specifiers, &field.pieces, field.span);
                    member_names.push(field.name.clone().unwrap_or_default());
                    member_types.push(ty);
                    member_bitfields.push(field.bitfield);
                }
                AggregateShape { tag: spec.tag.clone(), member_names, member_types, member_bitfields }
            }
        };
        if is_union {
            CType::new(Kind::Union(shape))
        } else {
            CType::new(Kind::Struct(shape))
        }
    }

    fn build_enum(&mut self, node: AstRef) -> CType {
        let NodeKind::EnumSpecifier(spec) = self.ast.kind(node).clone() else {
            self.diags.emit(Diagnostic::error("internal: expected enum specifier node", self.ast.get(node).span));
            return CType::error();
        };
        let (names, exprs) = match &spec.enumerators {
            None => (vec![], vec![]),
            Some(list) => (
                list.iter().map(|(n, _, _)| n.clone()).collect(),
                list.iter().map(|(_, e, _)| *e).collect::<Vec<_>>(),
            ),
        };

        // An enumerator without an initializer takes `previous + 1`; the
        // first enumerator without one takes 0.
        let mut values = Vec::with_capacity(exprs.len());
        let mut previous: i64 = -1;
        for expr in &exprs {
            let value = match expr {
                Some(e) => match self.evaluate(super::ConstKind::Integer, *e) {
                    super::ConstValue::Integer { value, .. } => value as i64,
                    _ => previous + 1,
                },
                None => previous + 1,
            };
            values.push(value);
            previous = value;
        }

        for (name, &value) in names.iter().zip(&values) {
            if let Some(sym) = self.symbols.lookup_mut(&Namespace::Ordinary, name) {
                sym.enum_value = Some(value);
            }
        }

        CType::new(Kind::Enum(EnumShape { tag: spec.tag.clone(), constant_names: names, constant_exprs: exprs, constant_values: values }))
    }

    /// Apply declarator pieces outermost-first (§4.1): `int *(*f)(int)[3]`
    /// becomes "pointer to function of (int) returning array[3] of pointer
    /// to int" by folding the pieces vector (already peeled
    /// innermost-to-outermost by the parser) left to right.
    fn apply_declarator(&mut self, base: CType, pieces: &[DeclaratorPiece]) -> CType {
        let mut ty = base;
        for piece in pieces {
            ty = match piece {
                DeclaratorPiece::Pointer(q) => {
                    let mut p = CType::pointer_to(ty);
                    p.qualifiers = *q;
                    p
                }
                DeclaratorPiece::Array { size_expr, .. } => {
                    let length = size_expr.and_then(|e| self.evaluate_array_length(e));
                    CType::array_of(ty, length, *size_expr)
                }
                DeclaratorPiece::Function { params, variadic } => {
                    let param_types = params.iter().map(|p| self.param_type(p)).collect();
                    CType::function_returning(ty, param_types, *variadic)
                }
            };
        }
        ty
    }

    fn evaluate_array_length(&mut self, expr: AstRef) -> Option<u64> {
        match self.evaluate(super::ConstKind::Integer, expr) {
            super::ConstValue::Integer { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Resolves a `(type-name)` AST node — used by casts, `sizeof(T)`, and
    /// compound literals — to a [`CType`] (§4.1).
    pub fn type_name_to_ctype(&mut self, node: AstRef) -> CType {
        let NodeKind::TypeName(type_name) = self.ast.kind(node).clone() else {
            self.diags.emit(Diagnostic::error("internal: expected type-name node", self.ast.get(node).span));
            return CType::error();
        };
        self.create_type(&type_name.specifiers, &type_name.pieces, self.ast.get(node).span)
    }

    fn param_type(&mut self, param: &ParamDecl) -> CType {
        let ty = self.create_type(&param.specifiers, &param.pieces, param.span);
        // Array and function parameters decay to pointers (ISO §6.7.5.3).
        match ty.kind {
            Kind::Array { .. } => CType::pointer_to(*ty.derived_from.unwrap()),
            Kind::Function(_) => CType::pointer_to(ty),
            _ => ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::nodes::Ast;
    use crate::ast::symbol::SymbolTable;

    fn sema() -> Sema {
        Sema::new(Ast::new(), SymbolTable::new())
    }

    #[test]
    fn unsigned_long_long_int_combination() {
        let mut s = sema();
        let specs = vec![Specifier::Unsigned, Specifier::Long, Specifier::Long, Specifier::Int];
        let ty = s.create_type(&specs, &[], Span::dummy());
        assert_eq!(ty.kind, Kind::ULongLong);
    }

    #[test]
    fn pointer_to_function_returning_array_of_pointer_to_int() {
        // int *(*f)(int)[3] peeled to: Pointer -> Function(int) -> Array[3] -> Pointer -> Int
        let mut s = sema();
        let pieces = vec![
            DeclaratorPiece::Pointer(Qualifiers::empty()),
            DeclaratorPiece::Function { params: vec![], variadic: false },
            DeclaratorPiece::Array { size_expr: None, unspecified: false },
            DeclaratorPiece::Pointer(Qualifiers::empty()),
        ];
        let ty = s.create_type(&[Specifier::Int], &pieces, Span::dummy());
        assert!(matches!(ty.kind, Kind::Pointer));
        let func = ty.derived_from.unwrap();
        assert!(matches!(func.kind, Kind::Function(_)));
    }

    #[test]
    fn invalid_specifier_combination_is_error() {
        let mut s = sema();
        let ty = s.create_type(&[Specifier::Void, Specifier::Int], &[], Span::dummy());
        assert!(ty.is_error());
        assert!(s.diags.has_errors());
    }

    #[test]
    fn unknown_tag_reports_not_defined() {
        let mut s = sema();
        let tag_node = s.ast.push(
            NodeKind::StructSpecifier(crate::ast::nodes::StructSpecifierNode { tag: Some("missing".into()), is_union: false, fields: None }),
            Span::dummy(),
        );
        let ty = s.create_type(&[Specifier::Struct(tag_node)], &[], Span::dummy());
        assert!(ty.is_error());
        assert!(s.diags.has_errors());
    }

    #[test]
    fn bodyless_reference_to_known_tag_resolves() {
        let mut s = sema();
        let tag_node = s.ast.push(
            NodeKind::StructSpecifier(crate::ast::nodes::StructSpecifierNode { tag: Some("point".into()), is_union: false, fields: None }),
            Span::dummy(),
        );
        let known = CType::new(Kind::Struct(AggregateShape {
            tag: Some("point".into()),
            member_names: vec!["x".into()],
            member_types: vec![CType::basic(Kind::Int)],
            member_bitfields: vec![None],
        }));
        s.symbols.insert(crate::ast::symbol::Symbol::new("point", 0, known, Namespace::Struct, Span::dummy()));
        let ty = s.create_type(&[Specifier::Struct(tag_node)], &[], Span::dummy());
        assert!(!ty.is_error());
        assert!(!s.diags.has_errors());
    }

    #[test]
    fn array_length_is_folded_from_a_constant_expression() {
        let mut s = sema();
        let len_expr = s.ast.push(NodeKind::Expr(crate::ast::nodes::ExprKind::IntLiteral(5, CType::basic(Kind::Int))), Span::dummy());
        let pieces = vec![DeclaratorPiece::Array { size_expr: Some(len_expr), unspecified: false }];
        let ty = s.create_type(&[Specifier::Int], &pieces, Span::dummy());
        assert!(matches!(ty.kind, Kind::Array { length: Some(5), .. }));
    }

    #[test]
    fn unspecified_enumerators_count_up_from_the_last_explicit_value() {
        let mut s = sema();
        // enum { RED, GREEN = 5, BLUE };
        s.symbols.insert(crate::ast::symbol::Symbol::new("RED", 0, CType::error(), Namespace::Ordinary, Span::dummy()));
        s.symbols.insert(crate::ast::symbol::Symbol::new("GREEN", 0, CType::error(), Namespace::Ordinary, Span::dummy()));
        s.symbols.insert(crate::ast::symbol::Symbol::new("BLUE", 0, CType::error(), Namespace::Ordinary, Span::dummy()));
        let five = s.ast.push(NodeKind::Expr(crate::ast::nodes::ExprKind::IntLiteral(5, CType::basic(Kind::Int))), Span::dummy());
        let enum_node = s.ast.push(
            NodeKind::EnumSpecifier(crate::ast::nodes::EnumSpecifierNode {
                tag: None,
                enumerators: Some(vec![("RED".into(), None, Span::dummy()), ("GREEN".into(), Some(five), Span::dummy()), ("BLUE".into(), None, Span::dummy())]),
            }),
            Span::dummy(),
        );
        let ty = s.create_type(&[Specifier::Enum(enum_node)], &[], Span::dummy());
        let Kind::Enum(shape) = &ty.kind else { panic!("expected an enum type") };
        assert_eq!(shape.value_of("RED"), Some(0));
        assert_eq!(shape.value_of("GREEN"), Some(5));
        assert_eq!(shape.value_of("BLUE"), Some(6));
        assert_eq!(s.symbols.lookup(&Namespace::Ordinary, "BLUE").and_then(|sym| sym.enum_value), Some(6));
    }
}
