//! The canonical C type representation (§3.1).
//!
//! `CType` is a tagged variant with a shared qualifier bitset and, where
//! applicable, a `derived_from` for pointee/element/return types. Array
//! length expressions are referenced by [`AstRef`] rather than embedded, so
//! that `CType` stays `Clone` without aliasing the AST arena.

use bitflags::bitflags;

/// Opaque handle into the AST arena (§9: "model the tree as an arena of
/// nodes indexed by handles"). Shared between `common` and `ast` so that
/// `CType` can reference array-length expressions without depending on the
/// `ast` crate module.
pub type AstRef = u32;

bitflags! {
    /// `const` / `volatile` / `restrict`, per §3.1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Qualifiers: u8 {
        const CONST    = 1 << 0;
        const VOLATILE = 1 << 1;
        const RESTRICT = 1 << 2;
    }
}

/// A declared or synthesized function parameter/return type. An empty
/// `param_types` with `variadic = false` means "unprototyped" (§3.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionShape {
    pub param_types: Vec<CType>,
    pub variadic: bool,
}

/// A struct/union field. `member_bitfields[i]` points at the bit-width
/// constant expression, if the member is a bitfield (§3.1, open question 5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateShape {
    pub tag: Option<String>,
    pub member_names: Vec<String>,
    pub member_types: Vec<CType>,
    pub member_bitfields: Vec<Option<AstRef>>,
}

impl AggregateShape {
    pub fn is_incomplete(&self) -> bool {
        self.member_names.is_empty()
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.member_names.iter().position(|n| n == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumShape {
    pub tag: Option<String>,
    pub constant_names: Vec<String>,
    pub constant_exprs: Vec<Option<AstRef>>,
    /// Each enumerator's folded value: `previous + 1`, or the evaluated
    /// initializer when one is given, or `0` for the first enumerator when
    /// it has no initializer.
    pub constant_values: Vec<i64>,
}

impl EnumShape {
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.constant_names.iter().position(|n| n == name).map(|i| self.constant_values[i])
    }
}

/// The tagged variant itself, without qualifiers (those live alongside it in
/// [`CType`]). Keeping `Kind` separate from qualifiers mirrors `type_copy`'s
/// `class`/`qualifiers` split in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    FloatComplex,
    DoubleComplex,
    LongDoubleComplex,
    FloatImaginary,
    DoubleImaginary,
    LongDoubleImaginary,
    /// `derived_from` is the pointee.
    Pointer,
    /// `derived_from` is the element type; `length` is evaluated at sema
    /// time from the expression referenced by `length_expr`.
    Array { length_expr: Option<AstRef>, length: Option<u64>, unspecified_size: bool },
    /// `derived_from` is the return type.
    Function(FunctionShape),
    Struct(AggregateShape),
    Union(AggregateShape),
    Enum(EnumShape),
    /// A type that failed construction; every operation on it stays `Error`
    /// so a single constraint violation never cascades (§7).
    Error,
    /// Synthetic type assigned to label identifiers, for type uniformity
    /// with ordinary identifiers in the analyzer's symbol table.
    Label,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CType {
    pub kind: Kind,
    pub qualifiers: Qualifiers,
    pub derived_from: Option<Box<CType>>,
}

impl CType {
    pub fn new(kind: Kind) -> Self {
        Self { kind, qualifiers: Qualifiers::empty(), derived_from: None }
    }

    pub fn basic(kind: Kind) -> Self {
        debug_assert!(!matches!(
            kind,
            Kind::Pointer | Kind::Array { .. } | Kind::Function(_)
        ));
        Self::new(kind)
    }

    pub fn pointer_to(pointee: CType) -> Self {
        Self { kind: Kind::Pointer, qualifiers: Qualifiers::empty(), derived_from: Some(Box::new(pointee)) }
    }

    pub fn array_of(element: CType, length: Option<u64>, length_expr: Option<AstRef>) -> Self {
        Self {
            kind: Kind::Array { length_expr, length, unspecified_size: length.is_none() },
            qualifiers: Qualifiers::empty(),
            derived_from: Some(Box::new(element)),
        }
    }

    pub fn function_returning(return_type: CType, param_types: Vec<CType>, variadic: bool) -> Self {
        Self {
            kind: Kind::Function(FunctionShape { param_types, variadic }),
            qualifiers: Qualifiers::empty(),
            derived_from: Some(Box::new(return_type)),
        }
    }

    pub fn error() -> Self {
        Self::new(Kind::Error)
    }

    pub fn with_qualifiers(mut self, q: Qualifiers) -> Self {
        self.qualifiers = q;
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, Kind::Error)
    }

    pub fn pointee(&self) -> Option<&CType> {
        match self.kind {
            Kind::Pointer | Kind::Array { .. } => self.derived_from.as_deref(),
            _ => None,
        }
    }

    pub fn return_type(&self) -> Option<&CType> {
        match self.kind {
            Kind::Function(_) => self.derived_from.as_deref(),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, Kind::Pointer)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, Kind::Array { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, Kind::Function(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, Kind::Void)
    }

    pub fn is_scalar(&self) -> bool {
        self.is_arithmetic() || self.is_pointer()
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.kind,
            Kind::Bool
                | Kind::Char
                | Kind::SignedChar
                | Kind::UnsignedChar
                | Kind::Short
                | Kind::UShort
                | Kind::Int
                | Kind::UInt
                | Kind::Long
                | Kind::ULong
                | Kind::LongLong
                | Kind::ULongLong
                | Kind::Enum(_)
        )
    }

    pub fn is_real_float(&self) -> bool {
        matches!(self.kind, Kind::Float | Kind::Double | Kind::LongDouble)
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.kind, Kind::FloatComplex | Kind::DoubleComplex | Kind::LongDoubleComplex)
    }

    pub fn is_imaginary(&self) -> bool {
        matches!(self.kind, Kind::FloatImaginary | Kind::DoubleImaginary | Kind::LongDoubleImaginary)
    }

    /// Arithmetic per §3.1: integer ∪ real-float ∪ complex ∪ imaginary.
    pub fn is_arithmetic(&self) -> bool {
        self.is_integer() || self.is_real_float() || self.is_complex() || self.is_imaginary()
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self.kind,
            Kind::Char | Kind::SignedChar | Kind::Short | Kind::Int | Kind::Long | Kind::LongLong
        )
    }

    pub fn is_struct_or_union(&self) -> bool {
        matches!(self.kind, Kind::Struct(_) | Kind::Union(_))
    }

    pub fn aggregate_shape(&self) -> Option<&AggregateShape> {
        match &self.kind {
            Kind::Struct(s) | Kind::Union(s) => Some(s),
            _ => None,
        }
    }

    /// True for object types that have a representation (i.e. not
    /// `void`, functions, or incomplete aggregates/arrays).
    pub fn is_complete_object_type(&self) -> bool {
        match &self.kind {
            Kind::Void | Kind::Function(_) | Kind::Error | Kind::Label => false,
            Kind::Array { length, .. } => length.is_some() && self.derived_from.as_ref().unwrap().is_complete_object_type(),
            Kind::Struct(s) | Kind::Union(s) => {
                !s.is_incomplete() && s.member_types.iter().all(CType::is_complete_object_type)
            }
            _ => true,
        }
    }

    /// Size in bytes, or `None` for VLAs and incomplete types (§3.1 invariant).
    pub fn size(&self) -> Option<u64> {
        match &self.kind {
            Kind::Void | Kind::Error | Kind::Label => None,
            Kind::Bool | Kind::Char | Kind::SignedChar | Kind::UnsignedChar => Some(1),
            Kind::Short | Kind::UShort => Some(2),
            Kind::Int | Kind::UInt | Kind::Enum(_) | Kind::Float | Kind::FloatImaginary => Some(4),
            Kind::Long | Kind::ULong | Kind::LongLong | Kind::ULongLong | Kind::Double | Kind::DoubleImaginary => Some(8),
            Kind::LongDouble | Kind::LongDoubleImaginary => Some(16),
            Kind::FloatComplex => Some(8),
            Kind::DoubleComplex => Some(16),
            Kind::LongDoubleComplex => Some(32),
            Kind::Pointer | Kind::Function(_) => Some(8),
            Kind::Array { length, .. } => {
                let n = (*length)?;
                let elem = self.derived_from.as_ref().unwrap().size()?;
                Some(elem * n)
            }
            Kind::Struct(s) => struct_layout(s).map(|l| l.size),
            Kind::Union(s) => union_layout(s).map(|l| l.size),
        }
    }

    /// Alignment in bytes; `align <= size` for every complete object type.
    pub fn align(&self) -> Option<u64> {
        match &self.kind {
            Kind::Void | Kind::Error | Kind::Label => None,
            Kind::Array { .. } => self.derived_from.as_ref().unwrap().align(),
            Kind::Struct(s) => struct_layout(s).map(|l| l.align),
            Kind::Union(s) => union_layout(s).map(|l| l.align),
            _ => self.size(),
        }
    }

    /// Structural compatibility (§3.1). Tags/qualifiers/variant must match;
    /// `derived_from` recurses. Struct members must match in order; union
    /// members match by set-equality of names.
    pub fn is_compatible(&self, other: &CType) -> bool {
        if self.qualifiers != other.qualifiers {
            return false;
        }
        match (&self.kind, &other.kind) {
            (Kind::Pointer, Kind::Pointer) => {
                self.derived_from.as_ref().unwrap().is_compatible(other.derived_from.as_ref().unwrap())
            }
            (Kind::Array { length: l1, unspecified_size: u1, .. }, Kind::Array { length: l2, unspecified_size: u2, .. }) => {
                let elem_ok = self.derived_from.as_ref().unwrap().is_compatible(other.derived_from.as_ref().unwrap());
                let size_ok = *u1 || *u2 || l1 == l2;
                elem_ok && size_ok
            }
            (Kind::Function(f1), Kind::Function(f2)) => {
                if !self.derived_from.as_ref().unwrap().is_compatible(other.derived_from.as_ref().unwrap()) {
                    return false;
                }
                if f1.variadic != f2.variadic {
                    return false;
                }
                if f1.param_types.is_empty() || f2.param_types.is_empty() {
                    return true;
                }
                f1.param_types.len() == f2.param_types.len()
                    && f1.param_types.iter().zip(&f2.param_types).all(|(a, b)| a.is_compatible(b))
            }
            (Kind::Struct(s1), Kind::Struct(s2)) => {
                s1.tag == s2.tag
                    && (s1.is_incomplete()
                        || s2.is_incomplete()
                        || (s1.member_names == s2.member_names
                            && s1.member_types.len() == s2.member_types.len()
                            && s1.member_types.iter().zip(&s2.member_types).all(|(a, b)| a.is_compatible(b))
                            && bitfields_agree(s1, s2, true)))
            }
            (Kind::Union(s1), Kind::Union(s2)) => {
                s1.tag == s2.tag
                    && (s1.is_incomplete()
                        || s2.is_incomplete()
                        || (s1.member_names.len() == s2.member_names.len()
                            && s1.member_names.iter().enumerate().all(|(i, name)| {
                                s2.member_index(name).map_or(false, |j| {
                                    s1.member_types[i].is_compatible(&s2.member_types[j])
                                })
                            })
                            && bitfields_agree(s1, s2, false)))
            }
            (Kind::Enum(e1), Kind::Enum(e2)) => e1.tag == e2.tag,
            _ => std::mem::discriminant(&self.kind) == std::mem::discriminant(&other.kind),
        }
    }

    /// Compose two compatible types, preferring the "more specified" side
    /// (§3.1 Composition): a prototyped function wins over an unprototyped
    /// one, a sized array wins over an incomplete one.
    pub fn compose(&self, other: &CType) -> CType {
        match (&self.kind, &other.kind) {
            (Kind::Function(f1), Kind::Function(f2)) => {
                let ret = self.derived_from.as_ref().unwrap().compose(other.derived_from.as_ref().unwrap());
                let shape = if !f1.param_types.is_empty() { f1.clone() } else { f2.clone() };
                CType::function_returning(ret, shape.param_types, shape.variadic)
            }
            (Kind::Array { length: l1, .. }, Kind::Array { length: l2, .. }) => {
                let elem = self.derived_from.as_ref().unwrap().compose(other.derived_from.as_ref().unwrap());
                let length = l1.or(*l2);
                CType::array_of(elem, length, None)
            }
            _ => self.clone(),
        }
    }
}

fn bitfields_agree(s1: &AggregateShape, s2: &AggregateShape, by_position: bool) -> bool {
    // Widths are compared by the caller via constant evaluation once both
    // expressions are available; structurally we only require presence to
    // agree here (both-None or both-Some), matching the source's early-out.
    if by_position {
        s1.member_bitfields.len() == s2.member_bitfields.len()
            && s1
                .member_bitfields
                .iter()
                .zip(&s2.member_bitfields)
                .all(|(a, b)| a.is_some() == b.is_some())
    } else {
        true
    }
}

/// A computed struct/union layout: per-member byte offset plus overall size
/// and alignment, padded so that `size` is a multiple of `align` (§3.1).
#[derive(Debug, Clone)]
pub struct Layout {
    pub size: u64,
    pub align: u64,
    pub offsets: Vec<u64>,
}

pub fn struct_layout(shape: &AggregateShape) -> Option<Layout> {
    if shape.is_incomplete() {
        return None;
    }
    let mut offset = 0u64;
    let mut align = 1u64;
    let mut offsets = Vec::with_capacity(shape.member_types.len());
    for ty in &shape.member_types {
        let m_align = ty.align()?;
        let m_size = ty.size()?;
        offset = round_up(offset, m_align);
        offsets.push(offset);
        offset += m_size;
        align = align.max(m_align);
    }
    let size = round_up(offset, align);
    Some(Layout { size, align, offsets })
}

pub fn union_layout(shape: &AggregateShape) -> Option<Layout> {
    if shape.is_incomplete() {
        return None;
    }
    let mut size = 0u64;
    let mut align = 1u64;
    for ty in &shape.member_types {
        size = size.max(ty.size()?);
        align = align.max(ty.align()?);
    }
    Some(Layout { size: round_up(size, align), align, offsets: vec![0; shape.member_types.len()] })
}

fn round_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        return value;
    }
    (value + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_sizes_match_sysv() {
        assert_eq!(CType::basic(Kind::Int).size(), Some(4));
        assert_eq!(CType::basic(Kind::Long).size(), Some(8));
        assert_eq!(CType::basic(Kind::Double).size(), Some(8));
        assert_eq!(CType::basic(Kind::LongDouble).size(), Some(16));
        assert_eq!(CType::pointer_to(CType::basic(Kind::Void)).size(), Some(8));
    }

    #[test]
    fn incomplete_struct_has_no_size() {
        let incomplete = CType::new(Kind::Struct(AggregateShape {
            tag: Some("s".into()),
            member_names: vec![],
            member_types: vec![],
            member_bitfields: vec![],
        }));
        assert_eq!(incomplete.size(), None);
    }

    #[test]
    fn struct_is_padded_to_its_alignment() {
        // struct { char c; int x; } -> offsets {0, 4}, size 8, align 4.
        let shape = AggregateShape {
            tag: None,
            member_names: vec!["c".into(), "x".into()],
            member_types: vec![CType::basic(Kind::Char), CType::basic(Kind::Int)],
            member_bitfields: vec![None, None],
        };
        let layout = struct_layout(&shape).unwrap();
        assert_eq!(layout.offsets, vec![0, 4]);
        assert_eq!(layout.size, 8);
        assert_eq!(layout.align, 4);
    }

    #[test]
    fn pointer_always_has_derived_from() {
        let p = CType::pointer_to(CType::basic(Kind::Int));
        assert!(p.pointee().is_some());
    }

    #[test]
    fn array_composition_prefers_known_size() {
        let unspecified = CType::array_of(CType::basic(Kind::Int), None, None);
        let sized = CType::array_of(CType::basic(Kind::Int), Some(10), None);
        let composed = unspecified.compose(&sized);
        assert!(matches!(composed.kind, Kind::Array { length: Some(10), .. }));
    }

    #[test]
    fn function_composition_adopts_prototype() {
        let unprototyped = CType::function_returning(CType::basic(Kind::Int), vec![], false);
        let prototyped = CType::function_returning(CType::basic(Kind::Int), vec![CType::basic(Kind::Int)], false);
        let composed = unprototyped.compose(&prototyped);
        match composed.kind {
            Kind::Function(f) => assert_eq!(f.param_types.len(), 1),
            _ => panic!("expected function type"),
        }
    }

    #[test]
    fn union_compatibility_ignores_member_order() {
        let a = AggregateShape {
            tag: Some("u".into()),
            member_names: vec!["x".into(), "y".into()],
            member_types: vec![CType::basic(Kind::Int), CType::basic(Kind::Float)],
            member_bitfields: vec![None, None],
        };
        let b = AggregateShape {
            tag: Some("u".into()),
            member_names: vec!["y".into(), "x".into()],
            member_types: vec![CType::basic(Kind::Float), CType::basic(Kind::Int)],
            member_bitfields: vec![None, None],
        };
        assert!(CType::new(Kind::Union(a)).is_compatible(&CType::new(Kind::Union(b))));
    }

    #[test]
    fn error_type_is_never_compatible_with_itself_structurally() {
        // Error types don't participate in the type system's compatibility
        // checks; analyzer consumers must special-case `is_error` first.
        let e1 = CType::error();
        let e2 = CType::error();
        assert!(e1.is_error() && e2.is_error());
    }
}
