//! System V AMD64 eightbyte classification (§4.5, ABI §3.2.3). Each eightbyte
//! of an argument or return value's type is assigned one of eight classes;
//! merge and post-merger rules collapse an aggregate's member classes down
//! to its final per-eightbyte classes.

use crate::air::insn::Vreg;
use crate::common::types::{AggregateShape, CType, Kind};
use super::regs::{RAX, RDX, XMM0, XMM1};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EightbyteClass {
    NoClass,
    Integer,
    Sse,
    SseUp,
    X87,
    X87Up,
    ComplexX87,
    Memory,
}

/// Per-eightbyte classes for `ty`, per ABI §3.2.3 "Classification". Scalars
/// classify to exactly one or two eightbytes without consulting merge rules;
/// aggregates recurse through [`classify_aggregate`].
pub fn classify(ty: &CType) -> Vec<EightbyteClass> {
    use EightbyteClass::*;
    if ty.is_integer() || ty.is_pointer() || ty.is_array() {
        return vec![Integer];
    }
    match &ty.kind {
        Kind::Float | Kind::Double | Kind::FloatComplex => vec![Sse],
        Kind::LongDouble => vec![X87, X87Up],
        Kind::DoubleComplex => vec![Sse, Sse],
        Kind::LongDoubleComplex => vec![ComplexX87, ComplexX87, ComplexX87, ComplexX87],
        Kind::Struct(shape) => classify_aggregate(shape, ty.size().unwrap_or(0), false),
        Kind::Union(shape) => classify_aggregate(shape, ty.size().unwrap_or(0), true),
        _ => vec![Integer],
    }
}

/// Assigns each of a (two-eightbyte-or-fewer) small aggregate's eightbyte
/// classes to its ABI return register: INTEGER-classed eightbytes consume
/// `RAX` then `RDX`, SSE-classed eightbytes consume `XMM0` then `XMM1`,
/// independently of each other (ABI §3.2.3 "Returning of Values") — e.g.
/// `struct { int x; double y; }` classifies `[Integer, Sse]` and returns
/// `[RAX, XMM0]`, not `[RAX, RDX]`.
pub fn return_eightbyte_registers(classes: &[EightbyteClass]) -> Vec<Vreg> {
    use EightbyteClass::*;
    let mut int_pool = [RAX, RDX].into_iter();
    let mut sse_pool = [XMM0, XMM1].into_iter();
    classes
        .iter()
        .filter_map(|class| match class {
            Integer => int_pool.next(),
            Sse | SseUp => sse_pool.next(),
            _ => None,
        })
        .collect()
}

/// Merge each member's classes into the whole-aggregate eightbyte classes,
/// then apply the ABI's four post-merger cleanup rules.
fn classify_aggregate(shape: &AggregateShape, size: u64, is_union: bool) -> Vec<EightbyteClass> {
    use EightbyteClass::*;
    let eightbytes = ((size + 7) / 8).max(1) as usize;
    if size > 64 {
        return vec![Memory; eightbytes];
    }
    let mut classes = vec![NoClass; eightbytes];

    let layout = if is_union { crate::common::types::union_layout(shape) } else { crate::common::types::struct_layout(shape) };
    let Some(layout) = layout else { return vec![Memory; eightbytes] };

    for (member_ty, &offset) in shape.member_types.iter().zip(&layout.offsets) {
        let sub = classify(member_ty);
        for (j, &subclass) in sub.iter().enumerate() {
            let idx = (offset as usize >> 3) + j;
            if idx >= classes.len() {
                continue;
            }
            classes[idx] = merge(classes[idx], subclass);
        }
    }

    post_merger(&mut classes);
    classes
}

fn merge(class: EightbyteClass, subclass: EightbyteClass) -> EightbyteClass {
    use EightbyteClass::*;
    if class == subclass {
        return class;
    }
    if subclass == NoClass {
        return class;
    }
    if class == NoClass || subclass == Memory || subclass == Integer {
        return subclass;
    }
    if matches!(class, X87 | X87Up | ComplexX87) || matches!(subclass, X87 | X87Up | ComplexX87) {
        return Memory;
    }
    Sse
}

fn post_merger(classes: &mut [EightbyteClass]) {
    use EightbyteClass::*;
    for i in 0..classes.len() {
        if classes[i] == Memory || (i >= 1 && classes[i] == X87Up && classes[i - 1] != X87) {
            classes.iter_mut().for_each(|c| *c = Memory);
            return;
        }
    }
    let first_sse = classes.first() == Some(&Sse);
    let has_sseup = classes.iter().any(|c| *c == SseUp);
    for i in 1..classes.len() {
        if classes[i] == SseUp && classes[i - 1] != Sse && classes[i - 1] != SseUp {
            classes[i] = Sse;
        }
    }
    if classes.len() > 2 && (!first_sse || !has_sseup) {
        classes.iter_mut().for_each(|c| *c = Memory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::AggregateShape;

    #[test]
    fn scalar_integer_is_one_integer_eightbyte() {
        assert_eq!(classify(&CType::basic(Kind::Int)), vec![EightbyteClass::Integer]);
    }

    #[test]
    fn double_is_one_sse_eightbyte() {
        assert_eq!(classify(&CType::basic(Kind::Double)), vec![EightbyteClass::Sse]);
    }

    #[test]
    fn two_doubles_struct_classifies_both_eightbytes_sse() {
        let shape = AggregateShape {
            tag: None,
            member_names: vec!["a".into(), "b".into()],
            member_types: vec![CType::basic(Kind::Double), CType::basic(Kind::Double)],
            member_bitfields: vec![None, None],
        };
        let classes = classify_aggregate(&shape, 16, false);
        assert_eq!(classes, vec![EightbyteClass::Sse, EightbyteClass::Sse]);
    }

    #[test]
    fn oversized_aggregate_is_entirely_memory() {
        let shape = AggregateShape {
            tag: None,
            member_names: vec!["buf".into()],
            member_types: vec![CType::array_of(CType::basic(Kind::Char), Some(128), None)],
            member_bitfields: vec![None],
        };
        let classes = classify_aggregate(&shape, 128, false);
        assert!(classes.iter().all(|c| *c == EightbyteClass::Memory));
    }

    #[test]
    fn mixed_int_and_double_struct_keeps_each_eightbyte_distinct() {
        // struct { int x; double y; } -> eightbyte 0: INTEGER, eightbyte 1: SSE
        let shape = AggregateShape {
            tag: None,
            member_names: vec!["x".into(), "y".into()],
            member_types: vec![CType::basic(Kind::Int), CType::basic(Kind::Double)],
            member_bitfields: vec![None, None],
        };
        let classes = classify_aggregate(&shape, 16, false);
        assert_eq!(classes, vec![EightbyteClass::Integer, EightbyteClass::Sse]);
    }

    #[test]
    fn mixed_class_return_routes_integer_and_sse_eightbytes_independently() {
        let regs = return_eightbyte_registers(&[EightbyteClass::Integer, EightbyteClass::Sse]);
        assert_eq!(regs, vec![RAX, XMM0]);
    }

    #[test]
    fn two_integer_eightbytes_return_through_rax_then_rdx() {
        let regs = return_eightbyte_registers(&[EightbyteClass::Integer, EightbyteClass::Integer]);
        assert_eq!(regs, vec![RAX, RDX]);
    }
}
