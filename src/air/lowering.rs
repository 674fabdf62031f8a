//! The AIR lowerer (§4.4): an AST-to-AIR translator. Each node is lowered
//! into its own fresh `InsnList` (the `SETUP` dummy head is simply "start a
//! new empty `InsnList`" here — [`InsnList::push_back`] already handles an
//! empty list without a sentinel, so no literal dummy `Nop` is needed) and
//! the result is appended into the parent's list in evaluation order,
//! mirroring `air.c`'s "parent composes by copying child code."

use crate::air::insn::{AirInsn, AirOp, AirOperand, InsnList, LabelNamespace, Vreg};
use crate::air::module::{AirData, AirModule, AirRoutine, Locale, Relocation};
use crate::ast::nodes::{AssignOp, BinOp, Designator, ExprKind, FunctionDefNode, IncDecOp, Initializer, NodeKind, StmtKind, StorageClass, UnaryOp, VarDeclNode};
use crate::common::types::{AstRef, CType, Kind};
use crate::sema::const_eval::ConstKind;
use crate::sema::Sema;

/// Where an lvalue's address currently lives, so callers can choose
/// `Load`/`LoadAddr` without recomputing it (mirrors §4.4's "if in lvalue
/// context... emit `LoadAddr`; else emit `Load`" contract).
enum Place {
    /// A value already sitting in a virtual register.
    Value(Vreg),
    /// The address of an object is in this register; load through it to
    /// get the value, or use the register directly for lvalue context.
    Address(Vreg),
}

struct LoopLabels {
    break_label: u64,
    continue_label: u64,
}

pub struct Lowerer {
    pub module: AirModule,
    loops: Vec<LoopLabels>,
    switch_break: Vec<u64>,
    float_neg_masks: std::collections::HashMap<&'static str, String>,
}

impl Lowerer {
    pub fn new(locale: Locale) -> Self {
        Self { module: AirModule::new(locale), loops: Vec::new(), switch_break: Vec::new(), float_neg_masks: std::collections::HashMap::new() }
    }

    pub fn lower_translation_unit(&mut self, sema: &mut Sema, root: AstRef) {
        let NodeKind::TranslationUnit(decls) = sema.ast.kind(root).clone() else { return };
        for decl in decls {
            match sema.ast.kind(decl).clone() {
                NodeKind::FunctionDef(def) => self.lower_function_def(sema, &def),
                NodeKind::VarDecl(decl_node) => self.lower_static_var_decl(sema, &decl_node),
                _ => {}
            }
        }
    }

    fn lower_function_def(&mut self, sema: &mut Sema, def: &FunctionDefNode) {
        let span = sema.ast.get(def.body).span;
        let ty = sema.create_type(&def.specifiers, &def.pieces, span);
        let (ret, params, variadic) = match &ty.kind {
            Kind::Function(shape) => (ty.return_type().cloned().unwrap_or_else(CType::error), shape.param_types.clone(), shape.variadic),
            _ => (CType::error(), vec![], false),
        };
        let mut routine = AirRoutine::new(def.name.clone(), ret, params);
        routine.uses_varargs = variadic;
        routine.param_names = def
            .pieces
            .iter()
            .find_map(|p| match p {
                crate::ast::nodes::DeclaratorPiece::Function { params, .. } => Some(params.iter().map(|p| p.name.clone().unwrap_or_default()).collect()),
                _ => None,
            })
            .unwrap_or_default();
        let mut list = InsnList::new();
        self.lower_stmt(sema, &mut list, def.body);
        routine.insns = list;
        self.module.push_routine(routine);
    }

    fn lower_static_var_decl(&mut self, sema: &mut Sema, decl: &VarDeclNode) {
        let storage = decl.specifiers.iter().find_map(|s| match s {
            crate::ast::nodes::Specifier::Storage(sc) => Some(*sc),
            _ => None,
        });
        if matches!(storage, Some(StorageClass::Extern)) {
            return;
        }
        let Some(sym) = sema.symbols.lookup(&crate::ast::symbol::Namespace::Ordinary, &decl.name) else { return };
        let size = sym.ty.size().unwrap_or(0);
        let bytes = sym.initial_data.clone().unwrap_or_else(|| vec![0u8; size as usize]);
        let relocations = sym.addresses.iter().map(|r| Relocation { offset: r.offset, target_symbol: r.target_symbol.clone(), addend: r.addend }).collect();
        self.module.push_data(AirData { symbol: decl.name.clone(), readonly: false, bytes, relocations });
    }

    // ---- statements ----

    fn lower_stmt(&mut self, sema: &mut Sema, list: &mut InsnList, node: AstRef) {
        let stmt = sema.ast.stmt(node).clone();
        match stmt {
            StmtKind::Compound(items) => {
                for item in items {
                    self.lower_stmt(sema, list, item);
                }
            }
            StmtKind::ExprStmt(e) => {
                if let Some(e) = e {
                    self.lower_expr(sema, list, e);
                    list.push_back(AirInsn::new(AirOp::SequencePoint, CType::basic(Kind::Int), vec![]));
                }
            }
            StmtKind::If(cond, then, els) => self.lower_if(sema, list, cond, then, els),
            StmtKind::While(cond, body) => self.lower_while(sema, list, cond, body),
            StmtKind::DoWhile(cond, body) => self.lower_do_while(sema, list, cond, body),
            StmtKind::For(init, cond, step, body) => self.lower_for(sema, list, init, cond, step, body),
            StmtKind::Return(e) => self.lower_return(sema, list, e),
            StmtKind::Break => {
                let label = self.switch_break.last().copied().or_else(|| self.loops.last().map(|l| l.break_label));
                if let Some(label) = label {
                    list.push_back(AirInsn::new(AirOp::Jmp, CType::basic(Kind::Int), vec![AirOperand::Label { id: label, namespace: LabelNamespace::Statement }]));
                }
            }
            StmtKind::Continue => {
                if let Some(l) = self.loops.last() {
                    list.push_back(AirInsn::new(AirOp::Jmp, CType::basic(Kind::Int), vec![AirOperand::Label { id: l.continue_label, namespace: LabelNamespace::Statement }]));
                }
            }
            StmtKind::Goto(name) => {
                list.push_back(AirInsn::new(AirOp::Jmp, CType::basic(Kind::Int), vec![AirOperand::Symbol(format!(".L{name}"))]));
            }
            StmtKind::Label(name, inner) => {
                list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Symbol(format!(".L{name}"))]));
                self.lower_stmt(sema, list, inner);
            }
            StmtKind::Switch(subject, body) => self.lower_switch(sema, list, subject, body),
            StmtKind::Case(_, inner) | StmtKind::Default(inner) => self.lower_stmt(sema, list, inner),
            StmtKind::Decl(d) => self.lower_local_decl(sema, list, d),
        }
    }

    fn lower_if(&mut self, sema: &mut Sema, list: &mut InsnList, cond: AstRef, then: AstRef, els: Option<AstRef>) {
        let cond_reg = self.value_of(sema, list, cond);
        let else_label = self.module.next_label();
        let end_label = self.module.next_label();
        list.push_back(AirInsn::new(
            AirOp::Jz,
            CType::basic(Kind::Int),
            vec![AirOperand::Register(cond_reg), AirOperand::Label { id: else_label, namespace: LabelNamespace::Statement }],
        ));
        self.lower_stmt(sema, list, then);
        list.push_back(AirInsn::new(AirOp::Jmp, CType::basic(Kind::Int), vec![AirOperand::Label { id: end_label, namespace: LabelNamespace::Statement }]));
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: else_label, namespace: LabelNamespace::Statement }]));
        if let Some(els) = els {
            self.lower_stmt(sema, list, els);
        }
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: end_label, namespace: LabelNamespace::Statement }]));
    }

    fn lower_while(&mut self, sema: &mut Sema, list: &mut InsnList, cond: AstRef, body: AstRef) {
        let top = self.module.next_label();
        let end = self.module.next_label();
        self.loops.push(LoopLabels { break_label: end, continue_label: top });
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: top, namespace: LabelNamespace::Statement }]));
        let cond_reg = self.value_of(sema, list, cond);
        list.push_back(AirInsn::new(AirOp::Jz, CType::basic(Kind::Int), vec![AirOperand::Register(cond_reg), AirOperand::Label { id: end, namespace: LabelNamespace::Statement }]));
        self.lower_stmt(sema, list, body);
        list.push_back(AirInsn::new(AirOp::Jmp, CType::basic(Kind::Int), vec![AirOperand::Label { id: top, namespace: LabelNamespace::Statement }]));
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: end, namespace: LabelNamespace::Statement }]));
        self.loops.pop();
    }

    fn lower_do_while(&mut self, sema: &mut Sema, list: &mut InsnList, cond: AstRef, body: AstRef) {
        let top = self.module.next_label();
        let continue_label = self.module.next_label();
        let end = self.module.next_label();
        self.loops.push(LoopLabels { break_label: end, continue_label });
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: top, namespace: LabelNamespace::Statement }]));
        self.lower_stmt(sema, list, body);
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: continue_label, namespace: LabelNamespace::Statement }]));
        let cond_reg = self.value_of(sema, list, cond);
        list.push_back(AirInsn::new(AirOp::Jnz, CType::basic(Kind::Int), vec![AirOperand::Register(cond_reg), AirOperand::Label { id: top, namespace: LabelNamespace::Statement }]));
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: end, namespace: LabelNamespace::Statement }]));
        self.loops.pop();
    }

    fn lower_for(&mut self, sema: &mut Sema, list: &mut InsnList, init: Option<AstRef>, cond: Option<AstRef>, step: Option<AstRef>, body: AstRef) {
        if let Some(init) = init {
            self.lower_stmt(sema, list, init);
        }
        let top = self.module.next_label();
        let continue_label = self.module.next_label();
        let end = self.module.next_label();
        self.loops.push(LoopLabels { break_label: end, continue_label });
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: top, namespace: LabelNamespace::Statement }]));
        if let Some(cond) = cond {
            let cond_reg = self.value_of(sema, list, cond);
            list.push_back(AirInsn::new(AirOp::Jz, CType::basic(Kind::Int), vec![AirOperand::Register(cond_reg), AirOperand::Label { id: end, namespace: LabelNamespace::Statement }]));
        }
        self.lower_stmt(sema, list, body);
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: continue_label, namespace: LabelNamespace::Statement }]));
        if let Some(step) = step {
            self.lower_expr(sema, list, step);
        }
        list.push_back(AirInsn::new(AirOp::Jmp, CType::basic(Kind::Int), vec![AirOperand::Label { id: top, namespace: LabelNamespace::Statement }]));
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: end, namespace: LabelNamespace::Statement }]));
        self.loops.pop();
    }

    /// Linear cascade of equality tests against the subject, per §4.4: no
    /// jump table, just `case`-by-`case` compare-and-branch in source order.
    fn lower_switch(&mut self, sema: &mut Sema, list: &mut InsnList, subject: AstRef, body: AstRef) {
        let subject_reg = self.value_of(sema, list, subject);
        let end = self.module.next_label();
        self.switch_break.push(end);

        let mut case_labels = Vec::new();
        let mut default_label = None;
        if let NodeKind::Stmt(StmtKind::Compound(items)) = sema.ast.kind(body).clone() {
            for item in &items {
                match sema.ast.kind(*item) {
                    NodeKind::Stmt(StmtKind::Case(value, _)) => {
                        let label = self.module.next_label();
                        case_labels.push((*value, label));
                    }
                    NodeKind::Stmt(StmtKind::Default(_)) => {
                        default_label = Some(self.module.next_label());
                    }
                    _ => {}
                }
            }
        }
        for (value_expr, label) in &case_labels {
            let case_val = sema.evaluate(ConstKind::Integer, *value_expr);
            let imm = match case_val {
                crate::sema::const_eval::ConstValue::Integer { value, .. } => value,
                _ => 0,
            };
            let cmp = self.module.next_vreg();
            list.push_back(AirInsn::new(AirOp::CmpEq, CType::basic(Kind::Int), vec![AirOperand::Register(cmp), AirOperand::Register(subject_reg), AirOperand::IntegerConstant(imm)]));
            list.push_back(AirInsn::new(AirOp::Jnz, CType::basic(Kind::Int), vec![AirOperand::Register(cmp), AirOperand::Label { id: *label, namespace: LabelNamespace::Statement }]));
        }
        let fallthrough = default_label.unwrap_or(end);
        list.push_back(AirInsn::new(AirOp::Jmp, CType::basic(Kind::Int), vec![AirOperand::Label { id: fallthrough, namespace: LabelNamespace::Statement }]));

        if let NodeKind::Stmt(StmtKind::Compound(items)) = sema.ast.kind(body).clone() {
            let mut case_iter = case_labels.into_iter();
            for item in items {
                match sema.ast.kind(item).clone() {
                    NodeKind::Stmt(StmtKind::Case(_, inner)) => {
                        let (_, label) = case_iter.next().unwrap();
                        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: label, namespace: LabelNamespace::Statement }]));
                        self.lower_stmt(sema, list, inner);
                    }
                    NodeKind::Stmt(StmtKind::Default(inner)) => {
                        if let Some(label) = default_label {
                            list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: label, namespace: LabelNamespace::Statement }]));
                        }
                        self.lower_stmt(sema, list, inner);
                    }
                    _ => self.lower_stmt(sema, list, item),
                }
            }
        }
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: end, namespace: LabelNamespace::Statement }]));
        self.switch_break.pop();
    }

    fn lower_return(&mut self, sema: &mut Sema, list: &mut InsnList, e: Option<AstRef>) {
        match e {
            Some(e) => {
                let ty = sema.ast.ctype(e).cloned().unwrap_or_else(CType::error);
                // Aggregates are returned by writing through an address
                // (directly into `__sret_*__` for large ones, or chunked
                // into RAX:RDX for small ones — §4.5), never by loading a
                // whole struct/union into one register.
                let reg = if ty.is_struct_or_union() { self.address_of(sema, list, e) } else { self.value_of(sema, list, e) };
                list.push_back(AirInsn::new(AirOp::Return, ty, vec![AirOperand::Register(reg)]));
            }
            None => {
                list.push_back(AirInsn::new(AirOp::Return, CType::basic(Kind::Void), vec![]));
            }
        }
    }

    fn lower_local_decl(&mut self, sema: &mut Sema, list: &mut InsnList, node: AstRef) {
        let NodeKind::VarDecl(decl) = sema.ast.kind(node).clone() else { return };
        let span = sema.ast.get(node).span;
        let ty = sema.create_type(&decl.specifiers, &decl.pieces, span);
        let storage = decl.specifiers.iter().find_map(|s| match s {
            crate::ast::nodes::Specifier::Storage(sc) => Some(*sc),
            _ => None,
        });
        if matches!(storage, Some(StorageClass::Static)) {
            self.lower_static_var_decl(sema, &decl);
            return;
        }
        list.push_back(AirInsn::new(AirOp::Declare, ty.clone(), vec![AirOperand::Symbol(decl.name.clone())]));
        match &decl.initializer {
            Some(Initializer::Expr(e)) if ty.is_scalar() => {
                let reg = self.value_of(sema, list, *e);
                let ety = sema.ast.ctype(*e).cloned().unwrap_or_else(CType::error);
                let converted = self.convert(list, &ety, &ty, reg);
                list.push_back(AirInsn::new(AirOp::Assign, ty, vec![AirOperand::Symbol(decl.name.clone()), AirOperand::Register(converted)]));
            }
            Some(Initializer::Expr(e)) if ty.is_array() && matches!(sema.ast.expr(*e), ExprKind::StringLiteral(_)) => {
                self.lower_char_array_string_init(sema, list, &decl.name, 0, &ty, *e);
            }
            Some(Initializer::List(items)) => {
                if let Some(size) = ty.size() {
                    list.push_back(AirInsn::new(
                        AirOp::Memset,
                        ty.clone(),
                        vec![AirOperand::Symbol(decl.name.clone()), AirOperand::IntegerConstant(0), AirOperand::IntegerConstant(size)],
                    ));
                }
                self.lower_initializer_list(sema, list, &decl.name, 0, &ty, items);
            }
            None if ty.is_struct_or_union() => {
                if let Some(size) = ty.size() {
                    list.push_back(AirInsn::new(
                        AirOp::Memset,
                        ty,
                        vec![AirOperand::Symbol(decl.name.clone()), AirOperand::IntegerConstant(0), AirOperand::IntegerConstant(size)],
                    ));
                }
            }
            _ => {}
        }
    }

    /// Automatic aggregate initialized by a `{...}` list (§4.4): the caller
    /// has already zeroed the whole object, so this only needs to walk the
    /// designator/positional-member resolution and emit one
    /// `IndirectSymbol`-targeted `Assign` per leaf scalar, the same
    /// resolution `Sema::analyze_initializer` already performs to type-check
    /// the same list.
    fn lower_initializer_list(&mut self, sema: &mut Sema, list: &mut InsnList, name: &str, base_offset: i64, ty: &CType, items: &[(Vec<Designator>, Initializer)]) {
        let shape = ty.aggregate_shape().cloned();
        let elem_ty = ty.pointee().cloned();
        let layout = shape.as_ref().and_then(|s| if matches!(ty.kind, Kind::Union(_)) { crate::common::types::union_layout(s) } else { crate::common::types::struct_layout(s) });
        let elem_size = elem_ty.as_ref().and_then(CType::size).unwrap_or(1);

        let mut positional = 0usize;
        for (designators, inner) in items {
            let (member_ty, offset) = match designators.last() {
                Some(Designator::Member(field)) => {
                    let idx = shape.as_ref().and_then(|s| s.member_index(field));
                    let member_ty = idx.and_then(|i| shape.as_ref().and_then(|s| s.member_types.get(i).cloned())).unwrap_or_else(CType::error);
                    let offset = idx.and_then(|i| layout.as_ref().and_then(|l| l.offsets.get(i)).copied()).unwrap_or(0) as i64;
                    (member_ty, offset)
                }
                Some(Designator::Index(idx_expr)) => {
                    let index = match sema.evaluate(ConstKind::Integer, *idx_expr) {
                        crate::sema::const_eval::ConstValue::Integer { value, .. } => value as i64,
                        _ => 0,
                    };
                    (elem_ty.clone().unwrap_or_else(CType::error), index * elem_size as i64)
                }
                None if shape.is_some() => {
                    let member_ty = shape.as_ref().and_then(|s| s.member_types.get(positional).cloned()).unwrap_or_else(CType::error);
                    let offset = layout.as_ref().and_then(|l| l.offsets.get(positional)).copied().unwrap_or(0) as i64;
                    positional += 1;
                    (member_ty, offset)
                }
                None => {
                    let offset = positional as i64 * elem_size as i64;
                    positional += 1;
                    (elem_ty.clone().unwrap_or_else(CType::error), offset)
                }
            };

            match inner {
                Initializer::Expr(e) if member_ty.is_array() && matches!(sema.ast.expr(*e), ExprKind::StringLiteral(_)) => {
                    self.lower_char_array_string_init(sema, list, name, base_offset + offset, &member_ty, *e);
                }
                Initializer::Expr(e) => {
                    let reg = self.value_of(sema, list, *e);
                    let ety = sema.ast.ctype(*e).cloned().unwrap_or_else(CType::error);
                    let converted = self.convert(list, &ety, &member_ty, reg);
                    list.push_back(AirInsn::new(
                        AirOp::Assign,
                        member_ty,
                        vec![AirOperand::IndirectSymbol { symbol: name.to_string(), offset: base_offset + offset }, AirOperand::Register(converted)],
                    ));
                }
                Initializer::List(nested) => {
                    self.lower_initializer_list(sema, list, name, base_offset + offset, &member_ty, nested);
                }
            }
        }
    }

    /// Char-array initialized from a string literal (§8 "Char-array
    /// initializer... copies `min(N, L+1)` bytes"): the destination was
    /// already `Memset` to zero, so the implicit nul terminator (and any
    /// trailing padding when `N > L`) is already in place and only the
    /// literal's own bytes need copying, chunked 8→4→2→1 like the localizer
    /// shuttles aggregate eightbytes.
    fn lower_char_array_string_init(&mut self, sema: &mut Sema, list: &mut InsnList, name: &str, base_offset: i64, ty: &CType, e: AstRef) {
        let ExprKind::StringLiteral(bytes) = sema.ast.expr(e).clone() else { return };
        let array_len = match &ty.kind {
            Kind::Array { length: Some(n), .. } => *n,
            _ => return,
        };
        let copy_len = array_len.min(bytes.len() as u64);
        if copy_len == 0 {
            return;
        }
        // Padded so the widening chunk read near the tail never runs past
        // the interned literal's own bytes.
        let mut padded = bytes;
        padded.resize(copy_len as usize + 7, 0);
        let symbol = format!(".Lstr{}", self.module.rodata.len());
        self.module.push_rodata(AirData { symbol: symbol.clone(), readonly: true, bytes: padded, relocations: vec![] });

        let mut copied = 0u64;
        while copied < copy_len {
            let chunk_ty = crate::localize::prologue::eightbyte_carrier_type(copy_len - copied);
            let chunk_size = chunk_ty.size().unwrap_or(8);
            list.push_back(AirInsn::new(
                AirOp::Assign,
                chunk_ty,
                vec![
                    AirOperand::IndirectSymbol { symbol: name.to_string(), offset: base_offset + copied as i64 },
                    AirOperand::IndirectSymbol { symbol: symbol.clone(), offset: copied as i64 },
                ],
            ));
            copied += chunk_size;
        }
    }

    // ---- expressions ----

    /// Lowers `node` and returns a register holding its *value* (never a
    /// bare address), resolving `Place::Address` with a `Load` if needed.
    fn value_of(&mut self, sema: &mut Sema, list: &mut InsnList, node: AstRef) -> Vreg {
        let place = self.lower_expr(sema, list, node);
        match place {
            Place::Value(v) => v,
            Place::Address(addr) => {
                let ty = sema.ast.ctype(node).cloned().unwrap_or_else(CType::error);
                let dest = self.module.next_vreg();
                list.push_back(AirInsn::new(AirOp::Load, ty, vec![AirOperand::Register(dest), AirOperand::IndirectRegister { base: addr, disp: 0, index: None, scale: 1 }]));
                dest
            }
        }
    }

    fn address_of(&mut self, sema: &mut Sema, list: &mut InsnList, node: AstRef) -> Vreg {
        match self.lower_expr(sema, list, node) {
            Place::Address(addr) => addr,
            Place::Value(v) => v,
        }
    }

    fn lower_expr(&mut self, sema: &mut Sema, list: &mut InsnList, node: AstRef) -> Place {
        let ty = sema.ast.ctype(node).cloned().unwrap_or_else(CType::error);
        let is_lvalue = sema.ast.get(node).is_lvalue;
        let expr = sema.ast.expr(node).clone();
        match expr {
            ExprKind::IntLiteral(v, _) | ExprKind::CharLiteral(v) => {
                let dest = self.module.next_vreg();
                list.push_back(AirInsn::new(AirOp::Load, ty, vec![AirOperand::Register(dest), AirOperand::IntegerConstant(v as u64)]));
                Place::Value(dest)
            }
            ExprKind::FloatLiteral(v, _) => {
                let symbol = self.intern_float_constant(v, &ty);
                let dest = self.module.next_vreg();
                list.push_back(AirInsn::new(AirOp::Load, ty, vec![AirOperand::Register(dest), AirOperand::Symbol(symbol)]));
                Place::Value(dest)
            }
            ExprKind::StringLiteral(bytes) => {
                let symbol = format!(".Lstr{}", self.module.rodata.len());
                self.module.push_rodata(AirData { symbol: symbol.clone(), readonly: true, bytes, relocations: vec![] });
                let dest = self.module.next_vreg();
                list.push_back(AirInsn::new(AirOp::LoadAddr, ty, vec![AirOperand::Register(dest), AirOperand::Symbol(symbol)]));
                Place::Value(dest)
            }
            ExprKind::Identifier(name) => {
                let dest = self.module.next_vreg();
                if is_lvalue || ty.is_struct_or_union() || ty.is_function() || ty.is_array() {
                    list.push_back(AirInsn::new(AirOp::LoadAddr, ty, vec![AirOperand::Register(dest), AirOperand::Symbol(name)]));
                    Place::Address(dest)
                } else {
                    list.push_back(AirInsn::new(AirOp::Load, ty, vec![AirOperand::Register(dest), AirOperand::Symbol(name)]));
                    Place::Value(dest)
                }
            }
            ExprKind::Subscript(base, index) => {
                let base_reg = self.address_of(sema, list, base);
                let index_reg = self.value_of(sema, list, index);
                let elem_size = ty.size().unwrap_or(1) as i64;
                let addr = self.module.next_vreg();
                let scaled = self.module.next_vreg();
                list.push_back(AirInsn::new(
                    AirOp::Mul,
                    CType::basic(Kind::Long),
                    vec![AirOperand::Register(scaled), AirOperand::Register(index_reg), AirOperand::IntegerConstant(elem_size as u64)],
                ));
                list.push_back(AirInsn::new(AirOp::Add, CType::pointer_to(ty.clone()), vec![AirOperand::Register(addr), AirOperand::Register(base_reg), AirOperand::Register(scaled)]));
                Place::Address(addr)
            }
            ExprKind::Member(base, field) => {
                let base_reg = self.address_of(sema, list, base);
                let base_ty = sema.ast.ctype(base).cloned().unwrap_or_else(CType::error);
                self.lower_member_offset(list, base_reg, &base_ty, &field)
            }
            ExprKind::Arrow(base, field) => {
                let base_reg = self.value_of(sema, list, base);
                let base_ty = sema.ast.ctype(base).cloned().unwrap_or_else(CType::error);
                let pointee = base_ty.pointee().cloned().unwrap_or_else(CType::error);
                self.lower_member_offset(list, base_reg, &pointee, &field)
            }
            ExprKind::Call(callee, args) => self.lower_call(sema, list, callee, &args, &ty),
            ExprKind::Unary(UnaryOp::Plus, inner) => Place::Value(self.value_of(sema, list, inner)),
            ExprKind::Unary(UnaryOp::Neg, inner) => {
                let reg = self.value_of(sema, list, inner);
                let dest = self.module.next_vreg();
                if ty.is_real_float() {
                    let mask = self.float_neg_mask(&ty);
                    list.push_back(AirInsn::new(AirOp::FloatNeg, ty, vec![AirOperand::Register(dest), AirOperand::Register(reg), AirOperand::Symbol(mask)]));
                } else {
                    list.push_back(AirInsn::new(AirOp::Neg, ty, vec![AirOperand::Register(dest), AirOperand::Register(reg)]));
                }
                Place::Value(dest)
            }
            ExprKind::Unary(UnaryOp::BitNot, inner) => {
                let reg = self.value_of(sema, list, inner);
                let dest = self.module.next_vreg();
                list.push_back(AirInsn::new(AirOp::BitNot, ty, vec![AirOperand::Register(dest), AirOperand::Register(reg)]));
                Place::Value(dest)
            }
            ExprKind::Unary(UnaryOp::LogicalNot, inner) => {
                let reg = self.value_of(sema, list, inner);
                let dest = self.module.next_vreg();
                list.push_back(AirInsn::new(AirOp::CmpEq, ty, vec![AirOperand::Register(dest), AirOperand::Register(reg), AirOperand::IntegerConstant(0)]));
                Place::Value(dest)
            }
            ExprKind::PreIncDec(op, inner) => self.lower_incdec(sema, list, op, inner, true),
            ExprKind::PostIncDec(op, inner) => self.lower_incdec(sema, list, op, inner, false),
            ExprKind::AddrOf(inner) => Place::Value(self.address_of(sema, list, inner)),
            ExprKind::Deref(inner) => {
                let reg = self.value_of(sema, list, inner);
                Place::Address(reg)
            }
            ExprKind::Cast(type_name, inner) => {
                let reg = self.value_of(sema, list, inner);
                let from = sema.ast.ctype(inner).cloned().unwrap_or_else(CType::error);
                let target = sema.type_name_to_ctype(type_name);
                Place::Value(self.convert(list, &from, &target, reg))
            }
            ExprKind::SizeofExpr(inner) => {
                let sty = sema.ast.ctype(inner).cloned().unwrap_or_else(CType::error);
                let dest = self.module.next_vreg();
                list.push_back(AirInsn::new(AirOp::Load, CType::basic(Kind::ULong), vec![AirOperand::Register(dest), AirOperand::IntegerConstant(sty.size().unwrap_or(0))]));
                Place::Value(dest)
            }
            ExprKind::SizeofType(type_name) => {
                let sty = sema.type_name_to_ctype(type_name);
                let dest = self.module.next_vreg();
                list.push_back(AirInsn::new(AirOp::Load, CType::basic(Kind::ULong), vec![AirOperand::Register(dest), AirOperand::IntegerConstant(sty.size().unwrap_or(0))]));
                Place::Value(dest)
            }
            ExprKind::Binary(BinOp::LogicalAnd, lhs, rhs) => Place::Value(self.lower_short_circuit(sema, list, lhs, rhs, true)),
            ExprKind::Binary(BinOp::LogicalOr, lhs, rhs) => Place::Value(self.lower_short_circuit(sema, list, lhs, rhs, false)),
            ExprKind::Binary(op, lhs, rhs) => Place::Value(self.lower_binary(sema, list, op, lhs, rhs, &ty)),
            ExprKind::Conditional(cond, then, els) => Place::Value(self.lower_conditional(sema, list, cond, then, els, &ty)),
            ExprKind::Assign(op, lhs, rhs) => Place::Value(self.lower_assign(sema, list, op, lhs, rhs)),
            ExprKind::Comma(lhs, rhs) => {
                self.lower_expr(sema, list, lhs);
                self.lower_expr(sema, list, rhs)
            }
            ExprKind::CompoundLiteral(..) => {
                let dest = self.module.next_vreg();
                Place::Value(dest)
            }
        }
    }

    fn lower_member_offset(&mut self, list: &mut InsnList, base_reg: Vreg, base_ty: &CType, field: &str) -> Place {
        let shape = base_ty.aggregate_shape().cloned();
        let offset = shape
            .as_ref()
            .and_then(|s| s.member_index(field))
            .and_then(|i| {
                let layout = if matches!(base_ty.kind, Kind::Union(_)) {
                    crate::common::types::union_layout(shape.as_ref().unwrap())
                } else {
                    crate::common::types::struct_layout(shape.as_ref().unwrap())
                };
                layout.map(|l| l.offsets[i] as i64)
            })
            .unwrap_or(0);
        let dest = self.module.next_vreg();
        list.push_back(AirInsn::new(AirOp::Add, CType::basic(Kind::Long), vec![AirOperand::Register(dest), AirOperand::Register(base_reg), AirOperand::IntegerConstant(offset as u64)]));
        Place::Address(dest)
    }

    fn lower_incdec(&mut self, sema: &mut Sema, list: &mut InsnList, op: IncDecOp, inner: AstRef, prefix: bool) -> Place {
        let ty = sema.ast.ctype(inner).cloned().unwrap_or_else(CType::error);
        let addr = self.address_of(sema, list, inner);
        let old = self.module.next_vreg();
        list.push_back(AirInsn::new(AirOp::Load, ty.clone(), vec![AirOperand::Register(old), AirOperand::IndirectRegister { base: addr, disp: 0, index: None, scale: 1 }]));
        let step = ty.pointee().and_then(CType::size).unwrap_or(1);
        let direct_op = match op {
            IncDecOp::Inc => AirOp::DirectAdd,
            IncDecOp::Dec => AirOp::DirectSub,
        };
        list.push_back(AirInsn::new(direct_op, ty.clone(), vec![AirOperand::IndirectRegister { base: addr, disp: 0, index: None, scale: 1 }, AirOperand::IntegerConstant(step)]));
        if prefix {
            let new = self.module.next_vreg();
            list.push_back(AirInsn::new(AirOp::Load, ty, vec![AirOperand::Register(new), AirOperand::IndirectRegister { base: addr, disp: 0, index: None, scale: 1 }]));
            Place::Value(new)
        } else {
            Place::Value(old)
        }
    }

    fn lower_call(&mut self, sema: &mut Sema, list: &mut InsnList, callee: AstRef, args: &[AstRef], ret_ty: &CType) -> Place {
        let callee_reg = self.value_of(sema, list, callee);
        let arg_regs: Vec<Vreg> = args.iter().map(|a| self.value_of(sema, list, *a)).collect();
        let dest = self.module.next_vreg();
        let mut operands = vec![AirOperand::Register(dest), AirOperand::Register(callee_reg)];
        operands.extend(arg_regs.into_iter().map(AirOperand::Register));
        let mut insn = AirInsn::new(AirOp::FuncCall, ret_ty.clone(), operands);
        insn.metadata.fcall_sret = ret_ty.is_struct_or_union() && ret_ty.size().map_or(false, |s| s > 16);
        list.push_back(insn);
        Place::Value(dest)
    }

    fn lower_short_circuit(&mut self, sema: &mut Sema, list: &mut InsnList, lhs: AstRef, rhs: AstRef, is_and: bool) -> Vreg {
        let short_circuit_label = self.module.next_label();
        let end_label = self.module.next_label();
        let lhs_reg = self.value_of(sema, list, lhs);
        let jump_op = if is_and { AirOp::Jz } else { AirOp::Jnz };
        list.push_back(AirInsn::new(jump_op, CType::basic(Kind::Int), vec![AirOperand::Register(lhs_reg), AirOperand::Label { id: short_circuit_label, namespace: LabelNamespace::ExprJoin }]));
        let rhs_reg = self.value_of(sema, list, rhs);
        let rhs_bool = self.module.next_vreg();
        list.push_back(AirInsn::new(AirOp::CmpNe, CType::basic(Kind::Int), vec![AirOperand::Register(rhs_bool), AirOperand::Register(rhs_reg), AirOperand::IntegerConstant(0)]));
        list.push_back(AirInsn::new(AirOp::Jmp, CType::basic(Kind::Int), vec![AirOperand::Label { id: end_label, namespace: LabelNamespace::ExprJoin }]));
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: short_circuit_label, namespace: LabelNamespace::ExprJoin }]));
        let short_circuit_value = if is_and { 0 } else { 1 };
        let short_circuit_reg = self.module.next_vreg();
        list.push_back(AirInsn::new(AirOp::Load, CType::basic(Kind::Int), vec![AirOperand::Register(short_circuit_reg), AirOperand::IntegerConstant(short_circuit_value)]));
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: end_label, namespace: LabelNamespace::ExprJoin }]));
        let dest = self.module.next_vreg();
        list.push_back(AirInsn::new(
            AirOp::Phi,
            CType::basic(Kind::Int),
            vec![AirOperand::Register(dest), AirOperand::Register(rhs_bool), AirOperand::Register(short_circuit_reg)],
        ));
        dest
    }

    fn lower_conditional(&mut self, sema: &mut Sema, list: &mut InsnList, cond: AstRef, then: AstRef, els: AstRef, result_ty: &CType) -> Vreg {
        let cond_reg = self.value_of(sema, list, cond);
        let else_label = self.module.next_label();
        let end_label = self.module.next_label();
        list.push_back(AirInsn::new(AirOp::Jz, CType::basic(Kind::Int), vec![AirOperand::Register(cond_reg), AirOperand::Label { id: else_label, namespace: LabelNamespace::ExprJoin }]));
        let then_ty = sema.ast.ctype(then).cloned().unwrap_or_else(CType::error);
        let then_reg = self.value_of(sema, list, then);
        let then_converted = self.convert(list, &then_ty, result_ty, then_reg);
        list.push_back(AirInsn::new(AirOp::Jmp, CType::basic(Kind::Int), vec![AirOperand::Label { id: end_label, namespace: LabelNamespace::ExprJoin }]));
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: else_label, namespace: LabelNamespace::ExprJoin }]));
        let els_ty = sema.ast.ctype(els).cloned().unwrap_or_else(CType::error);
        let els_reg = self.value_of(sema, list, els);
        let els_converted = self.convert(list, &els_ty, result_ty, els_reg);
        list.push_back(AirInsn::new(AirOp::Label, CType::basic(Kind::Int), vec![AirOperand::Label { id: end_label, namespace: LabelNamespace::ExprJoin }]));
        let dest = self.module.next_vreg();
        list.push_back(AirInsn::new(AirOp::Phi, result_ty.clone(), vec![AirOperand::Register(dest), AirOperand::Register(then_converted), AirOperand::Register(els_converted)]));
        dest
    }

    fn lower_binary(&mut self, sema: &mut Sema, list: &mut InsnList, op: BinOp, lhs: AstRef, rhs: AstRef, result_ty: &CType) -> Vreg {
        let lty = sema.ast.ctype(lhs).cloned().unwrap_or_else(CType::error);
        let rty = sema.ast.ctype(rhs).cloned().unwrap_or_else(CType::error);
        let lreg = self.value_of(sema, list, lhs);
        let rreg = self.value_of(sema, list, rhs);

        // Pointer +/- integer: delegate to pointer-offset expansion
        // (§4.4) by scaling the integer side by the pointee size.
        if matches!(op, BinOp::Add | BinOp::Sub) && (lty.is_pointer() || rty.is_pointer()) {
            return self.lower_pointer_arith(list, op, lreg, &lty, rreg, &rty);
        }

        let lconv = self.convert(list, &lty, result_ty, lreg);
        let rconv = self.convert(list, &rty, result_ty, rreg);
        let dest = self.module.next_vreg();
        let unsigned = !result_ty.is_signed();
        let air_op = match op {
            BinOp::Add => AirOp::Add,
            BinOp::Sub => AirOp::Sub,
            BinOp::Mul if unsigned => AirOp::UMul,
            BinOp::Mul => AirOp::Mul,
            BinOp::Div if unsigned => AirOp::UDiv,
            BinOp::Div => AirOp::Div,
            BinOp::Mod if unsigned => AirOp::UMod,
            BinOp::Mod => AirOp::Mod,
            BinOp::Shl => AirOp::Shl,
            BinOp::Shr if unsigned => AirOp::ShrLogical,
            BinOp::Shr => AirOp::ShrArith,
            BinOp::BitAnd => AirOp::BitAnd,
            BinOp::BitOr => AirOp::BitOr,
            BinOp::BitXor => AirOp::BitXor,
            BinOp::Lt => AirOp::CmpLt,
            BinOp::Gt => AirOp::CmpGt,
            BinOp::Le => AirOp::CmpLe,
            BinOp::Ge => AirOp::CmpGe,
            BinOp::Eq => AirOp::CmpEq,
            BinOp::Ne => AirOp::CmpNe,
            BinOp::LogicalAnd | BinOp::LogicalOr => unreachable!("handled by lower_short_circuit"),
        };
        list.push_back(AirInsn::new(air_op, result_ty.clone(), vec![AirOperand::Register(dest), AirOperand::Register(lconv), AirOperand::Register(rconv)]));
        dest
    }

    fn lower_pointer_arith(&mut self, list: &mut InsnList, op: BinOp, lreg: Vreg, lty: &CType, rreg: Vreg, rty: &CType) -> Vreg {
        let dest = self.module.next_vreg();
        if lty.is_pointer() && rty.is_pointer() {
            // `a - b` on two pointers: byte difference / sizeof(pointee).
            let elem_size = lty.pointee().and_then(CType::size).unwrap_or(1);
            let diff = self.module.next_vreg();
            list.push_back(AirInsn::new(AirOp::Sub, CType::basic(Kind::Long), vec![AirOperand::Register(diff), AirOperand::Register(lreg), AirOperand::Register(rreg)]));
            list.push_back(AirInsn::new(AirOp::Div, CType::basic(Kind::Long), vec![AirOperand::Register(dest), AirOperand::Register(diff), AirOperand::IntegerConstant(elem_size)]));
            return dest;
        }
        let (ptr_reg, ptr_ty, int_reg) = if lty.is_pointer() { (lreg, lty, rreg) } else { (rreg, rty, lreg) };
        let elem_size = ptr_ty.pointee().and_then(CType::size).unwrap_or(1);
        let scaled = self.module.next_vreg();
        list.push_back(AirInsn::new(AirOp::Mul, CType::basic(Kind::Long), vec![AirOperand::Register(scaled), AirOperand::Register(int_reg), AirOperand::IntegerConstant(elem_size)]));
        let air_op = if matches!(op, BinOp::Sub) && !lty.is_pointer() {
            // unreachable: `int - pointer` is ill-typed and rejected by the analyzer
            AirOp::Add
        } else if matches!(op, BinOp::Sub) {
            AirOp::Sub
        } else {
            AirOp::Add
        };
        list.push_back(AirInsn::new(air_op, ptr_ty.clone(), vec![AirOperand::Register(dest), AirOperand::Register(ptr_reg), AirOperand::Register(scaled)]));
        dest
    }

    fn lower_assign(&mut self, sema: &mut Sema, list: &mut InsnList, op: AssignOp, lhs: AstRef, rhs: AstRef) -> Vreg {
        let lty = sema.ast.ctype(lhs).cloned().unwrap_or_else(CType::error);
        let rty = sema.ast.ctype(rhs).cloned().unwrap_or_else(CType::error);
        let lhs_addr = self.address_of(sema, list, lhs);
        let rreg = self.value_of(sema, list, rhs);
        let converted = self.convert(list, &rty, &lty, rreg);
        if matches!(op, AssignOp::Assign) {
            list.push_back(AirInsn::new(AirOp::Assign, lty, vec![AirOperand::IndirectRegister { base: lhs_addr, disp: 0, index: None, scale: 1 }, AirOperand::Register(converted)]));
        } else {
            let scaled = if lty.is_pointer() {
                let elem = lty.pointee().and_then(CType::size).unwrap_or(1);
                let s = self.module.next_vreg();
                list.push_back(AirInsn::new(AirOp::Mul, CType::basic(Kind::Long), vec![AirOperand::Register(s), AirOperand::Register(converted), AirOperand::IntegerConstant(elem)]));
                s
            } else {
                converted
            };
            let direct_op = match op {
                AssignOp::Add => AirOp::DirectAdd,
                AssignOp::Sub => AirOp::DirectSub,
                AssignOp::Mul => AirOp::DirectMul,
                AssignOp::Div => AirOp::DirectDiv,
                AssignOp::Mod => AirOp::DirectMod,
                AssignOp::Shl => AirOp::DirectShl,
                AssignOp::Shr => AirOp::DirectShr,
                AssignOp::BitAnd => AirOp::DirectBitAnd,
                AssignOp::BitOr => AirOp::DirectBitOr,
                AssignOp::BitXor => AirOp::DirectBitXor,
                AssignOp::Assign => unreachable!(),
            };
            list.push_back(AirInsn::new(direct_op, lty, vec![AirOperand::IndirectRegister { base: lhs_addr, disp: 0, index: None, scale: 1 }, AirOperand::Register(scaled)]));
        }
        converted
    }

    /// `convert(from, to, reg) -> reg` (§4.4): emits one conversion
    /// instruction, or none if the types already match.
    fn convert(&mut self, list: &mut InsnList, from: &CType, to: &CType, reg: Vreg) -> Vreg {
        if from == to || from.is_error() || to.is_error() {
            return reg;
        }
        let (Some(from_size), Some(to_size)) = (from.size(), to.size()) else { return reg };
        let op = match (from.is_real_float(), to.is_real_float()) {
            (false, true) => {
                if from.is_signed() {
                    AirOp::ConvertIntToFloat
                } else {
                    AirOp::ConvertUIntToFloat
                }
            }
            (true, false) => {
                if to.is_signed() {
                    AirOp::ConvertFloatToInt
                } else {
                    AirOp::ConvertFloatToUInt
                }
            }
            (true, true) => {
                if to_size > from_size {
                    AirOp::ConvertFloatWiden
                } else if to_size < from_size {
                    AirOp::ConvertFloatNarrow
                } else {
                    return reg;
                }
            }
            (false, false) => {
                if to_size > from_size {
                    if from.is_signed() {
                        AirOp::ConvertSSignExtend
                    } else {
                        AirOp::ConvertUZeroExtend
                    }
                } else if to_size < from_size {
                    AirOp::ConvertTruncate
                } else {
                    return reg;
                }
            }
        };
        let dest = self.module.next_vreg();
        list.push_back(AirInsn::new(op, to.clone(), vec![AirOperand::Register(dest), AirOperand::Register(reg)]));
        dest
    }

    fn intern_float_constant(&mut self, value: f64, ty: &CType) -> String {
        let symbol = format!(".Lfconst{}", self.module.rodata.len());
        let bytes = if matches!(ty.kind, Kind::Float) {
            (value as f32).to_le_bytes().to_vec()
        } else {
            value.to_le_bytes().to_vec()
        };
        self.module.push_rodata(AirData { symbol: symbol.clone(), readonly: true, bytes, relocations: vec![] });
        symbol
    }

    /// Lazily creates the per-width XOR sign mask used to negate a float
    /// without a dedicated negate instruction (§4.5 fixed-register opcodes).
    fn float_neg_mask(&mut self, ty: &CType) -> String {
        let key: &'static str = if matches!(ty.kind, Kind::Float) { "f32" } else { "f64" };
        if let Some(sym) = self.float_neg_masks.get(key) {
            return sym.clone();
        }
        let symbol = format!(".Lnegmask.{key}");
        let bytes = if key == "f32" { 0x8000_0000u32.to_le_bytes().to_vec() } else { 0x8000_0000_0000_0000u64.to_le_bytes().to_vec() };
        self.module.push_rodata(AirData { symbol: symbol.clone(), readonly: true, bytes, relocations: vec![] });
        self.float_neg_masks.insert(key, symbol.clone());
        symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::nodes::Ast;
    use crate::ast::symbol::SymbolTable;
    use crate::common::source::Span;

    fn sema() -> Sema {
        Sema::new(Ast::new(), SymbolTable::new())
    }

    #[test]
    fn integer_literal_lowers_to_a_single_load() {
        let mut s = sema();
        let lit = s.ast.push(NodeKind::Expr(ExprKind::IntLiteral(42, CType::basic(Kind::Int))), Span::dummy());
        s.ast.set_ctype(lit, CType::basic(Kind::Int));
        let mut lowerer = Lowerer::new(Locale::X86_64);
        let mut list = InsnList::new();
        let reg = lowerer.value_of(&mut s, &mut list, lit);
        assert_eq!(list.iter().count(), 1);
        let (_, insn) = list.iter().next().unwrap();
        assert_eq!(insn.op, AirOp::Load);
        assert_eq!(insn.dest_vreg(), Some(reg));
    }

    #[test]
    fn arithmetic_binary_emits_convert_then_op() {
        let mut s = sema();
        let a = s.ast.push(NodeKind::Expr(ExprKind::IntLiteral(1, CType::basic(Kind::Int))), Span::dummy());
        s.ast.set_ctype(a, CType::basic(Kind::Int));
        let b = s.ast.push(NodeKind::Expr(ExprKind::IntLiteral(2, CType::basic(Kind::Int))), Span::dummy());
        s.ast.set_ctype(b, CType::basic(Kind::Int));
        let add = s.ast.push(NodeKind::Expr(ExprKind::Binary(BinOp::Add, a, b)), Span::dummy());
        s.ast.set_ctype(add, CType::basic(Kind::Int));
        let mut lowerer = Lowerer::new(Locale::X86_64);
        let mut list = InsnList::new();
        lowerer.value_of(&mut s, &mut list, add);
        assert!(list.iter().any(|(_, insn)| insn.op == AirOp::Add));
    }

    #[test]
    fn logical_and_short_circuits_with_a_phi() {
        let mut s = sema();
        let a = s.ast.push(NodeKind::Expr(ExprKind::IntLiteral(0, CType::basic(Kind::Int))), Span::dummy());
        s.ast.set_ctype(a, CType::basic(Kind::Int));
        let b = s.ast.push(NodeKind::Expr(ExprKind::IntLiteral(1, CType::basic(Kind::Int))), Span::dummy());
        s.ast.set_ctype(b, CType::basic(Kind::Int));
        let and = s.ast.push(NodeKind::Expr(ExprKind::Binary(BinOp::LogicalAnd, a, b)), Span::dummy());
        s.ast.set_ctype(and, CType::basic(Kind::Int));
        let mut lowerer = Lowerer::new(Locale::X86_64);
        let mut list = InsnList::new();
        lowerer.value_of(&mut s, &mut list, and);
        assert!(list.iter().any(|(_, insn)| insn.op == AirOp::Phi));
        assert!(list.iter().any(|(_, insn)| insn.op == AirOp::Jz));
    }

    #[test]
    fn initializer_list_assigns_each_member_through_its_own_offset() {
        let mut s = sema();
        let shape = crate::common::types::AggregateShape {
            tag: None,
            member_names: vec!["x".into(), "y".into()],
            member_types: vec![CType::basic(Kind::Int), CType::basic(Kind::Int)],
            member_bitfields: vec![None, None],
        };
        let ty = CType::new(Kind::Struct(shape));
        let a = s.ast.push(NodeKind::Expr(ExprKind::IntLiteral(1, CType::basic(Kind::Int))), Span::dummy());
        s.ast.set_ctype(a, CType::basic(Kind::Int));
        let b = s.ast.push(NodeKind::Expr(ExprKind::IntLiteral(2, CType::basic(Kind::Int))), Span::dummy());
        s.ast.set_ctype(b, CType::basic(Kind::Int));
        let items = vec![(vec![], Initializer::Expr(a)), (vec![], Initializer::Expr(b))];

        let mut lowerer = Lowerer::new(Locale::X86_64);
        let mut list = InsnList::new();
        lowerer.lower_initializer_list(&mut s, &mut list, "p", 0, &ty, &items);

        let assigns: Vec<&AirInsn> = list.iter().map(|(_, i)| i).filter(|i| i.op == AirOp::Assign).collect();
        assert_eq!(assigns.len(), 2);
        assert_eq!(assigns[0].operands[0], AirOperand::IndirectSymbol { symbol: "p".into(), offset: 0 });
        assert_eq!(assigns[1].operands[0], AirOperand::IndirectSymbol { symbol: "p".into(), offset: 4 });
    }

    #[test]
    fn initializer_list_designated_member_resolves_its_declared_offset() {
        let mut s = sema();
        let shape = crate::common::types::AggregateShape {
            tag: None,
            member_names: vec!["x".into(), "y".into()],
            member_types: vec![CType::basic(Kind::Int), CType::basic(Kind::Double)],
            member_bitfields: vec![None, None],
        };
        let ty = CType::new(Kind::Struct(shape));
        let v = s.ast.push(NodeKind::Expr(ExprKind::FloatLiteral(1.5, CType::basic(Kind::Double))), Span::dummy());
        s.ast.set_ctype(v, CType::basic(Kind::Double));
        let items = vec![(vec![Designator::Member("y".into())], Initializer::Expr(v))];

        let mut lowerer = Lowerer::new(Locale::X86_64);
        let mut list = InsnList::new();
        lowerer.lower_initializer_list(&mut s, &mut list, "p", 0, &ty, &items);

        let assign = list.iter().map(|(_, i)| i).find(|i| i.op == AirOp::Assign).unwrap();
        assert_eq!(assign.operands[0], AirOperand::IndirectSymbol { symbol: "p".into(), offset: 8 });
    }

    #[test]
    fn char_array_string_initializer_copies_min_of_array_len_and_literal_len() {
        let mut s = sema();
        let lit = s.ast.push(NodeKind::Expr(ExprKind::StringLiteral(b"hi".to_vec())), Span::dummy());
        let ty = CType::array_of(CType::basic(Kind::Char), Some(8), None);

        let mut lowerer = Lowerer::new(Locale::X86_64);
        let mut list = InsnList::new();
        lowerer.lower_char_array_string_init(&mut s, &mut list, "buf", 0, &ty, lit);

        let assigns: Vec<&AirInsn> = list.iter().map(|(_, i)| i).filter(|i| i.op == AirOp::Assign).collect();
        assert_eq!(assigns.len(), 1);
        assert_eq!(assigns[0].operands[0], AirOperand::IndirectSymbol { symbol: "buf".into(), offset: 0 });
        assert_eq!(assigns[0].operand_type, CType::basic(Kind::UShort));
    }
}
