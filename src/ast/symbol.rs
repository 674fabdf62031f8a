//! The symbol table handed to this crate by the (out-of-scope) parser/symbol
//! insertion pass, per §6. Namespace-qualified lookups mirror C's distinct
//! name spaces (label, tag-derived struct/union/enum, struct/union member,
//! ordinary).

use crate::common::source::Span;
use crate::common::types::{AstRef, CType};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    Ordinary,
    Label,
    Struct,
    Union,
    Enum,
    /// Keyed by the owning struct's tag (or a synthetic name for anonymous
    /// structs) so that member lookups inside `s.field`/`p->field` resolve
    /// against the right aggregate (§4.1: members are re-namespaced to
    /// `StructMember(struct-type)` on completion).
    StructMember(String),
    UnionMember(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    None,
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageDuration {
    Automatic,
    Static,
    /// Allocated storage duration is out of scope (no `malloc` intrinsics
    /// modeled); kept for exhaustiveness against ISO's storage-duration set.
    Allocated,
}

/// A relocation inside a symbol's static initial data: `target + addend` is
/// the value stored at `offset` bytes into the object (§3.3 `AirData`).
#[derive(Debug, Clone)]
pub struct Relocation {
    pub offset: u64,
    pub target_symbol: Option<String>,
    pub addend: i64,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub declarer: AstRef,
    pub ty: CType,
    pub ns: Namespace,
    pub linkage: Linkage,
    pub storage_duration: StorageDuration,
    /// Raw bytes of the evaluated static initializer, if any; `None` for
    /// automatic-duration objects and for tentative definitions before
    /// end-of-translation-unit finalization (GLOSSARY: "tentative
    /// definition").
    pub initial_data: Option<Vec<u8>>,
    pub addresses: Vec<Relocation>,
    pub is_tentative_definition: bool,
    pub span: Span,
    /// Set once the type constructor folds an enumeration's constants
    /// (GLOSSARY: enumerator constant folding); `None` for every other kind
    /// of symbol.
    pub enum_value: Option<i64>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, declarer: AstRef, ty: CType, ns: Namespace, span: Span) -> Self {
        Self {
            name: name.into(),
            declarer,
            ty,
            ns,
            linkage: Linkage::None,
            storage_duration: StorageDuration::Automatic,
            initial_data: None,
            addresses: Vec::new(),
            is_tentative_definition: false,
            span,
            enum_value: None,
        }
    }
}

/// Namespace-qualified symbol storage with lexical scoping (§6). Scopes
/// nest; lookups walk outward from the innermost open scope.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<HashMap<(Namespace, String), Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { scopes: vec![HashMap::new()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
        debug_assert!(!self.scopes.is_empty(), "popped the file scope");
    }

    pub fn insert(&mut self, sym: Symbol) {
        let key = (sym.ns.clone(), sym.name.clone());
        self.scopes.last_mut().unwrap().insert(key, sym);
    }

    pub fn lookup(&self, ns: &Namespace, name: &str) -> Option<&Symbol> {
        let key_name = name.to_string();
        for scope in self.scopes.iter().rev() {
            if let Some(sym) = scope.get(&(ns.clone(), key_name.clone())) {
                return Some(sym);
            }
        }
        None
    }

    pub fn lookup_mut(&mut self, ns: &Namespace, name: &str) -> Option<&mut Symbol> {
        let key_name = name.to_string();
        for scope in self.scopes.iter_mut().rev() {
            if let Some(sym) = scope.get_mut(&(ns.clone(), key_name.clone())) {
                return Some(sym);
            }
        }
        None
    }

    /// Lookup restricted to the current (innermost) scope, used for
    /// redeclaration/"no two identifiers in the same scope" checks.
    pub fn lookup_current_scope(&self, ns: &Namespace, name: &str) -> Option<&Symbol> {
        self.scopes.last().unwrap().get(&(ns.clone(), name.to_string()))
    }

    pub fn file_scope_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.scopes[0].values()
    }

    pub fn file_scope_symbols_mut(&mut self) -> impl Iterator<Item = &mut Symbol> {
        self.scopes[0].values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{CType, Kind};

    #[test]
    fn inner_scope_shadows_outer() {
        let mut table = SymbolTable::new();
        table.insert(Symbol::new("x", 0, CType::basic(Kind::Int), Namespace::Ordinary, Span::dummy()));
        table.push_scope();
        table.insert(Symbol::new("x", 1, CType::basic(Kind::Double), Namespace::Ordinary, Span::dummy()));
        assert_eq!(table.lookup(&Namespace::Ordinary, "x").unwrap().ty, CType::basic(Kind::Double));
        table.pop_scope();
        assert_eq!(table.lookup(&Namespace::Ordinary, "x").unwrap().ty, CType::basic(Kind::Int));
    }

    #[test]
    fn namespaces_do_not_collide() {
        let mut table = SymbolTable::new();
        table.insert(Symbol::new("foo", 0, CType::basic(Kind::Int), Namespace::Ordinary, Span::dummy()));
        table.insert(Symbol::new("foo", 1, CType::new(Kind::Struct(crate::common::types::AggregateShape {
            tag: Some("foo".into()), member_names: vec![], member_types: vec![], member_bitfields: vec![],
        })), Namespace::Struct, Span::dummy()));
        assert!(table.lookup(&Namespace::Ordinary, "foo").is_some());
        assert!(table.lookup(&Namespace::Struct, "foo").is_some());
    }
}
