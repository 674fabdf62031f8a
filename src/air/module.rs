//! `AirModule`, `AirData`, `AirRoutine` (§3.3) and their ownership/lifecycle
//! rules (§3.4): symbols referenced from AIR operands are borrowed from the
//! symbol table by name, never duplicated; the module owns every
//! instruction list and data object outright.

use crate::air::insn::InsnList;
use crate::common::types::CType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    Neutral,
    X86_64,
}

#[derive(Debug, Clone)]
pub struct Relocation {
    pub offset: u64,
    pub target_symbol: Option<String>,
    pub addend: i64,
}

#[derive(Debug, Clone)]
pub struct AirData {
    pub symbol: String,
    pub readonly: bool,
    pub bytes: Vec<u8>,
    pub relocations: Vec<Relocation>,
}

#[derive(Debug)]
pub struct AirRoutine {
    pub symbol: String,
    pub insns: InsnList,
    pub uses_varargs: bool,
    /// Hidden pointer-to-result symbol for `sret` returns on aggregates
    /// larger than two eightbytes (§4.5).
    pub retptr: Option<String>,
    pub return_type: CType,
    pub param_types: Vec<CType>,
    /// Declared parameter names, in order, so the localizer can bind
    /// incoming registers to the same storage the body's `Identifier`
    /// lookups already reference by name (§4.5).
    pub param_names: Vec<String>,
}

impl AirRoutine {
    pub fn new(symbol: impl Into<String>, return_type: CType, param_types: Vec<CType>) -> Self {
        Self { symbol: symbol.into(), insns: InsnList::new(), uses_varargs: false, retptr: None, return_type, param_types, param_names: Vec::new() }
    }
}

/// Owns every routine and static data object produced by lowering a
/// translation unit, plus the process-wide monotonic vreg/label counters
/// scoped to this module (§5: "a process-wide monotonic generator scoped
/// to the current `AirModule`").
#[derive(Debug)]
pub struct AirModule {
    pub rodata: Vec<AirData>,
    pub data: Vec<AirData>,
    pub routines: Vec<AirRoutine>,
    pub locale: Locale,
    next_vreg: u32,
    next_label: u64,
    /// First ids are reserved for the fixed physical registers the
    /// localizer pins operands to (`RAX`..`R15`, `XMM0`..`XMM15`); virtual
    /// registers for ordinary values start past this reservation (§3.3).
    first_virtual_vreg: u32,
}

pub const PHYSICAL_REGISTER_COUNT: u32 = 32;

impl AirModule {
    pub fn new(locale: Locale) -> Self {
        Self {
            rodata: Vec::new(),
            data: Vec::new(),
            routines: Vec::new(),
            locale,
            next_vreg: PHYSICAL_REGISTER_COUNT,
            next_label: 0,
            first_virtual_vreg: PHYSICAL_REGISTER_COUNT,
        }
    }

    pub fn next_vreg(&mut self) -> u32 {
        let v = self.next_vreg;
        self.next_vreg += 1;
        v
    }

    pub fn next_label(&mut self) -> u64 {
        let l = self.next_label;
        self.next_label += 1;
        l
    }

    pub fn is_virtual(&self, vreg: u32) -> bool {
        vreg >= self.first_virtual_vreg
    }

    pub fn push_rodata(&mut self, data: AirData) {
        self.rodata.push(data);
    }

    pub fn push_data(&mut self, data: AirData) {
        self.data.push(data);
    }

    pub fn push_routine(&mut self, routine: AirRoutine) {
        self.routines.push(routine);
    }
}
