//! Symbol tables and the scope manager.
//!
//! A [`SymbolTable`] is a LIFO stack of entries interleaved with scope
//! boundaries, plus a per-name stack of entry positions for lookups. Popping
//! a scope unwinds both, so a name shadowed by an inner declaration resolves
//! to the outer binding again once the inner scope closes.
//!
//! [`Scopes`] pairs the two namespaces the language has (user types and
//! variables/functions) and hands out storage slots.

use crate::semantic::datatype::{datatypes_match, Datatype, DatatypeRef};
use crate::utils::intern::Symbol;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Storage slot of a declared entity.
///
/// Locals count up from 1 within a function. Globals, user functions and
/// intrinsics each count up from 0 in their own class. A struct-typed
/// variable takes one slot for itself and one per member, so member `m` of a
/// struct at slot `s` lives at `s + 1 + m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SymbolIndex {
    #[default]
    None,
    Local(u32),
    Global(u32),
    Function(u32),
    Intrinsic(u32),
}

impl fmt::Display for SymbolIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolIndex::None => write!(f, "-"),
            SymbolIndex::Local(i) => write!(f, "local {}", i),
            SymbolIndex::Global(i) => write!(f, "global {}", i),
            SymbolIndex::Function(i) => write!(f, "function {}", i),
            SymbolIndex::Intrinsic(i) => write!(f, "intrinsic {}", i),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    #[error("symbol already defined in this scope")]
    DuplicateSymbol,
    #[error("function already defined")]
    DuplicateFunction(SymbolIndex),
}

#[derive(Debug)]
pub struct ScopeEntry {
    pub name: Symbol,
    pub datatype: DatatypeRef,
    pub index: SymbolIndex,
    /// Functions only: a body has been seen
    pub defined: bool,
    referenced: Cell<bool>,
}

impl ScopeEntry {
    pub fn new(name: Symbol, datatype: DatatypeRef, index: SymbolIndex) -> Self {
        Self { name, datatype, index, defined: false, referenced: Cell::new(false) }
    }

    pub fn is_referenced(&self) -> bool {
        self.referenced.get()
    }
}

#[derive(Debug)]
enum Slot {
    Boundary,
    Entry(ScopeEntry),
}

/// One namespace of nested scopes.
#[derive(Debug, Default)]
pub struct SymbolTable {
    slots: Vec<Slot>,
    /// Positions of the boundary slots, innermost last
    boundaries: Vec<usize>,
    by_name: HashMap<Symbol, Vec<usize>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a nested scope.
    pub fn push_boundary(&mut self) {
        self.boundaries.push(self.slots.len());
        self.slots.push(Slot::Boundary);
    }

    /// Close the innermost scope, dropping everything declared in it.
    pub fn pop_scope(&mut self) {
        while let Some(slot) = self.slots.pop() {
            match slot {
                Slot::Boundary => {
                    self.boundaries.pop();
                    return;
                }
                Slot::Entry(entry) => {
                    if let Some(stack) = self.by_name.get_mut(&entry.name) {
                        stack.pop();
                        if stack.is_empty() {
                            self.by_name.remove(&entry.name);
                        }
                    }
                }
            }
        }
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.boundaries.len()
    }

    pub fn insert(&mut self, entry: ScopeEntry) {
        let position = self.slots.len();
        self.by_name.entry(entry.name).or_default().push(position);
        self.slots.push(Slot::Entry(entry));
    }

    /// Whether `name` is declared in the innermost scope.
    pub fn in_current_scope(&self, name: Symbol) -> bool {
        let position = match self.by_name.get(&name).and_then(|stack| stack.last()) {
            Some(&position) => position,
            None => return false,
        };
        match self.boundaries.last() {
            Some(&floor) => position > floor,
            None => true,
        }
    }

    /// The innermost visible entry for `name`; marks it referenced.
    pub fn find(&self, name: Symbol) -> Option<&ScopeEntry> {
        let position = *self.by_name.get(&name)?.last()?;
        let entry = self.entry_at(position)?;
        entry.referenced.set(true);
        Some(entry)
    }

    /// Every visible entry named `name`, innermost first.
    pub fn overloads(&self, name: Symbol) -> impl Iterator<Item = &ScopeEntry> + '_ {
        self.by_name
            .get(&name)
            .into_iter()
            .flat_map(|stack| stack.iter().rev())
            .filter_map(move |&position| self.entry_at(position))
    }

    fn entry_at(&self, position: usize) -> Option<&ScopeEntry> {
        match self.slots.get(position) {
            Some(Slot::Entry(entry)) => Some(entry),
            _ => None,
        }
    }

    fn entry_at_mut(&mut self, position: usize) -> Option<&mut ScopeEntry> {
        match self.slots.get_mut(position) {
            Some(Slot::Entry(entry)) => Some(entry),
            _ => None,
        }
    }
}

/// The scope manager: both namespaces plus storage-slot counters.
#[derive(Debug, Default)]
pub struct Scopes {
    pub usertypes: SymbolTable,
    pub variables: SymbolTable,
    in_function: bool,
    local_slots: u32,
    global_slots: u32,
    function_count: u32,
    intrinsic_count: u32,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.usertypes.push_boundary();
        self.variables.push_boundary();
    }

    pub fn pop_scope(&mut self) {
        self.usertypes.pop_scope();
        self.variables.pop_scope();
    }

    /// Open a function body scope and restart local slot numbering.
    pub fn enter_function(&mut self) {
        self.push_scope();
        self.in_function = true;
        self.local_slots = 0;
    }

    /// Close the function body scope; returns the local slots it used.
    pub fn leave_function(&mut self) -> u32 {
        self.pop_scope();
        self.in_function = false;
        self.local_slots
    }

    /// Number of user function indices handed out so far.
    pub fn function_count(&self) -> u32 {
        self.function_count
    }

    pub fn push_variable(&mut self, name: Symbol, datatype: DatatypeRef) -> Result<SymbolIndex, ScopeError> {
        if self.variables.in_current_scope(name) {
            return Err(ScopeError::DuplicateSymbol);
        }
        let reserve = match &*self.reduce(&datatype) {
            Datatype::Struct { members, .. } => 1 + members.len() as u32,
            _ => 1,
        };
        let index = if self.in_function {
            let index = SymbolIndex::Local(self.local_slots + 1);
            self.local_slots += reserve;
            index
        } else {
            let index = SymbolIndex::Global(self.global_slots);
            self.global_slots += reserve;
            index
        };
        self.variables.insert(ScopeEntry::new(name, datatype, index));
        Ok(index)
    }

    pub fn push_usertype(&mut self, name: Symbol, datatype: DatatypeRef) -> Result<(), ScopeError> {
        if self.usertypes.in_current_scope(name) {
            return Err(ScopeError::DuplicateSymbol);
        }
        self.usertypes.insert(ScopeEntry::new(name, datatype, SymbolIndex::None));
        Ok(())
    }

    /// Register a function signature under `name`.
    ///
    /// An identical signature already registered returns its index. Giving a
    /// second body to the same signature is `DuplicateFunction`; prototypes
    /// (`just_declare`) never are.
    pub fn push_function(
        &mut self,
        name: Symbol,
        datatype: DatatypeRef,
        just_declare: bool,
    ) -> Result<SymbolIndex, ScopeError> {
        let existing = self.variables.by_name.get(&name).and_then(|stack| {
            stack.iter().rev().copied().find(|&position| {
                self.variables
                    .entry_at(position)
                    .map(|entry| entry.datatype.is_function() && datatypes_match(&entry.datatype, &datatype))
                    .unwrap_or(false)
            })
        });

        if let Some(position) = existing {
            if let Some(entry) = self.variables.entry_at_mut(position) {
                let index = entry.index;
                if !just_declare {
                    if entry.defined {
                        return Err(ScopeError::DuplicateFunction(index));
                    }
                    entry.defined = true;
                }
                return Ok(index);
            }
        }

        let intrinsic = matches!(&*datatype, Datatype::Function { intrinsic: true, .. });
        let index = if intrinsic {
            self.intrinsic_count += 1;
            SymbolIndex::Intrinsic(self.intrinsic_count - 1)
        } else {
            self.function_count += 1;
            SymbolIndex::Function(self.function_count - 1)
        };
        let mut entry = ScopeEntry::new(name, datatype, index);
        entry.defined = !just_declare;
        self.variables.insert(entry);
        Ok(index)
    }

    pub fn find_variable(&self, name: Symbol) -> Option<(DatatypeRef, SymbolIndex)> {
        self.variables.find(name).map(|entry| (Rc::clone(&entry.datatype), entry.index))
    }

    pub fn find_usertype(&self, name: Symbol) -> Option<DatatypeRef> {
        self.usertypes.find(name).map(|entry| Rc::clone(&entry.datatype))
    }

    /// Every visible variable-namespace entry named `name`, innermost first.
    pub fn overloads(&self, name: Symbol) -> impl Iterator<Item = &ScopeEntry> + '_ {
        self.variables.overloads(name)
    }

    /// Follow user type aliases down to a concrete datatype.
    ///
    /// Stub aliases emitted by the parser are resolved by looking the name
    /// up in the usertype namespace as it stands now. A name that cannot be
    /// resolved is returned unchanged.
    pub fn reduce(&self, datatype: &DatatypeRef) -> DatatypeRef {
        const MAX_ALIAS_DEPTH: usize = 64;
        let mut current = Rc::clone(datatype);
        for _ in 0..MAX_ALIAS_DEPTH {
            let next = match &*current {
                Datatype::User { details: Some(details), .. } => Rc::clone(details),
                Datatype::User { name, details: None } => match self.find_usertype(*name) {
                    Some(found) if !Rc::ptr_eq(&found, &current) => found,
                    _ => return current,
                },
                _ => return current,
            };
            current = next;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::datatype::{function_of, Primitives, StructMember};
    use crate::utils::intern::StringCache;

    #[test]
    fn test_shadowing_is_restored_on_pop() {
        let prims = Primitives::new();
        let mut strings = StringCache::new();
        let x = strings.intern("x");
        let mut scopes = Scopes::new();
        scopes.push_scope();
        scopes.push_variable(x, Rc::clone(&prims.int)).unwrap();

        scopes.push_scope();
        scopes.push_variable(x, Rc::clone(&prims.float)).unwrap();
        let (dt, _) = scopes.find_variable(x).unwrap();
        assert!(datatypes_match(&dt, &prims.float));
        scopes.pop_scope();

        let (dt, _) = scopes.find_variable(x).unwrap();
        assert!(datatypes_match(&dt, &prims.int));
        scopes.pop_scope();
        assert!(scopes.find_variable(x).is_none());
    }

    #[test]
    fn test_inner_variable_not_visible_after_pop() {
        let prims = Primitives::new();
        let mut strings = StringCache::new();
        let y = strings.intern("y");
        let mut scopes = Scopes::new();
        scopes.push_scope();
        scopes.push_scope();
        scopes.push_variable(y, Rc::clone(&prims.bool_)).unwrap();
        assert!(scopes.find_variable(y).is_some());
        scopes.pop_scope();
        assert!(scopes.find_variable(y).is_none());
        assert_eq!(scopes.variables.depth(), 1);
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let prims = Primitives::new();
        let mut strings = StringCache::new();
        let x = strings.intern("x");
        let mut scopes = Scopes::new();
        scopes.push_variable(x, Rc::clone(&prims.int)).unwrap();
        assert_eq!(
            scopes.push_variable(x, Rc::clone(&prims.float)),
            Err(ScopeError::DuplicateSymbol)
        );
        scopes.push_scope();
        assert!(scopes.push_variable(x, Rc::clone(&prims.float)).is_ok());
    }

    #[test]
    fn test_slot_allocation_reserves_struct_members() {
        let prims = Primitives::new();
        let mut strings = StringCache::new();
        let (a, b, s, m, n) = (
            strings.intern("a"),
            strings.intern("b"),
            strings.intern("s"),
            strings.intern("m"),
            strings.intern("n"),
        );
        let strukt = Rc::new(Datatype::Struct {
            name: None,
            members: vec![
                StructMember { name: m, datatype: Rc::clone(&prims.float) },
                StructMember { name: n, datatype: Rc::clone(&prims.float) },
            ],
        });

        let mut scopes = Scopes::new();
        assert_eq!(scopes.push_variable(a, Rc::clone(&prims.int)), Ok(SymbolIndex::Global(0)));
        assert_eq!(scopes.push_variable(s, Rc::clone(&strukt)), Ok(SymbolIndex::Global(1)));
        assert_eq!(scopes.push_variable(b, Rc::clone(&prims.int)), Ok(SymbolIndex::Global(4)));

        scopes.enter_function();
        assert_eq!(scopes.push_variable(s, Rc::clone(&strukt)), Ok(SymbolIndex::Local(1)));
        assert_eq!(scopes.push_variable(a, Rc::clone(&prims.int)), Ok(SymbolIndex::Local(4)));
        assert_eq!(scopes.leave_function(), 4);
    }

    #[test]
    fn test_push_function_overloads_and_duplicates() {
        let prims = Primitives::new();
        let mut strings = StringCache::new();
        let f = strings.intern("f");
        let mut scopes = Scopes::new();
        let f_float = function_of(Some(Rc::clone(&prims.float)), vec![Rc::clone(&prims.float)], false);
        let f_int = function_of(Some(Rc::clone(&prims.float)), vec![Rc::clone(&prims.int)], false);

        assert_eq!(scopes.push_function(f, Rc::clone(&f_float), true), Ok(SymbolIndex::Function(0)));
        assert_eq!(scopes.push_function(f, Rc::clone(&f_float), false), Ok(SymbolIndex::Function(0)));
        assert_eq!(scopes.push_function(f, Rc::clone(&f_int), false), Ok(SymbolIndex::Function(1)));
        assert_eq!(
            scopes.push_function(f, Rc::clone(&f_float), false),
            Err(ScopeError::DuplicateFunction(SymbolIndex::Function(0)))
        );
        assert_eq!(scopes.overloads(f).count(), 2);
        assert_eq!(scopes.function_count(), 2);

        let sin = strings.intern("sin");
        let intrinsic = function_of(Some(Rc::clone(&prims.float)), vec![Rc::clone(&prims.float)], true);
        assert_eq!(scopes.push_function(sin, intrinsic, true), Ok(SymbolIndex::Intrinsic(0)));
    }

    #[test]
    fn test_reduce_resolves_stub_alias() {
        let prims = Primitives::new();
        let mut strings = StringCache::new();
        let color = strings.intern("color");
        let mut scopes = Scopes::new();
        let stub = Rc::new(Datatype::User { name: color, details: None });
        assert!(matches!(&*scopes.reduce(&stub), Datatype::User { .. }));

        let vec4 = crate::semantic::datatype::vector_of(&prims.float, 4);
        scopes.push_usertype(color, Rc::clone(&vec4)).unwrap();
        assert!(datatypes_match(&scopes.reduce(&stub), &vec4));
        assert!(datatypes_match(&scopes.reduce(&scopes.reduce(&stub)), &vec4));
    }

    #[test]
    fn test_find_marks_referenced() {
        let prims = Primitives::new();
        let mut strings = StringCache::new();
        let x = strings.intern("x");
        let mut table = SymbolTable::new();
        table.insert(ScopeEntry::new(x, Rc::clone(&prims.int), SymbolIndex::None));
        assert!(!table.overloads(x).next().unwrap().is_referenced());
        table.find(x);
        assert!(table.overloads(x).next().unwrap().is_referenced());
    }
}
