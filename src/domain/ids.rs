//! Interned identifiers for strategies and symbols.
//!
//! Strategy names and instrument symbols are strings at the edges of the
//! system; inside the portfolio they are small integer handles so the position
//! table can be keyed by a `(StrategyId, SymbolId)` pair.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrategyId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub u32);

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strategy#{}", self.0)
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol#{}", self.0)
    }
}

impl From<u32> for StrategyId {
    fn from(v: u32) -> Self {
        StrategyId(v)
    }
}

impl From<u32> for SymbolId {
    fn from(v: u32) -> Self {
        SymbolId(v)
    }
}

/// Bidirectional string ↔ handle table. Handles are dense, starting at zero,
/// in insertion order.
#[derive(Debug, Clone)]
pub struct Interner<Id> {
    ids: HashMap<String, u32>,
    names: Vec<String>,
    _id: PhantomData<Id>,
}

impl<Id> Default for Interner<Id> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
            names: Vec::new(),
            _id: PhantomData,
        }
    }
}

impl<Id: From<u32> + Copy> Interner<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing handle for `name`, or allocates the next one.
    pub fn intern(&mut self, name: &str) -> Id {
        if let Some(&raw) = self.ids.get(name) {
            return Id::from(raw);
        }
        let raw = self.names.len() as u32;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), raw);
        Id::from(raw)
    }

    pub fn get(&self, name: &str) -> Option<Id> {
        self.ids.get(name).map(|&raw| Id::from(raw))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Interner<StrategyId> {
    pub fn name(&self, id: StrategyId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }
}

impl Interner<SymbolId> {
    pub fn name(&self, id: SymbolId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }
}
