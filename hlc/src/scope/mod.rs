mod namespace;
mod symbol;

pub use namespace::{Namespace, GLOBAL};
pub use symbol::{FunctionSymbol, Symbol};

use crate::error::Error;
use indexmap::IndexMap;
use tracing::trace;

/// Symbols keyed by (namespace, name).
///
/// Entries of a popped namespace stay in the table so that tokens which
/// captured that namespace can still resolve against it, but they are no
/// longer reachable from the current path.
#[derive(Debug, Default)]
pub struct ScopeTable {
    symbols: IndexMap<Namespace, IndexMap<String, Symbol>>,
    current: Namespace,
    anonymous: usize,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Namespace {
        &self.current
    }

    /// Enters a scope. Unnamed scopes get a fresh anonymous name.
    pub fn push(&mut self, name: Option<&str>) -> &Namespace {
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                self.anonymous += 1;
                format!("__anonymous{}__", self.anonymous - 1)
            }
        };
        self.current = self.current.child(&name);
        trace!("enter {}", self.current);
        &self.current
    }

    pub fn pop(&mut self) -> Result<Namespace, Error> {
        let parent = self.current.parent().ok_or(Error::PopGlobal)?;
        trace!("leave {}", self.current);
        Ok(std::mem::replace(&mut self.current, parent))
    }

    /// Registers `symbol`; an existing entry with the same name is replaced.
    pub fn define(&mut self, symbol: Symbol, ns: Option<&Namespace>) {
        let ns = ns.unwrap_or(&self.current).clone();
        self.symbols
            .entry(ns)
            .or_default()
            .insert(symbol.name().to_string(), symbol);
    }

    pub fn lookup(&self, name: &str, ns: Option<&Namespace>) -> Option<&Symbol> {
        self.lookup_entry(name, ns).map(|(_, symbol)| symbol)
    }

    /// Like `lookup`, also returning the namespace the symbol was found in.
    pub fn lookup_entry(&self, name: &str, ns: Option<&Namespace>) -> Option<(Namespace, &Symbol)> {
        let start = ns.unwrap_or(&self.current);
        start.ancestors().find_map(|ns| {
            let symbol = self.symbols.get(&ns)?.get(name)?;
            Some((ns, symbol))
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
