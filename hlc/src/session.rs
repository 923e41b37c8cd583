use crate::error::Pos;
use crate::scope::{Namespace, ScopeTable, Symbol};
use crate::token::Label;
use arch::{Cpu, Mos6502};

/// State shared by every stage of one compilation.
pub struct Session {
    pub scopes: ScopeTable,
    labels: usize,
    cpu: Box<dyn Cpu>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Box::new(Mos6502))
    }
}

impl Session {
    pub fn new(cpu: Box<dyn Cpu>) -> Self {
        Self {
            scopes: ScopeTable::new(),
            labels: 0,
            cpu,
        }
    }

    pub fn cpu(&self) -> &dyn Cpu {
        self.cpu.as_ref()
    }

    /// Mints the next `_L<n>` label and registers it globally.
    pub fn new_label(&mut self, pos: &Pos) -> String {
        let name = format!("_L{}", self.labels);
        self.labels += 1;
        self.scopes.define(
            Symbol::Label(Label::new(&name, pos.clone())),
            Some(&Namespace::global()),
        );
        name
    }

    /// Number of labels minted so far.
    pub fn label_count(&self) -> usize {
        self.labels
    }

    pub fn reset(&mut self) {
        self.scopes.reset();
        self.labels = 0;
    }
}
