use crate::token::{EnumDef, FunctionDecl, Label, StructDef, Token, Typedef, Variable};

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSymbol {
    pub decl: FunctionDecl,
    /// Body of an inline function, kept for splicing at call sites.
    pub body: Vec<Token>,
    /// Entry label, assigned when the function is lowered.
    pub entry: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Variable(Variable),
    Function(FunctionSymbol),
    Label(Label),
    Enum(EnumDef),
    Struct(StructDef),
    Typedef(Typedef),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable(var) => &var.name,
            Symbol::Function(func) => &func.decl.name,
            Symbol::Label(label) => &label.name,
            Symbol::Enum(def) => &def.name,
            Symbol::Struct(def) => &def.name,
            Symbol::Typedef(def) => &def.name,
        }
    }
}
