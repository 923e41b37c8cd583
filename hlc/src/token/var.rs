use super::expr::Expr;
use crate::{error::Pos, scope::Namespace};
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum InitValue {
    Values(Vec<Expr>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Initializer {
    pub value: InitValue,
    pub pos: Pos,
}

impl Initializer {
    pub fn count(&self) -> usize {
        match &self.value {
            InitValue::Values(values) => values.len(),
            InitValue::Text(text) => text.len(),
        }
    }
}

/// Array dimension of a declaration, `name[len]` or `name[]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Dim {
    Scalar,
    Array(Option<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub ty: String,
    pub name: String,
    pub shared: bool,
    pub dim: Dim,
    pub address: Option<Expr>,
    pub init: Option<Initializer>,
    pub ns: Namespace,
    /// Byte size, known once types and dimensions are resolved.
    pub size: Option<usize>,
    pub pos: Pos,
}

impl Variable {
    /// Key under which the variable is bound during layout.
    pub fn key(&self) -> String {
        self.ns.qualify(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub ty: String,
    pub name: String,
    pub dim: Dim,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Typedef {
    pub name: String,
    pub ty: String,
    pub dim: Dim,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub members: IndexMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl {
    Struct(StructDef, Pos),
    Typedef(Typedef, Pos),
    Enum(EnumDef, Pos),
}

impl TypeDecl {
    pub fn pos(&self) -> &Pos {
        match self {
            TypeDecl::Struct(_, pos) | TypeDecl::Typedef(_, pos) | TypeDecl::Enum(_, pos) => pos,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Scalar => Ok(()),
            Dim::Array(None) => write!(f, "[]"),
            Dim::Array(Some(len)) => write!(f, "[{len}]"),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shared {
            write!(f, "shared ")?;
        }
        write!(f, "{} {}{}", self.ty, self.name, self.dim)?;
        if let Some(address) = &self.address {
            write!(f, " : {address}")?;
        }
        match self.init.as_ref().map(|init| &init.value) {
            Some(InitValue::Values(values)) => write!(f, " = {{{}}}", values.iter().join(", ")),
            Some(InitValue::Text(text)) => write!(f, " = {text:?}"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDecl::Struct(def, _) => write!(
                f,
                "struct {} {{ {} }}",
                def.name,
                def.fields
                    .iter()
                    .map(|field| format!("{} {}{}", field.ty, field.name, field.dim))
                    .join(", ")
            ),
            TypeDecl::Typedef(def, _) => write!(f, "typedef {} {}{}", def.ty, def.name, def.dim),
            TypeDecl::Enum(def, _) => write!(
                f,
                "enum {} {{ {} }}",
                def.name,
                def.members
                    .iter()
                    .map(|(name, value)| format!("{name} = {value}"))
                    .join(", ")
            ),
        }
    }
}
