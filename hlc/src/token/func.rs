use super::{expr::Expr, Token};
use crate::{error::Pos, scope::Namespace};
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionKind {
    Subroutine,
    /// Inline function, spliced at every call site.
    Macro,
    /// Interrupt handler with an optional sub kind (`interrupt.nmi`).
    Interrupt(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub kind: FunctionKind,
    pub noreturn: bool,
    pub params: Vec<String>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub decl: FunctionDecl,
    pub body: Vec<Token>,
    pub ns: Namespace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub ns: Namespace,
    /// Inline functions this call was spliced out of, outermost first.
    pub expansion: Vec<String>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionReturn {
    /// Set by the structurer from the enclosing function.
    pub interrupt: bool,
    pub pos: Pos,
}

impl FunctionDecl {
    pub fn is_macro(&self) -> bool {
        self.kind == FunctionKind::Macro
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self.kind, FunctionKind::Interrupt(_))
    }
}

impl fmt::Display for FunctionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FunctionKind::Subroutine => write!(f, "function ")?,
            FunctionKind::Macro => write!(f, "inline ")?,
            FunctionKind::Interrupt(None) => write!(f, "interrupt ")?,
            FunctionKind::Interrupt(Some(sub)) => write!(f, "interrupt.{sub} ")?,
        }
        if self.noreturn {
            write!(f, "noreturn ")?;
        }
        write!(f, "{}({})", self.name, self.params.join(", "))
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.iter().join(", "))
    }
}
