pub mod cond;
pub mod expr;
pub mod func;
pub mod inst;
pub mod var;

pub use cond::{Block, CondMode, Conditional, ConditionalDecl, DeclKind};
pub use expr::{BinaryOp, Expr, UnaryOp};
pub use func::{Function, FunctionCall, FunctionDecl, FunctionKind, FunctionReturn};
pub use inst::InstructionLine;
pub use var::{Dim, EnumDef, Field, InitValue, Initializer, StructDef, TypeDecl, Typedef, Variable};

use crate::{error::Pos, source::Directive};
use std::fmt;

/// A named position in the output. Bound to an address only during layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,
    pub pos: Pos,
}

impl Label {
    pub fn new(name: &str, pos: Pos) -> Self {
        Self {
            name: name.to_string(),
            pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Label(Label),
    Variable(Variable),
    Initializer(Initializer),
    TypeDecl(TypeDecl),
    Function(Function),
    FunctionDecl(FunctionDecl),
    FunctionCall(FunctionCall),
    FunctionReturn(FunctionReturn),
    Conditional(Conditional),
    ConditionalDecl(ConditionalDecl),
    InstructionLine(InstructionLine),
    ScopeBegin(Pos),
    ScopeEnd(Pos),
    FileBegin(String),
    FileEnd(String),
    Directive(Directive, Pos),
}

impl Token {
    pub fn pos(&self) -> Option<&Pos> {
        match self {
            Token::Label(label) => Some(&label.pos),
            Token::Variable(var) => Some(&var.pos),
            Token::Initializer(init) => Some(&init.pos),
            Token::TypeDecl(decl) => Some(decl.pos()),
            Token::Function(func) => Some(&func.decl.pos),
            Token::FunctionDecl(decl) => Some(&decl.pos),
            Token::FunctionCall(call) => Some(&call.pos),
            Token::FunctionReturn(ret) => Some(&ret.pos),
            Token::Conditional(cond) => Some(cond.pos()),
            Token::ConditionalDecl(decl) => Some(&decl.pos),
            Token::InstructionLine(line) => Some(&line.pos),
            Token::ScopeBegin(pos) | Token::ScopeEnd(pos) | Token::Directive(_, pos) => Some(pos),
            Token::FileBegin(_) | Token::FileEnd(_) => None,
        }
    }

    /// `file:row:col: token`, used when reporting stuck tokens.
    pub fn located(&self) -> String {
        match self.pos() {
            Some(pos) => format!("{pos}: {self}"),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Label(label) => write!(f, "{}:", label.name),
            Token::Variable(var) => write!(f, "{var}"),
            Token::Initializer(init) => write!(f, "= ({} value(s))", init.count()),
            Token::TypeDecl(decl) => write!(f, "{decl}"),
            Token::Function(func) => write!(f, "{} {{ {} token(s) }}", func.decl, func.body.len()),
            Token::FunctionDecl(decl) => write!(f, "{decl}"),
            Token::FunctionCall(call) => write!(f, "{call}"),
            Token::FunctionReturn(_) => write!(f, "return"),
            Token::Conditional(cond) => write!(f, "{cond}"),
            Token::ConditionalDecl(decl) => write!(f, "{decl}"),
            Token::InstructionLine(line) => write!(f, "    {line}"),
            Token::ScopeBegin(_) => write!(f, "{{"),
            Token::ScopeEnd(_) => write!(f, "}}"),
            Token::FileBegin(name) => write!(f, "; begin {name}"),
            Token::FileEnd(name) => write!(f, "; end {name}"),
            Token::Directive(directive, _) => write!(f, "{directive}"),
        }
    }
}
