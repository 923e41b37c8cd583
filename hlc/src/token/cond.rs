use super::{expr::Expr, Token};
use crate::{error::Pos, scope::Namespace};
use arch::{Reg, Test};
use std::fmt;
use strum::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    If(Test),
    Else,
    While(Test),
    Do,
    Forever,
    Switch(Reg),
    Case(Expr),
    Default,
}

/// A conditional keyword as written, before its block is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalDecl {
    pub kind: DeclKind,
    pub pos: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CondMode {
    If,
    IfElse,
    While,
    DoWhile,
    Forever,
    Switch,
    SwitchDefault,
    Case,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub decl: ConditionalDecl,
    pub tokens: Vec<Token>,
    pub open: bool,
}

/// Structured control flow.
///
/// IF, WHILE, DO_WHILE and FOREVER hold one block, IF_ELSE two. A switch
/// holds its own placeholder block followed by its cases in declaration
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub mode: CondMode,
    pub blocks: Vec<Block>,
    pub depth: usize,
    /// Test of the trailing `while` of a do loop.
    pub post: Option<Test>,
    pub ns: Namespace,
}

impl ConditionalDecl {
    pub fn mode(&self) -> CondMode {
        match self.kind {
            DeclKind::If(_) => CondMode::If,
            DeclKind::Else => CondMode::IfElse,
            DeclKind::While(_) => CondMode::While,
            DeclKind::Do => CondMode::DoWhile,
            DeclKind::Forever => CondMode::Forever,
            DeclKind::Switch(_) => CondMode::Switch,
            DeclKind::Case(_) => CondMode::Case,
            DeclKind::Default => CondMode::Default,
        }
    }

    pub fn test(&self) -> Option<Test> {
        match self.kind {
            DeclKind::If(test) | DeclKind::While(test) => Some(test),
            _ => None,
        }
    }
}

impl Block {
    pub fn new(decl: ConditionalDecl) -> Self {
        Self {
            decl,
            tokens: Vec::new(),
            open: false,
        }
    }
}

impl Conditional {
    pub fn new(decl: ConditionalDecl, depth: usize, ns: Namespace) -> Self {
        Self {
            mode: decl.mode(),
            blocks: vec![Block::new(decl)],
            depth,
            post: None,
            ns,
        }
    }

    pub fn pos(&self) -> &Pos {
        &self.blocks[0].decl.pos
    }

    pub fn is_switch(&self) -> bool {
        matches!(self.mode, CondMode::Switch | CondMode::SwitchDefault)
    }

    pub fn current(&mut self) -> &mut Block {
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }
}

impl fmt::Display for ConditionalDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DeclKind::If(test) => write!(f, "if ({test})"),
            DeclKind::Else => write!(f, "else"),
            DeclKind::While(test) => write!(f, "while ({test})"),
            DeclKind::Do => write!(f, "do"),
            DeclKind::Forever => write!(f, "forever"),
            DeclKind::Switch(reg) => write!(f, "switch (reg.{reg})"),
            DeclKind::Case(value) => write!(f, "case #{value}"),
            DeclKind::Default => write!(f, "default"),
        }
    }
}

impl fmt::Display for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{} {{ {} token(s) }} ", block.decl, block.tokens.len())?;
        }
        if let Some(test) = &self.post {
            write!(f, "while ({test})")?;
        }
        Ok(())
    }
}
