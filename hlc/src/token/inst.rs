use super::expr::Expr;
use crate::{error::Pos, scope::Namespace};
use arch::{Mode, Op, Operand};
use std::fmt;

/// One machine instruction. The addressing mode is chosen when the operand
/// resolves; until then the line counts as unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionLine {
    pub op: Op,
    pub operand: Operand<Expr>,
    pub mode: Option<Mode>,
    pub ns: Namespace,
    pub pos: Pos,
}

impl InstructionLine {
    pub fn new(op: Op, operand: Operand<Expr>, ns: Namespace, pos: Pos) -> Self {
        Self {
            op,
            operand,
            mode: None,
            ns,
            pos,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.mode.is_some()
    }

    pub fn size(&self) -> Option<usize> {
        self.mode.map(Mode::len)
    }
}

impl fmt::Display for InstructionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Operand::None => write!(f, "{}", self.op),
            operand => write!(f, "{} {}", self.op, operand),
        }
    }
}
