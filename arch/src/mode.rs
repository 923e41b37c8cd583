use serde::{Deserialize, Serialize};
use std::fmt;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndexedIndirect,
    IndirectIndexed,
    ZeroPageIndirect,
    Relative,
}

impl Mode {
    pub const ALL: [Mode; 14] = [
        Mode::Implied,
        Mode::Accumulator,
        Mode::Immediate,
        Mode::ZeroPage,
        Mode::ZeroPageX,
        Mode::ZeroPageY,
        Mode::Absolute,
        Mode::AbsoluteX,
        Mode::AbsoluteY,
        Mode::Indirect,
        Mode::IndexedIndirect,
        Mode::IndirectIndexed,
        Mode::ZeroPageIndirect,
        Mode::Relative,
    ];

    /// Encoded length in bytes, opcode included.
    pub fn len(self) -> usize {
        match self {
            Mode::Implied | Mode::Accumulator => 1,
            Mode::Immediate
            | Mode::ZeroPage
            | Mode::ZeroPageX
            | Mode::ZeroPageY
            | Mode::IndexedIndirect
            | Mode::IndirectIndexed
            | Mode::ZeroPageIndirect
            | Mode::Relative => 2,
            Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY | Mode::Indirect => 3,
        }
    }
}

/// Operand as written in source, before an addressing mode is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand<V> {
    None,
    Accumulator,
    Immediate(V),
    Address(V),
    IndexedX(V),
    IndexedY(V),
    Indirect(V),
    IndexedIndirect(V),
    IndirectIndexed(V),
}

impl<V> Operand<V> {
    pub fn value(&self) -> Option<&V> {
        match self {
            Operand::None | Operand::Accumulator => None,
            Operand::Immediate(v)
            | Operand::Address(v)
            | Operand::IndexedX(v)
            | Operand::IndexedY(v)
            | Operand::Indirect(v)
            | Operand::IndexedIndirect(v)
            | Operand::IndirectIndexed(v) => Some(v),
        }
    }

    /// The operand with its payload erased, used for mode selection.
    pub fn shape(&self) -> Operand<()> {
        match self {
            Operand::None => Operand::None,
            Operand::Accumulator => Operand::Accumulator,
            Operand::Immediate(_) => Operand::Immediate(()),
            Operand::Address(_) => Operand::Address(()),
            Operand::IndexedX(_) => Operand::IndexedX(()),
            Operand::IndexedY(_) => Operand::IndexedY(()),
            Operand::Indirect(_) => Operand::Indirect(()),
            Operand::IndexedIndirect(_) => Operand::IndexedIndirect(()),
            Operand::IndirectIndexed(_) => Operand::IndirectIndexed(()),
        }
    }

    pub fn map<W, F: FnOnce(V) -> W>(self, f: F) -> Operand<W> {
        match self {
            Operand::None => Operand::None,
            Operand::Accumulator => Operand::Accumulator,
            Operand::Immediate(v) => Operand::Immediate(f(v)),
            Operand::Address(v) => Operand::Address(f(v)),
            Operand::IndexedX(v) => Operand::IndexedX(f(v)),
            Operand::IndexedY(v) => Operand::IndexedY(f(v)),
            Operand::Indirect(v) => Operand::Indirect(f(v)),
            Operand::IndexedIndirect(v) => Operand::IndexedIndirect(f(v)),
            Operand::IndirectIndexed(v) => Operand::IndirectIndexed(f(v)),
        }
    }

    pub fn try_map<W, E, F: FnOnce(V) -> Result<W, E>>(self, f: F) -> Result<Operand<W>, E> {
        Ok(match self {
            Operand::None => Operand::None,
            Operand::Accumulator => Operand::Accumulator,
            Operand::Immediate(v) => Operand::Immediate(f(v)?),
            Operand::Address(v) => Operand::Address(f(v)?),
            Operand::IndexedX(v) => Operand::IndexedX(f(v)?),
            Operand::IndexedY(v) => Operand::IndexedY(f(v)?),
            Operand::Indirect(v) => Operand::Indirect(f(v)?),
            Operand::IndexedIndirect(v) => Operand::IndexedIndirect(f(v)?),
            Operand::IndirectIndexed(v) => Operand::IndirectIndexed(f(v)?),
        })
    }
}

impl<V: fmt::Display> fmt::Display for Operand<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Accumulator => write!(f, "a"),
            Operand::Immediate(v) => write!(f, "#{v}"),
            Operand::Address(v) => write!(f, "{v}"),
            Operand::IndexedX(v) => write!(f, "{v},x"),
            Operand::IndexedY(v) => write!(f, "{v},y"),
            Operand::Indirect(v) => write!(f, "({v})"),
            Operand::IndexedIndirect(v) => write!(f, "({v},x)"),
            Operand::IndirectIndexed(v) => write!(f, "({v}),y"),
        }
    }
}
