pub mod cond;
pub mod cpu;
pub mod inst;
pub mod mode;
pub mod op;
pub mod reg;
mod table;

pub use cond::{Condition, Distance, Flag, Polarity, Test};
pub use cpu::{Cpu, EncodeError, Mos6502, Mos65C02};
pub use inst::Decoded;
pub use mode::{Mode, Operand};
pub use op::Op;
pub use reg::Reg;
