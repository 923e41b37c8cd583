use crate::{
    cond::Flag,
    mode::{Mode, Operand},
    op::Op,
    reg::Reg,
    table,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{0} does not support {1} addressing")]
    InvalidMode(Op, Mode),

    #[error("{0} in {1} addressing needs an operand")]
    MissingOperand(Op, Mode),

    #[error("branch from 0x{0:04X} to 0x{1:04X} is out of range, use a far test")]
    BranchOutOfRange(u16, i64),

    #[error("value {1} does not fit a {0} operand")]
    ValueOutOfRange(Mode, i64),
}

/// Everything the compiler core needs to know about a target CPU.
pub trait Cpu {
    fn name(&self) -> &'static str;

    fn opcode(&self, op: Op, mode: Mode) -> Option<u8>;

    fn decode(&self, byte: u8) -> Option<(Op, Mode)>;

    /// Mnemonic lookup restricted to this CPU.
    fn op(&self, word: &str) -> Option<Op> {
        Op::parse(word).filter(|op| self.supports(*op))
    }

    fn supports(&self, op: Op) -> bool {
        Mode::ALL.iter().any(|mode| self.opcode(op, *mode).is_some())
    }

    /// Picks an addressing mode for an operand shape. `zero_page` is only
    /// true when the operand is a constant below 0x100.
    fn select(&self, op: Op, shape: &Operand<()>, zero_page: bool) -> Option<Mode> {
        let has = |mode: Mode| self.opcode(op, mode).map(|_| mode);
        let pick = |zp: Mode, abs: Mode| {
            if zero_page {
                has(zp).or_else(|| has(abs))
            } else {
                has(abs).or_else(|| has(zp))
            }
        };
        match shape {
            Operand::None => has(Mode::Implied).or_else(|| has(Mode::Accumulator)),
            Operand::Accumulator => has(Mode::Accumulator),
            Operand::Immediate(_) => has(Mode::Immediate),
            Operand::Address(_) if op.is_branch() => has(Mode::Relative),
            Operand::Address(_) => pick(Mode::ZeroPage, Mode::Absolute),
            Operand::IndexedX(_) => pick(Mode::ZeroPageX, Mode::AbsoluteX),
            Operand::IndexedY(_) => pick(Mode::ZeroPageY, Mode::AbsoluteY),
            Operand::Indirect(_) => has(Mode::Indirect).or_else(|| has(Mode::ZeroPageIndirect)),
            Operand::IndexedIndirect(_) => has(Mode::IndexedIndirect),
            Operand::IndirectIndexed(_) => has(Mode::IndirectIndexed),
        }
    }

    /// Conditional branch taken when `flag` is in state `when`.
    fn branch(&self, flag: Flag, when: bool) -> Op {
        match (flag, when) {
            (Flag::N, false) => Op::BPL,
            (Flag::N, true) => Op::BMI,
            (Flag::V, false) => Op::BVC,
            (Flag::V, true) => Op::BVS,
            (Flag::C, false) => Op::BCC,
            (Flag::C, true) => Op::BCS,
            (Flag::Z, false) => Op::BNE,
            (Flag::Z, true) => Op::BEQ,
        }
    }

    fn compare(&self, reg: Reg) -> Op {
        match reg {
            Reg::A => Op::CMP,
            Reg::X => Op::CPX,
            Reg::Y => Op::CPY,
        }
    }

    fn jump(&self) -> Op {
        Op::JMP
    }

    fn call(&self) -> Op {
        Op::JSR
    }

    fn ret(&self, interrupt: bool) -> Op {
        if interrupt {
            Op::RTI
        } else {
            Op::RTS
        }
    }

    /// Encodes one instruction located at `pc`.
    fn encode(
        &self,
        op: Op,
        mode: Mode,
        value: Option<i64>,
        pc: u16,
    ) -> Result<Vec<u8>, EncodeError> {
        let opcode = self
            .opcode(op, mode)
            .ok_or(EncodeError::InvalidMode(op, mode))?;
        let mut bytes = vec![opcode];
        if mode.len() == 1 {
            return Ok(bytes);
        }

        let value = value.ok_or(EncodeError::MissingOperand(op, mode))?;
        match mode {
            Mode::Relative => {
                let offset = value - (pc as i64 + 2);
                if !(-128..=127).contains(&offset) {
                    return Err(EncodeError::BranchOutOfRange(pc, value));
                }
                bytes.push(offset as i8 as u8);
            }
            Mode::Immediate => {
                if !(-128..=255).contains(&value) {
                    return Err(EncodeError::ValueOutOfRange(mode, value));
                }
                bytes.push(value as u8);
            }
            _ if mode.len() == 2 => {
                if !(0..=0xFF).contains(&value) {
                    return Err(EncodeError::ValueOutOfRange(mode, value));
                }
                bytes.push(value as u8);
            }
            _ => {
                if !(0..=0xFFFF).contains(&value) {
                    return Err(EncodeError::ValueOutOfRange(mode, value));
                }
                bytes.extend((value as u16).to_le_bytes());
            }
        }
        Ok(bytes)
    }
}

/// NMOS 6502 with the documented instruction set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mos6502;

impl Cpu for Mos6502 {
    fn name(&self) -> &'static str {
        "6502"
    }

    fn opcode(&self, op: Op, mode: Mode) -> Option<u8> {
        table::MOS6502.get_by_left(&(op, mode)).copied()
    }

    fn decode(&self, byte: u8) -> Option<(Op, Mode)> {
        table::MOS6502.get_by_right(&byte).copied()
    }
}

/// CMOS 65C02, a superset of the 6502.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mos65C02;

impl Cpu for Mos65C02 {
    fn name(&self) -> &'static str {
        "65c02"
    }

    fn opcode(&self, op: Op, mode: Mode) -> Option<u8> {
        table::MOS65C02.get_by_left(&(op, mode)).copied()
    }

    fn decode(&self, byte: u8) -> Option<(Op, Mode)> {
        table::MOS65C02.get_by_right(&byte).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_selection() {
        let cpu = Mos6502;
        let addr = Operand::Address(());
        assert_eq!(cpu.select(Op::LDA, &addr, true), Some(Mode::ZeroPage));
        assert_eq!(cpu.select(Op::LDA, &addr, false), Some(Mode::Absolute));
        assert_eq!(cpu.select(Op::JMP, &addr, true), Some(Mode::Absolute));
        assert_eq!(cpu.select(Op::BNE, &addr, false), Some(Mode::Relative));
        assert_eq!(cpu.select(Op::ASL, &Operand::None, false), Some(Mode::Accumulator));
        assert_eq!(cpu.select(Op::STX, &Operand::IndexedY(()), true), Some(Mode::ZeroPageY));
        assert_eq!(cpu.select(Op::STA, &Operand::Immediate(()), false), None);
        assert_eq!(cpu.select(Op::LDA, &Operand::Indirect(()), true), None);
        assert_eq!(
            Mos65C02.select(Op::LDA, &Operand::Indirect(()), true),
            Some(Mode::ZeroPageIndirect)
        );
    }

    #[test]
    fn cmos_only_ops() {
        assert_eq!(Mos6502.op("stz"), None);
        assert_eq!(Mos65C02.op("stz"), Some(Op::STZ));
        assert_eq!(Mos6502.op("LDA"), Some(Op::LDA));
    }

    #[test]
    fn encode_widths() {
        let cpu = Mos6502;
        assert_eq!(cpu.encode(Op::INX, Mode::Implied, None, 0), Ok(vec![0xE8]));
        assert_eq!(cpu.encode(Op::LDA, Mode::Immediate, Some(1), 0), Ok(vec![0xA9, 0x01]));
        assert_eq!(
            cpu.encode(Op::JMP, Mode::Absolute, Some(0x8003), 0),
            Ok(vec![0x4C, 0x03, 0x80])
        );
        assert_eq!(
            cpu.encode(Op::LDA, Mode::ZeroPage, Some(0x100), 0),
            Err(EncodeError::ValueOutOfRange(Mode::ZeroPage, 0x100))
        );
    }

    #[test]
    fn encode_relative() {
        let cpu = Mos6502;
        assert_eq!(cpu.encode(Op::BNE, Mode::Relative, Some(0x8000), 0x8000), Ok(vec![0xD0, 0xFE]));
        assert_eq!(cpu.encode(Op::BEQ, Mode::Relative, Some(0x8012), 0x8000), Ok(vec![0xF0, 0x10]));
        assert_eq!(
            cpu.encode(Op::BEQ, Mode::Relative, Some(0x8100), 0x8000),
            Err(EncodeError::BranchOutOfRange(0x8000, 0x8100))
        );
    }

    #[test]
    fn branch_table() {
        let cpu = Mos6502;
        assert_eq!(cpu.branch(Flag::Z, true), Op::BEQ);
        assert_eq!(cpu.branch(Flag::Z, false), Op::BNE);
        assert_eq!(cpu.branch(Flag::V, true), Op::BVS);
        assert_eq!(cpu.compare(Reg::Y), Op::CPY);
        assert_eq!(cpu.ret(true), Op::RTI);
    }
}
