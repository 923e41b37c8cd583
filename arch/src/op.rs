use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Mnemonics of the 6502 family. The tail group only exists on the 65C02.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter, Display,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Op {
    ADC,
    AND,
    ASL,
    BCC,
    BCS,
    BEQ,
    BIT,
    BMI,
    BNE,
    BPL,
    BRK,
    BVC,
    BVS,
    CLC,
    CLD,
    CLI,
    CLV,
    CMP,
    CPX,
    CPY,
    DEC,
    DEX,
    DEY,
    EOR,
    INC,
    INX,
    INY,
    JMP,
    JSR,
    LDA,
    LDX,
    LDY,
    LSR,
    NOP,
    ORA,
    PHA,
    PHP,
    PLA,
    PLP,
    ROL,
    ROR,
    RTI,
    RTS,
    SBC,
    SEC,
    SED,
    SEI,
    STA,
    STX,
    STY,
    TAX,
    TAY,
    TSX,
    TXA,
    TXS,
    TYA,

    // 65C02
    BRA,
    PHX,
    PHY,
    PLX,
    PLY,
    STZ,
    TRB,
    TSB,
}

impl Op {
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Op::BCC | Op::BCS | Op::BEQ | Op::BMI | Op::BNE | Op::BPL | Op::BVC | Op::BVS | Op::BRA
        )
    }
}
