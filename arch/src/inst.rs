use crate::{cpu::Cpu, mode::Mode, op::Op};
use color_print::cformat;
use std::fmt;

/// One instruction read back from encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub op: Op,
    pub mode: Mode,
    /// Operand value; branch targets are already absolute.
    pub value: Option<u16>,
}

impl Decoded {
    pub fn decode(cpu: &dyn Cpu, bytes: &[u8], pc: u16) -> Option<Self> {
        let (op, mode) = cpu.decode(*bytes.first()?)?;
        let value = match mode.len() {
            1 => None,
            2 => {
                let byte = *bytes.get(1)?;
                if mode == Mode::Relative {
                    Some(pc.wrapping_add(2).wrapping_add(byte as i8 as u16))
                } else {
                    Some(byte as u16)
                }
            }
            _ => Some(u16::from_le_bytes([*bytes.get(1)?, *bytes.get(2)?])),
        };
        Some(Self { op, mode, value })
    }

    pub fn len(&self) -> usize {
        self.mode.len()
    }

    fn operand(&self) -> String {
        let v = self.value.unwrap_or_default();
        match self.mode {
            Mode::Implied => String::new(),
            Mode::Accumulator => "a".to_string(),
            Mode::Immediate => format!("#${v:02X}"),
            Mode::ZeroPage => format!("${v:02X}"),
            Mode::ZeroPageX => format!("${v:02X},x"),
            Mode::ZeroPageY => format!("${v:02X},y"),
            Mode::Absolute | Mode::Relative => format!("${v:04X}"),
            Mode::AbsoluteX => format!("${v:04X},x"),
            Mode::AbsoluteY => format!("${v:04X},y"),
            Mode::Indirect => format!("(${v:04X})"),
            Mode::IndexedIndirect => format!("(${v:02X},x)"),
            Mode::IndirectIndexed => format!("(${v:02X}),y"),
            Mode::ZeroPageIndirect => format!("(${v:02X})"),
        }
    }

    pub fn cformat(&self) -> String {
        cformat!("<r>{:<4}</><y>{}</>", self.op, self.operand())
    }
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand() {
            operand if operand.is_empty() => write!(f, "{}", self.op),
            operand => write!(f, "{} {}", self.op, operand),
        }
    }
}
