//! Splits source text into code chunks and memory directives.

use crate::error::{Error, Pos};
use crate::grammer::lexer::Lexer;
use crate::grammer::parsercore::Parser;
use crate::grammer::token::{Token, TokenKind};
use crate::linker::memory::Padding;
use crate::{check, expect, optional};
use std::fmt;
use strum::{Display, EnumString};

/// Consecutive source lines with no directive between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub file: String,
    /// Row of the first line within `file`.
    pub line: usize,
    pub text: String,
}

/// What the scanner is fed.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Code(Chunk),
    FileBegin(String),
    FileEnd(String),
    Directive(Directive, Pos),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum VectorKind {
    Start,
    Nmi,
    Irq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    RomOrg { addr: usize, maxsize: Option<usize> },
    RomEnd,
    RomBank { number: usize, maxsize: Option<usize> },
    RomBanksize(usize),
    RamOrg { addr: usize, maxsize: Option<usize> },
    RamEnd,
    SetPad(Padding),
    Align(usize),
    Incbin { name: String, bytes: Vec<u8> },
    Vector(VectorKind, String),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = |maxsize: &Option<usize>| match maxsize {
            Some(size) => format!(", 0x{size:X}"),
            None => String::new(),
        };
        match self {
            Directive::RomOrg { addr, maxsize } => write!(f, "#rom.org 0x{addr:04X}{}", size(maxsize)),
            Directive::RomEnd => write!(f, "#rom.end"),
            Directive::RomBank { number, maxsize } => write!(f, "#rom.bank {number}{}", size(maxsize)),
            Directive::RomBanksize(size) => write!(f, "#rom.banksize 0x{size:X}"),
            Directive::RamOrg { addr, maxsize } => write!(f, "#ram.org 0x{addr:04X}{}", size(maxsize)),
            Directive::RamEnd => write!(f, "#ram.end"),
            Directive::SetPad(padding) => write!(f, "#setpad 0x{padding}"),
            Directive::Align(n) => write!(f, "#align {n}"),
            Directive::Incbin { name, bytes } => write!(f, "#incbin {name:?} ({} bytes)", bytes.len()),
            Directive::Vector(kind, name) => write!(f, "#interrupt.{kind} {name}"),
        }
    }
}

/// Splits one file into inputs, framed by its begin and end markers.
///
/// Lines starting with `#` are directives; everything else is gathered into
/// chunks for the grammar. `loader` reads the files named by `#incbin`.
pub fn split<F>(file: &str, text: &str, mut loader: F) -> Result<Vec<Input>, Error>
where
    F: FnMut(&str) -> Result<Vec<u8>, Error>,
{
    let mut inputs = vec![Input::FileBegin(file.to_string())];
    let mut chunk: Option<Chunk> = None;

    for (row, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        let Some(body) = trimmed.strip_prefix('#') else {
            let chunk = chunk.get_or_insert_with(|| Chunk {
                file: file.to_string(),
                line: row,
                text: String::new(),
            });
            chunk.text.push_str(line);
            chunk.text.push('\n');
            continue;
        };
        inputs.extend(chunk.take().map(Input::Code));

        let col = line.len() - trimmed.len();
        let pos = Pos::new(file, row, col);
        let (head, args) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
        let directive = directive(head, args, file, row, &pos, &mut loader)?;
        inputs.push(Input::Directive(directive, pos));
    }
    inputs.extend(chunk.take().map(Input::Code));
    inputs.push(Input::FileEnd(file.to_string()));
    Ok(inputs)
}

fn directive<F>(
    head: &str,
    args: &str,
    file: &str,
    row: usize,
    pos: &Pos,
    loader: &mut F,
) -> Result<Directive, Error>
where
    F: FnMut(&str) -> Result<Vec<u8>, Error>,
{
    let tokens = Lexer::new(file, args).starting_at(row).parse();
    let mut args = Parser::new(tokens.into_iter());
    let directive = match head.to_ascii_lowercase().as_str() {
        "rom.org" => {
            let addr = unsigned(&mut args)?;
            let maxsize = optional!(args, TokenKind::Comma, unsigned(&mut args)?);
            Directive::RomOrg { addr, maxsize }
        }
        "rom.end" => Directive::RomEnd,
        "rom.bank" => {
            let number = unsigned(&mut args)?;
            let maxsize = optional!(args, TokenKind::Comma, unsigned(&mut args)?);
            Directive::RomBank { number, maxsize }
        }
        "rom.banksize" => Directive::RomBanksize(unsigned(&mut args)?),
        "ram.org" => {
            let addr = unsigned(&mut args)?;
            let maxsize = optional!(args, TokenKind::Comma, unsigned(&mut args)?);
            Directive::RamOrg { addr, maxsize }
        }
        "ram.end" => Directive::RamEnd,
        "setpad" => match optional!(args, TokenKind::Text(_)).map(|token| token.kind) {
            Some(TokenKind::Text(text)) => Directive::SetPad(Padding::from_text(&text)),
            _ => Directive::SetPad(Padding::from_value(args.parse_const()?)),
        },
        "align" => Directive::Align(unsigned(&mut args)?),
        "incbin" => match expect!(args, TokenKind::Text(_))?.kind {
            TokenKind::Text(name) => {
                let bytes = loader(&name)?;
                Directive::Incbin { name, bytes }
            }
            kind => return Err(Error::UnexpectedToken(pos.clone(), kind.to_string())),
        },
        other => match other.strip_prefix("interrupt.").map(str::parse::<VectorKind>) {
            Some(Ok(kind)) => match expect!(args, TokenKind::Ident(_))?.kind {
                TokenKind::Ident(name) => Directive::Vector(kind, name),
                kind => return Err(Error::UnexpectedToken(pos.clone(), kind.to_string())),
            },
            _ => return Err(Error::UnknownDirective(pos.clone(), format!("#{head}"))),
        },
    };
    args.skip_newlines();
    if !check!(args, _) {
        return Ok(directive);
    }
    Err(args.unexpected())
}

/// Addresses, sizes and bank numbers are never negative.
fn unsigned<I: Iterator<Item = Token>>(args: &mut Parser<I>) -> Result<usize, Error> {
    let pos = args.peek().map(|token| token.pos.clone()).unwrap_or_default();
    let value = args.parse_const()?;
    usize::try_from(value).map_err(|_| Error::OutOfRange(pos, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_files(name: &str) -> Result<Vec<u8>, Error> {
        Err(Error::UnknownDirective(Pos::default(), name.to_string()))
    }

    #[test]
    fn directives_cut_chunks() {
        let text = "#rom.org 0x8000, 0x100\nfunction main() {\n  nop\n}\n#rom.end\n";
        let inputs = split("a.hl", text, no_files).unwrap();
        assert_eq!(inputs.len(), 5);
        assert_eq!(
            inputs[1],
            Input::Directive(
                Directive::RomOrg {
                    addr: 0x8000,
                    maxsize: Some(0x100)
                },
                Pos::new("a.hl", 0, 0)
            )
        );
        match &inputs[2] {
            Input::Code(chunk) => {
                assert_eq!(chunk.line, 1);
                assert_eq!(chunk.text, "function main() {\n  nop\n}\n");
            }
            other => panic!("expected code, got {other:?}"),
        }
        assert_eq!(inputs[3], Input::Directive(Directive::RomEnd, Pos::new("a.hl", 4, 0)));
    }

    #[test]
    fn setpad_and_vectors() {
        let text = "#setpad \"ab\"\n#setpad $EA\n#interrupt.nmi on_nmi\n";
        let inputs = split("a.hl", text, no_files).unwrap();
        assert_eq!(
            inputs[1],
            Input::Directive(Directive::SetPad(Padding::from_text("ab")), Pos::new("a.hl", 0, 0))
        );
        assert_eq!(
            inputs[2],
            Input::Directive(Directive::SetPad(Padding::from_value(0xEA)), Pos::new("a.hl", 1, 0))
        );
        assert_eq!(
            inputs[3],
            Input::Directive(
                Directive::Vector(VectorKind::Nmi, "on_nmi".to_string()),
                Pos::new("a.hl", 2, 0)
            )
        );
    }

    #[test]
    fn incbin_uses_loader() {
        let inputs = split("a.hl", "#incbin \"tiles.chr\"\n", |name| {
            assert_eq!(name, "tiles.chr");
            Ok(vec![1, 2, 3])
        })
        .unwrap();
        assert_eq!(
            inputs[1],
            Input::Directive(
                Directive::Incbin {
                    name: "tiles.chr".to_string(),
                    bytes: vec![1, 2, 3]
                },
                Pos::new("a.hl", 0, 0)
            )
        );
    }

    #[test]
    fn unknown_directive() {
        assert!(matches!(
            split("a.hl", "#define X 1\n", no_files),
            Err(Error::UnknownDirective(_, name)) if name == "#define"
        ));
    }
}
