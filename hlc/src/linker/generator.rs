use super::allocator::Allocator;
use super::image::{BankImage, Image, Placement, RegionImage};
use super::romfile::{RomFile, Slot};
use crate::compile::eval::Lookup;
use crate::error::{Error, Pos};
use crate::session::Session;
use crate::source::Directive;
use crate::token::{Expr, InitValue, InstructionLine, Token, Variable};
use indexmap::IndexMap;
use tracing::{debug, trace};

/// Upper bound on rounds; after the first walk only deferred items remain.
pub const MAX_ROUNDS: usize = 16;

/// Assigns addresses to the resolved stream and writes its bytes.
///
/// The first round walks the stream, binding labels and variables and
/// reserving space for every instruction. Instructions whose operands name
/// a symbol that is not bound yet are written in later rounds.
pub fn layout(session: &Session, tokens: &[Token]) -> Result<Image, Error> {
    let mut generator = Generator::new(session);
    for token in tokens {
        generator.walk(token)?;
    }
    generator.rom.close_all(&Pos::default())?;

    let mut round = 1;
    while !generator.pending.is_empty() {
        round += 1;
        let before = generator.pending.len();
        let pending = std::mem::take(&mut generator.pending);
        for item in pending {
            generator.retry(item)?;
        }
        debug!(round, unresolved = generator.pending.len(), "layout round");
        if generator.pending.len() == before {
            return Err(Error::NoProgress {
                stage: "layout",
                rounds: round,
                stuck: generator.pending.iter().map(Pending::located).collect(),
            });
        }
        if round >= MAX_ROUNDS {
            return Err(Error::TooManyRounds("layout", MAX_ROUNDS));
        }
    }
    Ok(generator.finish())
}

/// Work deferred until more symbols are bound.
enum Pending {
    Inst { line: InstructionLine, slot: Slot, pc: u16 },
    Data { var: Variable, slot: Slot },
    Vector { kind: String, name: String, pos: Pos },
}

impl Pending {
    fn located(&self) -> String {
        match self {
            Pending::Inst { line, .. } => format!("{}: {line}", line.pos),
            Pending::Data { var, .. } => format!("{}: {var}", var.pos),
            Pending::Vector { kind, name, pos } => format!("{pos}: #interrupt.{kind} {name}"),
        }
    }
}

struct Generator<'s> {
    session: &'s Session,
    rom: RomFile,
    ram: Allocator,
    /// Open `#ram.org` window, inclusive bounds.
    window: Option<(usize, usize)>,
    symbols: IndexMap<String, u16>,
    labels: IndexMap<String, u16>,
    placed_ram: Vec<Placement>,
    placed_data: Vec<Placement>,
    vectors: IndexMap<String, u16>,
    pending: Vec<Pending>,
}

impl<'s> Generator<'s> {
    fn new(session: &'s Session) -> Self {
        Self {
            session,
            rom: RomFile::new(),
            ram: Allocator::default(),
            window: None,
            symbols: IndexMap::new(),
            labels: IndexMap::new(),
            placed_ram: Vec::new(),
            placed_data: Vec::new(),
            vectors: IndexMap::new(),
            pending: Vec::new(),
        }
    }

    fn walk(&mut self, token: &Token) -> Result<(), Error> {
        match token {
            Token::Label(label) => {
                let addr = self.rom.region(&label.pos)?.address(&label.pos)?;
                self.bind(&label.name, addr, &label.pos)?;
                self.labels.insert(label.name.clone(), addr);
                Ok(())
            }
            Token::InstructionLine(line) => {
                let size = line
                    .size()
                    .ok_or_else(|| Error::Unstructured(line.pos.clone(), line.to_string()))?;
                let (slot, pc) = self.rom.reserve(size, &line.pos)?;
                self.retry(Pending::Inst {
                    line: line.clone(),
                    slot,
                    pc,
                })
            }
            Token::Variable(var) => self.variable(var),
            Token::Directive(directive, pos) => self.directive(directive, pos),
            Token::FileBegin(_) | Token::FileEnd(_) => Ok(()),
            token => Err(Error::Unstructured(
                token.pos().cloned().unwrap_or_default(),
                token.to_string(),
            )),
        }
    }

    /// Binds `name`; binding it again to another address is an error.
    fn bind(&mut self, name: &str, addr: u16, pos: &Pos) -> Result<(), Error> {
        match self.symbols.insert(name.to_string(), addr) {
            Some(prev) if prev != addr => Err(Error::DuplicateLabel(pos.clone(), name.to_string(), prev, addr)),
            _ => {
                trace!(name, addr, "bind");
                Ok(())
            }
        }
    }

    fn eval(&self, expr: &Expr, pos: &Pos) -> Result<Option<i64>, Error> {
        let lookup = |key: &str| self.symbols.get(key).map(|&addr| addr as i64);
        expr.eval(&lookup).map_err(|err| Error::Eval(pos.clone(), err))
    }

    fn variable(&mut self, var: &Variable) -> Result<(), Error> {
        let size = var
            .size
            .ok_or_else(|| Error::Unstructured(var.pos.clone(), var.to_string()))?;
        let key = var.key();

        if var.init.is_some() {
            let (slot, addr) = self.rom.reserve(size, &var.pos)?;
            self.bind(&key, addr, &var.pos)?;
            self.placed_data.push(Placement {
                name: key,
                address: addr,
                size,
            });
            return self.retry(Pending::Data {
                var: var.clone(),
                slot,
            });
        }

        let addr = match &var.address {
            Some(expr) => match self.eval(expr, &var.pos)? {
                Some(addr) if (0..0x10000).contains(&addr) => addr as usize,
                Some(addr) => return Err(Error::AddressOutOfRange(var.pos.clone(), addr as usize)),
                None => return Err(Error::NotAConstant(var.pos.clone(), expr.to_string())),
            },
            None => {
                let (start, end) = self
                    .window
                    .ok_or_else(|| Error::NoRamRegion(var.pos.clone(), key.clone()))?;
                self.ram
                    .place(start, end, size, &key)
                    .ok_or_else(|| Error::RamOverflow(var.pos.clone(), key.clone(), size))?
            }
        };
        self.bind(&key, addr as u16, &var.pos)?;
        self.placed_ram.push(Placement {
            name: key,
            address: addr as u16,
            size,
        });
        Ok(())
    }

    fn directive(&mut self, directive: &Directive, pos: &Pos) -> Result<(), Error> {
        trace!(%directive, "directive");
        match directive {
            Directive::RomOrg { addr, maxsize } => self.rom.open(*addr, *maxsize, pos),
            Directive::RomEnd => self.rom.close(pos),
            Directive::RomBank { number, maxsize } => {
                self.rom.select(*number, *maxsize);
                Ok(())
            }
            Directive::RomBanksize(size) => {
                self.rom.set_banksize(*size);
                Ok(())
            }
            Directive::RamOrg { addr, maxsize } => {
                let end = match maxsize {
                    Some(size) => addr.saturating_add((*size).max(1)) - 1,
                    None => 0xFFFF,
                };
                if *addr > 0xFFFF || end > 0xFFFF {
                    return Err(Error::AddressOutOfRange(pos.clone(), end.max(*addr)));
                }
                self.window = Some((*addr, end));
                Ok(())
            }
            Directive::RamEnd => {
                self.window = None;
                Ok(())
            }
            Directive::SetPad(padding) => {
                self.rom.set_padding(padding.clone());
                Ok(())
            }
            Directive::Align(n) => self.rom.region(pos)?.align(*n, pos),
            Directive::Incbin { bytes, .. } => self.rom.region(pos)?.write(bytes, pos).map(|_| ()),
            Directive::Vector(kind, name) => self.retry(Pending::Vector {
                kind: kind.to_string(),
                name: name.clone(),
                pos: pos.clone(),
            }),
        }
    }

    /// Completes `item`, or queues it again when a symbol is still unbound.
    fn retry(&mut self, item: Pending) -> Result<(), Error> {
        let done = match &item {
            Pending::Inst { line, slot, pc } => self.encode(line, *slot, *pc)?,
            Pending::Data { var, slot } => self.data(var, *slot)?,
            Pending::Vector { kind, name, .. } => match self.symbols.get(name) {
                Some(&addr) => {
                    self.vectors.insert(kind.clone(), addr);
                    true
                }
                None => false,
            },
        };
        if !done {
            self.pending.push(item);
        }
        Ok(())
    }

    fn encode(&mut self, line: &InstructionLine, slot: Slot, pc: u16) -> Result<bool, Error> {
        let value = match line.operand.value() {
            Some(expr) => match self.eval(expr, &line.pos)? {
                Some(value) => Some(value),
                None => return Ok(false),
            },
            None => None,
        };
        let mode = line
            .mode
            .ok_or_else(|| Error::Unstructured(line.pos.clone(), line.to_string()))?;
        let bytes = self
            .session
            .cpu()
            .encode(line.op, mode, value, pc)
            .map_err(|err| Error::Encode(line.pos.clone(), err))?;
        self.rom.write_at(slot, &bytes);
        Ok(true)
    }

    /// Writes an initialized variable, element by element.
    fn data(&mut self, var: &Variable, slot: Slot) -> Result<bool, Error> {
        let size = var.size.unwrap_or_default();
        let mut bytes = match var.init.as_ref().map(|init| &init.value) {
            Some(InitValue::Text(text)) => text.as_bytes().to_vec(),
            Some(InitValue::Values(values)) => {
                let lookup = Lookup::new(&self.session.scopes, &var.ns, &var.pos);
                let width = lookup.type_size(&var.ty)?.unwrap_or(1);
                let mut bytes = Vec::with_capacity(size);
                for value in values {
                    let Some(value) = self.eval(value, &var.pos)? else {
                        return Ok(false);
                    };
                    bytes.extend(&value.to_le_bytes()[..width.min(8)]);
                }
                bytes
            }
            None => Vec::new(),
        };
        bytes.resize(size, 0);
        self.rom.write_at(slot, &bytes);
        Ok(true)
    }

    fn finish(self) -> Image {
        let banks = self
            .rom
            .banks
            .values()
            .map(|bank| BankImage {
                number: bank.number,
                maxsize: bank.maxsize,
                regions: bank
                    .regions
                    .iter()
                    .map(|region| RegionImage {
                        org: region.org,
                        maxsize: region.maxsize,
                        bytes: region.finish(),
                        padding: region.padding.clone(),
                    })
                    .collect(),
            })
            .collect();
        Image {
            banks,
            labels: self.labels,
            ram: self.placed_ram,
            data: self.placed_data,
            vectors: self.vectors,
        }
    }
}
