use super::memory::{Buffer, Padding};
use crate::error::{Error, Pos};
use indexmap::IndexMap;
use tracing::trace;

/// A numbered ROM bank and the regions opened in it.
#[derive(Debug, Clone)]
pub struct Bank {
    pub number: usize,
    pub maxsize: Option<usize>,
    pub regions: Vec<Buffer>,
    open: Option<usize>,
}

impl Bank {
    fn new(number: usize, maxsize: Option<usize>) -> Self {
        Self {
            number,
            maxsize,
            regions: Vec::new(),
            open: None,
        }
    }

    /// Index of the region that would collide with `[begin, end)`.
    fn overlapping(&self, begin: usize, end: usize, skip: Option<usize>) -> Option<usize> {
        self.regions.iter().enumerate().position(|(idx, region)| {
            let other_end = region.org + region.extent().max(1);
            Some(idx) != skip && begin < other_end && region.org < end
        })
    }

    fn used(&self) -> usize {
        self.regions.iter().map(Buffer::extent).sum()
    }
}

/// Location of a reserved byte run, stable across regions being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub bank: usize,
    pub region: usize,
    pub offset: usize,
}

/// All banks of the output ROM.
#[derive(Debug, Clone, Default)]
pub struct RomFile {
    pub banks: IndexMap<usize, Bank>,
    current: usize,
    banksize: Option<usize>,
    padding: Padding,
}

impl RomFile {
    pub fn new() -> Self {
        Self::default()
    }

    fn bank_mut(&mut self) -> &mut Bank {
        let (number, banksize) = (self.current, self.banksize);
        self.banks
            .entry(number)
            .or_insert_with(|| Bank::new(number, banksize))
    }

    /// Selects bank `number`, creating it on first use.
    pub fn select(&mut self, number: usize, maxsize: Option<usize>) {
        self.current = number;
        let bank = self.bank_mut();
        if maxsize.is_some() {
            bank.maxsize = maxsize;
        }
        trace!(bank = number, "select bank");
    }

    /// Default size of banks created from now on.
    pub fn set_banksize(&mut self, size: usize) {
        self.banksize = Some(size);
    }

    /// Padding of the open region and of every region opened later.
    pub fn set_padding(&mut self, padding: Padding) {
        self.padding = padding.clone();
        if let Some(bank) = self.banks.get_mut(&self.current) {
            if let Some(idx) = bank.open {
                bank.regions[idx].padding = padding;
            }
        }
    }

    pub fn open(&mut self, org: usize, maxsize: Option<usize>, pos: &Pos) -> Result<(), Error> {
        let padding = self.padding.clone();
        let bank = self.bank_mut();
        if bank.open.is_some() {
            return Err(Error::RegionAlreadyOpen(pos.clone(), bank.number));
        }
        let end = org.saturating_add(maxsize.unwrap_or(1).max(1));
        if end > 0x10000 {
            return Err(Error::AddressOutOfRange(pos.clone(), end - 1));
        }
        if let Some(idx) = bank.overlapping(org, end, None) {
            let other = &bank.regions[idx];
            return Err(Error::RegionOverlap(
                pos.clone(),
                org,
                end - 1,
                other.org,
                other.org + other.extent().max(1) - 1,
                bank.number,
            ));
        }
        bank.regions.push(Buffer::new(org, maxsize, padding));
        bank.open = Some(bank.regions.len() - 1);
        trace!(bank = bank.number, org, "open region");
        Ok(())
    }

    /// Closes the open region, checking its final extent against the bank.
    pub fn close(&mut self, pos: &Pos) -> Result<(), Error> {
        let bank = self.bank_mut();
        let idx = bank
            .open
            .take()
            .ok_or_else(|| Error::NoOpenRegion(pos.clone(), bank.number))?;
        let region = &bank.regions[idx];
        let end = region.org + region.extent().max(1);
        if let Some(other) = bank.overlapping(region.org, end, Some(idx)) {
            let other = &bank.regions[other];
            return Err(Error::RegionOverlap(
                pos.clone(),
                region.org,
                end - 1,
                other.org,
                other.org + other.extent().max(1) - 1,
                bank.number,
            ));
        }
        if let Some(maxsize) = bank.maxsize {
            if bank.used() > maxsize {
                return Err(Error::BankOverflow(pos.clone(), bank.number, maxsize));
            }
        }
        trace!(bank = bank.number, org = region.org, len = region.len(), "close region");
        Ok(())
    }

    /// Closes whatever is still open in any bank.
    pub fn close_all(&mut self, pos: &Pos) -> Result<(), Error> {
        let open = self
            .banks
            .values()
            .filter(|bank| bank.open.is_some())
            .map(|bank| bank.number)
            .collect::<Vec<_>>();
        for number in open {
            self.current = number;
            self.close(pos)?;
        }
        Ok(())
    }

    /// The open region of the current bank.
    pub fn region(&mut self, pos: &Pos) -> Result<&mut Buffer, Error> {
        let bank = self.bank_mut();
        match bank.open {
            Some(idx) => Ok(&mut bank.regions[idx]),
            None => Err(Error::NoOpenRegion(pos.clone(), bank.number)),
        }
    }

    /// Reserves `size` bytes at the cursor of the open region.
    pub fn reserve(&mut self, size: usize, pos: &Pos) -> Result<(Slot, u16), Error> {
        let bank = self.current;
        let region = self.region(pos)?;
        let addr = region.address(pos)?;
        let offset = region.reserve(size, pos)?;
        let slot = Slot {
            bank,
            region: self.banks[&bank].open.unwrap_or_default(),
            offset,
        };
        Ok((slot, addr))
    }

    pub fn write_at(&mut self, slot: Slot, bytes: &[u8]) {
        if let Some(bank) = self.banks.get_mut(&slot.bank) {
            bank.regions[slot.region].write_at(slot.offset, bytes);
        }
    }
}
