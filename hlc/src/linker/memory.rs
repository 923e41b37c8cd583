use crate::error::{Error, Pos};
use std::fmt;

/// Fill rule for bytes that are never written.
///
/// The pattern is tiled from the start of its region, so a two byte
/// pattern `0xEA 0x00` puts `0xEA` at every even offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Padding(Vec<u8>);

impl Default for Padding {
    fn default() -> Self {
        Self(vec![0xFF])
    }
}

impl Padding {
    /// Little-endian bytes of `value`, as many as it needs.
    pub fn from_value(value: i64) -> Self {
        let bytes = (value as u64).to_le_bytes();
        let len = bytes.iter().rposition(|&b| b != 0).map_or(1, |i| i + 1);
        Self(bytes[..len].to_vec())
    }

    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self::from_value(0);
        }
        Self(text.as_bytes().to_vec())
    }

    pub fn at(&self, offset: usize) -> u8 {
        self.0[offset % self.0.len()]
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Bytes of one region. Reserved but unwritten bytes are `None` until the
/// region is finished.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub org: usize,
    pub maxsize: Option<usize>,
    pub padding: Padding,
    data: Vec<Option<u8>>,
}

impl Buffer {
    pub fn new(org: usize, maxsize: Option<usize>, padding: Padding) -> Self {
        Self {
            org,
            maxsize,
            padding,
            data: Vec::new(),
        }
    }

    /// Address of the next byte.
    pub fn cursor(&self) -> usize {
        self.org + self.data.len()
    }

    /// The cursor as a CPU address. A full region ending at 0xFFFF has none.
    pub fn address(&self, pos: &Pos) -> Result<u16, Error> {
        let cursor = self.cursor();
        u16::try_from(cursor).map_err(|_| Error::AddressOutOfRange(pos.clone(), cursor))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes this region occupies in its bank once padded.
    pub fn extent(&self) -> usize {
        self.maxsize.unwrap_or(0).max(self.data.len())
    }

    /// Claims `size` bytes at the cursor and returns their offset.
    pub fn reserve(&mut self, size: usize, pos: &Pos) -> Result<usize, Error> {
        let offset = self.data.len();
        let end = offset + size;
        if let Some(maxsize) = self.maxsize {
            if end > maxsize {
                return Err(Error::RegionOverflow(pos.clone(), self.org, maxsize));
            }
        }
        if self.org + end > 0x10000 {
            return Err(Error::AddressOutOfRange(pos.clone(), self.org + end - 1));
        }
        self.data.resize(end, None);
        Ok(offset)
    }

    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) {
        for (slot, byte) in self.data[offset..offset + bytes.len()].iter_mut().zip(bytes) {
            *slot = Some(*byte);
        }
    }

    pub fn write(&mut self, bytes: &[u8], pos: &Pos) -> Result<usize, Error> {
        let offset = self.reserve(bytes.len(), pos)?;
        self.write_at(offset, bytes);
        Ok(offset)
    }

    /// Advances the cursor to the next multiple of `n`.
    pub fn align(&mut self, n: usize, pos: &Pos) -> Result<(), Error> {
        if n <= 1 {
            return Ok(());
        }
        let gap = (n - self.cursor() % n) % n;
        self.reserve(gap, pos).map(|_| ())
    }

    /// Final bytes, padded out to the maximum size.
    pub fn finish(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self
            .data
            .iter()
            .enumerate()
            .map(|(offset, byte)| byte.unwrap_or_else(|| self.padding.at(offset)))
            .collect();
        let extent = self.extent();
        bytes.extend((bytes.len()..extent).map(|offset| self.padding.at(offset)));
        bytes
    }
}
