/// A run of RAM addresses, `[begin, end]` inclusive.
#[derive(Debug, Clone)]
struct Section {
    begin: usize,
    end: usize,
    owner: Option<String>, // None means free
}

impl Section {
    fn new(begin: usize, end: usize, owner: Option<String>) -> Self {
        Self { begin, end, owner }
    }

    fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    fn contains(&self, addr: usize, end: usize) -> bool {
        addr >= self.begin && end <= self.end
    }

    /// Carves `[addr, addr + size)` for `owner` out of this free section.
    fn split(&self, addr: usize, size: usize, owner: &str) -> Vec<Self> {
        let end = addr + size - 1;
        let mut result = Vec::new();
        if addr > self.begin {
            result.push(Section::new(self.begin, addr - 1, None));
        }
        result.push(Section::new(addr, end, Some(owner.to_string())));
        if end < self.end {
            result.push(Section::new(end + 1, self.end, None));
        }
        result
    }
}

/// First-fit placement of RAM variables.
///
/// Every `#ram.org` window draws from the same map, so a window reopened
/// at an address that is already in use continues after the earlier
/// variables instead of overlapping them.
#[derive(Debug, Clone)]
pub struct Allocator {
    map: Vec<Section>,
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new(0x0000, 0xFFFF)
    }
}

impl Allocator {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            map: vec![Section::new(start, end, None)],
        }
    }

    /// Places `size` bytes for `owner` inside `[start, end]`, returning the
    /// address, or None when no free run is large enough.
    pub fn place(&mut self, start: usize, end: usize, size: usize, owner: &str) -> Option<usize> {
        let size = size.max(1);
        let idx = self.map.iter().position(|section| {
            let begin = section.begin.max(start);
            section.is_free() && begin + size - 1 <= section.end.min(end)
        })?;
        let section = &self.map[idx];
        let addr = section.begin.max(start);
        debug_assert!(section.contains(addr, addr + size - 1));
        let parts = section.split(addr, size, owner);
        self.map.splice(idx..=idx, parts);
        Some(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fit_inside_window() {
        let mut ram = Allocator::default();
        assert_eq!(ram.place(0x0200, 0x02FF, 2, "a"), Some(0x0200));
        assert_eq!(ram.place(0x0200, 0x02FF, 1, "b"), Some(0x0202));
        assert_eq!(ram.place(0x0000, 0x00FF, 1, "zp"), Some(0x0000));
    }

    #[test]
    fn reopened_window_skips_used_bytes() {
        let mut ram = Allocator::default();
        ram.place(0x0300, 0x0303, 3, "a");
        assert_eq!(ram.place(0x0300, 0x0303, 1, "b"), Some(0x0303));
        assert_eq!(ram.place(0x0300, 0x0303, 1, "c"), None);
    }
}
