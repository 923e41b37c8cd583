use super::memory::Padding;
use indexmap::IndexMap;
use serde::Serialize;

/// A laid out region: its origin and final bytes.
#[derive(Debug, Clone, Serialize)]
pub struct RegionImage {
    pub org: usize,
    pub maxsize: Option<usize>,
    pub bytes: Vec<u8>,
    #[serde(skip)]
    pub padding: Padding,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankImage {
    pub number: usize,
    pub maxsize: Option<usize>,
    pub regions: Vec<RegionImage>,
}

/// A placed variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub name: String,
    pub address: u16,
    pub size: usize,
}

/// Everything layout produces for one session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Image {
    pub banks: Vec<BankImage>,
    pub labels: IndexMap<String, u16>,
    /// Variables without an initializer.
    pub ram: Vec<Placement>,
    /// Variables with an initializer, stored in ROM.
    pub data: Vec<Placement>,
    pub vectors: IndexMap<String, u16>,
}

impl BankImage {
    /// Regions in address order, with the gaps between them padded.
    pub fn image(&self) -> Vec<u8> {
        let mut regions = self.regions.iter().collect::<Vec<_>>();
        regions.sort_by_key(|region| region.org);

        let mut bytes = Vec::new();
        let mut cursor = None;
        let mut last: Option<&RegionImage> = None;
        for region in regions {
            if let (Some(cursor), Some(prev)) = (cursor, last) {
                let gap = region.org.saturating_sub(cursor);
                let start = prev.bytes.len();
                bytes.extend((start..start + gap).map(|offset| prev.padding.at(offset)));
            }
            bytes.extend(&region.bytes);
            cursor = Some(region.org + region.bytes.len());
            last = Some(region);
        }
        if let (Some(maxsize), Some(prev)) = (self.maxsize, last) {
            let start = prev.bytes.len();
            let missing = maxsize.saturating_sub(bytes.len());
            bytes.extend((start..start + missing).map(|offset| prev.padding.at(offset)));
        }
        bytes
    }
}

impl Image {
    /// All banks in number order, concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        let mut banks = self.banks.iter().collect::<Vec<_>>();
        banks.sort_by_key(|bank| bank.number);
        banks.iter().flat_map(|bank| bank.image()).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(org: usize, bytes: &[u8], padding: Padding) -> RegionImage {
        RegionImage {
            org,
            maxsize: None,
            bytes: bytes.to_vec(),
            padding,
        }
    }

    #[test]
    fn gaps_and_tail_are_padded() {
        let bank = BankImage {
            number: 0,
            maxsize: Some(8),
            regions: vec![
                region(0x8004, &[3, 4], Padding::from_value(0)),
                region(0x8000, &[1, 2], Padding::from_value(0xEA)),
            ],
        };
        assert_eq!(bank.image(), vec![1, 2, 0xEA, 0xEA, 3, 4, 0, 0]);
    }

    #[test]
    fn json_skips_padding() {
        let image = Image {
            banks: vec![BankImage {
                number: 1,
                maxsize: None,
                regions: vec![region(0xC000, &[0x60], Padding::default())],
            }],
            ..Default::default()
        };
        let json = image.to_json().unwrap();
        assert!(json.contains("\"org\": 49152"));
        assert!(!json.contains("padding"));
    }
}
