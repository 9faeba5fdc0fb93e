use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{bitmask, bits, config::ConfigError};

/// Number of 64-bit words in the fixed identification header.
pub const HEADER_WORDS: usize = 5;

/// Feature type encoding for an AFU in bits 63:60 of the DFH.
pub const AFU_FEATURE_TYPE: u64 = 0x1;

/// Header words in address order, starting at MMIO address 0x0000.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum HeaderField {
    #[strum(to_string = "DFH")]
    Dfh,
    #[strum(to_string = "AFU_ID_L")]
    AfuIdLow,
    #[strum(to_string = "AFU_ID_H")]
    AfuIdHigh,
    #[strum(to_string = "DFH_RSVD0")]
    Reserved0,
    #[strum(to_string = "DFH_RSVD1")]
    Reserved1,
}

impl HeaderField {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Device feature header fields.
///
/// Layout of the raw word:
/// - 63:60 feature type (always AFU)
/// - 40    end of list
/// - 39:16 byte offset to the next DFH
/// - 15:12 AFU revision
/// - 11:0  feature id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceFeatureHeader {
    pub end_of_list: bool,
    pub next_offset: u32,
    pub revision: u8,
    pub feature_id: u16,
}

impl Default for DeviceFeatureHeader {
    fn default() -> Self {
        DeviceFeatureHeader {
            end_of_list: true,
            next_offset: 0,
            revision: 0,
            feature_id: 0,
        }
    }
}

impl DeviceFeatureHeader {
    const NEXT_OFFSET_BITS: u32 = 24;
    const REVISION_BITS: u32 = 4;
    const FEATURE_ID_BITS: u32 = 12;

    pub fn check_fields(&self) -> Result<(), ConfigError> {
        let fields = [
            ("next_offset", self.next_offset as u64, Self::NEXT_OFFSET_BITS),
            ("revision", self.revision as u64, Self::REVISION_BITS),
            ("feature_id", self.feature_id as u64, Self::FEATURE_ID_BITS),
        ];
        for (field, value, bits) in fields {
            if value >> bits != 0 {
                return Err(ConfigError::DfhFieldOverflow { field, value, bits });
            }
        }
        Ok(())
    }

    pub fn to_raw(&self) -> u64 {
        let next_offset: u64 = bitmask!(Self::NEXT_OFFSET_BITS);
        let revision: u64 = bitmask!(Self::REVISION_BITS);
        let feature_id: u64 = bitmask!(Self::FEATURE_ID_BITS);

        (AFU_FEATURE_TYPE << 60)
            | ((self.end_of_list as u64) << 40)
            | ((self.next_offset as u64 & next_offset) << 16)
            | ((self.revision as u64 & revision) << 12)
            | (self.feature_id as u64 & feature_id)
    }

    pub fn from_raw(raw: u64) -> Self {
        DeviceFeatureHeader {
            end_of_list: bits!(raw, 40) != 0,
            next_offset: bits!(raw, 39;16) as u32,
            revision: bits!(raw, 15;12) as u8,
            feature_id: bits!(raw, 11;0) as u16,
        }
    }
}

/// Read-only identification words served from the header region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderRom {
    words: [u64; HEADER_WORDS],
}

impl HeaderRom {
    pub fn new(afu_id: u128, dfh: &DeviceFeatureHeader) -> Self {
        let mut words = [0; HEADER_WORDS];
        words[HeaderField::Dfh.index()] = dfh.to_raw();
        words[HeaderField::AfuIdLow.index()] = afu_id as u64;
        words[HeaderField::AfuIdHigh.index()] = (afu_id >> 64) as u64;
        HeaderRom { words }
    }

    /// Constant at header word `index`; anything past the header reads zero.
    pub fn read(&self, index: usize) -> u64 {
        self.words.get(index).copied().unwrap_or(0)
    }

    pub fn field(&self, field: HeaderField) -> u64 {
        self.words[field.index()]
    }

    pub fn afu_id(&self) -> u128 {
        ((self.field(HeaderField::AfuIdHigh) as u128) << 64)
            | self.field(HeaderField::AfuIdLow) as u128
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn default_dfh_marks_single_afu() {
        let raw = DeviceFeatureHeader::default().to_raw();
        assert_eq!(raw, 0x1000_0100_0000_0000);
    }

    #[test]
    fn dfh_fields_decode_from_raw() {
        let dfh = DeviceFeatureHeader {
            end_of_list: false,
            next_offset: 0x1000,
            revision: 3,
            feature_id: 0x0AB,
        };
        let raw = dfh.to_raw();

        assert_eq!(bits!(raw, 63;60), AFU_FEATURE_TYPE);
        assert_eq!(DeviceFeatureHeader::from_raw(raw), dfh);
    }

    #[test]
    fn oversized_dfh_fields_are_rejected() {
        let dfh = DeviceFeatureHeader {
            revision: 16,
            ..Default::default()
        };
        assert_eq!(
            dfh.check_fields(),
            Err(ConfigError::DfhFieldOverflow {
                field: "revision",
                value: 16,
                bits: 4,
            })
        );
    }

    #[test]
    fn rom_splits_afu_id() {
        let afu_id = 0x0011_2233_4455_6677_8899_AABB_CCDD_EEFF_u128;
        let rom = HeaderRom::new(afu_id, &DeviceFeatureHeader::default());

        assert_eq!(rom.field(HeaderField::AfuIdLow), 0x8899_AABB_CCDD_EEFF);
        assert_eq!(rom.field(HeaderField::AfuIdHigh), 0x0011_2233_4455_6677);
        assert_eq!(rom.afu_id(), afu_id);
        assert_eq!(rom.read(HEADER_WORDS), 0);

        let reserved = HeaderField::iter()
            .filter(|f| matches!(f, HeaderField::Reserved0 | HeaderField::Reserved1))
            .map(|f| rom.field(f));
        assert!(reserved.into_iter().all(|word| word == 0));
    }
}
