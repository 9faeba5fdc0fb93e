use crate::config::{AddressMap, Region};

/// Result of decoding one request address.
///
/// At most one index is `Some`; an address with no index is unmapped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodedAddress {
    pub header_index: Option<usize>,
    pub register_index: Option<usize>,
    pub block_index: Option<usize>,
    /// Write enable for the block store: a write landing in its region.
    pub block_write_enable: bool,
}

impl DecodedAddress {
    pub fn region(&self) -> Option<Region> {
        if self.header_index.is_some() {
            Some(Region::Header)
        } else if self.register_index.is_some() {
            Some(Region::Registers)
        } else if self.block_index.is_some() {
            Some(Region::BlockStore)
        } else {
            None
        }
    }
}

pub fn decode(map: &AddressMap, address: u16, is_write: bool) -> DecodedAddress {
    let block_index = map.block().index_of(address);
    DecodedAddress {
        header_index: map.header().index_of(address),
        register_index: map.registers().index_of(address),
        block_index,
        block_write_enable: is_write && block_index.is_some(),
    }
}
