//! Elaboration-time configuration of the MMIO controller.
//!
//! A [`MmioConfig`] is plain data that can be deserialized from JSON. It only
//! becomes usable after [`MmioConfig::validate`] turns it into an
//! [`AddressMap`]; every configuration defect is reported there instead of
//! surfacing as a silently misbehaving pipeline.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use thiserror::Error;

use crate::{
    bitmask,
    mmio::{
        block_store::BlockStore,
        header::{DeviceFeatureHeader, HEADER_WORDS, HeaderRom},
    },
};

/// Reference sizing of the endpoint.
mod defaults {
    pub const NUM_REGISTERS: usize = 16;
    pub const REGISTER_BASE: u16 = 0x0020;
    pub const BLOCK_WORDS: usize = 512;
    pub const BLOCK_BASE: u16 = 0x0080;
    pub const BLOCK_NATIVE_LATENCY: usize = 1;
    pub const TID_WIDTH: u32 = 9;

    /// c7a1f3e2-5b4d-4e8a-9f60-2d1b7c3e8a45
    pub const AFU_ID: [u8; 16] = [
        0xc7, 0xa1, 0xf3, 0xe2, 0x5b, 0x4d, 0x4e, 0x8a, 0x9f, 0x60, 0x2d, 0x1b, 0x7c, 0x3e, 0x8a,
        0x45,
    ];
}

/// Distance between consecutive 64-bit words in the MMIO address space.
///
/// MMIO addresses count 32-bit units, so every backing word spans two
/// addresses.
pub const ADDRESS_STRIDE: u32 = 2;

/// Widest transaction id the transport can carry.
pub const MAX_TID_WIDTH: u32 = 16;

/// Size of the MMIO address space (16-bit addresses).
const ADDRESS_SPACE: u32 = 1 << 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum Region {
    #[strum(to_string = "header")]
    Header,
    #[strum(to_string = "registers")]
    Registers,
    #[strum(to_string = "block store")]
    BlockStore,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MmioConfig {
    pub num_registers: usize,
    pub register_base: u16,
    pub block_words: usize,
    pub block_base: u16,
    /// Cycles the block array needs between its registered address and data.
    pub block_native_latency: usize,
    /// Optional explicit delay-line depth. When present it must match the
    /// block store's end-to-end read latency.
    pub delay_depth: Option<usize>,
    pub tid_width: u32,
    #[serde(with = "hex::serde")]
    pub afu_id: [u8; 16],
    pub dfh: DeviceFeatureHeader,
}

impl Default for MmioConfig {
    fn default() -> Self {
        MmioConfig {
            num_registers: defaults::NUM_REGISTERS,
            register_base: defaults::REGISTER_BASE,
            block_words: defaults::BLOCK_WORDS,
            block_base: defaults::BLOCK_BASE,
            block_native_latency: defaults::BLOCK_NATIVE_LATENCY,
            delay_depth: None,
            tid_width: defaults::TID_WIDTH,
            afu_id: defaults::AFU_ID,
            dfh: DeviceFeatureHeader::default(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{region} region must contain at least one word")]
    EmptyRegion { region: Region },

    #[error("{region} region {start:#06x}..{end:#07x} extends past the 16-bit address space")]
    RegionOutOfRange { region: Region, start: u32, end: u32 },

    #[error("{a} region overlaps {b} region")]
    RegionOverlap { a: Region, b: Region },

    #[error(
        "block store base {block_base:#06x} must lie above the register and header regions (which end at {lower_end:#06x})"
    )]
    BlockBelowRegisters { block_base: u16, lower_end: u32 },

    #[error(
        "delay depth {configured} does not match the block store read latency {expected} (native latency {native})"
    )]
    DelayDepthMismatch {
        configured: usize,
        expected: usize,
        native: usize,
    },

    #[error("transaction id width {0} must be between 1 and 16 bits")]
    InvalidTidWidth(u32),

    #[error("DFH field `{field}` value {value:#x} does not fit in {bits} bits")]
    DfhFieldOverflow {
        field: &'static str,
        value: u64,
        bits: u32,
    },
}

/// A contiguous run of 64-bit words mapped at stride [`ADDRESS_STRIDE`].
///
/// Covers the half-open address range `[base, base + 2 * words)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRegion {
    pub base: u16,
    pub words: usize,
}

impl AddressRegion {
    pub fn new(base: u16, words: usize) -> Self {
        AddressRegion { base, words }
    }

    /// One past the last address of the region.
    pub fn end(&self) -> u32 {
        self.base as u32 + ADDRESS_STRIDE * self.words as u32
    }

    /// Last address that still decodes into the region.
    pub fn upper(&self) -> u32 {
        self.end() - 1
    }

    pub fn contains(&self, address: u16) -> bool {
        let address = address as u32;
        address >= self.base as u32 && address < self.end()
    }

    /// Local word index of `address`, floor-dividing odd addresses.
    pub fn index_of(&self, address: u16) -> Option<usize> {
        self.contains(address)
            .then(|| ((address - self.base) as u32 / ADDRESS_STRIDE) as usize)
    }

    /// First MMIO address of word `index`.
    pub fn address_of(&self, index: usize) -> Option<u16> {
        (index < self.words).then(|| (self.base as u32 + ADDRESS_STRIDE * index as u32) as u16)
    }

    pub fn overlaps(&self, other: &AddressRegion) -> bool {
        (self.base as u32) < other.end() && (other.base as u32) < self.end()
    }
}

/// Validated address map plus the pipeline parameters derived from it.
#[derive(Clone, Debug, PartialEq)]
pub struct AddressMap {
    header: AddressRegion,
    registers: AddressRegion,
    block: AddressRegion,
    block_native_latency: usize,
    read_latency: usize,
    tid_mask: u16,
    header_rom: HeaderRom,
}

impl AddressMap {
    pub fn header(&self) -> &AddressRegion {
        &self.header
    }

    pub fn registers(&self) -> &AddressRegion {
        &self.registers
    }

    pub fn block(&self) -> &AddressRegion {
        &self.block
    }

    pub fn region(&self, region: Region) -> &AddressRegion {
        match region {
            Region::Header => &self.header,
            Region::Registers => &self.registers,
            Region::BlockStore => &self.block,
        }
    }

    pub fn block_native_latency(&self) -> usize {
        self.block_native_latency
    }

    /// Ticks between a read request and its response. Every delay line in
    /// the controller is built with this depth.
    pub fn read_latency(&self) -> usize {
        self.read_latency
    }

    pub fn tid_mask(&self) -> u16 {
        self.tid_mask
    }

    pub fn header_rom(&self) -> &HeaderRom {
        &self.header_rom
    }
}

impl MmioConfig {
    pub fn validate(&self) -> Result<AddressMap, ConfigError> {
        if self.tid_width == 0 || self.tid_width > MAX_TID_WIDTH {
            return Err(ConfigError::InvalidTidWidth(self.tid_width));
        }

        let header = AddressRegion::new(0, HEADER_WORDS);
        let registers = AddressRegion::new(self.register_base, self.num_registers);
        let block = AddressRegion::new(self.block_base, self.block_words);

        for (region, range) in [(Region::Registers, &registers), (Region::BlockStore, &block)] {
            if range.words == 0 {
                return Err(ConfigError::EmptyRegion { region });
            }
            // word counts large enough to wrap u32 are out of range too
            let end = range.base as u64 + ADDRESS_STRIDE as u64 * range.words as u64;
            if end > ADDRESS_SPACE as u64 {
                return Err(ConfigError::RegionOutOfRange {
                    region,
                    start: range.base as u32,
                    end: end.min(u32::MAX as u64) as u32,
                });
            }
        }

        let pairs = [
            (Region::Header, &header, Region::Registers, &registers),
            (Region::Header, &header, Region::BlockStore, &block),
            (Region::Registers, &registers, Region::BlockStore, &block),
        ];
        for (a, range_a, b, range_b) in pairs {
            if range_a.overlaps(range_b) {
                return Err(ConfigError::RegionOverlap { a, b });
            }
        }

        let lower_end = registers.end().max(header.end());
        if (block.base as u32) < lower_end {
            return Err(ConfigError::BlockBelowRegisters {
                block_base: block.base,
                lower_end,
            });
        }

        let expected = BlockStore::read_latency(self.block_native_latency);
        if let Some(configured) = self.delay_depth {
            if configured != expected {
                return Err(ConfigError::DelayDepthMismatch {
                    configured,
                    expected,
                    native: self.block_native_latency,
                });
            }
        }

        self.dfh.check_fields()?;

        let tid_mask: u32 = bitmask!(self.tid_width);
        Ok(AddressMap {
            header,
            registers,
            block,
            block_native_latency: self.block_native_latency,
            read_latency: expected,
            tid_mask: tid_mask as u16,
            header_rom: HeaderRom::new(u128::from_be_bytes(self.afu_id), &self.dfh),
        })
    }
}
