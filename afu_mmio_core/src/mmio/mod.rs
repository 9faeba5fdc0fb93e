pub mod block_store;
pub mod decoder;
pub mod delay_line;
pub mod header;
pub mod register_bank;
pub mod response_mux;

#[cfg(test)]
mod fuzz_test;

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, info, trace};

use crate::config::{AddressMap, ConfigError, MmioConfig, Region};
use block_store::BlockStore;
use decoder::DecodedAddress;
use delay_line::DelayLine;
use header::HeaderRom;
use register_bank::RegisterBank;

/// One tick of the inbound request channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub is_write: bool,
    pub is_read: bool,
    pub address: u16,
    pub write_data: u64,
    pub transaction_id: u16,
}

impl Request {
    pub fn idle() -> Self {
        Request::default()
    }

    pub fn read(address: u16, transaction_id: u16) -> Self {
        Request {
            is_read: true,
            address,
            transaction_id,
            ..Default::default()
        }
    }

    pub fn write(address: u16, write_data: u64) -> Self {
        Request {
            is_write: true,
            address,
            write_data,
            ..Default::default()
        }
    }

    /// A request flagged as both write and read is handled as a write.
    fn admits_read(&self) -> bool {
        self.is_read && !self.is_write
    }
}

/// One tick of the outbound response channel.
///
/// `transaction_id` and `data` are only meaningful when `read_valid` is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub transaction_id: u16,
    pub read_valid: bool,
    pub data: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
pub enum ControllerState {
    Reset,
    #[default]
    Operating,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub ticks: u64,
    pub reads: u64,
    pub writes: u64,
    pub dropped_writes: u64,
    pub resets: u64,
    pub responses: u64,
}

/// The MMIO controller: address decoder, register bank, block store and the
/// delay lines that align the register path with the block store's latency.
///
/// Every call to [`clock`](MmioController::clock) is one tick. Outputs of the
/// tick are computed from the state registered at its start, then every
/// register updates.
#[derive(Clone, Debug, PartialEq)]
pub struct MmioController {
    map: AddressMap,
    registers: RegisterBank,
    block_store: BlockStore,

    // in-flight read lanes, all built with the same depth
    tid_line: DelayLine<u16>,
    valid_line: DelayLine<bool>,
    data_line: DelayLine<u64>,
    addr_line: DelayLine<u16>,

    state: ControllerState,
    tick: u64,
    stats: Stats,
}

impl MmioController {
    pub fn new(config: &MmioConfig) -> Result<Self, ConfigError> {
        let map = config.validate()?;
        Ok(Self::from_map(map))
    }

    pub fn from_map(map: AddressMap) -> Self {
        let block_store = BlockStore::new(map.block().words, map.block_native_latency());
        let depth = map.read_latency();
        info!(
            registers = map.registers().words,
            block_words = map.block().words,
            read_latency = depth,
            "elaborated MMIO controller"
        );

        MmioController {
            registers: RegisterBank::new(map.registers().words),
            block_store,
            tid_line: DelayLine::new(depth),
            valid_line: DelayLine::new(depth),
            data_line: DelayLine::new(depth),
            addr_line: DelayLine::new(depth),
            state: ControllerState::Operating,
            tick: 0,
            stats: Stats::default(),
            map,
        }
    }

    /// Advance the controller by one tick.
    ///
    /// Returns the response channel as driven during this tick: the read
    /// issued [`read_latency`](Self::read_latency) ticks earlier, if any.
    pub fn clock(&mut self, reset: bool, request: &Request) -> Response {
        self.run_reset_state(reset);
        if reset {
            // asynchronous: the bank reads as zero for the whole tick
            self.registers.reset();
        }

        let is_read = request.admits_read();
        let decoded = decoder::decode(&self.map, request.address, request.is_write);

        // register path, combinational from the state at the start of the tick
        let register_data = if is_read {
            self.run_register_read(&decoded)
        } else {
            0
        };

        let delayed_tid = self
            .tid_line
            .clock(request.transaction_id & self.map.tid_mask());
        let delayed_valid = self.valid_line.clock(is_read);
        let delayed_data = self.data_line.clock(register_data);
        let delayed_addr = self.addr_line.clock(request.address);

        let block_read = if is_read { decoded.block_index } else { None };
        let block_write = if decoded.block_write_enable {
            decoded.block_index.map(|index| (index, request.write_data))
        } else {
            None
        };
        let block_data = self.block_store.clock(block_read, block_write);

        let register_write = if request.is_write {
            self.run_register_write(request, &decoded, reset)
        } else {
            None
        };
        self.registers.advance(reset, register_write);

        let response = Response {
            transaction_id: delayed_tid,
            read_valid: delayed_valid,
            data: response_mux::select(&self.map, delayed_addr, delayed_data, block_data),
        };

        self.record(request, is_read, &response);
        response
    }

    /// Host-style write: one tick carrying a write request.
    pub fn mmio_write(&mut self, address: u16, value: u64) {
        self.clock(false, &Request::write(address, value));
    }

    /// Host-style read: issue the read, then idle until its response leaves
    /// the pipeline.
    pub fn mmio_read(&mut self, address: u16) -> Option<u64> {
        let mut response = self.clock(false, &Request::read(address, 0));
        for _ in 0..self.read_latency() {
            response = self.clock(false, &Request::idle());
        }
        response.read_valid.then_some(response.data)
    }

    /// Ticks between a read request and its response.
    pub fn read_latency(&self) -> usize {
        self.map.read_latency()
    }

    pub fn map(&self) -> &AddressMap {
        &self.map
    }

    pub fn header(&self) -> &HeaderRom {
        self.map.header_rom()
    }

    pub fn registers(&self) -> &RegisterBank {
        &self.registers
    }

    pub fn block_store(&self) -> &BlockStore {
        &self.block_store
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Index of the next tick to be clocked.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Reads still travelling through the pipeline.
    pub fn reads_in_flight(&self) -> usize {
        self.valid_line.in_flight().filter(|&valid| valid).count()
    }

    /// Value an address would read right now, bypassing the pipeline
    pub fn preview(&self, address: u16) -> u64 {
        let decoded = decoder::decode(&self.map, address, false);
        match decoded.region() {
            Some(Region::Header) => self.header().read(decoded.header_index.unwrap_or(0)),
            Some(Region::Registers) => decoded
                .register_index
                .and_then(|index| self.registers.preview(index))
                .unwrap_or(0),
            Some(Region::BlockStore) => decoded
                .block_index
                .and_then(|index| self.block_store.preview(index))
                .unwrap_or(0),
            None => 0,
        }
    }

    fn run_reset_state(&mut self, reset: bool) {
        match (self.state, reset) {
            (ControllerState::Operating, true) => {
                info!(tick = self.tick, "reset asserted");
                self.state = ControllerState::Reset;
                self.stats.resets += 1;
            }
            (ControllerState::Reset, false) => {
                info!(tick = self.tick, "reset released");
                self.state = ControllerState::Operating;
            }
            _ => {}
        }
    }

    fn run_register_read(&self, decoded: &DecodedAddress) -> u64 {
        if let Some(index) = decoded.header_index {
            self.header().read(index)
        } else if let Some(index) = decoded.register_index {
            self.registers.read(index)
        } else {
            // block store reads come from its own pipeline
            0
        }
    }

    fn run_register_write(
        &mut self,
        request: &Request,
        decoded: &DecodedAddress,
        reset: bool,
    ) -> Option<(usize, u64)> {
        match decoded.region() {
            Some(Region::Registers) if !reset => {
                decoded.register_index.map(|index| (index, request.write_data))
            }
            Some(Region::Registers) => {
                debug!(address = request.address, "register write dropped during reset");
                self.stats.dropped_writes += 1;
                None
            }
            Some(Region::BlockStore) => None,
            Some(Region::Header) => {
                debug!(address = request.address, "write to read-only header ignored");
                self.stats.dropped_writes += 1;
                None
            }
            None => {
                debug!(address = request.address, "write to unmapped address ignored");
                self.stats.dropped_writes += 1;
                None
            }
        }
    }

    fn record(&mut self, request: &Request, is_read: bool, response: &Response) {
        trace!(
            tick = self.tick,
            ?request,
            ?response,
            state = %self.state,
            "clock"
        );
        self.stats.ticks += 1;
        self.stats.reads += is_read as u64;
        self.stats.writes += request.is_write as u64;
        self.stats.responses += response.read_valid as u64;
        self.tick += 1;
    }
}
