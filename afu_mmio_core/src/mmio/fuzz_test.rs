use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

/// Zero-latency model of the address space: every read is answered on the
/// tick it is issued.
struct ReferenceModel {
    map: AddressMap,
    registers: Vec<u64>,
    block: Vec<u64>,
}

impl ReferenceModel {
    fn new(map: &AddressMap) -> Self {
        ReferenceModel {
            map: map.clone(),
            registers: vec![0; map.registers().words],
            block: vec![0; map.block().words],
        }
    }

    fn step(&mut self, reset: bool, request: &Request) -> Option<(u16, u64)> {
        if reset {
            self.registers.fill(0);
        }

        let address = request.address;
        if request.is_write {
            if let Some(index) = self.map.registers().index_of(address) {
                if !reset {
                    self.registers[index] = request.write_data;
                }
            } else if let Some(index) = self.map.block().index_of(address) {
                self.block[index] = request.write_data;
            }
            return None;
        }
        if !request.is_read {
            return None;
        }

        let data = if let Some(index) = self.map.header().index_of(address) {
            self.map.header_rom().read(index)
        } else if let Some(index) = self.map.registers().index_of(address) {
            self.registers[index]
        } else if let Some(index) = self.map.block().index_of(address) {
            self.block[index]
        } else {
            0
        };
        Some((request.transaction_id & self.map.tid_mask(), data))
    }
}

fn random_address<R: Rng>(rng: &mut R, map: &AddressMap) -> u16 {
    let pick = |rng: &mut R, region: &crate::config::AddressRegion| {
        rng.random_range(region.base as u32..region.end()) as u16
    };
    match rng.random_range(0..10) {
        0 => pick(rng, map.header()),
        1..=4 => pick(rng, map.registers()),
        5..=8 => pick(rng, map.block()),
        _ => rng.random(),
    }
}

fn random_tick<R: Rng>(rng: &mut R, map: &AddressMap) -> (bool, Request) {
    let reset = rng.random_range(0..100) < 3;
    let request = match rng.random_range(0..100) {
        0..45 => Request::read(random_address(rng, map), rng.random()),
        45..85 => Request::write(random_address(rng, map), rng.random()),
        _ => Request::idle(),
    };
    (reset, request)
}

fn check_against_reference(config: &MmioConfig, seed: u8, ticks: usize) {
    let mut rng = StdRng::from_seed([seed; 32]);
    let mut controller = MmioController::new(config).unwrap();
    let map = controller.map().clone();
    let mut model = ReferenceModel::new(&map);

    let latency = controller.read_latency();
    let mut expected: VecDeque<Option<(u16, u64)>> = VecDeque::from(vec![None; latency]);

    for tick in 0..ticks {
        let (reset, request) = random_tick(&mut rng, &map);
        expected.push_back(model.step(reset, &request));

        let response = controller.clock(reset, &request);
        let due = expected.pop_front().flatten();

        match due {
            Some((tid, data)) => {
                assert!(response.read_valid, "tick {tick}: missing response");
                assert_eq!(response.transaction_id, tid, "tick {tick}: transaction id");
                assert_eq!(response.data, data, "tick {tick}: data");
            }
            None => assert!(!response.read_valid, "tick {tick}: unexpected response"),
        }
    }

    assert_eq!(controller.stats().ticks, ticks as u64);
}

#[test]
fn test_fuzz_reference_map() {
    check_against_reference(&MmioConfig::default(), 40, 20_000);
}

#[test]
fn test_fuzz_native_latencies() {
    for native in [0, 2, 5] {
        let config = MmioConfig {
            block_native_latency: native,
            ..Default::default()
        };
        check_against_reference(&config, 7 + native as u8, 5_000);
    }
}

#[test]
fn test_fuzz_relocated_map() {
    let config = MmioConfig {
        register_base: 0x0100,
        num_registers: 16,
        block_base: 0x0400,
        block_words: 64,
        tid_width: 4,
        ..Default::default()
    };
    check_against_reference(&config, 99, 10_000);
}
