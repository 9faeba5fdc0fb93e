use crate::config::AddressMap;

/// Pick the response data for a read leaving the pipeline.
///
/// `delayed_address` must be the address that travelled through the delay
/// lines with `register_data`; the block-store output on the same tick
/// belongs to that address too.
pub fn select(map: &AddressMap, delayed_address: u16, register_data: u64, block_data: u64) -> u64 {
    if delayed_address < map.block().base {
        register_data
    } else {
        block_data
    }
}
