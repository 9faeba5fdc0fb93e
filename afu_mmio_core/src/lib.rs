pub mod config;
pub mod mmio;
pub mod trace;
mod utils;
