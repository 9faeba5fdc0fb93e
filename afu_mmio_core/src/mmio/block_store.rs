use super::delay_line::DelayLine;

/// Synchronous-read, synchronous-write array of 64-bit words.
///
/// A read address presented on tick T is captured in the address register at
/// the end of T. On T+1 the array is read from that address and the word
/// spends `native_latency` ticks inside the array before landing in the
/// read-data register, which drives the output one tick later.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockStore {
    words: Vec<u64>,
    addr_reg: Option<usize>,
    array: DelayLine<u64>,
    rd_data: u64,
}

impl BlockStore {
    /// Registers around the array: address capture and read data.
    pub const REGISTER_STAGES: usize = 2;

    /// Ticks from presenting a read address to the word appearing on the
    /// output. The controller sizes its delay lines with this.
    pub const fn read_latency(native_latency: usize) -> usize {
        native_latency + Self::REGISTER_STAGES
    }

    pub fn new(words: usize, native_latency: usize) -> Self {
        BlockStore {
            words: vec![0; words],
            addr_reg: None,
            array: DelayLine::new(native_latency),
            rd_data: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn native_latency(&self) -> usize {
        self.array.depth()
    }

    /// Advance one tick.
    ///
    /// Returns the read-data register as seen during this tick, i.e. the word
    /// for the address presented [`read_latency`](Self::read_latency) ticks
    /// ago, or zero if no read was presented then.
    pub fn clock(&mut self, read_index: Option<usize>, write: Option<(usize, u64)>) -> u64 {
        let output = self.rd_data;

        let fetched = self.addr_reg.map_or(0, |index| self.words[index]);
        self.rd_data = self.array.clock(fetched);
        self.addr_reg = read_index;

        if let Some((index, value)) = write {
            self.words[index] = value;
        }

        output
    }

    /// View a word without going through the read pipeline
    pub fn preview(&self, index: usize) -> Option<u64> {
        self.words.get(index).copied()
    }
}
