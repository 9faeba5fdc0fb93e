use std::ops::Index;

/// Software-visible 64-bit registers.
///
/// Reads are combinational. Writes land at the end of the tick through
/// [`advance`](RegisterBank::advance), where reset wins over any write
/// scheduled for the same tick.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisterBank {
    regs: Vec<u64>,
}

impl RegisterBank {
    pub fn new(num_registers: usize) -> Self {
        RegisterBank {
            regs: vec![0; num_registers],
        }
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    /// Combinational read. `index` must come from the address decoder.
    pub fn read(&self, index: usize) -> u64 {
        self.regs[index]
    }

    /// View a register without the range contract (used by inspection tools)
    pub fn preview(&self, index: usize) -> Option<u64> {
        self.regs.get(index).copied()
    }

    pub fn write(&mut self, index: usize, value: u64) {
        self.regs[index] = value;
    }

    pub fn reset(&mut self) {
        self.regs.fill(0);
    }

    /// Clock edge: apply reset or the pending write.
    pub fn advance(&mut self, reset: bool, write: Option<(usize, u64)>) {
        if reset {
            self.reset();
        } else if let Some((index, value)) = write {
            self.write(index, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.regs.iter().copied()
    }
}

impl Index<usize> for RegisterBank {
    type Output = u64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.regs[index]
    }
}
