/// Fixed-depth pipeline register.
///
/// Every [`clock`](DelayLine::clock) pushes one value and releases the value
/// pushed `depth` clocks earlier. Until the line has been clocked `depth`
/// times it releases `T::default()`, so a bool lane reads as "invalid" and a
/// data lane reads as zero while warming up.
///
/// A depth of zero is a combinational pass-through.
#[derive(Clone, Debug, PartialEq)]
pub struct DelayLine<T> {
    stages: Vec<T>,
    /// Slot holding the oldest value, overwritten by the next push.
    head: usize,
}

impl<T: Copy + Default> DelayLine<T> {
    pub fn new(depth: usize) -> Self {
        DelayLine {
            stages: vec![T::default(); depth],
            head: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.stages.len()
    }

    /// Advance one tick: push `input` and return the value leaving the line.
    pub fn clock(&mut self, input: T) -> T {
        if self.stages.is_empty() {
            return input;
        }
        let output = std::mem::replace(&mut self.stages[self.head], input);
        self.head = (self.head + 1) % self.stages.len();
        output
    }

    /// The value the next clock will release, without advancing.
    pub fn peek(&self) -> Option<T> {
        self.stages.get(self.head).copied()
    }

    /// Values in flight, oldest first.
    pub fn in_flight(&self) -> impl Iterator<Item = T> + '_ {
        let (newer, older) = self.stages.split_at(self.head);
        older.iter().chain(newer.iter()).copied()
    }

    /// Refill every stage with the default value.
    pub fn clear(&mut self) {
        self.stages.fill(T::default());
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releases_value_after_depth_ticks() {
        let mut line = DelayLine::<u64>::new(3);

        assert_eq!(line.clock(0xA), 0);
        assert_eq!(line.clock(0xB), 0);
        assert_eq!(line.clock(0xC), 0);
        assert_eq!(line.clock(0xD), 0xA);
        assert_eq!(line.clock(0xE), 0xB);
        assert_eq!(line.peek(), Some(0xC));
        assert_eq!(line.clock(0), 0xC);
    }

    #[test]
    fn warm_up_reads_invalid() {
        let mut valid = DelayLine::<bool>::new(2);

        assert!(!valid.clock(true));
        assert!(!valid.clock(true));
        assert!(valid.clock(false));
        assert!(valid.clock(false));
        assert!(!valid.clock(false));
    }

    #[test]
    fn zero_depth_passes_through() {
        let mut line = DelayLine::<u16>::new(0);

        assert_eq!(line.depth(), 0);
        assert_eq!(line.peek(), None);
        assert_eq!(line.clock(7), 7);
        assert_eq!(line.clock(9), 9);
    }

    #[test]
    fn one_output_per_tick_in_order() {
        let depth = 5;
        let mut line = DelayLine::<u32>::new(depth);

        let released: Vec<u32> = (1..=20).map(|i| line.clock(i)).collect();

        assert!(released[..depth].iter().all(|&x| x == 0));
        assert_eq!(released[depth..], (1..=15u32).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn in_flight_is_oldest_first() {
        let mut line = DelayLine::<u8>::new(3);
        line.clock(1);
        line.clock(2);
        line.clock(3);
        line.clock(4);

        assert_eq!(line.in_flight().collect::<Vec<_>>(), vec![2, 3, 4]);

        line.clear();
        assert_eq!(line.in_flight().collect::<Vec<_>>(), vec![0, 0, 0]);
    }
}
