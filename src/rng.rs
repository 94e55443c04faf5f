use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Where `Cxkk` gets its random bytes.
pub trait RandomSource: fmt::Debug {
    fn next_byte(&mut self) -> u8;
}

/// A pseudo-random generator seeded once, at construction.
#[derive(Debug, Clone)]
pub struct SeededRng(StdRng);

impl SeededRng {
    /// Seeds from operating system entropy.
    pub fn from_entropy() -> Self {
        SeededRng(StdRng::from_entropy())
    }

    /// Seeds from a fixed value, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        SeededRng(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRng {
    fn next_byte(&mut self) -> u8 {
        self.0.gen()
    }
}

/// Replays a fixed byte sequence, cycling when it runs out.
#[derive(Debug, Clone)]
pub struct Sequence {
    bytes: Vec<u8>,
    next: usize,
}

impl Sequence {
    /// Returns a source that yields `bytes` in order. An empty sequence yields zeroes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Sequence { bytes, next: 0 }
    }
}

impl RandomSource for Sequence {
    fn next_byte(&mut self) -> u8 {
        if self.bytes.is_empty() {
            return 0;
        }
        let b = self.bytes[self.next];
        self.next = (self.next + 1) % self.bytes.len();
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_cycles() {
        let mut seq = Sequence::new(vec![1, 2, 3]);
        let got: Vec<u8> = (0..5).map(|_| seq.next_byte()).collect();
        assert_eq!(got, vec![1, 2, 3, 1, 2]);
    }

    #[test]
    fn empty_sequence_yields_zero() {
        let mut seq = Sequence::new(Vec::new());
        assert_eq!(seq.next_byte(), 0);
    }

    #[test]
    fn same_seed_same_bytes() {
        let mut a = SeededRng::with_seed(42);
        let mut b = SeededRng::with_seed(42);
        let xs: Vec<u8> = (0..32).map(|_| a.next_byte()).collect();
        let ys: Vec<u8> = (0..32).map(|_| b.next_byte()).collect();
        assert_eq!(xs, ys);
    }
}
