//! Multi-bit signal samples in the two-plane encoding simulators exchange.
//!
//! A bit is described by a pair `(aval, bval)`, as in the VPI
//! `s_vpi_vecval` structure:
//!
//! | aval | bval | level |
//! |---|---|---|
//! | 0 | 0 | `0` |
//! | 1 | 0 | `1` |
//! | 0 | 1 | `Z` |
//! | 1 | 1 | `X` |
//!
//! Keeping the planes as whole words makes the common questions (is any bit
//! unknown, what integer is this) word operations rather than bit loops.

use crate::logic::Logic;
use crate::width::width_mask;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A sampled signal value of arbitrary width.
///
/// Every signal read from or driven into a simulation target travels as a
/// `LogicVec`, so undefined bits survive until a caller decides how to
/// interpret them.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    width: u32,
    aval: Vec<u64>,
    bval: Vec<u64>,
}

impl LogicVec {
    /// An all-zero vector.
    pub fn new(width: u32) -> Self {
        let words = width.div_ceil(64) as usize;
        Self {
            width,
            aval: vec![0; words],
            bval: vec![0; words],
        }
    }

    /// A vector with every bit `X`.
    pub fn all_x(width: u32) -> Self {
        let mut v = Self::new(width);
        for word in 0..v.aval.len() {
            let mask = v.word_mask(word);
            v.aval[word] = mask;
            v.bval[word] = mask;
        }
        v
    }

    /// Number of bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The level of bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        let (word, bit) = self.locate(index);
        let a = (self.aval[word] >> bit) & 1 != 0;
        let b = (self.bval[word] >> bit) & 1 != 0;
        match (a, b) {
            (false, false) => Logic::Zero,
            (true, false) => Logic::One,
            (false, true) => Logic::Z,
            (true, true) => Logic::X,
        }
    }

    /// Sets bit `index` to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        let (word, bit) = self.locate(index);
        let (a, b) = match value {
            Logic::Zero => (0, 0),
            Logic::One => (1, 0),
            Logic::Z => (0, 1),
            Logic::X => (1, 1),
        };
        self.aval[word] = (self.aval[word] & !(1 << bit)) | (a << bit);
        self.bval[word] = (self.bval[word] & !(1 << bit)) | (b << bit);
    }

    /// A single-bit vector.
    pub fn from_bool(value: bool) -> Self {
        Self::from_u64(u64::from(value), 1)
    }

    /// A fully defined vector holding the low `width` bits of `value`.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        if let Some(first) = v.aval.first_mut() {
            *first = value & width_mask(width);
        }
        v
    }

    /// The integer value, if every bit is `0` or `1` and the vector fits in
    /// 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 || self.has_unknown() {
            return None;
        }
        Some(self.aval.first().copied().unwrap_or(0))
    }

    /// Returns `true` if any bit is `X` or `Z`.
    pub fn has_unknown(&self) -> bool {
        self.bval.iter().any(|&b| b != 0)
    }

    /// Returns `true` if every bit is `0`.
    pub fn is_all_zero(&self) -> bool {
        !self.has_unknown() && self.aval.iter().all(|&a| a == 0)
    }

    /// A copy resized to `width`, zero-extending or truncating.
    pub fn resized(&self, width: u32) -> Self {
        let mut v = Self::new(width);
        for word in 0..v.aval.len().min(self.aval.len()) {
            let mask = v.word_mask(word);
            v.aval[word] = self.aval[word] & mask;
            v.bval[word] = self.bval[word] & mask;
        }
        v
    }

    /// Parses a bit string such as `"10XZ"`, most significant bit first.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let mut v = Self::new(s.chars().count() as u32);
        for (i, c) in s.chars().rev().enumerate() {
            v.set(i as u32, Logic::from_char(c)?);
        }
        Some(v)
    }

    /// Word index and bit offset of `index`.
    fn locate(&self, index: u32) -> (usize, u32) {
        assert!(
            index < self.width,
            "bit {index} out of range for a {}-bit vector",
            self.width
        );
        ((index / 64) as usize, index % 64)
    }

    /// Valid bits of storage word `word`.
    fn word_mask(&self, word: usize) -> u64 {
        let used = self.width - 64 * word as u32;
        width_mask(used)
    }

    fn write_bits(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Display for LogicVec {
    /// Defined values wider than a nibble print as hex, anything else bit by bit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u64() {
            Some(value) if self.width > 4 => write!(f, "{value:#x}"),
            _ => self.write_bits(f),
        }
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicVec[{}](", self.width)?;
        self.write_bits(f)?;
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_use_vpi_planes() {
        let v = LogicVec::from_binary_str("XZ10").unwrap();
        assert_eq!(v.aval, vec![0b1010]);
        assert_eq!(v.bval, vec![0b1100]);
        assert_eq!(v.get(0), Logic::Zero);
        assert_eq!(v.get(1), Logic::One);
        assert_eq!(v.get(2), Logic::Z);
        assert_eq!(v.get(3), Logic::X);
    }

    #[test]
    fn integer_round_trip_truncates() {
        assert_eq!(LogicVec::from_u64(0xDEAD_BEEF, 32).to_u64(), Some(0xDEAD_BEEF));
        assert_eq!(LogicVec::from_u64(0x1FF, 8).to_u64(), Some(0xFF));
        assert_eq!(LogicVec::from_u64(u64::MAX, 64).to_u64(), Some(u64::MAX));
    }

    #[test]
    fn unknown_bits_block_integer_conversion() {
        let mut v = LogicVec::from_u64(0xF, 4);
        assert!(!v.has_unknown());
        v.set(2, Logic::Z);
        assert!(v.has_unknown());
        assert_eq!(v.to_u64(), None);
        assert!(LogicVec::all_x(32).has_unknown());
        assert!(!LogicVec::all_x(32).is_all_zero());
    }

    #[test]
    fn all_x_stays_within_width() {
        let v = LogicVec::all_x(70);
        assert_eq!(v.bval, vec![u64::MAX, 0x3F]);
        assert_eq!(v.get(69), Logic::X);
    }

    #[test]
    fn wide_vectors_do_not_convert() {
        let mut v = LogicVec::new(65);
        assert!(v.is_all_zero());
        assert_eq!(v.to_u64(), None);
        v.set(64, Logic::One);
        assert_eq!(v.get(64), Logic::One);
        assert!(!v.is_all_zero());
    }

    #[test]
    fn resized_zero_extends_and_truncates() {
        let v = LogicVec::from_u64(0b101, 3).resized(8);
        assert_eq!(v.to_u64(), Some(0b101));
        let t = LogicVec::from_u64(0xABCD, 16).resized(8);
        assert_eq!(t.to_u64(), Some(0xCD));
        let x = LogicVec::all_x(8).resized(4);
        assert_eq!(x.to_string(), "XXXX");
    }

    #[test]
    fn display() {
        assert_eq!(LogicVec::from_u64(0xF, 32).to_string(), "0xf");
        assert_eq!(LogicVec::from_u64(0b10, 2).to_string(), "10");
        assert_eq!(LogicVec::from_binary_str("10XZ").unwrap().to_string(), "10XZ");
        assert_eq!(format!("{:?}", LogicVec::from_bool(true)), "LogicVec[1](1)");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn get_past_width_panics() {
        LogicVec::new(4).get(4);
    }

    #[test]
    fn serde_keeps_unknown_bits() {
        let v = LogicVec::from_binary_str("1X0Z").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: LogicVec = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
        assert_eq!(back.get(2), Logic::X);
    }
}
