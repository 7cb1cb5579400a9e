//! Virtual simulation time with femtosecond precision.
//!
//! [`SimTime`] is the harness's notion of elapsed simulated time. It advances
//! only when the kernel steps the virtual clock and is independent of wall
//! clock time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::SimError;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = FS_PER_MS * 1_000;

/// A point in (or span of) virtual time, stored in femtoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Simulation time in femtoseconds.
    pub fs: u64,
}

impl SimTime {
    /// Time zero.
    pub const ZERO: SimTime = SimTime { fs: 0 };

    /// Creates a time from a femtosecond value.
    pub const fn from_fs(fs: u64) -> Self {
        Self { fs }
    }

    /// Creates a time from a picosecond value.
    pub const fn from_ps(ps: u64) -> Self {
        Self { fs: ps * FS_PER_PS }
    }

    /// Creates a time from a nanosecond value.
    pub const fn from_ns(ns: u64) -> Self {
        Self { fs: ns * FS_PER_NS }
    }

    /// Creates a time from a microsecond value.
    pub const fn from_us(us: u64) -> Self {
        Self { fs: us * FS_PER_US }
    }

    /// Converts to nanoseconds (truncated).
    pub fn to_ns(self) -> u64 {
        self.fs / FS_PER_NS
    }

    /// Parses a human-readable duration such as `"100ns"` or `"10us"`.
    ///
    /// Supports units `fs`, `ps`, `ns`, `us`, `ms` and `s`. A unit is
    /// mandatory.
    pub fn parse_duration(s: &str) -> Result<Self, SimError> {
        let s = s.trim();
        let invalid = |reason: String| SimError::InvalidDuration {
            input: s.to_string(),
            reason,
        };
        if s.is_empty() {
            return Err(invalid("empty duration string".into()));
        }

        let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        if digit_end == 0 {
            return Err(invalid("no numeric value".into()));
        }
        let number: u64 = s[..digit_end]
            .parse()
            .map_err(|_| invalid("number out of range".into()))?;

        let multiplier = match s[digit_end..].trim() {
            "fs" => 1,
            "ps" => FS_PER_PS,
            "ns" => FS_PER_NS,
            "us" => FS_PER_US,
            "ms" => FS_PER_MS,
            "s" => FS_PER_S,
            "" => return Err(invalid("missing unit (use fs, ps, ns, us, ms, or s)".into())),
            unit => {
                return Err(invalid(format!(
                    "unknown unit '{unit}' (use fs, ps, ns, us, ms, or s)"
                )))
            }
        };

        number
            .checked_mul(multiplier)
            .map(Self::from_fs)
            .ok_or_else(|| invalid("duration overflows".into()))
    }
}

impl FromStr for SimTime {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_duration(s)
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        SimTime::from_fs(self.fs.saturating_add(rhs.fs))
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> SimTime {
        SimTime::from_fs(self.fs.saturating_sub(rhs.fs))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.fs;
        if fs == 0 {
            write!(f, "0 fs")
        } else if fs >= FS_PER_MS && fs.is_multiple_of(FS_PER_MS) {
            write!(f, "{} ms", fs / FS_PER_MS)
        } else if fs >= FS_PER_US && fs.is_multiple_of(FS_PER_US) {
            write!(f, "{} us", fs / FS_PER_US)
        } else if fs >= FS_PER_NS && fs.is_multiple_of(FS_PER_NS) {
            write!(f, "{} ns", fs / FS_PER_NS)
        } else if fs >= FS_PER_PS && fs.is_multiple_of(FS_PER_PS) {
            write!(f, "{} ps", fs / FS_PER_PS)
        } else {
            write!(f, "{fs} fs")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert_eq!(SimTime::from_ns(10).fs, 10_000_000);
        assert_eq!(SimTime::from_ps(500).fs, 500_000);
        assert_eq!(SimTime::from_us(2).fs, 2 * FS_PER_US);
        assert_eq!(SimTime::ZERO, SimTime::default());
    }

    #[test]
    fn to_ns_truncates() {
        assert_eq!(SimTime::from_fs(1_500_000).to_ns(), 1);
    }

    #[test]
    fn arithmetic_saturates() {
        let a = SimTime::from_ns(5);
        let b = SimTime::from_ns(7);
        assert_eq!(a + b, SimTime::from_ns(12));
        assert_eq!(a - b, SimTime::ZERO);
        assert_eq!(SimTime::from_fs(u64::MAX) + a, SimTime::from_fs(u64::MAX));
    }

    #[test]
    fn ordering() {
        assert!(SimTime::from_ns(1) < SimTime::from_ns(2));
    }

    #[test]
    fn display_units() {
        assert_eq!(SimTime::ZERO.to_string(), "0 fs");
        assert_eq!(SimTime::from_ns(10).to_string(), "10 ns");
        assert_eq!(SimTime::from_ps(500).to_string(), "500 ps");
        assert_eq!(SimTime::from_us(5).to_string(), "5 us");
        assert_eq!(SimTime::from_fs(2 * FS_PER_MS).to_string(), "2 ms");
        assert_eq!(SimTime::from_fs(1500).to_string(), "1500 fs");
        assert_eq!(SimTime::from_ns(100_500).to_string(), "100500 ns");
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(SimTime::parse_duration("100ns").unwrap(), SimTime::from_ns(100));
        assert_eq!(SimTime::parse_duration("10us").unwrap(), SimTime::from_us(10));
        assert_eq!(SimTime::parse_duration("250ps").unwrap(), SimTime::from_ps(250));
        assert_eq!(SimTime::parse_duration("42fs").unwrap(), SimTime::from_fs(42));
        assert_eq!(SimTime::parse_duration("1s").unwrap().fs, FS_PER_S);
        assert_eq!(SimTime::parse_duration("  50 ns ").unwrap(), SimTime::from_ns(50));
        assert_eq!("3ms".parse::<SimTime>().unwrap().fs, 3 * FS_PER_MS);
    }

    #[test]
    fn parse_duration_errors() {
        let err = SimTime::parse_duration("").unwrap_err();
        assert!(err.to_string().contains("empty"));
        let err = SimTime::parse_duration("ns").unwrap_err();
        assert!(err.to_string().contains("no numeric value"));
        let err = SimTime::parse_duration("100").unwrap_err();
        assert!(err.to_string().contains("missing unit"));
        let err = SimTime::parse_duration("100xyz").unwrap_err();
        assert!(err.to_string().contains("unknown unit"));
        let err = SimTime::parse_duration("99999999999s").unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn serde_roundtrip() {
        let t = SimTime::from_fs(12345);
        let json = serde_json::to_string(&t).unwrap();
        let back: SimTime = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
