//! Receipt numbers: `{year}/{sequence:04}`, sequence restarting each year.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A parsed receipt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReceiptNumber {
    /// Numbering year.
    pub year: i32,
    /// Position within the year, starting at 1.
    pub sequence: u32,
}

impl ReceiptNumber {
    /// Creates a receipt number.
    #[must_use]
    pub const fn new(year: i32, sequence: u32) -> Self {
        Self { year, sequence }
    }
}

impl fmt::Display for ReceiptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:04}", self.year, self.sequence)
    }
}

/// Malformed receipt number.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid receipt number: {0}")]
pub struct ReceiptNumberError(String);

impl FromStr for ReceiptNumber {
    type Err = ReceiptNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ReceiptNumberError(s.to_string());
        let (year, seq) = s.split_once('/').ok_or_else(err)?;
        if seq.len() < 4 {
            return Err(err());
        }
        let year = year.parse::<i32>().map_err(|_| err())?;
        let sequence = seq.parse::<u32>().map_err(|_| err())?;
        if sequence == 0 {
            return Err(err());
        }
        Ok(Self { year, sequence })
    }
}
