//! Bounded progress counters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProgressError;

/// How much of a known amount of work is done. `processed <= total` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Progress {
    total: u64,
    processed: u64,
}

impl Progress {
    /// No work, none done.
    pub const NONE: Progress = Progress {
        total: 0,
        processed: 0,
    };

    pub fn new(total: u64, processed: u64) -> Result<Self, ProgressError> {
        if processed > total {
            return Err(ProgressError::ProcessedExceedsTotal { total, processed });
        }
        Ok(Self { total, processed })
    }

    /// Like [`Progress::new`], additionally rejecting negative values.
    pub fn from_signed(total: i64, processed: i64) -> Result<Self, ProgressError> {
        match (u64::try_from(total), u64::try_from(processed)) {
            (Ok(total), Ok(processed)) => Self::new(total, processed),
            _ => Err(ProgressError::Negative { total, processed }),
        }
    }

    /// Build a progress, raising `total` to `processed` if it is smaller.
    pub fn normalize(total: u64, processed: u64) -> Self {
        Self {
            total: total.max(processed),
            processed,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn left(&self) -> u64 {
        self.total - self.processed
    }

    /// Fraction done in `[0, 1]`; zero when there is no work at all.
    pub fn processed_percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }

    pub fn is_done(&self) -> bool {
        self.processed == self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.processed, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_overflow() {
        assert!(Progress::new(3, 2).is_ok());
        assert!(Progress::new(3, 3).is_ok());
        assert_eq!(
            Progress::new(2, 3),
            Err(ProgressError::ProcessedExceedsTotal {
                total: 2,
                processed: 3
            })
        );
    }

    #[test]
    fn test_from_signed_rejects_negative() {
        assert!(matches!(
            Progress::from_signed(-1, 0),
            Err(ProgressError::Negative { .. })
        ));
        assert!(matches!(
            Progress::from_signed(1, -1),
            Err(ProgressError::Negative { .. })
        ));
        assert_eq!(Progress::from_signed(5, 2).unwrap().left(), 3);
    }

    #[test]
    fn test_normalize_clamps_total() {
        let p = Progress::normalize(1, 4);
        assert_eq!(p.total(), 4);
        assert_eq!(p.processed(), 4);
        assert!(p.is_done());
        assert_eq!(Progress::normalize(9, 4).total(), 9);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(Progress::NONE.processed_percentage(), 0.0);
        assert_eq!(Progress::new(4, 1).unwrap().processed_percentage(), 0.25);
        assert_eq!(Progress::new(4, 1).unwrap().to_string(), "1/4");
    }
}
