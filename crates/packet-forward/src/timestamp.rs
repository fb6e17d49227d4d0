use core::fmt::Display;
use core::ops::Add;
use core::time::Duration;

use flex_error::define_error;
use serde_derive::{Deserialize, Serialize};

/// A newtype wrapper over the `u64` Unix timestamp in nanoseconds carried by
/// IBC packets, where a value of 0 represents the absence of a timestamp.
#[derive(
    PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug, Default, Deserialize, Serialize, Hash,
)]
pub struct Timestamp {
    nanoseconds: u64,
}

impl Timestamp {
    /// The IBC protocol represents timestamps as u64 Unix
    /// timestamps in nanoseconds. A protocol value of 0
    /// indicates that the timestamp is not set.
    pub const fn from_nanoseconds(nanoseconds: u64) -> Timestamp {
        Timestamp { nanoseconds }
    }

    /// Returns a `Timestamp` representation of a timestamp not being set.
    pub const fn none() -> Self {
        Timestamp { nanoseconds: 0 }
    }

    pub fn is_set(&self) -> bool {
        self.nanoseconds != 0
    }

    /// Convert a `Timestamp` to `u64` value in nanoseconds. If no timestamp
    /// is set, the result is 0.
    pub fn as_nanoseconds(&self) -> u64 {
        self.nanoseconds
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_set() {
            write!(f, "Timestamp({})", self.nanoseconds)
        } else {
            write!(f, "Timestamp(NoTimestamp)")
        }
    }
}

impl From<u64> for Timestamp {
    fn from(nanoseconds: u64) -> Self {
        Self::from_nanoseconds(nanoseconds)
    }
}

define_error! {
    TimestampOverflowError {
        TimestampOverflow
            |_| { "Timestamp overflow when modifying with duration" }
    }
}

impl Add<Duration> for Timestamp {
    type Output = Result<Timestamp, TimestampOverflowError>;

    /// Adding to an unset timestamp yields an unset timestamp.
    fn add(self, duration: Duration) -> Result<Timestamp, TimestampOverflowError> {
        if !self.is_set() {
            return Ok(self);
        }

        let nanos = u64::try_from(duration.as_nanos())
            .map_err(|_| TimestampOverflowError::timestamp_overflow())?;

        self.nanoseconds
            .checked_add(nanos)
            .map(Self::from_nanoseconds)
            .ok_or_else(TimestampOverflowError::timestamp_overflow)
    }
}
