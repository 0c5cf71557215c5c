//! Monotonic time for timers and elapsed time

use core::{
    fmt,
    ops::{Add, Sub},
    time::Duration,
};

use super::NANOS_PER_SECOND;

/// A point on a monotonic clock, as seconds and nanoseconds since an
/// arbitrary origin.
///
/// Only differences between two [`LinearTime`]s carry meaning. Arithmetic
/// saturates at zero and at the maximum representable value instead of
/// wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LinearTime {
    seconds: u64,
    nanos: u32,
}

impl LinearTime {
    pub const ZERO: Self = Self {
        seconds: 0,
        nanos: 0,
    };

    pub const MAX: Self = Self {
        seconds: u64::MAX,
        nanos: NANOS_PER_SECOND - 1,
    };

    /// Create a new [`LinearTime`]. Nanoseconds beyond a second carry into
    /// the seconds.
    ///
    /// # Example
    /// ```
    /// # use pulsesync::LinearTime;
    /// let time = LinearTime::new(1, 1_500_000_000);
    /// assert_eq!(time.seconds(), 2);
    /// assert_eq!(time.subsec_nanos(), 500_000_000);
    /// ```
    pub const fn new(seconds: u64, nanos: u32) -> Self {
        Self {
            seconds: seconds.saturating_add((nanos / NANOS_PER_SECOND) as u64),
            nanos: nanos % NANOS_PER_SECOND,
        }
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self::new(millis / 1000, ((millis % 1000) * 1_000_000) as u32)
    }

    pub const fn seconds(&self) -> u64 {
        self.seconds
    }

    pub const fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    /// The time as fractional seconds
    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + self.nanos as f64 / NANOS_PER_SECOND as f64
    }

    /// Time passed between `earlier` and `self`, zero if `earlier` is later.
    ///
    /// # Example
    /// ```
    /// # use pulsesync::LinearTime;
    /// # use core::time::Duration;
    /// let earlier = LinearTime::new(10, 900_000_000);
    /// let later = LinearTime::new(12, 100_000_000);
    /// assert_eq!(later.duration_since(earlier), Duration::from_millis(1200));
    /// assert_eq!(earlier.duration_since(later), Duration::ZERO);
    /// ```
    pub fn duration_since(&self, earlier: LinearTime) -> Duration {
        (*self - earlier).into()
    }
}

impl Add for LinearTime {
    type Output = LinearTime;

    fn add(self, rhs: Self) -> Self::Output {
        let mut nanos = self.nanos + rhs.nanos;
        let mut carry = 0;
        if nanos >= NANOS_PER_SECOND {
            nanos -= NANOS_PER_SECOND;
            carry = 1;
        }

        match self
            .seconds
            .checked_add(rhs.seconds)
            .and_then(|s| s.checked_add(carry))
        {
            Some(seconds) => Self { seconds, nanos },
            None => Self::MAX,
        }
    }
}

impl Add<Duration> for LinearTime {
    type Output = LinearTime;

    fn add(self, rhs: Duration) -> Self::Output {
        self + LinearTime::from(rhs)
    }
}

impl Sub for LinearTime {
    type Output = LinearTime;

    fn sub(self, rhs: Self) -> Self::Output {
        if self <= rhs {
            return Self::ZERO;
        }

        // self > rhs, so the borrow below cannot underflow the seconds
        if self.nanos >= rhs.nanos {
            Self {
                seconds: self.seconds - rhs.seconds,
                nanos: self.nanos - rhs.nanos,
            }
        } else {
            Self {
                seconds: self.seconds - rhs.seconds - 1,
                nanos: self.nanos + NANOS_PER_SECOND - rhs.nanos,
            }
        }
    }
}

impl From<Duration> for LinearTime {
    fn from(value: Duration) -> Self {
        Self {
            seconds: value.as_secs(),
            nanos: value.subsec_nanos(),
        }
    }
}

impl From<LinearTime> for Duration {
    fn from(value: LinearTime) -> Self {
        Duration::new(value.seconds, value.nanos)
    }
}

impl fmt::Display for LinearTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}
