//! Hardware addresses and their election order

use core::{cmp::Ordering, fmt, str::FromStr};

/// A 6 byte Ethernet hardware (MAC) address.
///
/// Addresses are ordered byte-lexicographically with unsigned byte
/// comparison, so the first differing byte decides. This order is what the
/// master election runs on: the lowest address wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HardwareAddress(pub [u8; 6]);

impl HardwareAddress {
    /// The all-ones address. Used as destination for broadcast frames and as
    /// the "no master known" sentinel of the election.
    pub const BROADCAST: Self = Self([0xff; 6]);

    /// Sentinel meaning no master has been chosen.
    pub const NO_MASTER: Self = Self::BROADCAST;

    /// The all-zero address, used as the source of frames before the
    /// transport fills in the real one.
    pub const ZERO: Self = Self([0; 6]);

    /// Compare two addresses in election order.
    ///
    /// # Example
    /// ```
    /// # use core::cmp::Ordering;
    /// # use pulsesync::HardwareAddress;
    /// let a = HardwareAddress([0, 1, 2, 3, 4, 5]);
    /// let b = HardwareAddress([0, 1, 2, 3, 4, 6]);
    /// assert_eq!(a.compare(&b), Ordering::Less);
    /// assert_eq!(a.compare(&a), Ordering::Equal);
    /// ```
    pub fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    /// Returns `true` if this is the "no master known" sentinel.
    pub fn is_no_master(&self) -> bool {
        *self == Self::NO_MASTER
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for HardwareAddress {
    fn from(value: [u8; 6]) -> Self {
        Self(value)
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, val) in self.0.iter().enumerate() {
            if i != 0 {
                write!(f, ":")?;
            }

            write!(f, "{:02x}", val)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid hardware address, expected six hex octets separated by ':'")]
pub struct ParseAddressError;

impl FromStr for HardwareAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');

        for octet in octets.iter_mut() {
            let part = parts.next().ok_or(ParseAddressError)?;
            if part.len() != 2 {
                return Err(ParseAddressError);
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| ParseAddressError)?;
        }

        if parts.next().is_some() {
            return Err(ParseAddressError);
        }

        Ok(Self(octets))
    }
}
