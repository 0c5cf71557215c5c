//! Access to the system clocks

#![forbid(unsafe_code)]

use nix::{
    sys::time::TimeSpec,
    time::{clock_gettime, ClockId},
};
use pulsesync::{CalendarTime, LinearTime, TransportError};

fn read(clock: ClockId) -> Result<TimeSpec, TransportError> {
    clock_gettime(clock).map_err(|errno| TransportError::new("clock_gettime", errno.into()))
}

/// The monotonic and realtime clocks of the system
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxClock;

impl LinuxClock {
    /// Read `CLOCK_MONOTONIC`
    pub fn monotonic_now(&self) -> Result<LinearTime, TransportError> {
        let spec = read(ClockId::CLOCK_MONOTONIC)?;
        Ok(LinearTime::new(spec.tv_sec() as u64, spec.tv_nsec() as u32))
    }

    /// Read `CLOCK_REALTIME` as UTC calendar time. Times before 1970 read as
    /// the epoch.
    pub fn utc_now(&self) -> Result<CalendarTime, TransportError> {
        let spec = read(ClockId::CLOCK_REALTIME)?;
        let seconds = u64::try_from(spec.tv_sec()).unwrap_or(0);
        Ok(CalendarTime::from_unix_time(seconds, spec.tv_nsec() as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_does_not_go_back() {
        let clock = LinuxClock;
        let first = clock.monotonic_now().unwrap();
        let second = clock.monotonic_now().unwrap();
        assert!(second >= first);
    }

    #[test]
    fn utc_is_recent() {
        let now = LinuxClock.utc_now().unwrap();
        assert!(now.year >= 2024);
        assert!(now.day_of_year < 366);
        assert!(now.second_of_day < 86_400);
        assert!(now.nanosecond < 1_000_000_000);
    }
}
