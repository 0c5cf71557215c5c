//! UTC wall clock time as year, day of year, second and nanosecond

use core::fmt;

pub const SECONDS_PER_DAY: u32 = 86_400;
pub const NANOS_PER_SECOND: u32 = 1_000_000_000;

const UNIX_EPOCH_YEAR: u16 = 1970;

/// Number of days in the given Gregorian year.
///
/// # Example
/// ```
/// # use pulsesync::time::days_in_year;
/// assert_eq!(days_in_year(2000), 366);
/// assert_eq!(days_in_year(1900), 365);
/// assert_eq!(days_in_year(2024), 366);
/// assert_eq!(days_in_year(2023), 365);
/// ```
pub const fn days_in_year(year: u16) -> u16 {
    if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) {
        366
    } else {
        365
    }
}

/// A UTC wall-clock time split the way pulses carry it.
///
/// There is no leap second model: every day has [`SECONDS_PER_DAY`] seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalendarTime {
    pub year: u16,
    /// 0 based, 0 to 365
    pub day_of_year: u16,
    /// 0 to 86399
    pub second_of_day: u32,
    pub nanosecond: u32,
}

impl CalendarTime {
    pub const fn new(year: u16, day_of_year: u16, second_of_day: u32, nanosecond: u32) -> Self {
        Self {
            year,
            day_of_year,
            second_of_day,
            nanosecond,
        }
    }

    /// Convert seconds since 1970-01-01T00:00:00Z, without leap seconds, into
    /// calendar form.
    ///
    /// Years past `u16::MAX` saturate there.
    ///
    /// # Example
    /// ```
    /// # use pulsesync::CalendarTime;
    /// // 2024-03-01T12:00:00.5Z
    /// let time = CalendarTime::from_unix_time(1_709_294_400, 500_000_000);
    /// assert_eq!(time, CalendarTime::new(2024, 60, 43_200, 500_000_000));
    /// ```
    pub fn from_unix_time(seconds: u64, nanos: u32) -> Self {
        let mut days = seconds / SECONDS_PER_DAY as u64;
        let second_of_day = (seconds % SECONDS_PER_DAY as u64) as u32;

        let mut year = UNIX_EPOCH_YEAR;
        while days >= days_in_year(year) as u64 && year < u16::MAX {
            days -= days_in_year(year) as u64;
            year += 1;
        }

        Self {
            year,
            day_of_year: days.min(u16::MAX as u64) as u16,
            second_of_day,
            nanosecond: nanos,
        }
    }

    /// Signed number of days from `self` to `other`, counting only year and
    /// day of year. Spans year boundaries, including leap years.
    ///
    /// # Example
    /// ```
    /// # use pulsesync::CalendarTime;
    /// let new_years_eve = CalendarTime::new(2024, 365, 0, 0);
    /// let new_year = CalendarTime::new(2025, 0, 0, 0);
    /// assert_eq!(new_years_eve.days_until(&new_year), 1);
    /// assert_eq!(new_year.days_until(&new_years_eve), -1);
    /// ```
    pub fn days_until(&self, other: &CalendarTime) -> i64 {
        let mut days: i64 = 0;

        if self.year < other.year {
            for year in self.year..other.year {
                days += days_in_year(year) as i64;
            }
        } else {
            for year in other.year..self.year {
                days -= days_in_year(year) as i64;
            }
        }

        days + other.day_of_year as i64 - self.day_of_year as i64
    }

    /// Signed seconds from `self` to `other`. Positive when `other` is later.
    ///
    /// This is the clock deviation of a receiver whose clock read `self` when
    /// a pulse carrying `other` arrived: positive means the receiver is
    /// behind.
    pub fn seconds_until(&self, other: &CalendarTime) -> f64 {
        let days = self.days_until(other) as f64;
        let seconds = other.second_of_day as f64 - self.second_of_day as f64;
        let nanos = other.nanosecond as f64 - self.nanosecond as f64;

        days * SECONDS_PER_DAY as f64 + seconds + nanos * 1e-9
    }
}

impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.year, self.day_of_year, self.second_of_day, self.nanosecond
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_years() {
        assert_eq!(days_in_year(2000), 366);
        assert_eq!(days_in_year(1900), 365);
        assert_eq!(days_in_year(2100), 365);
        assert_eq!(days_in_year(2400), 366);
        assert_eq!(days_in_year(2024), 366);
        assert_eq!(days_in_year(2023), 365);
    }

    #[test]
    fn unix_epoch() {
        assert_eq!(CalendarTime::from_unix_time(0, 0), CalendarTime::new(1970, 0, 0, 0));
        assert_eq!(
            CalendarTime::from_unix_time(86_399, 1),
            CalendarTime::new(1970, 0, 86_399, 1)
        );
    }

    #[test]
    fn unix_time_year_boundaries() {
        // 2000-12-31T23:59:59Z, the last day of a leap year
        assert_eq!(
            CalendarTime::from_unix_time(978_307_199, 0),
            CalendarTime::new(2000, 365, 86_399, 0)
        );
        // 2001-01-01T00:00:00Z
        assert_eq!(
            CalendarTime::from_unix_time(978_307_200, 0),
            CalendarTime::new(2001, 0, 0, 0)
        );
        // 2023-12-31T00:00:00Z
        assert_eq!(
            CalendarTime::from_unix_time(1_703_980_800, 0),
            CalendarTime::new(2023, 364, 0, 0)
        );
    }

    #[test]
    fn day_difference_across_years() {
        let a = CalendarTime::new(2023, 364, 0, 0);
        let b = CalendarTime::new(2024, 0, 0, 0);
        assert_eq!(a.days_until(&b), 1);
        assert_eq!(b.days_until(&a), -1);

        // 1999-06-01 to 2001-06-01 spans the leap year 2000
        let a = CalendarTime::new(1999, 151, 0, 0);
        let b = CalendarTime::new(2001, 151, 0, 0);
        assert_eq!(a.days_until(&b), 365 + 366);
        assert_eq!(b.days_until(&a), -(365 + 366));

        let a = CalendarTime::new(2024, 10, 0, 0);
        assert_eq!(a.days_until(&a), 0);
    }

    #[test]
    fn deviation_in_seconds() {
        let local = CalendarTime::new(2024, 100, 1000, 250_000_000);
        let master = CalendarTime::new(2024, 100, 1001, 0);
        assert!((local.seconds_until(&master) - 0.75).abs() < 1e-9);
        assert!((master.seconds_until(&local) + 0.75).abs() < 1e-9);

        let local = CalendarTime::new(2023, 364, 86_399, 900_000_000);
        let master = CalendarTime::new(2024, 0, 0, 100_000_000);
        assert!((local.seconds_until(&master) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn display() {
        assert_eq!(CalendarTime::new(2024, 5, 10, 20).to_string(), "2024:5:10:20");
    }
}
