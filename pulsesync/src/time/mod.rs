//! Types that describe points in time.
//!
//! Two time bases are used side by side: [`LinearTime`] from a monotonic clock
//! for timer bookkeeping and elapsed time, and [`CalendarTime`] from the UTC
//! wall clock for the values exchanged in pulses. The two are never mixed.

mod calendar;
mod linear;

pub use calendar::{days_in_year, CalendarTime, NANOS_PER_SECOND, SECONDS_PER_DAY};
pub use linear::LinearTime;
