//! Status snapshots of the controller and their text rendering

use core::fmt;

use crate::{controller::Role, statistics::DeviationHistory, time::CalendarTime, HardwareAddress};

/// Read-only snapshot of the controller, handed to
/// [`Provider::report`](crate::Provider::report) after every event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Status {
    pub role: Role,
    /// The master this node follows, `None` while master or while no master
    /// is known.
    pub chosen_master: Option<HardwareAddress>,
    /// Time carried by the last pulse sent while master
    pub last_sent: CalendarTime,
    /// Time carried by the last pulse received from the chosen master
    pub last_received: CalendarTime,
    /// Latest measured deviation in seconds
    pub current_deviation: f64,
    pub statistics: DeviationHistory,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Role::Master => write!(f, "m - {}", self.last_sent),
            Role::Slave => {
                let master = self.chosen_master.unwrap_or(HardwareAddress::NO_MASTER);
                writeln!(f, "s [{}] - {}", master, self.last_received)?;
                writeln!(
                    f,
                    "  current deviation: {:.6e}s, mu_10 = {:.6e}s, mu_100 = {:.6e}s,",
                    self.current_deviation, self.statistics.mu_10, self.statistics.mu_100
                )?;
                writeln!(
                    f,
                    "  delta_10_max = {:.6e}s, delta_100_max = {:.6e}s,",
                    self.statistics.delta_10_max, self.statistics.delta_100_max
                )?;
                write!(
                    f,
                    "  delta_10_bar = {:.6e}s, delta_100_bar = {:.6e}s",
                    self.statistics.delta_10_bar, self.statistics.delta_100_bar
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_line() {
        let status = Status {
            role: Role::Master,
            chosen_master: None,
            last_sent: CalendarTime::new(2024, 12, 3600, 42),
            last_received: CalendarTime::default(),
            current_deviation: 0.0,
            statistics: DeviationHistory::new(),
        };

        assert_eq!(status.to_string(), "m - 2024:12:3600:42");
    }

    #[test]
    fn slave_lines() {
        let mut statistics = DeviationHistory::new();
        statistics.record(0.5);

        let status = Status {
            role: Role::Slave,
            chosen_master: Some(HardwareAddress([0x02, 0, 0, 0, 0, 0x01])),
            last_sent: CalendarTime::default(),
            last_received: CalendarTime::new(2024, 1, 2, 3),
            current_deviation: statistics.current(),
            statistics,
        };

        let text = status.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "s [02:00:00:00:00:01] - 2024:1:2:3");
        assert!(lines[1].starts_with("  current deviation: 5.000000e-1s, mu_10 = 5.000000e-2s"));
        assert!(lines[3].starts_with("  delta_10_bar = "));
    }

    #[test]
    fn slave_without_master() {
        let status = Status {
            role: Role::Slave,
            chosen_master: None,
            last_sent: CalendarTime::default(),
            last_received: CalendarTime::default(),
            current_deviation: 0.0,
            statistics: DeviationHistory::new(),
        };

        assert!(status.to_string().starts_with("s [ff:ff:ff:ff:ff:ff] - 0:0:0:0"));
    }
}
