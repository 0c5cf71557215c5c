//! Rendering of status reports on stdout

use std::{
    io::{self, Write},
    sync::Mutex,
};

use pulsesync::{Role, Status};
use serde::Deserialize;

/// Lines a status occupies in text mode
const STATUS_LINES: usize = 4;

/// Erase the current line, then move to the start of the previous one
const ERASE_LINE_UP: &str = "\x1b[2K\x1b[1F";

/// Erase the current line from the cursor on
const ERASE_LINE: &str = "\x1b[0K";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFormat {
    /// Redraw a four line block in place
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Writes every status report to stdout in the configured format
#[derive(Debug)]
pub struct StatusObserver {
    format: StatusFormat,
    drawn: Mutex<bool>,
}

impl StatusObserver {
    pub fn new(format: StatusFormat) -> Self {
        Self {
            format,
            drawn: Mutex::new(false),
        }
    }

    pub fn format(&self) -> StatusFormat {
        self.format
    }

    /// The bytes to print for `status`. In text mode the block previously
    /// drawn, if any, is erased first.
    pub fn render(&self, status: &Status) -> String {
        match self.format {
            StatusFormat::Text => {
                let mut drawn = self.drawn.lock().unwrap_or_else(|e| e.into_inner());
                let text = render_text(status, *drawn);
                *drawn = true;
                text
            }
            StatusFormat::Json => match serde_json::to_string(status) {
                Ok(mut json) => {
                    json.push('\n');
                    json
                }
                Err(e) => {
                    log::warn!("Could not serialize status: {e}");
                    String::new()
                }
            },
        }
    }

    pub fn observe(&self, status: &Status) {
        let rendered = self.render(status);

        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout
            .write_all(rendered.as_bytes())
            .and_then(|()| stdout.flush())
        {
            log::warn!("Could not write status: {e}");
        }
    }
}

fn render_text(status: &Status, erase_previous: bool) -> String {
    let mut text = String::new();

    if erase_previous {
        for _ in 1..STATUS_LINES {
            text.push_str(ERASE_LINE_UP);
        }
        text.push_str(ERASE_LINE);
    }

    text.push_str(&status.to_string());

    // keep the block height fixed so the next redraw erases exactly it
    if status.role == Role::Master {
        for _ in 1..STATUS_LINES {
            text.push('\n');
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use pulsesync::{CalendarTime, DeviationHistory, HardwareAddress};

    use super::*;

    fn master() -> Status {
        Status {
            role: Role::Master,
            chosen_master: None,
            last_sent: CalendarTime::new(2025, 3, 7, 11),
            last_received: CalendarTime::default(),
            current_deviation: 0.0,
            statistics: DeviationHistory::new(),
        }
    }

    fn slave() -> Status {
        let mut statistics = DeviationHistory::new();
        statistics.record(-0.25);

        Status {
            role: Role::Slave,
            chosen_master: Some(HardwareAddress([0x02, 0, 0, 0, 0, 0x01])),
            last_sent: CalendarTime::default(),
            last_received: CalendarTime::new(2025, 3, 7, 11),
            current_deviation: statistics.current(),
            statistics,
        }
    }

    #[test]
    fn text_blocks_have_fixed_height() {
        for status in [master(), slave()] {
            let text = render_text(&status, false);
            assert_eq!(text.matches('\n').count(), STATUS_LINES - 1);
            assert!(!text.ends_with('\n') || status.role == Role::Master);
        }
    }

    #[test]
    fn text_redraw_erases_previous_block() {
        let observer = StatusObserver::new(StatusFormat::Text);

        let first = observer.render(&master());
        assert!(first.starts_with("m - 2025:3:7:11"));

        let second = observer.render(&slave());
        assert!(second.starts_with("\x1b[2K\x1b[1F\x1b[2K\x1b[1F\x1b[2K\x1b[1F\x1b[0Ks [02:00:00:00:00:01]"));
    }

    #[test]
    fn json_lines() {
        let observer = StatusObserver::new(StatusFormat::Json);

        let line = observer.render(&slave());
        assert!(line.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["role"], "Slave");
        assert_eq!(value["current_deviation"], -0.25);
        assert_eq!(value["last_received"]["year"], 2025);

        // nothing to erase in json mode
        let line = observer.render(&master());
        assert!(line.starts_with('{'));
        assert_eq!(serde_json::from_str::<serde_json::Value>(&line).unwrap()["role"], "Master");
    }
}
