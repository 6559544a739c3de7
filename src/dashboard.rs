//! Display state and the text panel that presents it.
//!
//! The UI loop owns [`DisplayState`] and is its only writer: the poller hands
//! readings over the channel and the loop applies them here.

use crate::config::DashboardConfig;
use crate::data_models::RainDisplayRule;
use crate::metrics::METRICS;
use crate::poller::SensorUpdate;
use crate::snapshot::{Snapshot, SnapshotSource};
use chrono::{DateTime, Local};
use crossbeam_channel::{select, tick, Receiver};
use log::info;
use std::io::Write;

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Values currently on screen. Starts at zero / "No" until the first reading.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub ambient_humidity: f64,
    pub soil_humidity: f64,
    pub luminance: i64,
    pub rain_display: bool,
    pub temperature: f64,
    pub last_update: Option<DateTime<Local>>,
    rain_rule: RainDisplayRule,
}

impl DisplayState {
    pub fn new(rain_rule: RainDisplayRule) -> Self {
        Self {
            ambient_humidity: 0.0,
            soil_humidity: 0.0,
            luminance: 0,
            rain_display: false,
            temperature: 0.0,
            last_update: None,
            rain_rule,
        }
    }

    /// Replaces every displayed value from one reading, verbatim.
    pub fn apply(&mut self, update: &SensorUpdate) {
        let reading = &update.reading;
        *self = Self {
            ambient_humidity: reading.ambient_humidity,
            soil_humidity: reading.soil_humidity,
            luminance: reading.luminance,
            rain_display: self.rain_rule.apply(reading),
            temperature: reading.temperature,
            last_update: Some(update.received_at),
            rain_rule: self.rain_rule,
        };
        info!(
            "Display updated: ambient {}%, soil {}%, {} lux, rain {}, {} C",
            reading.ambient_humidity,
            reading.soil_humidity,
            reading.luminance,
            yes_no(self.rain_display),
            reading.temperature
        );
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

// Whole numbers keep one decimal, like 88.0
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Renders the whole panel as text.
pub fn render_panel(title: &str, state: &DisplayState, snapshot: &Snapshot, status_line: &str) -> String {
    let (width, height) = snapshot.dimensions();
    let camera = match &snapshot.source {
        SnapshotSource::File(path) => format!("{}x{} from {}", width, height, path.display()),
        SnapshotSource::Placeholder => format!("{}x{} placeholder (no image)", width, height),
    };
    let last_update = state
        .last_update
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    let rows = [
        ("Ambient humidity (%):", format_float(state.ambient_humidity)),
        ("Soil humidity (%):", format_float(state.soil_humidity)),
        ("Luminance (lux):", state.luminance.to_string()),
        ("Rain:", yes_no(state.rain_display).to_string()),
        ("Temperature (°C):", format_float(state.temperature)),
        ("Last update:", last_update),
        ("Camera:", camera),
    ];

    let mut panel = format!("==== {} ====\n", title);
    for (label, value) in rows {
        panel.push_str(&format!("{:<24}{}\n", label, value));
    }
    panel.push_str(&format!("---\n{}\n", status_line));
    panel
}

/// UI event loop: applies updates as they arrive and redraws when the panel
/// text changes, checking at least once per refresh interval. Returns once
/// the poller side of the channel is gone.
pub fn run_dashboard<W: Write>(
    config: &DashboardConfig,
    snapshot: &Snapshot,
    updates: Receiver<SensorUpdate>,
    out: &mut W,
    clear_screen: bool,
) -> std::io::Result<DisplayState> {
    let ticker = tick(config.refresh_interval());
    let mut state = DisplayState::new(config.rain_display_rule);
    let mut last_frame = String::new();

    loop {
        let frame = render_panel(&config.title, &state, snapshot, &METRICS.lock().summary_line());
        if frame != last_frame {
            if clear_screen {
                out.write_all(CLEAR_SCREEN.as_bytes())?;
            }
            out.write_all(frame.as_bytes())?;
            out.flush()?;
            last_frame = frame;
        }

        select! {
            recv(updates) -> message => match message {
                Ok(update) => state.apply(&update),
                Err(_) => {
                    info!("Poller finished, closing dashboard");
                    return Ok(state);
                }
            },
            recv(ticker) -> _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::SensorReading;
    use crate::parsers::parse_record;
    use chrono::TimeZone;

    fn update_from(line: &str) -> SensorUpdate {
        SensorUpdate {
            reading: parse_record(line).unwrap(),
            received_at: Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_initial_state_matches_empty_dashboard() {
        let state = DisplayState::new(RainDisplayRule::HumidityGated);
        assert_eq!(state.luminance, 0);
        assert!(!state.rain_display);
        assert!(state.last_update.is_none());
    }

    #[test]
    fn test_apply_replaces_all_values() {
        let mut state = DisplayState::new(RainDisplayRule::HumidityGated);
        state.apply(&update_from("1,42.5,97.0,23,550"));
        assert_eq!(state.ambient_humidity, 97.0);
        assert_eq!(state.soil_humidity, 42.5);
        assert_eq!(state.luminance, 550);
        assert_eq!(state.temperature, 23.0);
        assert!(state.rain_display);

        state.apply(&update_from("1,40.0,88.0,21,300"));
        assert!(!state.rain_display);
        assert_eq!(state.luminance, 300);
    }

    #[test]
    fn test_sensor_only_rule_shows_rain_flag() {
        let mut state = DisplayState::new(RainDisplayRule::SensorOnly);
        state.apply(&SensorUpdate {
            reading: SensorReading {
                rain_detected: true,
                soil_humidity: 1.0,
                ambient_humidity: 30.0,
                temperature: 1.0,
                luminance: 1,
            },
            received_at: Local::now(),
        });
        assert!(state.rain_display);
    }

    #[test]
    fn test_render_panel_lists_readouts() {
        let mut state = DisplayState::new(RainDisplayRule::HumidityGated);
        state.apply(&update_from("1,42.5,88.0,23,550"));
        let panel = render_panel("Agrobot V1.0", &state, &Snapshot::placeholder(400, 500), "polls: 1");

        assert!(panel.starts_with("==== Agrobot V1.0 ====\n"));
        assert!(panel.contains("Ambient humidity (%):   88.0\n"));
        assert!(panel.contains("Soil humidity (%):      42.5\n"));
        assert!(panel.contains("Luminance (lux):        550\n"));
        assert!(panel.contains("Rain:                   No\n"));
        assert!(panel.contains("Temperature (°C):       23.0\n"));
        assert!(panel.contains("2024-05-01 12:30:00"));
        assert!(panel.contains("400x500 placeholder"));
        assert!(panel.ends_with("polls: 1\n"));
    }

    #[test]
    fn test_format_float_keeps_one_decimal_for_whole_numbers() {
        assert_eq!(format_float(88.0), "88.0");
        assert_eq!(format_float(42.5), "42.5");
        assert_eq!(format_float(-4.25), "-4.25");
    }

    #[test]
    fn test_run_dashboard_applies_updates_until_poller_ends() {
        let config = DashboardConfig {
            refresh_ms: 5,
            ..DashboardConfig::default()
        };
        let (tx, rx) = crossbeam_channel::bounded(4);
        tx.send(update_from("1,42.5,97.0,23,550")).unwrap();
        drop(tx);

        let mut out = Vec::new();
        let state = run_dashboard(&config, &Snapshot::placeholder(4, 5), rx, &mut out, false).unwrap();

        assert!(state.rain_display);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Rain:                   Yes"));
        assert!(!text.contains(CLEAR_SCREEN));
    }
}
