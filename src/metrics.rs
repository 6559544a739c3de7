use crate::errors::{LinkError, ParseError};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Global metrics instance
pub static METRICS: Lazy<Mutex<Metrics>> = Lazy::new(|| Mutex::new(Metrics::new()));

/// Poll cycle counters. Counts only, no sample history is kept.
#[derive(Debug, Default, Clone)]
pub struct Metrics {
    pub polls_attempted: u64,
    pub readings_parsed: u64,
    pub connection_failures: u64,
    pub timeouts: u64,
    pub decode_failures: u64,
    pub parse_failures: u64,
    pub last_read_duration: Option<Duration>,
    pub start_time: Option<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_poll_attempt(&mut self) {
        self.polls_attempted += 1;
    }

    pub fn record_reading(&mut self) {
        self.readings_parsed += 1;
    }

    pub fn record_link_failure(&mut self, error: &LinkError) {
        match error {
            LinkError::Timeout { .. } => self.timeouts += 1,
            LinkError::Decode { .. } => self.decode_failures += 1,
            LinkError::Open { .. } | LinkError::Io { .. } | LinkError::Disconnected { .. } => {
                self.connection_failures += 1
            }
        }
    }

    pub fn record_parse_failure(&mut self, _error: &ParseError) {
        self.parse_failures += 1;
    }

    pub fn record_read_duration(&mut self, duration: Duration) {
        self.last_read_duration = Some(duration);
    }

    pub fn total_failures(&self) -> u64 {
        self.connection_failures + self.timeouts + self.decode_failures + self.parse_failures
    }

    pub fn get_total_duration(&self) -> Duration {
        self.start_time
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    /// Single line for the dashboard footer.
    pub fn summary_line(&self) -> String {
        format!(
            "polls: {} | parsed: {} | link: {} | timeout: {} | decode: {} | parse: {}",
            self.polls_attempted,
            self.readings_parsed,
            self.connection_failures,
            self.timeouts,
            self.decode_failures,
            self.parse_failures,
        )
    }

    pub fn print_summary(&self) {
        println!("\n========== Poll Metrics Summary ==========");
        println!("Uptime: {:.2?}", self.get_total_duration());
        println!("Polls Attempted: {}", self.polls_attempted);
        println!("Readings Parsed: {}", self.readings_parsed);
        println!("Connection Failures: {}", self.connection_failures);
        println!("Timeouts: {}", self.timeouts);
        println!("Decode Failures: {}", self.decode_failures);
        println!("Parse Failures: {}", self.parse_failures);
        if let Some(duration) = self.last_read_duration {
            println!("Last Link Read: {:.2?}", duration);
        }
        println!("==========================================\n");
    }
}

/// Helper macro to time a link read
#[macro_export]
macro_rules! time_operation {
    ($op:expr) => {{
        let start = std::time::Instant::now();
        let result = $op;
        let duration = start.elapsed();
        $crate::metrics::METRICS.lock().record_read_duration(duration);
        result
    }};
}
