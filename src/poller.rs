//! Background read-parse loop feeding the dashboard.
//!
//! One poll walks `Idle -> Connecting -> Reading -> {Parsed | ParseFailed |
//! ConnectionFailed} -> Sleeping -> Idle`. Only `Parsed` produces an update;
//! every failure is logged, counted and dropped, and the next poll is the
//! retry.

use crate::data_models::SensorReading;
use crate::errors::{DashboardError, LinkError, ParseError};
use crate::link::{read_record_line, LinkReader};
use crate::metrics::METRICS;
use crate::parsers::parse_record;
use crate::time_operation;
use chrono::{DateTime, Local};
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const POLLER_THREAD_NAME: &str = "link-poller";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Connecting,
    Reading,
    Parsed,
    ParseFailed,
    ConnectionFailed,
    Sleeping,
}

/// Result of a single poll.
#[derive(Debug)]
pub enum PollOutcome {
    Parsed(SensorReading),
    ParseFailed(ParseError),
    /// Open, timeout, IO and decode failures of the link.
    ConnectionFailed(LinkError),
}

impl PollOutcome {
    pub fn state(&self) -> PollState {
        match self {
            PollOutcome::Parsed(_) => PollState::Parsed,
            PollOutcome::ParseFailed(_) => PollState::ParseFailed,
            PollOutcome::ConnectionFailed(_) => PollState::ConnectionFailed,
        }
    }
}

/// A parsed reading on its way to the display, stamped on arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorUpdate {
    pub reading: SensorReading,
    pub received_at: DateTime<Local>,
}

pub struct Poller<L: LinkReader> {
    link: L,
    interval: Duration,
    state: PollState,
    max_polls: Option<u64>,
}

impl<L: LinkReader> Poller<L> {
    pub fn new(link: L, interval: Duration) -> Self {
        Self {
            link,
            interval,
            state: PollState::Idle,
            max_polls: None,
        }
    }

    /// Stop after `limit` polls instead of running for the process lifetime.
    pub fn with_poll_limit(mut self, limit: Option<u64>) -> Self {
        self.max_polls = limit;
        self
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    fn transition(&mut self, next: PollState) {
        debug!("[{}] {:?} -> {:?}", self.link.name(), self.state, next);
        self.state = next;
    }

    /// Runs one connect-read-parse cycle. The link session is closed before
    /// this returns.
    pub fn poll_once(&mut self) -> PollOutcome {
        METRICS.lock().record_poll_attempt();
        self.transition(PollState::Connecting);

        let line = match self.link.connect() {
            Ok(mut session) => {
                self.transition(PollState::Reading);
                let timeout = self.link.read_timeout();
                time_operation!(read_record_line(&mut session, self.link.name(), timeout))
            }
            Err(e) => Err(e),
        };

        let outcome = match line {
            Ok(line) => {
                debug!("Received from {}: {}", self.link.name(), line);
                match parse_record(&line) {
                    Ok(reading) => PollOutcome::Parsed(reading),
                    Err(e) => PollOutcome::ParseFailed(e),
                }
            }
            Err(e) => PollOutcome::ConnectionFailed(e),
        };

        match &outcome {
            PollOutcome::Parsed(reading) => {
                METRICS.lock().record_reading();
                debug!("Parsed reading: {:?}", reading);
            }
            PollOutcome::ParseFailed(e) => {
                METRICS.lock().record_parse_failure(e);
                warn!("Discarding record from {}: {}", self.link.name(), e);
            }
            PollOutcome::ConnectionFailed(e) => {
                METRICS.lock().record_link_failure(e);
                warn!("Link error: {}", e);
            }
        }

        self.transition(outcome.state());
        outcome
    }

    fn limit_reached(&self, polls: u64) -> bool {
        self.max_polls.is_some_and(|limit| polls >= limit)
    }

    /// Polls until the poll limit is reached or the receiving side is gone.
    /// Without a limit and with a live receiver this never returns.
    pub fn run(mut self, updates: Sender<SensorUpdate>) {
        info!(
            "Polling {} every {:?} (read timeout {:?})",
            self.link.name(),
            self.interval,
            self.link.read_timeout()
        );
        let mut polls: u64 = 0;

        loop {
            if self.limit_reached(polls) {
                info!("Reached poll limit of {}, stopping poller", polls);
                return;
            }

            if let PollOutcome::Parsed(reading) = self.poll_once() {
                let update = SensorUpdate {
                    reading,
                    received_at: Local::now(),
                };
                if updates.send(update).is_err() {
                    info!("Dashboard closed, stopping poller for {}", self.link.name());
                    return;
                }
            }

            polls += 1;
            // No sleep after the last poll
            if self.limit_reached(polls) {
                info!("Reached poll limit of {}, stopping poller", polls);
                return;
            }

            self.transition(PollState::Sleeping);
            thread::sleep(self.interval);
            self.transition(PollState::Idle);
        }
    }
}

/// Starts the poller on its own named thread. The handle does not need to be
/// joined; the thread ends with the process.
pub fn spawn_poller<L>(poller: Poller<L>, updates: Sender<SensorUpdate>) -> Result<JoinHandle<()>, DashboardError>
where
    L: LinkReader + 'static,
{
    thread::Builder::new()
        .name(POLLER_THREAD_NAME.to_string())
        .spawn(move || poller.run(updates))
        .map_err(|e| DashboardError::ThreadSpawn {
            name: POLLER_THREAD_NAME.to_string(),
            source: e,
        })
}
