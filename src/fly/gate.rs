//! # Publish Gate Module
//!
//! Decides when the tracker sends a pose report.
//!
//! - At most one report per update interval in steady state.
//! - An extra, immediate report whenever a new subscriber has joined since
//!   the previous tick, so late joiners get the current pose right away.
//! - The gate starts with a full interval already elapsed, so the first
//!   tick always reports the initial pose.

use std::time::Duration;

use crate::session::SubscriberNotifier;

/// Why a report was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishReason {
    /// The update interval elapsed.
    Interval,
    /// A subscriber joined since the previous tick.
    NewSubscriber,
}

/// Rate limiter with new-subscriber resync.
#[derive(Debug, Clone)]
pub struct PublishGate {
    update_interval: Duration,
    since_publish: Duration,
    notifier: SubscriberNotifier,
    seen_joins: u64,
}

impl PublishGate {
    /// Creates a gate publishing every `update_interval`.
    ///
    /// Joins already recorded by `notifier` still count as new.
    #[must_use]
    pub fn new(update_interval: Duration, notifier: SubscriberNotifier) -> Self {
        Self {
            update_interval,
            since_publish: update_interval,
            notifier,
            seen_joins: 0,
        }
    }

    #[must_use]
    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    #[must_use]
    pub fn notifier(&self) -> &SubscriberNotifier {
        &self.notifier
    }

    /// Accounts for `elapsed` time and reports whether to publish now.
    ///
    /// Returning `Some` restarts the interval.
    pub fn poll(&mut self, elapsed: Duration) -> Option<PublishReason> {
        self.since_publish = self.since_publish.saturating_add(elapsed);

        let joins = self.notifier.joined();
        let reason = if joins != self.seen_joins {
            self.seen_joins = joins;
            Some(PublishReason::NewSubscriber)
        } else if self.since_publish >= self.update_interval {
            Some(PublishReason::Interval)
        } else {
            None
        };

        if reason.is_some() {
            self.since_publish = Duration::ZERO;
        }
        reason
    }
}
