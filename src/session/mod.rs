//! # Session Module
//!
//! The publishing side of the tracker.
//!
//! This module handles:
//! - [`TrackerReport`]: one pose sample for one sensor
//! - [`ReportSink`]: where reports go
//! - [`SubscriberNotifier`]: join notifications raised by the session layer
//! - JSON Lines output to any writer ([`jsonl`])
//! - A TCP server broadcasting reports to connected clients ([`tcp`])
//!
//! ## Report Format
//!
//! Each report is one JSON object per line:
//!
//! ```text
//! {"timestamp":"2024-01-01T12:00:00.000Z","sensor":0,"position":[0.0,0.0,0.0],"orientation":[0.0,0.0,0.0,1.0]}
//! ```
//!
//! `orientation` is a unit quaternion in `[x, y, z, w]` order.

pub mod jsonl;
pub mod tcp;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::Pose;

/// One tracker sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerReport {
    pub sensor: u32,
    pub position: [f64; 3],
    pub orientation: [f64; 4],
}

impl TrackerReport {
    /// Snapshot of `pose` for `sensor`.
    #[must_use]
    pub fn from_pose(sensor: u32, pose: &Pose) -> Self {
        Self {
            sensor,
            position: pose.position.to_array(),
            orientation: pose.quaternion().to_array(),
        }
    }
}

#[derive(Serialize)]
struct StampedReport<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a TrackerReport,
}

/// Serializes `report` as a timestamped JSON line, newline included.
pub fn encode_line(report: &TrackerReport) -> Result<String> {
    let stamped = StampedReport {
        timestamp: Utc::now(),
        report,
    };
    let mut line = serde_json::to_string(&stamped)?;
    line.push('\n');
    Ok(line)
}

/// Destination for tracker reports.
#[cfg_attr(test, mockall::automock)]
pub trait ReportSink {
    fn publish(&mut self, report: &TrackerReport) -> Result<()>;
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn publish(&mut self, report: &TrackerReport) -> Result<()> {
        (**self).publish(report)
    }
}

/// Counts subscriber joins.
///
/// The session layer calls [`SubscriberNotifier::notify_joined`] whenever a
/// consumer connects; the publish gate compares the count against the last
/// value it saw, so no join between two ticks is missed. Clones share the
/// same counter and may be moved to other threads.
#[derive(Debug, Clone, Default)]
pub struct SubscriberNotifier {
    joined: Arc<AtomicU64>,
}

impl SubscriberNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a new subscriber joined.
    pub fn notify_joined(&self) {
        self.joined.fetch_add(1, Ordering::AcqRel);
    }

    /// Total joins recorded so far.
    #[must_use]
    pub fn joined(&self) -> u64 {
        self.joined.load(Ordering::Acquire)
    }
}
