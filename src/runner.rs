//! # Tick Loop
//!
//! Drives an [`AnalogFlyTracker`] from a tokio interval until shutdown.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::fly::tracker::AnalogFlyTracker;
use crate::session::ReportSink;

/// Number of ticks between status log messages
pub const LOG_INTERVAL_TICKS: u64 = 10_000;

/// Ticks `tracker` every `tick_period` until `shutdown` resolves.
///
/// Shutdown wins over a tick that is due at the same time. Missed ticks are
/// not replayed; the next tick simply integrates the longer gap. Returns the
/// number of ticks run.
pub async fn run_until<S, F>(
    tracker: &mut AnalogFlyTracker<S>,
    tick_period: Duration,
    shutdown: F,
) -> u64
where
    S: ReportSink,
    F: Future<Output = ()>,
{
    let mut ticker = interval(tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut ticks: u64 = 0;
    let mut last_log_ticks: u64 = 0;

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown requested after {} ticks", ticks);
                break;
            }

            now = ticker.tick() => {
                tracker.tick(now.into_std());
                ticks += 1;

                if ticks - last_log_ticks >= LOG_INTERVAL_TICKS {
                    let position = tracker.pose().position;
                    info!(
                        "Ran {} ticks, {} reports, position ({:.3}, {:.3}, {:.3})",
                        ticks,
                        tracker.reports(),
                        position.x,
                        position.y,
                        position.z
                    );
                    last_log_ticks = ticks;
                }
            }
        }
    }

    ticks
}
