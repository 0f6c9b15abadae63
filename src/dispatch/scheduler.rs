use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::DispatchTask;

/// How often the scheduler checks the clock
const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Fires the dispatch task once a day at a configured time
pub struct Scheduler;

impl Scheduler {
    /// Spawn the scheduler loop
    ///
    /// The loop wakes once a minute, fires at most once per day after
    /// `send_time`, and exits when `shutdown` changes.
    pub fn spawn(
        task: Arc<DispatchTask>,
        send_time: NaiveTime,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            // If today's trigger already passed, the first fire is
            // tomorrow, not at startup
            let now = Utc::now();
            let mut last_fired = if now.time() >= send_time {
                Some(now.date_naive())
            } else {
                None
            };

            let mut timer = tokio::time::interval(POLL_INTERVAL);
            timer.tick().await; // the first tick resolves immediately

            tracing::info!(%send_time, "Dispatch scheduler started");
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let now = Utc::now();
                        if due(now, send_time, last_fired) {
                            last_fired = Some(now.date_naive());
                            let outcome = task.run().await;
                            tracing::info!(?outcome, "Scheduled dispatch finished");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Dispatch scheduler shutting down");
                        return;
                    }
                }
            }
        })
    }
}

/// Whether the daily trigger should fire at `now`
fn due(now: DateTime<Utc>, send_time: NaiveTime, last_fired: Option<NaiveDate>) -> bool {
    now.time() >= send_time && last_fired != Some(now.date_naive())
}
