//! Periodic retirement of idle rooms.
//!
//! The reaper wakes on a fixed interval, asks the repository for every room
//! whose `last_action_time` is older than the inactivity timeout (across all
//! partitions) and destroys each one with reason `inactivity`. Each
//! candidate is reloaded first; one that saw activity or changed status since the
//! scan is left alone.
//!
//! ```ignore
//! let handle = Reaper::new(service.clone()).spawn();
//! // ...
//! handle.shutdown().await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use gomoku_hub::NotificationGateway;
use gomoku_protocol::DeleteReason;
use gomoku_store::RoomRepository;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{RoomError, RoomService};

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Rooms found idle past the cutoff.
    pub examined: usize,
    pub retired: usize,
    /// Rooms that were active again, or already gone, by the time they
    /// were reloaded.
    pub skipped: usize,
    /// Rooms whose deletion failed. They are picked up again next sweep.
    pub failed: usize,
}

/// Background sweeper for inactive rooms.
pub struct Reaper<R, N> {
    service: Arc<RoomService<R, N>>,
    running: Arc<AtomicBool>,
}

impl<R, N> Clone for Reaper<R, N> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            running: Arc::clone(&self.running),
        }
    }
}

impl<R: RoomRepository, N: NotificationGateway> Reaper<R, N> {
    pub fn new(service: Arc<RoomService<R, N>>) -> Self {
        Self {
            service,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs one sweep as of `now`.
    ///
    /// Per-room failures are logged and counted; only a failure to list
    /// candidates fails the sweep. If another sweep is still running this
    /// returns an empty report without doing anything.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport, RoomError> {
        let Some(_guard) = SweepGuard::acquire(&self.running) else {
            tracing::debug!("previous sweep still running, skipping");
            return Ok(SweepReport::default());
        };

        let timeout = self.service.config().inactivity_timeout;
        let cutoff = TimeDelta::from_std(timeout)
            .ok()
            .and_then(|delta| now.checked_sub_signed(delta))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let idle = self.service.inactive_since(cutoff).await?;
        let mut report = SweepReport {
            examined: idle.len(),
            ..SweepReport::default()
        };

        for listed in &idle {
            let outcome = match self.service.still_idle(listed, cutoff).await {
                Ok(Some(room)) => self.service.destroy(&room, DeleteReason::Inactivity).await,
                Ok(None) => {
                    report.skipped += 1;
                    tracing::debug!(room_id = %listed.id, "room changed since listing, kept");
                    continue;
                }
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => report.retired += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(room_id = %listed.id, error = %e, "failed to retire idle room");
                }
            }
        }

        if report.examined > 0 {
            tracing::info!(
                examined = report.examined,
                retired = report.retired,
                skipped = report.skipped,
                failed = report.failed,
                "inactivity sweep finished"
            );
        }
        Ok(report)
    }

    /// Starts sweeping every `sweep_interval` on a background task.
    ///
    /// The first sweep runs one interval after spawning. A sweep that
    /// overruns the interval makes the missed ticks collapse into one.
    pub fn spawn(self) -> ReaperHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let period = self.service.config().sweep_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            tracing::debug!(?period, "reaper started");
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep_once(Utc::now()).await {
                            tracing::warn!(error = %e, "inactivity sweep failed");
                        }
                    }
                }
            }
            tracing::debug!("reaper stopped");
        });

        ReaperHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

/// Owns a running reaper task.
pub struct ReaperHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stops the reaper and waits for an in-flight sweep to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "reaper task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Clears the running flag when dropped.
struct SweepGuard<'a>(&'a AtomicBool);

impl<'a> SweepGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
