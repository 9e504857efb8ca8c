//! Background eviction of idle participants.

use std::{sync::Arc, time::Duration};

use lobby_core::{
    model::{LEAVE_NOTICE, Message},
    traits::ChatStore,
};
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::service::{ChatError, ChatService};

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Participants removed this sweep.
    pub evicted: Vec<String>,
    /// Stale in the snapshot but seen again before removal.
    pub kept: Vec<String>,
    /// Removal failed; retried next sweep.
    pub failed: Vec<String>,
}

impl SweepReport {
    fn is_quiet(&self) -> bool {
        self.evicted.is_empty() && self.kept.is_empty() && self.failed.is_empty()
    }
}

impl<S> ChatService<S>
where
    S: ChatStore,
{
    /// Evict every participant idle for longer than the staleness threshold.
    ///
    /// Each removal is paired with its departure notice by the store. A
    /// failure for one participant is logged and does not stop the others.
    ///
    /// # Errors
    /// Returns error only if the registry snapshot cannot be read.
    pub async fn sweep(&self) -> Result<SweepReport, ChatError> {
        let now = self.now();
        let cutoff = self.config().stale_cutoff(now);
        let snapshot = self.store().list_participants().await?;

        let mut report = SweepReport::default();
        for participant in snapshot.into_iter().filter(|p| p.is_stale(cutoff)) {
            let notice = Message::status(&participant.name, LEAVE_NOTICE, now);
            match self
                .store()
                .evict_if_stale(&participant.name, cutoff, &notice)
                .await
            {
                Ok(true) => {
                    tracing::info!("{} left (idle)", participant.name);
                    report.evicted.push(participant.name);
                }
                Ok(false) => report.kept.push(participant.name),
                Err(e) => {
                    tracing::warn!("Failed to evict {}: {e}", participant.name);
                    report.failed.push(participant.name);
                }
            }
        }

        Ok(report)
    }

    /// Run `sweep` every `sweep_interval` until the handle is stopped.
    ///
    /// The first sweep happens one interval after spawning. Sweeps never
    /// overlap; a slow sweep delays the next one.
    #[must_use]
    pub fn spawn_sweeper(self: Arc<Self>) -> SweeperHandle
    where
        S: 'static,
    {
        let period = self.config().sweep_interval.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => match self.sweep().await {
                        Ok(report) if report.is_quiet() => {}
                        Ok(report) => tracing::debug!(?report, "sweep finished"),
                        Err(e) => tracing::warn!("Sweep skipped: {e}"),
                    },
                }
            }

            tracing::debug!("sweeper stopped");
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Owner of a running sweeper task. Dropping it aborts the task.
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Whether the task is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Ask the sweeper to stop and wait for it. A sweep in progress is
    /// allowed to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            if !e.is_cancelled() {
                tracing::error!("Sweeper task failed: {e}");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
