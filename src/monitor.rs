use chrono::{Local, TimeDelta};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{MonitorConfig, QueueConfig};
use crate::error::MonitorError;
use crate::extract::StockExtractor;
use crate::fetch::PageFetcher;
use crate::opener::{BrowserLauncher, ItemOpener};
use crate::snapshot::{ItemId, Snapshot};

/// A queue together with the last snapshot taken of it.
#[derive(Debug, Clone)]
struct QueueState {
    queue: QueueConfig,
    snapshot: Snapshot,
}

/// Outcome of polling a single queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub opened: Vec<ItemId>,
    pub deferred: Vec<ItemId>,
    /// The fetch came back empty and the previous snapshot was kept.
    pub kept_previous: bool,
}

pub struct Monitor<F, X, B> {
    config: MonitorConfig,
    fetcher: F,
    extractor: X,
    opener: ItemOpener<B>,
    states: Vec<QueueState>,
}

impl<F, X, B> Monitor<F, X, B>
where
    F: PageFetcher,
    X: StockExtractor,
    B: BrowserLauncher,
{
    pub fn new(config: MonitorConfig, fetcher: F, extractor: X, opener: ItemOpener<B>) -> Self {
        let states = config
            .queues
            .iter()
            .cloned()
            .map(|queue| QueueState {
                queue,
                snapshot: Snapshot::new(),
            })
            .collect();
        Self {
            config,
            fetcher,
            extractor,
            opener,
            states,
        }
    }

    pub fn snapshot(&self, queue: &str) -> Option<&Snapshot> {
        self.states
            .iter()
            .find(|state| state.queue.name == queue)
            .map(|state| &state.snapshot)
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn opener(&self) -> &ItemOpener<B> {
        &self.opener
    }

    /// Current in-stock set of a queue. A failed fetch is an empty set.
    pub async fn take_snapshot(&self, queue: &QueueConfig) -> Snapshot {
        info!("Checking {}...", queue.name);
        match self.fetcher.fetch(&queue.listing_url).await {
            Some(markup) => self.extractor.extract(&markup, &queue.name),
            None => {
                error!(
                    "Could not get page for {}, returning empty list.",
                    queue.name
                );
                Snapshot::new()
            }
        }
    }

    /// Takes the initial snapshot of every queue. Fails when all of them
    /// come back empty, since that cannot be told apart from a broken session.
    pub async fn bootstrap(&mut self) -> Result<(), MonitorError> {
        for i in 0..self.states.len() {
            let snapshot = self.take_snapshot(&self.states[i].queue).await;
            self.states[i].snapshot = snapshot;
        }

        if self.states.iter().all(|state| state.snapshot.is_empty()) {
            error!("Cannot get initial item lists. Exiting.");
            return Err(MonitorError::NoInitialItems);
        }
        Ok(())
    }

    /// One pass over every queue, in configuration order.
    pub async fn poll_once(&mut self) -> Vec<PollReport> {
        let mut reports = Vec::with_capacity(self.states.len());
        for i in 0..self.states.len() {
            reports.push(self.poll_queue(i).await);
        }
        reports
    }

    async fn poll_queue(&mut self, index: usize) -> PollReport {
        let mut report = PollReport::default();
        let queue = &self.states[index].queue;
        let mut fresh = self.take_snapshot(queue).await;

        if fresh.is_empty() {
            // Zero items is treated as a glitch; otherwise the next pass
            // would see every item as new.
            warn!("No items in {}, keeping the previous list.", queue.name);
            report.kept_previous = true;
            return report;
        }

        for id in fresh.newly_added(&self.states[index].snapshot) {
            if self.opener.open(&self.fetcher, queue, &id).await {
                report.opened.push(id);
            } else {
                // Not visible yet; forget it so it shows up as new next time.
                fresh.remove(&id);
                report.deferred.push(id);
            }
        }

        self.states[index].snapshot = fresh;
        report
    }

    /// Bootstraps, then polls once per wait interval until `cancel` fires or
    /// `max_cycles` polls have run.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
        max_cycles: Option<usize>,
    ) -> Result<(), MonitorError> {
        self.bootstrap().await?;

        let mut cycles = 0usize;
        while max_cycles.is_none_or(|max| cycles < max) {
            self.announce_wait();
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown requested, stopping.");
                    return Ok(());
                }
                _ = sleep(self.config.wait_interval) => {}
            }

            self.poll_once().await;
            cycles += 1;
        }
        Ok(())
    }

    fn announce_wait(&self) {
        let minutes = self.config.wait_interval.as_secs() / 60;
        let plural = if minutes == 1 { "" } else { "s" };
        let next_check = TimeDelta::from_std(self.config.wait_interval)
            .ok()
            .and_then(|delta| Local::now().checked_add_signed(delta));
        match next_check {
            Some(at) => info!(
                next_check = %at.format("%H:%M:%S"),
                "Waiting {minutes} minute{plural} for the next check."
            ),
            None => info!("Waiting {minutes} minute{plural} for the next check."),
        }
    }
}
