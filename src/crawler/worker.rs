//! Consumer workers
//!
//! Each worker repeatedly takes a fetch ticket from the frontier, fetches
//! it, asks the politeness policy for the host's next fetch time and
//! reports the outcome back. Failed path-queries go back into their host's
//! queue until the policy gives up on them.
//!
//! Workers stop when the frontier is shut down or, with
//! `stop_when_drained`, once no host is scheduled or in flight.

use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::fetcher::Fetcher;
use crate::error::BaramErrorTrait;
use crate::frontier::{FetchOutcome, FetchTicket, Frontier, FrontierError};
use crate::metrics;
use crate::politeness::{FetchObservation, PolitenessPolicy};
use crate::utils::truncate_text;

/// Longest failure message stored on a host
const MAX_ERROR_LEN: usize = 256;

/// Aggregated worker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Tickets taken from the frontier
    pub fetched: u64,
    pub succeeded: u64,
    pub failed: u64,

    /// Failed path-queries put back for another attempt
    pub requeued: u64,

    /// Failed path-queries abandoned
    pub dropped: u64,
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.fetched += other.fetched;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.requeued += other.requeued;
        self.dropped += other.dropped;
    }
}

/// Pool configuration
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub workers: usize,

    /// How long a worker waits for a ready host before checking for drain
    pub poll_interval: Duration,

    /// Shut the frontier down once it has no scheduled or in-flight hosts
    pub stop_when_drained: bool,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            poll_interval: Duration::from_millis(500),
            stop_when_drained: true,
        }
    }
}

/// Runs N consumer tasks against one frontier
pub struct WorkerPool {
    frontier: Arc<Frontier>,
    fetcher: Arc<dyn Fetcher>,
    policy: Arc<dyn PolitenessPolicy>,
    config: WorkerPoolConfig,
}

impl WorkerPool {
    pub fn new(
        frontier: Arc<Frontier>,
        fetcher: Arc<dyn Fetcher>,
        policy: Arc<dyn PolitenessPolicy>,
        config: WorkerPoolConfig,
    ) -> Self {
        Self {
            frontier,
            fetcher,
            policy,
            config,
        }
    }

    /// Spawn the workers and wait for all of them to stop
    pub async fn run(&self) -> WorkerStats {
        let workers = self.config.workers.max(1);
        tracing::info!(workers, "Starting fetch workers");
        metrics::set_workers(workers, 0);

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    frontier: Arc::clone(&self.frontier),
                    fetcher: Arc::clone(&self.fetcher),
                    policy: Arc::clone(&self.policy),
                    poll_interval: self.config.poll_interval,
                    stop_when_drained: self.config.stop_when_drained,
                };
                tokio::spawn(worker.run())
            })
            .collect();

        let mut total = WorkerStats::default();
        for result in futures::future::join_all(handles).await {
            match result {
                Ok(stats) => total += stats,
                Err(e) => tracing::error!(error = %e, "Worker task failed"),
            }
        }

        metrics::set_workers(0, 0);
        tracing::info!(
            fetched = total.fetched,
            succeeded = total.succeeded,
            failed = total.failed,
            dropped = total.dropped,
            "Fetch workers stopped"
        );
        total
    }
}

struct Worker {
    id: usize,
    frontier: Arc<Frontier>,
    fetcher: Arc<dyn Fetcher>,
    policy: Arc<dyn PolitenessPolicy>,
    poll_interval: Duration,
    stop_when_drained: bool,
}

impl Worker {
    async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats::default();

        loop {
            match self.frontier.next_fetch(Some(self.poll_interval)).await {
                Ok(Some(ticket)) => self.process(ticket, &mut stats).await,
                Ok(None) => {
                    if self.stop_when_drained && self.is_drained().await {
                        tracing::info!(worker = self.id, "Frontier drained");
                        self.frontier.shutdown();
                        break;
                    }
                }
                Err(FrontierError::Cancelled) => break,
                Err(e) => {
                    tracing::error!(worker = self.id, error = %e, "Failed to take fetch ticket");
                }
            }
        }

        tracing::debug!(worker = self.id, fetched = stats.fetched, "Worker stopped");
        stats
    }

    /// Nothing scheduled, nothing in flight and no host became resolvable
    async fn is_drained(&self) -> bool {
        if self.frontier.active_hosts() > 0 {
            return false;
        }
        self.frontier.resolve_pending().await == 0 && self.frontier.active_hosts() == 0
    }

    async fn process(&self, ticket: FetchTicket, stats: &mut WorkerStats) {
        stats.fetched += 1;
        let started = Instant::now();
        let result = self.fetcher.fetch(&ticket).await;
        let latency = started.elapsed();
        metrics::observe_fetch_duration(latency.as_secs_f64());

        let authority = ticket.authority.as_str();
        let (outcome, observation) = match result {
            Ok(response) => {
                stats.succeeded += 1;
                tracing::debug!(
                    url = %ticket.url(),
                    status = response.status,
                    bytes = response.body_len,
                    "Fetched"
                );
                (
                    FetchOutcome::Success {
                        cookies: response.cookies,
                    },
                    FetchObservation::success(Instant::now(), response.latency),
                )
            }
            Err(e) => {
                stats.failed += 1;
                let failures = ticket.retry_count + 1;
                tracing::warn!(
                    url = %ticket.url(),
                    error = %e,
                    category = e.category().description(),
                    failures,
                    "Fetch failed"
                );

                // Requeue before reporting so the host never looks drained
                if e.is_recoverable() && !self.policy.should_give_up(failures) {
                    match self.frontier.enqueue(&ticket.url()).await {
                        Ok(()) => stats.requeued += 1,
                        Err(err) => {
                            stats.dropped += 1;
                            tracing::warn!(url = %ticket.url(), error = %err, "Could not requeue");
                        }
                    }
                } else {
                    stats.dropped += 1;
                    tracing::warn!(url = %ticket.url(), failures, "Giving up on path-query");
                }

                (
                    FetchOutcome::failure(truncate_text(&e.to_string(), MAX_ERROR_LEN)),
                    FetchObservation::failure(Instant::now(), latency, failures),
                )
            }
        };

        let next_fetch_at = self.policy.next_fetch_at(&observation);
        if let Err(e) = self
            .frontier
            .report_outcome(authority, outcome, next_fetch_at)
        {
            tracing::error!(authority = %authority, error = %e, "Failed to report fetch outcome");
        }
    }
}
