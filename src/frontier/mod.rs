//! Crawl frontier: which host may be fetched next, and when
//!
//! The frontier composes three pieces:
//!
//! - [`registry`] - one [`HostEntry`] per authority, created lazily
//! - [`entry`] - per-host queue, address, cookies and failure bookkeeping
//! - [`ready`] - delay-ordered queue releasing hosts once their politeness
//!   delay has elapsed
//!
//! # Architecture
//!
//! ```text
//!   producers                                        consumers
//!  ──────────►  enqueue(url)                   next_fetch() ◄──────────
//!                  │                                 ▲
//!                  ▼                                 │
//!        ┌──────────────────┐   admit    ┌──────────────────────┐
//!        │ AuthorityRegistry│──────────► │    ReadyScheduler    │
//!        │  authority →     │            │  heap by next_fetch  │
//!        │    HostEntry     │ ◄───────── │                      │
//!        └──────────────────┘  resubmit  └──────────────────────┘
//!                                  ▲
//!                                  │ report_outcome(...)
//! ```
//!
//! A host moves through `Idle → Scheduled → InFlight → (Scheduled | Idle)`
//! and finally `Retired`. Producers only admit idle hosts; consumers
//! resubmit the host they hold atomically with recording the fetch outcome,
//! so a host is never in the scheduler twice and never stranded with work.
//!
//! # Example
//!
//! ```no_run
//! use baram_frontier::frontier::{FetchOutcome, Frontier};
//! use baram_frontier::resolver::SystemResolver;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), baram_frontier::frontier::FrontierError> {
//! let frontier = Frontier::new(Arc::new(SystemResolver::default()));
//! frontier.enqueue("https://example.com/").await?;
//!
//! if let Some(ticket) = frontier.next_fetch(Some(Duration::from_secs(5))).await? {
//!     // ... fetch ticket.url() ...
//!     let next = tokio::time::Instant::now() + Duration::from_secs(2);
//!     frontier.report_outcome(ticket.authority.as_str(), FetchOutcome::success(), next)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod authority;
pub mod entry;
pub mod error;
pub mod ready;
pub mod registry;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::FrontierConfig;
use crate::metrics;
use crate::resolver::DnsResolver;

pub use authority::{split_url, Authority};
pub use entry::{Cookie, HostEntry, HostSnapshot, Rotation, DEFAULT_PATH_QUERY_LIMIT};
pub use error::{FrontierError, FrontierResult, Inadmissible};
pub use ready::ReadyScheduler;
pub use registry::AuthorityRegistry;

/// Result of one fetch as reported by a consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The fetch succeeded; `cookies` replaces the host's cookie set if present
    Success { cookies: Option<Vec<Cookie>> },

    /// The fetch failed
    Failure { error: String },
}

impl FetchOutcome {
    /// Success that keeps the stored cookies
    pub fn success() -> Self {
        Self::Success { cookies: None }
    }

    pub fn success_with_cookies(cookies: Vec<Cookie>) -> Self {
        Self::Success {
            cookies: Some(cookies),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Everything a consumer needs to perform one fetch
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub authority: Authority,
    pub path_query: String,
    pub address: IpAddr,
    pub cookies: Vec<Cookie>,

    /// Consecutive failures on this host before this fetch
    pub retry_count: u32,
}

impl FetchTicket {
    /// Absolute URL of the path-query
    pub fn url(&self) -> String {
        self.authority.join(&self.path_query)
    }
}

/// Registry + ready scheduler behind the producer and consumer entry points
pub struct Frontier {
    registry: AuthorityRegistry,
    scheduler: ReadyScheduler,
    resolver: Arc<dyn DnsResolver>,
}

impl std::fmt::Debug for Frontier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontier")
            .field("hosts", &self.registry.count())
            .field("ready", &self.scheduler.len())
            .finish()
    }
}

impl Frontier {
    /// Create a frontier with the default per-host queue bound
    pub fn new(resolver: Arc<dyn DnsResolver>) -> Self {
        Self::with_limit(resolver, DEFAULT_PATH_QUERY_LIMIT)
    }

    /// Create a frontier whose hosts hold at most `path_query_limit` items
    pub fn with_limit(resolver: Arc<dyn DnsResolver>, path_query_limit: usize) -> Self {
        Self {
            registry: AuthorityRegistry::new(path_query_limit),
            scheduler: ReadyScheduler::new(),
            resolver,
        }
    }

    pub fn from_config(config: &FrontierConfig, resolver: Arc<dyn DnsResolver>) -> Self {
        Self::with_limit(resolver, config.path_query_limit)
    }

    pub fn registry(&self) -> &AuthorityRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &ReadyScheduler {
        &self.scheduler
    }

    // ========================================================================
    // Producer side
    // ========================================================================

    /// Queue a URL for fetching
    ///
    /// Resolves the host on first use and admits it to the scheduler once it
    /// has both work and an address. Concurrent producers share a single
    /// lookup per host. A failed resolution keeps the URL queued, and only
    /// [`resolve_pending`](Self::resolve_pending) retries it.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` if the URL has no usable authority
    /// - `CapacityExceeded` if the host queue is full
    pub async fn enqueue(&self, url: &str) -> FrontierResult<()> {
        let (authority, path_query) = split_url(url).inspect_err(|e| {
            metrics::record_rejected("invalid_url");
            tracing::debug!(url = %url, error = %e, "Rejected URL");
        })?;

        let entry = self.push_path_query(&authority, path_query).await?;
        metrics::record_enqueued();

        self.resolve_entry(&entry, false).await;
        self.admit(&entry);
        Ok(())
    }

    /// Queue several URLs, returning the ones that were rejected
    pub async fn enqueue_all<I, S>(&self, urls: I) -> Vec<(String, FrontierError)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rejected = Vec::new();
        for url in urls {
            let url = url.as_ref();
            if let Err(e) = self.enqueue(url).await {
                rejected.push((url.to_string(), e));
            }
        }
        rejected
    }

    async fn push_path_query(
        &self,
        authority: &Authority,
        path_query: String,
    ) -> FrontierResult<Arc<HostEntry>> {
        loop {
            let entry = self.registry.get_or_create(authority);
            match entry.enqueue(path_query.clone()) {
                Ok(_) => {
                    metrics::set_hosts(self.registry.count());
                    return Ok(entry);
                }
                // Lost a race with retirement: the registry hands out a
                // fresh entry once the retired one is unmapped.
                Err(FrontierError::NotAdmissible {
                    reason: Inadmissible::Retired,
                    ..
                }) => tokio::task::yield_now().await,
                Err(e) => {
                    if matches!(e, FrontierError::CapacityExceeded { .. }) {
                        metrics::record_rejected("capacity");
                        tracing::warn!(
                            authority = %authority,
                            path_query = %path_query,
                            "Host queue full, rejecting path-query"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    // Only one task resolves a host at a time; producers leave failed
    // lookups to `resolve_pending`.
    async fn resolve_entry(&self, entry: &HostEntry, retry_failed: bool) -> bool {
        let Some(claim) = entry.claim_lookup(retry_failed) else {
            return false;
        };
        match self.resolver.resolve(entry.authority()).await {
            Ok(ip) => {
                claim.resolved(ip);
                tracing::debug!(authority = %entry.authority(), address = %ip, "Host resolved");
                true
            }
            Err(e) => {
                tracing::warn!(authority = %entry.authority(), error = %e, "Host resolution failed");
                false
            }
        }
    }

    fn admit(&self, entry: &Arc<HostEntry>) {
        if let Some(due) = entry.admit_idle() {
            self.scheduler.push(Arc::clone(entry), due);
        }
    }

    /// Retry resolution for hosts that have work but no address
    ///
    /// Returns the number of hosts admitted to the scheduler.
    pub async fn resolve_pending(&self) -> usize {
        let mut admitted = 0;
        for entry in self.registry.entries() {
            if entry.is_empty() {
                continue;
            }
            if self.resolve_entry(&entry, true).await && entry.rotation() == Rotation::Idle {
                self.admit(&entry);
                admitted += 1;
            }
        }
        admitted
    }

    // ========================================================================
    // Consumer side
    // ========================================================================

    /// Wait for the next host whose politeness delay has elapsed and pop
    /// one path-query from it
    ///
    /// With `timeout` set, returns `Ok(None)` if nothing became eligible in
    /// time. The host stays in flight until
    /// [`report_outcome`](Self::report_outcome) is called for it.
    ///
    /// # Errors
    ///
    /// `Cancelled` after [`shutdown`](Self::shutdown).
    pub async fn next_fetch(&self, timeout: Option<Duration>) -> FrontierResult<Option<FetchTicket>> {
        let entry = match timeout {
            None => Some(self.scheduler.take().await?),
            Some(timeout) => self.scheduler.take_timeout(timeout).await?,
        };
        let Some(entry) = entry else {
            return Ok(None);
        };

        match entry.checkout() {
            Ok(checkout) => {
                tracing::debug!(
                    authority = %entry.authority(),
                    path_query = %checkout.path_query,
                    "Fetch ticket issued"
                );
                Ok(Some(FetchTicket {
                    authority: entry.authority().clone(),
                    path_query: checkout.path_query,
                    address: checkout.address,
                    cookies: checkout.cookies,
                    retry_count: checkout.retry_count,
                }))
            }
            Err(e) => {
                entry.release();
                tracing::error!(authority = %entry.authority(), error = %e, "Scheduled host had no work");
                Err(e)
            }
        }
    }

    /// Record the outcome of a fetch and put the host back in rotation if
    /// it still has work
    ///
    /// # Errors
    ///
    /// - `UnknownHost` if the authority is not tracked
    /// - `NotInFlight` if no fetch ticket is outstanding for the host
    pub fn report_outcome(
        &self,
        authority: &str,
        outcome: FetchOutcome,
        next_fetch_at: Instant,
    ) -> FrontierResult<()> {
        let entry = self
            .registry
            .get(authority)
            .ok_or_else(|| FrontierError::UnknownHost {
                authority: authority.to_string(),
            })?;

        let success = outcome.is_success();
        match entry.complete_fetch(outcome, next_fetch_at)? {
            Some(due) => self.scheduler.push(entry, due),
            None => tracing::debug!(authority = %authority, "Host drained, now idle"),
        }
        metrics::record_fetch(success);
        Ok(())
    }

    // ========================================================================
    // Host lifecycle
    // ========================================================================

    /// Permanently remove an idle, drained host
    ///
    /// Returns `false` if the authority is unknown.
    ///
    /// # Errors
    ///
    /// `HostBusy` if the host still has work, is scheduled or is in flight.
    pub fn retire_host(&self, authority: &str) -> FrontierResult<bool> {
        match self.registry.get(authority) {
            Some(entry) => self.retire_entry(&entry),
            None => Ok(false),
        }
    }

    /// Retire a specific entry instance
    ///
    /// Returns `false` when the registry already maps the authority to a
    /// newer instance.
    pub fn retire_entry(&self, entry: &Arc<HostEntry>) -> FrontierResult<bool> {
        if entry.rotation() != Rotation::Retired && !entry.mark_retired() {
            return Err(FrontierError::HostBusy {
                authority: entry.authority().to_string(),
            });
        }

        let removed = self.registry.retire(entry);
        if removed {
            metrics::record_retired();
            metrics::set_hosts(self.registry.count());
            tracing::info!(authority = %entry.authority(), "Host retired");
        }
        Ok(removed)
    }

    /// Retire every idle, drained host; returns how many were removed
    pub fn retire_drained(&self) -> usize {
        self.registry
            .entries()
            .iter()
            .filter(|entry| entry.rotation() == Rotation::Idle && entry.is_empty())
            .filter(|entry| matches!(self.retire_entry(entry), Ok(true)))
            .count()
    }

    /// Stop handing out work; blocked consumers return `Cancelled`
    pub fn shutdown(&self) {
        tracing::info!(
            hosts = self.registry.count(),
            ready = self.scheduler.len(),
            "Frontier shutting down"
        );
        self.scheduler.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.scheduler.is_shut_down()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn host_count(&self) -> usize {
        self.registry.count()
    }

    pub fn contains_host(&self, authority: &str) -> bool {
        self.registry.contains(authority)
    }

    /// Hosts waiting in the ready scheduler
    pub fn ready_len(&self) -> usize {
        self.scheduler.len()
    }

    /// Path-queries pending across all hosts
    pub fn pending_urls(&self) -> usize {
        self.registry.entries().iter().map(|e| e.size()).sum()
    }

    /// Hosts taken by a consumer and not yet reported
    pub fn in_flight(&self) -> usize {
        self.registry
            .entries()
            .iter()
            .filter(|e| e.rotation() == Rotation::InFlight)
            .count()
    }

    /// Hosts that are scheduled or in flight
    ///
    /// A host stays active from admission until a report leaves it drained,
    /// so zero means no fetch can happen without new work or a resolution.
    pub fn active_hosts(&self) -> usize {
        self.registry
            .entries()
            .iter()
            .filter(|e| matches!(e.rotation(), Rotation::Scheduled | Rotation::InFlight))
            .count()
    }

    // ========================================================================
    // Checkpointing
    // ========================================================================

    /// Durable records for every host, sorted by authority
    pub fn snapshot(&self) -> Vec<HostSnapshot> {
        let now = Instant::now();
        let mut hosts: Vec<HostSnapshot> = self
            .registry
            .entries()
            .iter()
            .map(|entry| entry.snapshot(now))
            .collect();
        hosts.sort_by(|a, b| a.authority.cmp(&b.authority));
        hosts
    }

    /// Load host records produced by [`snapshot`](Self::snapshot)
    ///
    /// Path-queries beyond a host's capacity are dropped with a warning.
    /// Returns the number of path-queries restored.
    ///
    /// # Errors
    ///
    /// `InvalidUrl` if a record carries an unparsable authority.
    pub async fn restore(&self, hosts: Vec<HostSnapshot>) -> FrontierResult<usize> {
        let now = Instant::now();
        let mut restored = 0;

        for host in hosts {
            let authority = Authority::parse(&host.authority)?;
            let entry = self.registry.get_or_create(&authority);

            for path_query in host.path_queries {
                match entry.enqueue(path_query) {
                    Ok(_) => restored += 1,
                    Err(e) => {
                        tracing::warn!(authority = %authority, error = %e, "Dropping restored path-queries");
                        break;
                    }
                }
            }

            entry.reset_next_fetch(now + Duration::from_millis(host.delay_remaining_ms));
            entry.restore_bookkeeping(host.retry_count, host.last_error);

            if !entry.is_empty() {
                self.resolve_entry(&entry, false).await;
                self.admit(&entry);
            }
        }

        metrics::set_hosts(self.registry.count());
        tracing::info!(
            hosts = self.registry.count(),
            path_queries = restored,
            "Frontier restored"
        );
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticResolver;
    use crate::utils::error::ResolveError;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn frontier() -> Frontier {
        let resolver = StaticResolver::new().with_fallback(IpAddr::V4(Ipv4Addr::LOCALHOST));
        Frontier::new(Arc::new(resolver))
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_then_fetch() {
        let frontier = frontier();
        frontier.enqueue("http://a.com/1").await.unwrap();
        frontier.enqueue("http://a.com/2").await.unwrap();

        assert_eq!(frontier.host_count(), 1);
        assert_eq!(frontier.ready_len(), 1);
        assert_eq!(frontier.pending_urls(), 2);

        let ticket = frontier.next_fetch(None).await.unwrap().unwrap();
        assert_eq!(ticket.url(), "http://a.com/1");
        assert_eq!(ticket.address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(frontier.in_flight(), 1);
        assert_eq!(frontier.ready_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_does_not_double_schedule_in_flight_host() {
        let frontier = frontier();
        frontier.enqueue("http://a.com/1").await.unwrap();
        let ticket = frontier.next_fetch(None).await.unwrap().unwrap();

        // Host is in flight and drained; new work must wait for the report
        frontier.enqueue("http://a.com/2").await.unwrap();
        assert_eq!(frontier.ready_len(), 0);

        let next = Instant::now() + Duration::from_secs(1);
        frontier
            .report_outcome(ticket.authority.as_str(), FetchOutcome::success(), next)
            .unwrap();
        assert_eq!(frontier.ready_len(), 1);

        let ticket = frontier.next_fetch(None).await.unwrap().unwrap();
        assert_eq!(ticket.path_query, "/2");
        assert!(Instant::now() >= next);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drained_host_goes_idle_and_readmits() {
        let frontier = frontier();
        frontier.enqueue("http://a.com/1").await.unwrap();
        let ticket = frontier.next_fetch(None).await.unwrap().unwrap();
        frontier
            .report_outcome(ticket.authority.as_str(), FetchOutcome::success(), Instant::now())
            .unwrap();

        let entry = frontier.registry().get("http://a.com").unwrap();
        assert_eq!(entry.rotation(), Rotation::Idle);
        assert_eq!(frontier.ready_len(), 0);

        frontier.enqueue("http://a.com/again").await.unwrap();
        assert_eq!(entry.rotation(), Rotation::Scheduled);
        assert_eq!(frontier.ready_len(), 1);
    }

    #[tokio::test]
    async fn test_report_errors() {
        let frontier = frontier();
        let err = frontier
            .report_outcome("http://nope.com", FetchOutcome::success(), Instant::now())
            .unwrap_err();
        assert!(matches!(err, FrontierError::UnknownHost { .. }));

        frontier.enqueue("http://a.com/1").await.unwrap();
        let err = frontier
            .report_outcome("http://a.com", FetchOutcome::success(), Instant::now())
            .unwrap_err();
        assert!(matches!(err, FrontierError::NotInFlight { .. }));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let frontier = frontier();
        let err = frontier.enqueue("::not a url::").await.unwrap_err();
        assert!(matches!(err, FrontierError::InvalidUrl { .. }));
        assert_eq!(frontier.host_count(), 0);
    }

    /// Resolver that takes a second per lookup and fails until switched on
    #[derive(Default)]
    struct SlowResolver {
        lookups: AtomicUsize,
        online: AtomicBool,
    }

    #[async_trait::async_trait]
    impl DnsResolver for SlowResolver {
        async fn resolve(&self, authority: &Authority) -> Result<IpAddr, ResolveError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            if self.online.load(Ordering::SeqCst) {
                Ok(IpAddr::V4(Ipv4Addr::LOCALHOST))
            } else {
                Err(ResolveError::Timeout {
                    host: authority.host().to_string(),
                })
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_resolved_once_across_producers() {
        let resolver = Arc::new(SlowResolver::default());
        let frontier = Frontier::new(Arc::clone(&resolver) as Arc<dyn DnsResolver>);

        let (a, b, c) = tokio::join!(
            frontier.enqueue("http://a.com/1"),
            frontier.enqueue("http://a.com/2"),
            frontier.enqueue("http://a.com/3"),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
        assert_eq!(resolver.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(frontier.ready_len(), 0);

        // Producers leave a failed lookup alone
        frontier.enqueue("http://a.com/4").await.unwrap();
        assert_eq!(resolver.lookups.load(Ordering::SeqCst), 1);

        resolver.online.store(true, Ordering::SeqCst);
        assert_eq!(frontier.resolve_pending().await, 1);
        assert_eq!(resolver.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(frontier.ready_len(), 1);
        assert_eq!(frontier.pending_urls(), 4);
    }

    #[tokio::test]
    async fn test_unresolvable_host_stays_queued() {
        let frontier = Frontier::new(Arc::new(StaticResolver::new()));
        frontier.enqueue("http://unknown.test/1").await.unwrap();

        assert_eq!(frontier.host_count(), 1);
        assert_eq!(frontier.pending_urls(), 1);
        assert_eq!(frontier.ready_len(), 0);
        assert_eq!(frontier.resolve_pending().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retire_rules() {
        let frontier = frontier();
        assert!(!frontier.retire_host("http://a.com").unwrap());

        frontier.enqueue("http://a.com/1").await.unwrap();
        let err = frontier.retire_host("http://a.com").unwrap_err();
        assert!(matches!(err, FrontierError::HostBusy { .. }));

        let ticket = frontier.next_fetch(None).await.unwrap().unwrap();
        assert!(frontier.retire_host("http://a.com").is_err());

        frontier
            .report_outcome(ticket.authority.as_str(), FetchOutcome::success(), Instant::now())
            .unwrap();
        assert!(frontier.retire_host("http://a.com").unwrap());
        assert!(!frontier.contains_host("http://a.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_after_retire_creates_fresh_entry() {
        let frontier = frontier();
        frontier.enqueue("http://a.com/1").await.unwrap();
        let old = frontier.registry().get("http://a.com").unwrap();
        let ticket = frontier.next_fetch(None).await.unwrap().unwrap();
        frontier
            .report_outcome(ticket.authority.as_str(), FetchOutcome::success(), Instant::now())
            .unwrap();
        assert!(frontier.retire_host("http://a.com").unwrap());

        frontier.enqueue("http://a.com/2").await.unwrap();
        let fresh = frontier.registry().get("http://a.com").unwrap();
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert_eq!(fresh.size(), 1);

        // The stale handle cannot evict the fresh entry
        assert!(!frontier.retire_entry(&old).unwrap());
        assert!(frontier.contains_host("http://a.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retire_drained() {
        let frontier = frontier();
        frontier.enqueue("http://a.com/1").await.unwrap();
        frontier.enqueue("http://b.com/1").await.unwrap();

        let ticket = frontier.next_fetch(None).await.unwrap().unwrap();
        frontier
            .report_outcome(ticket.authority.as_str(), FetchOutcome::success(), Instant::now())
            .unwrap();

        assert_eq!(frontier.retire_drained(), 1);
        assert_eq!(frontier.host_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_restore() {
        let source = frontier();
        source.enqueue("http://a.com/1").await.unwrap();
        source.enqueue("http://a.com/2").await.unwrap();
        source.enqueue("https://b.com/x?y=1").await.unwrap();

        let snapshot = source.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].authority, "http://a.com");
        assert_eq!(snapshot[0].path_queries, vec!["/1", "/2"]);

        let target = frontier();
        let restored = target.restore(snapshot).await.unwrap();
        assert_eq!(restored, 3);
        assert_eq!(target.host_count(), 2);
        assert_eq!(target.ready_len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_consumers() {
        let frontier = Arc::new(frontier());
        let consumer = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.next_fetch(None).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        frontier.shutdown();

        let result = consumer.await.unwrap();
        assert!(matches!(result, Err(FrontierError::Cancelled)));
    }
}
