//! Per-host crawl state
//!
//! A [`HostEntry`] holds everything the frontier knows about one authority:
//! the FIFO of pending path-queries, the resolved address, the session
//! cookies, failure bookkeeping and the earliest instant at which the host
//! may be fetched again.
//!
//! Producers append to the queue while a consumer may be mid-fetch on the
//! same entry, so every read and write goes through the entry's own mutex.
//! No lock is ever held across an await point.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::authority::Authority;
use super::error::{FrontierError, FrontierResult, Inadmissible};
use super::FetchOutcome;

/// Default bound on pending path-queries per host
pub const DEFAULT_PATH_QUERY_LIMIT: usize = 1000;

/// A session cookie stored for a host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse the name/value pair from a `Set-Cookie` header value
    ///
    /// Attributes after the first `;` are ignored.
    pub fn from_set_cookie(header: &str) -> Option<Self> {
        let pair = header.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, value.trim()))
    }
}

/// Where an entry currently sits in the fetch rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    /// Known to the registry, not waiting in the scheduler
    Idle,

    /// Waiting in the ready scheduler
    Scheduled,

    /// Taken by a consumer that has not reported back yet
    InFlight,

    /// Removed from the registry; accepts no more work
    Retired,
}

/// Address lookup progress for an entry that has no address yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Idle,
    Pending,
    Failed,
}

/// Durable per-host record used for checkpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSnapshot {
    /// Serialized authority, e.g. `https://a.com`
    pub authority: String,

    /// Pending path-queries in FIFO order
    pub path_queries: Vec<String>,

    /// Time left until the host may be fetched again
    pub delay_remaining_ms: u64,

    /// Consecutive failures
    pub retry_count: u32,

    /// Most recent failure, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct EntryState {
    address: Option<IpAddr>,
    path_queries: VecDeque<String>,
    cookies: Vec<Cookie>,
    last_error: Option<String>,
    retry_count: u32,
    next_fetch_at: Instant,
    rotation: Rotation,
    lookup: Lookup,
}

impl EntryState {
    fn apply_success(&mut self, cookies: Option<Vec<Cookie>>, next_fetch_at: Instant) {
        if let Some(cookies) = cookies {
            self.cookies = dedup_cookies(cookies);
        }
        self.last_error = None;
        self.retry_count = 0;
        self.advance(next_fetch_at);
    }

    fn apply_failure(&mut self, error: String, next_fetch_at: Instant) {
        self.last_error = Some(error);
        self.retry_count = self.retry_count.saturating_add(1);
        self.advance(next_fetch_at);
    }

    // nextFetchAt is monotone outside of an explicit reset
    fn advance(&mut self, next_fetch_at: Instant) {
        if next_fetch_at > self.next_fetch_at {
            self.next_fetch_at = next_fetch_at;
        }
    }

    fn settle_if_drained(&mut self) {
        if self.rotation == Rotation::InFlight && self.path_queries.is_empty() {
            self.rotation = Rotation::Idle;
        }
    }

    fn admissible(&self) -> Result<(), Inadmissible> {
        if self.rotation == Rotation::Retired {
            return Err(Inadmissible::Retired);
        }
        if self.path_queries.is_empty() {
            return Err(Inadmissible::Empty);
        }
        if self.address.is_none() {
            return Err(Inadmissible::Unresolved);
        }
        Ok(())
    }
}

/// Keep the first occurrence of each cookie name, preserving order
fn dedup_cookies(cookies: Vec<Cookie>) -> Vec<Cookie> {
    let mut out: Vec<Cookie> = Vec::with_capacity(cookies.len());
    for cookie in cookies {
        if !out.iter().any(|c| c.name == cookie.name) {
            out.push(cookie);
        }
    }
    out
}

/// What a consumer needs to perform one fetch, captured under one lock
#[derive(Debug, Clone)]
pub(crate) struct Checkout {
    pub path_query: String,
    pub address: IpAddr,
    pub cookies: Vec<Cookie>,
    pub retry_count: u32,
}

/// Exclusive right to resolve one entry's address
pub(crate) struct LookupClaim<'a> {
    entry: &'a HostEntry,
}

impl LookupClaim<'_> {
    pub(crate) fn resolved(self, address: IpAddr) {
        self.entry.set_address(address);
    }
}

impl Drop for LookupClaim<'_> {
    fn drop(&mut self) {
        let mut state = self.entry.lock();
        state.lookup = if state.address.is_some() {
            Lookup::Idle
        } else {
            Lookup::Failed
        };
    }
}

/// Mutable crawl state for a single authority
#[derive(Debug)]
pub struct HostEntry {
    authority: Authority,
    capacity: usize,
    state: Mutex<EntryState>,
}

impl HostEntry {
    /// Create an empty entry that is immediately eligible for fetching
    pub fn new(authority: Authority, capacity: usize) -> Self {
        Self {
            authority,
            capacity,
            state: Mutex::new(EntryState {
                address: None,
                path_queries: VecDeque::new(),
                cookies: Vec::new(),
                last_error: None,
                retry_count: 0,
                next_fetch_at: Instant::now(),
                rotation: Rotation::Idle,
                lookup: Lookup::Idle,
            }),
        }
    }

    // A panic while holding the lock leaves the state consistent: every
    // mutation below is a single field write or a VecDeque operation.
    fn lock(&self) -> MutexGuard<'_, EntryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Maximum number of pending path-queries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.lock().path_queries.is_empty()
    }

    pub fn size(&self) -> usize {
        self.lock().path_queries.len()
    }

    /// Append a path-query to the tail of the queue
    ///
    /// Returns the queue length after the append.
    ///
    /// # Errors
    ///
    /// - `CapacityExceeded` when the queue already holds `capacity` items
    /// - `NotAdmissible` with [`Inadmissible::Retired`] once the entry was retired
    pub fn enqueue(&self, path_query: impl Into<String>) -> FrontierResult<usize> {
        let mut state = self.lock();
        if state.rotation == Rotation::Retired {
            return Err(FrontierError::not_admissible(
                self.authority.as_str(),
                Inadmissible::Retired,
            ));
        }
        if state.path_queries.len() >= self.capacity {
            return Err(FrontierError::CapacityExceeded {
                authority: self.authority.to_string(),
                limit: self.capacity,
            });
        }
        state.path_queries.push_back(path_query.into());
        Ok(state.path_queries.len())
    }

    /// Remove and return the head of the queue
    pub fn dequeue(&self) -> FrontierResult<String> {
        self.lock()
            .path_queries
            .pop_front()
            .ok_or_else(|| FrontierError::EmptyQueue {
                authority: self.authority.to_string(),
            })
    }

    /// Time left before the host may be fetched, measured from `now`
    pub fn delay_remaining(&self, now: Instant) -> Duration {
        self.lock().next_fetch_at.saturating_duration_since(now)
    }

    pub fn next_fetch_at(&self) -> Instant {
        self.lock().next_fetch_at
    }

    /// Record a successful fetch
    ///
    /// `cookies` replaces the stored set wholesale when present; `None`
    /// keeps the current cookies. The retry counter resets to zero.
    ///
    /// An in-flight entry whose queue is now empty goes back to idle, so the
    /// next producer enqueue readmits it. An in-flight entry that still has
    /// work stays in flight until it is resubmitted.
    pub fn record_success(&self, cookies: Option<Vec<Cookie>>, next_fetch_at: Instant) {
        let mut state = self.lock();
        state.apply_success(cookies, next_fetch_at);
        state.settle_if_drained();
    }

    /// Record a failed fetch and bump the consecutive-failure counter
    ///
    /// Leaves rotation the same way as [`record_success`](Self::record_success).
    pub fn record_failure(&self, error: impl Into<String>, next_fetch_at: Instant) {
        let mut state = self.lock();
        state.apply_failure(error.into(), next_fetch_at);
        state.settle_if_drained();
    }

    /// Explicitly move the next fetch instant, including backwards
    pub fn reset_next_fetch(&self, next_fetch_at: Instant) {
        self.lock().next_fetch_at = next_fetch_at;
    }

    pub fn set_address(&self, address: IpAddr) {
        self.lock().address = Some(address);
    }

    pub fn address(&self) -> Option<IpAddr> {
        self.lock().address
    }

    pub fn cookies(&self) -> Vec<Cookie> {
        self.lock().cookies.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn retry_count(&self) -> u32 {
        self.lock().retry_count
    }

    pub fn rotation(&self) -> Rotation {
        self.lock().rotation
    }

    /// Capture the durable part of this entry
    pub fn snapshot(&self, now: Instant) -> HostSnapshot {
        let state = self.lock();
        HostSnapshot {
            authority: self.authority.to_string(),
            path_queries: state.path_queries.iter().cloned().collect(),
            delay_remaining_ms: state.next_fetch_at.saturating_duration_since(now).as_millis()
                as u64,
            retry_count: state.retry_count,
            last_error: state.last_error.clone(),
        }
    }

    /// Claim the address lookup for this entry
    ///
    /// Returns `None` when the address is known or another task is already
    /// resolving it. A lookup that failed before is only claimed again with
    /// `retry_failed`. Dropping the claim without an address marks the
    /// lookup as failed.
    pub(crate) fn claim_lookup(&self, retry_failed: bool) -> Option<LookupClaim<'_>> {
        let mut state = self.lock();
        if state.address.is_some() {
            return None;
        }
        match state.lookup {
            Lookup::Idle => {}
            Lookup::Failed if retry_failed => {}
            Lookup::Failed | Lookup::Pending => return None,
        }
        state.lookup = Lookup::Pending;
        Some(LookupClaim { entry: self })
    }

    /// Restore failure bookkeeping from a snapshot
    pub(crate) fn restore_bookkeeping(&self, retry_count: u32, last_error: Option<String>) {
        let mut state = self.lock();
        state.retry_count = retry_count;
        state.last_error = last_error;
    }

    // ------------------------------------------------------------------
    // Rotation transitions
    // ------------------------------------------------------------------

    /// Producer-side admission: only an idle entry with work and an address
    /// moves to `Scheduled`. Returns the scheduling key on success.
    pub(crate) fn admit_idle(&self) -> Option<Instant> {
        let mut state = self.lock();
        if state.rotation != Rotation::Idle || state.admissible().is_err() {
            return None;
        }
        state.rotation = Rotation::Scheduled;
        Some(state.next_fetch_at)
    }

    /// Strict admission used by explicit submissions
    pub(crate) fn admit(&self) -> Result<Instant, Inadmissible> {
        let mut state = self.lock();
        state.admissible()?;
        if state.rotation == Rotation::Scheduled {
            return Err(Inadmissible::AlreadyScheduled);
        }
        state.rotation = Rotation::Scheduled;
        Ok(state.next_fetch_at)
    }

    /// Hand the entry to a consumer unless its next fetch moved past `now`
    /// while it waited; in that case the new key is returned.
    pub(crate) fn begin_fetch(&self, now: Instant) -> Result<(), Instant> {
        let mut state = self.lock();
        if state.next_fetch_at > now {
            return Err(state.next_fetch_at);
        }
        state.rotation = Rotation::InFlight;
        Ok(())
    }

    /// Pop the next path-query together with the connection details
    pub(crate) fn checkout(&self) -> FrontierResult<Checkout> {
        let mut state = self.lock();
        let address = state.address.ok_or_else(|| {
            FrontierError::not_admissible(self.authority.as_str(), Inadmissible::Unresolved)
        })?;
        let path_query =
            state
                .path_queries
                .pop_front()
                .ok_or_else(|| FrontierError::EmptyQueue {
                    authority: self.authority.to_string(),
                })?;
        Ok(Checkout {
            path_query,
            address,
            cookies: state.cookies.clone(),
            retry_count: state.retry_count,
        })
    }

    /// Apply a fetch outcome and leave rotation in one step
    ///
    /// Returns the new scheduling key when work remains, `None` when the
    /// entry went idle.
    pub(crate) fn complete_fetch(
        &self,
        outcome: FetchOutcome,
        next_fetch_at: Instant,
    ) -> FrontierResult<Option<Instant>> {
        let mut state = self.lock();
        if state.rotation != Rotation::InFlight {
            return Err(FrontierError::NotInFlight {
                authority: self.authority.to_string(),
            });
        }

        match outcome {
            FetchOutcome::Success { cookies } => state.apply_success(cookies, next_fetch_at),
            FetchOutcome::Failure { error } => state.apply_failure(error, next_fetch_at),
        }

        if state.admissible().is_ok() {
            state.rotation = Rotation::Scheduled;
            Ok(Some(state.next_fetch_at))
        } else {
            state.rotation = Rotation::Idle;
            Ok(None)
        }
    }

    /// Give an in-flight entry back without recording an outcome
    pub(crate) fn release(&self) {
        let mut state = self.lock();
        if state.rotation == Rotation::InFlight {
            state.rotation = Rotation::Idle;
        }
    }

    /// Take the entry out of rotation for good if it is idle and drained
    pub(crate) fn mark_retired(&self) -> bool {
        let mut state = self.lock();
        if state.rotation == Rotation::Idle && state.path_queries.is_empty() {
            state.rotation = Rotation::Retired;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    fn entry(capacity: usize) -> HostEntry {
        HostEntry::new(Authority::parse("http://a.com").unwrap(), capacity)
    }

    fn localhost() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    #[test]
    fn test_fifo_order() {
        let e = entry(10);
        assert!(e.is_empty());
        e.enqueue("/1").unwrap();
        e.enqueue("/2").unwrap();
        assert_eq!(e.size(), 2);
        assert_eq!(e.dequeue().unwrap(), "/1");
        assert_eq!(e.size(), 1);
        assert_eq!(e.dequeue().unwrap(), "/2");
        assert!(e.is_empty());
    }

    #[test]
    fn test_dequeue_empty_fails() {
        let e = entry(10);
        let err = e.dequeue().unwrap_err();
        assert!(matches!(err, FrontierError::EmptyQueue { .. }));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_capacity_bound_enforced() {
        let e = entry(DEFAULT_PATH_QUERY_LIMIT);
        for i in 0..DEFAULT_PATH_QUERY_LIMIT {
            e.enqueue(format!("/{i}")).unwrap();
        }
        let err = e.enqueue("/overflow").unwrap_err();
        assert!(matches!(
            err,
            FrontierError::CapacityExceeded { limit: 1000, .. }
        ));
        assert_eq!(e.size(), DEFAULT_PATH_QUERY_LIMIT);
    }

    #[test]
    fn test_delay_remaining_subtracts_now() {
        // Regression guard: the remaining delay is relative to `now`,
        // never the absolute next-fetch instant.
        let e = entry(10);
        let now = Instant::now();
        e.reset_next_fetch(now + Duration::from_secs(5));

        assert_eq!(e.delay_remaining(now), Duration::from_secs(5));
        assert_eq!(
            e.delay_remaining(now + Duration::from_secs(2)),
            Duration::from_secs(3)
        );
        assert_eq!(
            e.delay_remaining(now + Duration::from_secs(9)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_new_entry_is_immediately_eligible() {
        let e = entry(10);
        assert_eq!(e.delay_remaining(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn test_retry_count_bookkeeping() {
        let e = entry(10);
        let now = Instant::now();
        e.record_failure("timeout", now + Duration::from_secs(1));
        e.record_failure("timeout", now + Duration::from_secs(2));
        assert_eq!(e.retry_count(), 2);
        assert_eq!(e.last_error().as_deref(), Some("timeout"));

        e.record_success(None, now + Duration::from_secs(3));
        assert_eq!(e.retry_count(), 0);
        assert!(e.last_error().is_none());
    }

    #[test]
    fn test_next_fetch_never_moves_backward() {
        let e = entry(10);
        let now = Instant::now();
        e.record_success(None, now + Duration::from_secs(10));
        e.record_failure("late", now + Duration::from_secs(1));
        assert_eq!(e.next_fetch_at(), now + Duration::from_secs(10));

        e.reset_next_fetch(now);
        assert_eq!(e.next_fetch_at(), now);
    }

    #[test]
    fn test_cookies_replaced_wholesale() {
        let e = entry(10);
        let now = Instant::now();
        e.record_success(
            Some(vec![Cookie::new("a", "1"), Cookie::new("b", "2")]),
            now,
        );
        assert_eq!(e.cookies().len(), 2);

        e.record_success(Some(vec![Cookie::new("c", "3")]), now);
        assert_eq!(e.cookies(), vec![Cookie::new("c", "3")]);

        e.record_success(None, now);
        assert_eq!(e.cookies(), vec![Cookie::new("c", "3")]);
    }

    #[test]
    fn test_cookie_set_keeps_first_per_name() {
        let e = entry(10);
        e.record_success(
            Some(vec![Cookie::new("sid", "1"), Cookie::new("sid", "2")]),
            Instant::now(),
        );
        assert_eq!(e.cookies(), vec![Cookie::new("sid", "1")]);
    }

    #[test]
    fn test_parse_set_cookie() {
        let c = Cookie::from_set_cookie("sid=abc123; Path=/; HttpOnly").unwrap();
        assert_eq!(c, Cookie::new("sid", "abc123"));
        assert!(Cookie::from_set_cookie("=novalue").is_none());
        assert!(Cookie::from_set_cookie("garbage").is_none());
    }

    #[test]
    fn test_admission_requires_work_and_address() {
        let e = entry(10);
        assert_eq!(e.admit(), Err(Inadmissible::Empty));

        e.enqueue("/1").unwrap();
        assert_eq!(e.admit(), Err(Inadmissible::Unresolved));
        assert!(e.admit_idle().is_none());

        e.set_address(localhost());
        assert!(e.admit_idle().is_some());
        assert_eq!(e.rotation(), Rotation::Scheduled);
        assert_eq!(e.admit(), Err(Inadmissible::AlreadyScheduled));
        assert!(e.admit_idle().is_none());
    }

    #[test]
    fn test_complete_fetch_requeues_or_idles() {
        let e = entry(10);
        e.set_address(localhost());
        e.enqueue("/1").unwrap();
        e.enqueue("/2").unwrap();
        e.admit().unwrap();
        e.begin_fetch(Instant::now()).unwrap();
        e.checkout().unwrap();

        let later = Instant::now() + Duration::from_secs(1);
        let key = e
            .complete_fetch(FetchOutcome::Success { cookies: None }, later)
            .unwrap();
        assert_eq!(key, Some(later));
        assert_eq!(e.rotation(), Rotation::Scheduled);

        e.begin_fetch(later).unwrap();
        e.checkout().unwrap();
        let key = e
            .complete_fetch(
                FetchOutcome::Failure {
                    error: "boom".to_string(),
                },
                later,
            )
            .unwrap();
        assert_eq!(key, None);
        assert_eq!(e.rotation(), Rotation::Idle);
    }

    #[test]
    fn test_record_outcome_idles_drained_in_flight_entry() {
        let e = entry(10);
        e.set_address(localhost());
        e.enqueue("/1").unwrap();
        e.enqueue("/2").unwrap();
        e.admit().unwrap();
        e.begin_fetch(Instant::now()).unwrap();

        e.dequeue().unwrap();
        e.record_failure("reset", Instant::now());
        assert_eq!(e.rotation(), Rotation::InFlight);

        e.dequeue().unwrap();
        e.record_success(None, Instant::now());
        assert_eq!(e.rotation(), Rotation::Idle);
        assert!(e.mark_retired());
    }

    #[test]
    fn test_lookup_claimed_once() {
        let e = entry(10);
        let claim = e.claim_lookup(true).unwrap();
        assert!(e.claim_lookup(true).is_none());
        drop(claim);

        // Failed lookups are only reclaimed on request
        assert!(e.claim_lookup(false).is_none());
        let claim = e.claim_lookup(true).unwrap();
        claim.resolved(localhost());
        assert_eq!(e.address(), Some(localhost()));
        assert!(e.claim_lookup(true).is_none());
    }

    #[test]
    fn test_complete_fetch_requires_in_flight() {
        let e = entry(10);
        let err = e
            .complete_fetch(FetchOutcome::Success { cookies: None }, Instant::now())
            .unwrap_err();
        assert!(matches!(err, FrontierError::NotInFlight { .. }));
    }

    #[test]
    fn test_begin_fetch_rekeys_when_moved_later() {
        let e = entry(10);
        let now = Instant::now();
        e.reset_next_fetch(now + Duration::from_secs(3));
        assert_eq!(e.begin_fetch(now), Err(now + Duration::from_secs(3)));
        assert!(e.begin_fetch(now + Duration::from_secs(3)).is_ok());
        assert_eq!(e.rotation(), Rotation::InFlight);
    }

    #[test]
    fn test_retired_entry_rejects_work() {
        let e = entry(10);
        assert!(e.mark_retired());
        let err = e.enqueue("/late").unwrap_err();
        assert!(matches!(
            err,
            FrontierError::NotAdmissible {
                reason: Inadmissible::Retired,
                ..
            }
        ));
    }

    #[test]
    fn test_busy_entry_cannot_retire() {
        let e = entry(10);
        e.enqueue("/1").unwrap();
        assert!(!e.mark_retired());
        assert_eq!(e.rotation(), Rotation::Idle);
    }

    #[test]
    fn test_snapshot() {
        let e = entry(10);
        let now = Instant::now();
        e.enqueue("/a").unwrap();
        e.enqueue("/b").unwrap();
        e.record_failure("refused", now + Duration::from_millis(1500));

        let snap = e.snapshot(now);
        assert_eq!(snap.authority, "http://a.com");
        assert_eq!(snap.path_queries, vec!["/a", "/b"]);
        assert_eq!(snap.delay_remaining_ms, 1500);
        assert_eq!(snap.retry_count, 1);
        assert_eq!(snap.last_error.as_deref(), Some("refused"));
    }

    #[test]
    fn test_concurrent_producer_consumer_preserves_prefix() {
        const N: usize = 500;
        let e = Arc::new(entry(N));

        let producer = {
            let e = Arc::clone(&e);
            std::thread::spawn(move || {
                for i in 0..N {
                    e.enqueue(format!("/{i}")).unwrap();
                }
            })
        };

        let consumer = {
            let e = Arc::clone(&e);
            std::thread::spawn(move || {
                let mut seen = Vec::new();
                while seen.len() < N / 2 {
                    if let Ok(pq) = e.dequeue() {
                        seen.push(pq);
                    } else {
                        std::thread::yield_now();
                    }
                }
                seen
            })
        };

        producer.join().unwrap();
        let seen = consumer.join().unwrap();

        let expected: Vec<String> = (0..N / 2).map(|i| format!("/{i}")).collect();
        assert_eq!(seen, expected);
        assert_eq!(e.size(), N - N / 2);
    }
}
