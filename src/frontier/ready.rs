//! Delay-ordered ready queue of host entries
//!
//! Entries are keyed by their next-fetch instant and released only once
//! that instant has passed. Among eligible entries the earliest due wins;
//! ties go to the entry submitted first.
//!
//! Waiters compute their own wake-up time from the heap minimum and are
//! additionally woken on every insertion, so a newly submitted entry that is
//! due sooner than the current head is picked up without delay.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

use super::entry::HostEntry;
use super::error::{FrontierError, FrontierResult};

struct Slot {
    due: Instant,
    seq: u64,
    entry: Arc<HostEntry>,
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Slot {}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    // Reversed: BinaryHeap is a max-heap and the earliest slot must be on top
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct Heap {
    slots: BinaryHeap<Slot>,
    next_seq: u64,
}

impl Heap {
    fn push(&mut self, entry: Arc<HostEntry>, due: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.push(Slot { due, seq, entry });
    }
}

enum Head {
    Ready(Arc<HostEntry>),
    Wait(Option<Instant>),
}

/// Time-ordered, internally synchronized queue of schedulable hosts
pub struct ReadyScheduler {
    heap: Mutex<Heap>,
    wakeup: Notify,
    shutdown_tx: watch::Sender<bool>,
}

impl Default for ReadyScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReadyScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyScheduler")
            .field("len", &self.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl ReadyScheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            heap: Mutex::new(Heap::default()),
            wakeup: Notify::new(),
            shutdown_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Heap> {
        self.heap.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert an entry keyed by its current next-fetch instant
    ///
    /// # Errors
    ///
    /// `NotAdmissible` if the entry is empty, unresolved, retired or
    /// already waiting in the scheduler.
    pub fn submit(&self, entry: Arc<HostEntry>) -> FrontierResult<()> {
        let due = entry
            .admit()
            .map_err(|reason| FrontierError::not_admissible(entry.authority().as_str(), reason))?;
        self.push(entry, due);
        Ok(())
    }

    /// Insert an entry that has already transitioned to `Scheduled`
    pub(crate) fn push(&self, entry: Arc<HostEntry>, due: Instant) {
        tracing::trace!(authority = %entry.authority(), "Entry scheduled");
        self.lock().push(entry, due);
        self.wakeup.notify_waiters();
    }

    /// Wait for the earliest-due entry to become eligible and remove it
    ///
    /// # Errors
    ///
    /// `Cancelled` once [`shutdown`](Self::shutdown) has been called.
    /// Dropping the returned future is also a cancellation; neither path
    /// removes anything from the queue.
    pub async fn take(&self) -> FrontierResult<Arc<HostEntry>> {
        match self.take_until(None).await? {
            Some(entry) => Ok(entry),
            None => Err(FrontierError::Cancelled),
        }
    }

    /// Like [`take`](Self::take), but gives up with `Ok(None)` after `timeout`
    pub async fn take_timeout(&self, timeout: Duration) -> FrontierResult<Option<Arc<HostEntry>>> {
        self.take_until(Some(Instant::now() + timeout)).await
    }

    async fn take_until(&self, deadline: Option<Instant>) -> FrontierResult<Option<Arc<HostEntry>>> {
        let mut shutdown = self.shutdown_tx.subscribe();

        loop {
            if *shutdown.borrow_and_update() {
                return Err(FrontierError::Cancelled);
            }

            // Register for wake-ups before inspecting the heap so an insert
            // racing with the inspection is not missed.
            let notified = self.wakeup.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let now = Instant::now();
            let head_due = match self.pop_ready(now) {
                Head::Ready(entry) => return Ok(Some(entry)),
                Head::Wait(due) => due,
            };

            if deadline.is_some_and(|d| now >= d) {
                return Ok(None);
            }

            let wake_at = match (head_due, deadline) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };

            tokio::select! {
                _ = &mut notified => {}
                _ = sleep_until(wake_at) => {}
                _ = shutdown.changed() => {}
            }
        }
    }

    fn pop_ready(&self, now: Instant) -> Head {
        let mut heap = self.lock();
        loop {
            let due = match heap.slots.peek() {
                None => return Head::Wait(None),
                Some(top) => top.due,
            };
            if due > now {
                return Head::Wait(Some(due));
            }

            let Some(slot) = heap.slots.pop() else {
                return Head::Wait(None);
            };

            match slot.entry.begin_fetch(now) {
                Ok(()) => return Head::Ready(slot.entry),
                Err(later) => {
                    tracing::trace!(authority = %slot.entry.authority(), "Entry re-keyed");
                    heap.push(slot.entry, later);
                }
            }
        }
    }

    /// Number of entries waiting
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().slots.is_empty()
    }

    /// Wake every waiter with `Cancelled`; subsequent takes fail immediately
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        self.wakeup.notify_waiters();
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
