//! Authority registry
//!
//! Maps each authority to its single [`HostEntry`]. Every operation takes
//! the one registry lock for its whole read-modify-write; per-entry traffic
//! never touches this lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::authority::Authority;
use super::entry::{HostEntry, DEFAULT_PATH_QUERY_LIMIT};

/// Concurrent authority → entry map with exactly-once creation
#[derive(Debug)]
pub struct AuthorityRegistry {
    entries: Mutex<HashMap<String, Arc<HostEntry>>>,
    path_query_limit: usize,
}

impl Default for AuthorityRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_QUERY_LIMIT)
    }
}

impl AuthorityRegistry {
    /// Create a registry whose entries hold at most `path_query_limit` items
    pub fn new(path_query_limit: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            path_query_limit,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<HostEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path_query_limit(&self) -> usize {
        self.path_query_limit
    }

    /// Return the entry for `authority`, creating it if absent
    ///
    /// Look-up and insertion happen under one lock, so concurrent callers
    /// always observe the same instance.
    pub fn get_or_create(&self, authority: &Authority) -> Arc<HostEntry> {
        let mut entries = self.lock();
        if let Some(entry) = entries.get(authority.as_str()) {
            return Arc::clone(entry);
        }

        let entry = Arc::new(HostEntry::new(authority.clone(), self.path_query_limit));
        entries.insert(authority.as_str().to_string(), Arc::clone(&entry));
        tracing::debug!(authority = %authority, "Host entry created");
        entry
    }

    /// Look up an entry without creating one
    pub fn get(&self, authority: &str) -> Option<Arc<HostEntry>> {
        self.lock().get(authority).cloned()
    }

    pub fn contains(&self, authority: &str) -> bool {
        self.lock().contains_key(authority)
    }

    /// Number of distinct authorities tracked
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Remove the mapping only if it still points at `entry`
    ///
    /// Returns `false` when the authority is unknown or mapped to a newer
    /// instance than the one the caller holds.
    pub fn retire(&self, entry: &Arc<HostEntry>) -> bool {
        let mut entries = self.lock();
        let key = entry.authority().as_str();
        match entries.get(key) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Clone out every tracked entry
    pub fn entries(&self) -> Vec<Arc<HostEntry>> {
        self.lock().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn authority(s: &str) -> Authority {
        Authority::parse(s).unwrap()
    }

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let registry = AuthorityRegistry::default();
        let a1 = registry.get_or_create(&authority("http://a.com"));
        let a2 = registry.get_or_create(&authority("http://a.com/"));
        assert!(Arc::ptr_eq(&a1, &a2));
        assert_eq!(registry.count(), 1);
        assert!(registry.contains("http://a.com"));
        assert!(!registry.contains("http://b.com"));
    }

    #[test]
    fn test_entries_inherit_limit() {
        let registry = AuthorityRegistry::new(5);
        let entry = registry.get_or_create(&authority("http://a.com"));
        assert_eq!(entry.capacity(), 5);
    }

    #[test]
    fn test_retire_identity_checked() {
        let registry = AuthorityRegistry::default();
        let stale = registry.get_or_create(&authority("http://a.com"));
        assert!(registry.retire(&stale));
        assert!(!registry.contains("http://a.com"));

        let fresh = registry.get_or_create(&authority("http://a.com"));
        assert!(!Arc::ptr_eq(&stale, &fresh));

        // The stale handle must not evict the newer entry
        assert!(!registry.retire(&stale));
        assert!(registry.contains("http://a.com"));
        assert!(registry.retire(&fresh));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_retire_unknown() {
        let registry = AuthorityRegistry::default();
        let orphan = Arc::new(HostEntry::new(authority("http://x.com"), 10));
        assert!(!registry.retire(&orphan));
    }

    #[test]
    fn test_concurrent_first_access() {
        const THREADS: usize = 8;
        const HOSTS: usize = 50;

        let registry = Arc::new(AuthorityRegistry::default());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..HOSTS)
                        .map(|i| {
                            let entry = registry
                                .get_or_create(&authority(&format!("http://host{i}.com")));
                            Arc::as_ptr(&entry) as usize
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.count(), HOSTS);
        for host in 0..HOSTS {
            let ptrs: HashSet<usize> = results.iter().map(|r| r[host]).collect();
            assert_eq!(ptrs.len(), 1, "host{host} resolved to several instances");
        }
    }
}
