//! Refcounted media-session sharing across `ClientSession`s (§3: "Backend
//! sessions are shared: multiple ClientSessions may hold references to the
//! same `MediaAdapter` session keyed by (source-addr, destination-addr);
//! lifetime = longest holder.")
//!
//! Single-threaded and lock-free by construction: a plain owned `HashMap`,
//! not the teacher's `Arc<RwLock<HashMap<_, _>>>` — this gateway never
//! shares the table across threads.

use std::collections::HashMap;

use crate::adapter::SessionHandle;

#[derive(Debug, Default)]
pub struct MediaSessionRegistry {
    sessions: HashMap<(String, String), (SessionHandle, usize)>,
}

impl MediaSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared handle for (source, destination), creating it via
    /// `make` on first acquisition and bumping the refcount on every call.
    pub fn acquire(
        &mut self,
        source: &str,
        destination: &str,
        make: impl FnOnce() -> SessionHandle,
    ) -> SessionHandle {
        let key = (source.to_owned(), destination.to_owned());
        match self.sessions.get_mut(&key) {
            Some((handle, count)) => {
                *count += 1;
                *handle
            }
            None => {
                let handle = make();
                self.sessions.insert(key, (handle, 1));
                handle
            }
        }
    }

    /// Drops one reference; returns the handle if this was the last one, so
    /// the caller can release it on the real backend.
    pub fn release(&mut self, source: &str, destination: &str) -> Option<SessionHandle> {
        let key = (source.to_owned(), destination.to_owned());
        let remove = match self.sessions.get_mut(&key) {
            Some((_, count)) => {
                *count -= 1;
                *count == 0
            }
            None => return None,
        };
        if remove {
            self.sessions.remove(&key).map(|(handle, _)| handle)
        } else {
            None
        }
    }

    pub fn refcount(&self, source: &str, destination: &str) -> usize {
        self.sessions
            .get(&(source.to_owned(), destination.to_owned()))
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_a_handle_across_acquisitions() {
        let mut reg = MediaSessionRegistry::new();
        let mut next = 1u64;
        let mut make = || {
            let h = SessionHandle(next);
            next += 1;
            h
        };
        let a = reg.acquire("AA", "BB", &mut make);
        let b = reg.acquire("AA", "BB", &mut make);
        assert_eq!(a, b);
        assert_eq!(reg.refcount("AA", "BB"), 2);
    }

    #[test]
    fn releases_only_when_last_holder_leaves() {
        let mut reg = MediaSessionRegistry::new();
        let mut next = 1u64;
        let mut make = || {
            let h = SessionHandle(next);
            next += 1;
            h
        };
        reg.acquire("AA", "BB", &mut make);
        reg.acquire("AA", "BB", &mut make);
        assert!(reg.release("AA", "BB").is_none());
        assert!(reg.release("AA", "BB").is_some());
        assert_eq!(reg.refcount("AA", "BB"), 0);
    }

    #[test]
    fn distinct_address_pairs_get_distinct_sessions() {
        let mut reg = MediaSessionRegistry::new();
        let mut next = 1u64;
        let mut make = || {
            let h = SessionHandle(next);
            next += 1;
            h
        };
        let a = reg.acquire("AA", "BB", &mut make);
        let c = reg.acquire("AA", "CC", &mut make);
        assert_ne!(a, c);
    }
}
