//! Process-wide unique identifiers.

use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generates identifiers of the form `<pid>.<sequence>`.
///
/// The sequence starts at 1 and only grows, so identifiers never repeat
/// within one process.
#[derive(Debug)]
pub struct UniqueIdGenerator {
    pid: u32,
    next: AtomicU64,
}

impl Default for UniqueIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl UniqueIdGenerator {
    /// Creates a generator tagged with the current process id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pid(process::id())
    }

    /// Creates a generator tagged with an explicit process id.
    #[must_use]
    pub const fn with_pid(pid: u32) -> Self {
        Self {
            pid,
            next: AtomicU64::new(1),
        }
    }

    /// Returns a fresh identifier.
    pub fn generate(&self) -> String {
        let sequence = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}.{sequence}", self.pid)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn identifiers_are_sequential() {
        let ids = UniqueIdGenerator::with_pid(42);
        assert_eq!(ids.generate(), "42.1");
        assert_eq!(ids.generate(), "42.2");
    }

    #[test]
    fn identifiers_are_unique_across_threads() {
        let ids = Arc::new(UniqueIdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..100).map(|_| ids.generate()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("generator thread") {
                assert!(seen.insert(id), "duplicate identifier");
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
