//! Session-scoped object storage for command collaborators.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Value type held by the store.
pub type StoredObject = Arc<dyn Any + Send + Sync>;

/// Synchronised key to opaque value map.
///
/// Entries live until removed; the store never expires anything.
#[derive(Default)]
pub struct ObjectStore {
    entries: Mutex<HashMap<String, StoredObject>>,
}

impl ObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, StoredObject>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn store<T>(&self, key: impl Into<String>, value: T) -> Option<StoredObject>
    where
        T: Any + Send + Sync,
    {
        self.entries().insert(key.into(), Arc::new(value))
    }

    /// Returns the value under `key` when it exists and has type `T`.
    #[must_use]
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self.entries().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Removes the value under `key`.
    pub fn remove(&self, key: &str) -> Option<StoredObject> {
        self.entries().remove(key)
    }

    /// Returns `true` when a value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self.entries().keys().cloned().collect();
        keys.sort();
        f.debug_struct("ObjectStore").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Credential {
        path: String,
    }

    #[test]
    fn stores_and_reads_typed_values() {
        let store = ObjectStore::new();
        store.store(
            "credential",
            Credential {
                path: "/tmp/x509up_u100".to_owned(),
            },
        );

        let credential = store
            .get::<Credential>("credential")
            .expect("credential stored");
        assert_eq!(credential.path, "/tmp/x509up_u100");
    }

    #[test]
    fn wrong_type_reads_as_absent() {
        let store = ObjectStore::new();
        store.store("count", 3_u32);
        assert!(store.get::<String>("count").is_none());
        assert!(store.contains("count"));
    }

    #[test]
    fn replacing_returns_previous_value() {
        let store = ObjectStore::new();
        assert!(store.store("key", 1_u8).is_none());
        let previous = store.store("key", 2_u8).expect("previous value");
        assert_eq!(previous.downcast_ref::<u8>(), Some(&1));
    }

    #[test]
    fn removal_forgets_the_key() {
        let store = ObjectStore::new();
        store.store("key", "value".to_owned());
        assert!(store.remove("key").is_some());
        assert!(store.remove("key").is_none());
        assert!(store.get::<String>("key").is_none());
    }
}
