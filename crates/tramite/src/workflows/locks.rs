use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

/// Table of mutexes keyed by entity id.
///
/// Work for the same key runs one closure at a time while different keys proceed in
/// parallel. Entries are dropped once no caller holds or waits on them.
pub(crate) struct KeyedLocks<K> {
    entries: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn with<T>(&self, key: &K, work: impl FnOnce() -> T) -> T {
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.entry(key.clone()).or_default().clone()
        };

        let result = {
            let _guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
            work()
        };

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference lives in the map and one is ours; anything above that is a waiter.
        if Arc::strong_count(&entry) == 2 {
            entries.remove(key);
        }

        result
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
