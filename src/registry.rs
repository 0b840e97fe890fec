//! Ordered registry of observers.
//!
//! The registry holds `Weak` references only; an observer's lifetime stays
//! with whoever owns its `Arc`. Each entry carries a shared "registered" flag
//! that outstanding snapshots consult, so a dispatch pass can tell whether an
//! observer was unregistered after the pass began.

use crate::observer::{DocumentObserver, ObserverKey};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Internal registry entry.
#[derive(Clone)]
pub(crate) struct Entry {
    key: ObserverKey,
    observer: Weak<dyn DocumentObserver>,
    registered: Arc<AtomicBool>,
}

impl Entry {
    fn is_alive(&self) -> bool {
        self.observer.strong_count() > 0
    }

    fn retire(&self) {
        self.registered.store(false, Ordering::Release);
    }
}

/// Manages the ordered set of observers for one document.
pub struct ObserverRegistry {
    /// Entries in registration order.
    entries: RwLock<Vec<Entry>>,
}

impl ObserverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Add an observer at the end of the dispatch order.
    ///
    /// No-op if the observer is already registered; its position is kept.
    pub fn register<O>(&self, observer: &Arc<O>) -> ObserverKey
    where
        O: DocumentObserver + 'static,
    {
        let key = ObserverKey::of_arc(observer);
        let weak: Weak<O> = Arc::downgrade(observer);
        self.insert(key, weak);
        key
    }

    /// Same as [`register`](Self::register) for an already type-erased observer.
    pub fn register_dyn(&self, observer: &Arc<dyn DocumentObserver>) -> ObserverKey {
        let key = ObserverKey::of_arc(observer);
        self.insert(key, Arc::downgrade(observer));
        key
    }

    fn insert(&self, key: ObserverKey, observer: Weak<dyn DocumentObserver>) {
        let mut entries = self.entries.write();
        // A dead entry may share the address of a new allocation.
        Self::prune(&mut entries);

        if entries.iter().any(|e| e.key == key) {
            return;
        }

        entries.push(Entry {
            key,
            observer,
            registered: Arc::new(AtomicBool::new(true)),
        });
    }

    /// Remove an observer. No-op if it is not registered.
    ///
    /// Safe to call from inside a handler, including for the observer whose
    /// handler is running.
    pub fn unregister(&self, key: ObserverKey) -> bool {
        let mut entries = self.entries.write();
        match entries.iter().position(|e| e.key == key) {
            Some(pos) => {
                let entry = entries.remove(pos);
                entry.retire();
                true
            }
            None => false,
        }
    }

    /// Immutable view of the current observers, in registration order.
    ///
    /// Entries whose observer has been dropped are pruned first.
    pub fn snapshot(&self) -> ObserverSnapshot {
        let mut entries = self.entries.write();
        Self::prune(&mut entries);
        ObserverSnapshot {
            entries: entries.clone(),
        }
    }

    fn prune(entries: &mut Vec<Entry>) {
        entries.retain(|e| {
            if e.is_alive() {
                true
            } else {
                e.retire();
                false
            }
        });
    }

    /// Whether a live observer with `key` is registered.
    pub fn contains(&self, key: ObserverKey) -> bool {
        self.entries
            .read()
            .iter()
            .any(|e| e.key == key && e.is_alive())
    }

    /// Keys of live observers in dispatch order.
    pub fn keys(&self) -> Vec<ObserverKey> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.is_alive())
            .map(|e| e.key)
            .collect()
    }

    /// Number of live observers.
    pub fn len(&self) -> usize {
        self.entries.read().iter().filter(|e| e.is_alive()).count()
    }

    /// Whether no live observer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// How a snapshot slot resolved at call time.
pub(crate) enum Resolved {
    Live(Arc<dyn DocumentObserver>),
    Unregistered,
    Dropped,
}

/// Frozen, ordered view of a registry taken at the start of a dispatch pass.
pub struct ObserverSnapshot {
    entries: Vec<Entry>,
}

impl ObserverSnapshot {
    /// Number of slots, including observers retired since the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no slots.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in dispatch order.
    pub fn keys(&self) -> Vec<ObserverKey> {
        self.entries.iter().map(|e| e.key).collect()
    }

    /// Resolve slot `index`. `honor_removal` decides whether an observer
    /// unregistered since the snapshot was taken is reported as such.
    pub(crate) fn resolve(
        &self,
        index: usize,
        honor_removal: bool,
    ) -> Option<(ObserverKey, Resolved)> {
        let entry = self.entries.get(index)?;
        if honor_removal && !entry.registered.load(Ordering::Acquire) {
            return Some((entry.key, Resolved::Unregistered));
        }
        let resolved = match entry.observer.upgrade() {
            Some(observer) => Resolved::Live(observer),
            None => Resolved::Dropped,
        };
        Some((entry.key, resolved))
    }
}
