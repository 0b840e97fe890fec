//! Dispatch passes.
//!
//! A pass snapshots the registry before the first handler runs, then walks
//! the snapshot in order. Observers registered during the pass are not in the
//! snapshot. Handlers may raise new events on the same document; every nested
//! pass takes its own snapshot and leaves the outer one untouched.
//!
//! Nested passes are counted per thread. When a new pass would exceed the
//! configured limit it is refused before anything happens, so a handler that
//! keeps re-raising its own event terminates deterministically. Passes running
//! side by side on different threads do not count as nesting.

use crate::error::{NotifyError, Result};
use crate::events::EventKind;
use crate::observer::DocumentObserver;
use crate::registry::{ObserverRegistry, Resolved};
use crate::types::DocumentId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::thread::{self, ThreadId};

/// Default limit on nested dispatch passes per document.
pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 64;

/// What happens to an observer unregistered after a pass took its snapshot
/// but before its turn came.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MidPassRemoval {
    /// Skip it for the rest of the pass.
    #[default]
    Skip,
    /// Deliver anyway; the snapshot is authoritative for the whole pass.
    Deliver,
}

/// Outcome of one dispatch pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers invoked.
    pub delivered: usize,
    /// Observers unregistered mid-pass and skipped.
    pub skipped_unregistered: usize,
    /// Observers dropped by their owner before their turn.
    pub skipped_dropped: usize,
    /// Observers without a handler for the event (extension events only).
    pub unsupported: usize,
}

impl DispatchReport {
    /// Number of snapshot slots the pass visited.
    pub fn visited(&self) -> usize {
        self.delivered + self.skipped_unregistered + self.skipped_dropped + self.unsupported
    }
}

/// Nested pass counts, per thread running a pass.
type Depths = Mutex<HashMap<ThreadId, usize>>;

/// Proof that a pass slot was reserved. Releases it on drop.
pub struct DispatchGuard<'a> {
    depths: &'a Depths,
    thread: ThreadId,
    depth: usize,
}

impl DispatchGuard<'_> {
    /// Nesting depth of this pass on its thread, starting at 1.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut depths = self.depths.lock();
        if let Some(count) = depths.get_mut(&self.thread) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                depths.remove(&self.thread);
            }
        }
    }
}

/// Delivers events to a document's observers.
///
/// Nesting is counted per thread: only passes raised from inside a handler
/// on the same thread count toward the limit.
pub struct MutationDispatcher {
    document: DocumentId,
    depths: Depths,
    max_depth: usize,
    removal: MidPassRemoval,
}

impl MutationDispatcher {
    /// Create a dispatcher for `document`.
    pub fn new(document: DocumentId, max_depth: usize, removal: MidPassRemoval) -> Self {
        Self {
            document,
            depths: Mutex::new(HashMap::new()),
            max_depth,
            removal,
        }
    }

    /// Reserve a pass slot for `event` on the calling thread.
    ///
    /// Fails when the nested pass limit is reached; the caller must then drop
    /// the event without touching any other state.
    pub fn enter(&self, event: EventKind) -> Result<DispatchGuard<'_>> {
        let thread = thread::current().id();
        let depth = {
            let mut depths = self.depths.lock();
            let current = depths.get(&thread).copied().unwrap_or(0);
            if current >= self.max_depth {
                None
            } else {
                depths.insert(thread, current + 1);
                Some(current + 1)
            }
        };

        let Some(depth) = depth else {
            tracing::error!(
                document = %self.document,
                event = event.name(),
                limit = self.max_depth,
                "dispatch depth limit exceeded, dropping event"
            );
            return Err(NotifyError::DispatchDepthExceeded {
                document: self.document,
                event: event.name(),
                limit: self.max_depth,
            });
        };

        Ok(DispatchGuard {
            depths: &self.depths,
            thread,
            depth,
        })
    }

    /// Run one pass over a fresh snapshot of `registry`.
    ///
    /// `call` invokes the handler and returns false if the observer has no
    /// handler for the event.
    pub fn pass<F>(
        &self,
        guard: &DispatchGuard<'_>,
        registry: &ObserverRegistry,
        event: EventKind,
        mut call: F,
    ) -> DispatchReport
    where
        F: FnMut(&dyn DocumentObserver) -> bool,
    {
        let snapshot = registry.snapshot();
        let honor_removal = self.removal == MidPassRemoval::Skip;
        let mut report = DispatchReport::default();

        let _span = tracing::debug_span!(
            "dispatch",
            document = %self.document,
            event = event.name(),
            depth = guard.depth(),
            observers = snapshot.len()
        )
        .entered();

        for index in 0..snapshot.len() {
            let Some((key, resolved)) = snapshot.resolve(index, honor_removal) else {
                break;
            };
            match resolved {
                Resolved::Live(observer) => {
                    tracing::trace!(observer = ?key, "invoking handler");
                    if call(observer.as_ref()) {
                        report.delivered += 1;
                    } else {
                        report.unsupported += 1;
                    }
                }
                Resolved::Unregistered => {
                    tracing::trace!(observer = ?key, "skipping observer unregistered mid-pass");
                    report.skipped_unregistered += 1;
                }
                Resolved::Dropped => {
                    report.skipped_dropped += 1;
                }
            }
        }

        tracing::debug!(
            delivered = report.delivered,
            skipped = report.skipped_unregistered + report.skipped_dropped,
            "dispatch finished"
        );
        report
    }

    /// Number of passes nested on the calling thread.
    pub fn in_flight(&self) -> usize {
        let thread = thread::current().id();
        self.depths.lock().get(&thread).copied().unwrap_or(0)
    }

    /// Configured limit on nested passes.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// How observers unregistered mid-pass are treated.
    pub fn removal_policy(&self) -> MidPassRemoval {
        self.removal
    }
}
