//! Error handling and edge case tests.

use document_observer::{
    Document, DocumentConfig, DocumentObserver, EventStates, NotifyError, ObserverKey,
    UpdateType, ViolationPolicy,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn clamping_document(max_dispatch_depth: usize) -> Document {
    Document::new(DocumentConfig {
        max_dispatch_depth,
        violation_policy: ViolationPolicy::ClampAndLog,
        ..Default::default()
    })
}

struct EndCounter {
    ends: Mutex<u32>,
}

impl DocumentObserver for EndCounter {
    fn end_update(&self, _document: &Document, _update_type: UpdateType) {
        *self.ends.lock() += 1;
    }
}

// --- Contract Violations ---

#[test]
fn test_lone_end_update_takes_violation_path() {
    init_tracing();
    let doc = clamping_document(64);
    let counter = Arc::new(EndCounter {
        ends: Mutex::new(0),
    });
    doc.add_observer(&counter);

    let result = doc.end_update(UpdateType::CONTENT_MODEL);

    assert!(matches!(result, Err(NotifyError::UnbalancedEndUpdate { .. })));
    assert_eq!(doc.update_depth(), 0);
    assert_eq!(*counter.ends.lock(), 0);
}

#[test]
fn test_document_usable_after_violation() {
    init_tracing();
    let doc = clamping_document(64);

    assert!(doc.end_update(UpdateType::STYLE).is_err());
    assert!(doc.end_update(UpdateType::STYLE).is_err());

    let opened = doc.begin_update(UpdateType::STYLE).unwrap();
    assert_eq!(opened.depth, 1);
    let closed = doc.end_update(UpdateType::STYLE).unwrap();
    assert_eq!(closed.depth, 0);
    assert!(closed.mask.is_empty());
}

#[test]
fn test_violation_error_message() {
    let doc = clamping_document(64);
    let err = doc.end_update(UpdateType::CONTENT_MODEL).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("no open update scope"));
    assert!(message.contains("CONTENT_MODEL"));
}

#[test]
#[should_panic]
fn test_violation_panics_with_panic_policy() {
    let doc = Document::new(DocumentConfig {
        violation_policy: ViolationPolicy::Panic,
        ..Default::default()
    });
    let _ = doc.end_update(UpdateType::CONTENT_MODEL);
}

#[test]
fn test_handler_closing_extra_scope_is_clamped() {
    // Closes one more scope than it opened from inside EndUpdate.
    struct Overcloser;

    impl DocumentObserver for Overcloser {
        fn end_update(&self, document: &Document, update_type: UpdateType) {
            if update_type == UpdateType::CONTENT_MODEL {
                let _ = document.end_update(UpdateType::STYLE);
            }
        }
    }

    init_tracing();
    let doc = clamping_document(64);
    let overcloser = Arc::new(Overcloser);
    doc.add_observer(&overcloser);

    doc.begin_update(UpdateType::CONTENT_MODEL).unwrap();
    let result = doc.end_update(UpdateType::CONTENT_MODEL);

    // The nested call consumed the only open scope.
    assert!(matches!(result, Err(NotifyError::UnbalancedEndUpdate { .. })));
    assert_eq!(doc.update_depth(), 0);
}

// --- Reentrancy Limits ---

/// Re-raises the same event from its own handler, forever.
struct Echo {
    calls: Mutex<u32>,
    refusals: Mutex<u32>,
}

impl Echo {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(0),
            refusals: Mutex::new(0),
        })
    }
}

impl DocumentObserver for Echo {
    fn document_states_changed(&self, document: &Document, changed: EventStates) {
        *self.calls.lock() += 1;
        if let Err(NotifyError::DispatchDepthExceeded { .. }) =
            document.document_states_changed(changed)
        {
            *self.refusals.lock() += 1;
        }
    }

    fn begin_update(&self, document: &Document, update_type: UpdateType) {
        *self.calls.lock() += 1;
        if document.begin_update(update_type).is_err() {
            *self.refusals.lock() += 1;
        }
    }
}

#[test]
fn test_self_triggering_cycle_terminates() {
    init_tracing();
    let doc = clamping_document(8);
    let echo = Echo::new();
    doc.add_observer(&echo);

    let outer = doc.document_states_changed(EventStates::LWTHEME);

    assert!(outer.is_ok());
    assert_eq!(*echo.calls.lock(), 8);
    assert_eq!(*echo.refusals.lock(), 1);
    assert_eq!(doc.dispatch_depth(), 0);
}

#[test]
fn test_refused_begin_update_leaves_depth_untouched() {
    init_tracing();
    let doc = clamping_document(4);
    let echo = Echo::new();
    doc.add_observer(&echo);

    doc.begin_update(UpdateType::CONTENT_MODEL).unwrap();

    // Four passes ran, the fifth was refused before opening a scope.
    assert_eq!(*echo.calls.lock(), 4);
    assert_eq!(*echo.refusals.lock(), 1);
    assert_eq!(doc.update_depth(), 4);

    doc.remove_observer(ObserverKey::of_arc(&echo));
    for expected in (0..4).rev() {
        assert_eq!(doc.end_update(UpdateType::CONTENT_MODEL).unwrap().depth, expected);
    }
}

#[test]
fn test_depth_exceeded_reports_limit() {
    let doc = clamping_document(0);

    let result = doc.begin_load();

    match result {
        Err(NotifyError::DispatchDepthExceeded { limit, event, .. }) => {
            assert_eq!(limit, 0);
            assert_eq!(event, "BeginLoad");
        }
        other => panic!("Expected DispatchDepthExceeded, got {:?}", other),
    }
    assert_eq!(doc.load_state(), document_observer::LoadState::Idle);
}

#[test]
fn test_limit_counts_nesting_per_thread() {
    // Raises EndLoad from a second thread while its own BeginLoad pass runs.
    struct CrossThread {
        inner: Mutex<Option<bool>>,
    }

    impl DocumentObserver for CrossThread {
        fn begin_load(&self, document: &Document) {
            let ok = std::thread::scope(|s| {
                s.spawn(|| document.end_load().is_ok())
                    .join()
                    .unwrap_or(false)
            });
            *self.inner.lock() = Some(ok);
        }
    }

    init_tracing();
    let doc = clamping_document(1);
    let observer = Arc::new(CrossThread {
        inner: Mutex::new(None),
    });
    doc.add_observer(&observer);

    doc.begin_load().unwrap();

    assert_eq!(*observer.inner.lock(), Some(true));
    assert_eq!(doc.load_state(), document_observer::LoadState::Loaded);
    assert_eq!(doc.dispatch_depth(), 0);
}

// --- Registry Edge Cases ---

#[test]
fn test_unregister_unknown_observer_is_noop() {
    let doc = Document::with_defaults();
    let stranger = Arc::new(EndCounter {
        ends: Mutex::new(0),
    });

    assert!(!doc.remove_observer(ObserverKey::of_arc(&stranger)));
    assert_eq!(doc.observer_count(), 0);
}

#[test]
fn test_dispatch_with_no_observers() {
    let doc = Document::with_defaults();

    let report = doc.document_states_changed(EventStates::RTL_LOCALE).unwrap();

    assert_eq!(report.visited(), 0);
}

#[test]
fn test_load_order_anomalies_still_dispatch() {
    init_tracing();
    let doc = Document::with_defaults();
    let counter = Arc::new(EndCounter {
        ends: Mutex::new(0),
    });
    doc.add_observer(&counter);

    // EndLoad without BeginLoad is logged, not refused.
    let report = doc.end_load().unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(doc.load_state(), document_observer::LoadState::Loaded);

    doc.begin_load().unwrap();
    let report = doc.begin_load().unwrap();
    assert_eq!(report.delivered, 1);
}
