//! Property tests for update scope nesting.

use document_observer::{
    Document, DocumentConfig, DocumentObserver, UpdateScopeTracker, UpdateType, ViolationPolicy,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Clone, Copy, Debug)]
enum Op {
    Begin(UpdateType),
    End(UpdateType),
}

fn update_type() -> impl Strategy<Value = UpdateType> {
    prop_oneof![
        Just(UpdateType::CONTENT_MODEL),
        Just(UpdateType::STYLE),
        Just(UpdateType::ALL),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![update_type().prop_map(Op::Begin), update_type().prop_map(Op::End)]
}

struct PassCounter {
    passes: Mutex<usize>,
}

impl DocumentObserver for PassCounter {
    fn begin_update(&self, _document: &Document, _update_type: UpdateType) {
        *self.passes.lock() += 1;
    }

    fn end_update(&self, _document: &Document, _update_type: UpdateType) {
        *self.passes.lock() += 1;
    }
}

proptest! {
    #[test]
    fn tracker_depth_matches_open_scopes(ops in prop::collection::vec(op(), 0..64)) {
        let mut tracker = UpdateScopeTracker::new();
        let mut open: Vec<UpdateType> = Vec::new();

        for op in ops {
            match op {
                Op::Begin(mask) => {
                    let state = tracker.begin(mask);
                    open.push(mask);
                    prop_assert_eq!(state.depth as usize, open.len());
                }
                Op::End(mask) => {
                    let result = tracker.end(mask);
                    if open.pop().is_some() {
                        prop_assert_eq!(result.unwrap().depth as usize, open.len());
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
            }

            let expected_mask = open
                .iter()
                .fold(UpdateType::NONE, |acc, m| acc | *m);
            prop_assert_eq!(tracker.depth() as usize, open.len());
            prop_assert_eq!(tracker.is_updating(), !open.is_empty());
            // Masks only accumulate while any scope is open.
            prop_assert!(tracker.mask().contains(expected_mask));
            if open.is_empty() {
                prop_assert!(tracker.mask().is_empty());
            }
        }
    }

    #[test]
    fn document_fires_once_per_accepted_call(ops in prop::collection::vec(op(), 0..48)) {
        let doc = Document::new(DocumentConfig {
            violation_policy: ViolationPolicy::ClampAndLog,
            ..Default::default()
        });
        let counter = Arc::new(PassCounter { passes: Mutex::new(0) });
        doc.add_observer(&counter);

        let mut depth = 0usize;
        let mut accepted = 0usize;

        for op in ops {
            match op {
                Op::Begin(mask) => {
                    prop_assert!(doc.begin_update(mask).is_ok());
                    depth += 1;
                    accepted += 1;
                }
                Op::End(mask) => {
                    let result = doc.end_update(mask);
                    if depth == 0 {
                        prop_assert!(result.is_err());
                    } else {
                        prop_assert!(result.is_ok());
                        depth -= 1;
                        accepted += 1;
                    }
                }
            }
            prop_assert_eq!(doc.update_depth() as usize, depth);
        }

        prop_assert_eq!(*counter.passes.lock(), accepted);
    }
}
