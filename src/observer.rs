//! Observer capabilities.
//!
//! [`DocumentObserver`] is the single capability every listener implements.
//! All handlers default to doing nothing, so an observer overrides only the
//! notifications it cares about. Handlers get the originating [`Document`]
//! and may re-enter it: register or unregister observers, or raise further
//! events.
//!
//! [`ContentBindingObserver`] is an optional extension. An observer opts in by
//! returning itself from [`DocumentObserver::as_content_binding`].

use crate::document::Document;
use crate::types::{ContentId, EventStates, ParserId, StyleSheetRef, UpdateType};
use std::fmt;
use std::sync::Arc;

/// Receives change notifications from a document.
pub trait DocumentObserver: Send + Sync {
    /// An update scope was opened. Scopes nest.
    fn begin_update(&self, _document: &Document, _update_type: UpdateType) {}

    /// An update scope is closing. `document.update_state()` still reports
    /// the closing scope; `is_outermost()` is true for the last one.
    fn end_update(&self, _document: &Document, _update_type: UpdateType) {}

    fn begin_load(&self, _document: &Document) {}

    /// The load finished. Layout for the loaded content has already run.
    fn end_load(&self, _document: &Document) {}

    /// State flags of `content` changed. Only the flags set in `changed` moved.
    fn content_state_changed(
        &self,
        _document: &Document,
        _content: ContentId,
        _changed: EventStates,
    ) {
    }

    /// Document-level state flags changed. Only the flags set in `changed` moved.
    fn document_states_changed(&self, _document: &Document, _changed: EventStates) {}

    /// A sheet was added, whether or not it is applicable.
    fn style_sheet_added(&self, _document: &Document, _sheet: StyleSheetRef) {}

    /// A sheet was removed, whether or not it was applicable.
    fn style_sheet_removed(&self, _document: &Document, _sheet: StyleSheetRef) {}

    fn style_sheet_applicable_state_changed(&self, _document: &Document, _sheet: StyleSheetRef) {}

    fn style_rule_changed(&self, _document: &Document, _sheet: StyleSheetRef) {}

    fn style_rule_added(&self, _document: &Document, _sheet: StyleSheetRef) {}

    fn style_rule_removed(&self, _document: &Document, _sheet: StyleSheetRef) {}

    /// Capability query for the content-binding extension.
    fn as_content_binding(&self) -> Option<&dyn ContentBindingObserver> {
        None
    }
}

/// Verdict of a script execution query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScriptExecution {
    #[default]
    Proceed,
    Block,
}

impl ScriptExecution {
    /// Any blocking verdict wins.
    pub fn combine(self, other: ScriptExecution) -> ScriptExecution {
        match (self, other) {
            (ScriptExecution::Proceed, ScriptExecution::Proceed) => ScriptExecution::Proceed,
            _ => ScriptExecution::Block,
        }
    }

    /// Whether the script must not run.
    pub fn is_blocked(self) -> bool {
        self == ScriptExecution::Block
    }
}

/// Extension capability for observers embedding a script host.
pub trait ContentBindingObserver: Send + Sync {
    /// A content node was bound to the document tree.
    fn bind_to_document(&self, _document: &Document, _content: ContentId) {}

    /// The parser is about to run the script held by `content`.
    fn attempt_to_execute_script(
        &self,
        _document: &Document,
        _content: ContentId,
        _parser: ParserId,
    ) -> ScriptExecution {
        ScriptExecution::Proceed
    }
}

/// Identity of a registered observer.
///
/// Derived from the address of the observer value inside its `Arc`, so an
/// observer can compute its own key from `&self` inside a handler.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverKey(usize);

impl ObserverKey {
    /// Key of an observer from a reference to it.
    pub fn of<O: ?Sized>(observer: &O) -> Self {
        ObserverKey(observer as *const O as *const () as usize)
    }

    /// Key of an observer from the `Arc` that owns it.
    pub fn of_arc<O: ?Sized>(observer: &Arc<O>) -> Self {
        ObserverKey(Arc::as_ptr(observer) as *const () as usize)
    }
}

impl fmt::Debug for ObserverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObserverKey({:#x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quiet;

    impl DocumentObserver for Quiet {}

    #[test]
    fn test_key_matches_self_reference() {
        let observer = Arc::new(Quiet);
        let as_dyn: Arc<dyn DocumentObserver> = observer.clone();

        assert_eq!(ObserverKey::of_arc(&observer), ObserverKey::of(&*observer));
        assert_eq!(ObserverKey::of_arc(&observer), ObserverKey::of_arc(&as_dyn));
    }

    #[test]
    fn test_distinct_observers_have_distinct_keys() {
        let a = Arc::new(Quiet);
        let b = Arc::new(Quiet);
        // Zero-sized values in separate allocations still get distinct addresses.
        assert_ne!(ObserverKey::of_arc(&a), ObserverKey::of_arc(&b));
    }

    #[test]
    fn test_script_verdict_block_wins() {
        use ScriptExecution::*;
        assert_eq!(Proceed.combine(Proceed), Proceed);
        assert_eq!(Proceed.combine(Block), Block);
        assert_eq!(Block.combine(Proceed), Block);
        assert!(!ScriptExecution::default().is_blocked());
    }

    #[test]
    fn test_default_has_no_binding_capability() {
        assert!(Quiet.as_content_binding().is_none());
    }
}
