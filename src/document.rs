//! Document handle tying the registry, scope tracker and dispatcher together.

use crate::dispatch::{
    DispatchGuard, DispatchReport, MidPassRemoval, MutationDispatcher, DEFAULT_MAX_DISPATCH_DEPTH,
};
use crate::error::{NotifyError, Result};
use crate::events::{DocumentEvent, EventKind};
use crate::observer::{DocumentObserver, ObserverKey, ScriptExecution};
use crate::registry::ObserverRegistry;
use crate::scope::{ScopeError, ScopeState, UpdateScopeTracker};
use crate::types::{ContentId, DocumentId, EventStates, ParserId, StyleSheetRef, UpdateType};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter for generating document IDs.
static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// How an `EndUpdate` with no open scope is handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationPolicy {
    /// Log and panic.
    Panic,
    /// Log, keep the depth at 0, skip dispatch and return an error.
    ClampAndLog,
}

impl Default for ViolationPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            ViolationPolicy::Panic
        } else {
            ViolationPolicy::ClampAndLog
        }
    }
}

/// Document configuration.
#[derive(Clone, Debug)]
pub struct DocumentConfig {
    /// Max nested dispatch passes before new events are dropped.
    /// Default: 64
    pub max_dispatch_depth: usize,

    /// Treatment of observers unregistered during a pass.
    /// Default: skip them.
    pub mid_pass_removal: MidPassRemoval,

    /// Treatment of unbalanced `EndUpdate` calls.
    /// Default: panic in debug builds, clamp in release builds.
    pub violation_policy: ViolationPolicy,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_dispatch_depth: DEFAULT_MAX_DISPATCH_DEPTH,
            mid_pass_removal: MidPassRemoval::default(),
            violation_policy: ViolationPolicy::default(),
        }
    }
}

/// Where the document is in its load cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
}

/// A document and its notification state.
///
/// Owns exactly one observer registry and one update scope tracker; both die
/// with the document. All notification methods run synchronously on the
/// calling thread and may be re-entered from observer handlers. The
/// document may be shared across threads; the nested pass limit applies to
/// each thread separately.
pub struct Document {
    id: DocumentId,
    config: DocumentConfig,
    registry: ObserverRegistry,
    scopes: Mutex<UpdateScopeTracker>,
    load: Mutex<LoadState>,
    dispatcher: MutationDispatcher,
}

impl Document {
    /// Create a document with a fresh id and no observers.
    pub fn new(config: DocumentConfig) -> Self {
        let id = DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::SeqCst));
        let dispatcher =
            MutationDispatcher::new(id, config.max_dispatch_depth, config.mid_pass_removal);

        Self {
            id,
            config,
            registry: ObserverRegistry::new(),
            scopes: Mutex::new(UpdateScopeTracker::new()),
            load: Mutex::new(LoadState::Idle),
            dispatcher,
        }
    }

    /// Create a document with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(DocumentConfig::default())
    }

    /// Get the document id.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Get the configuration.
    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    // --- Observers ---

    /// Register an observer. The document only keeps a weak reference.
    pub fn add_observer<O>(&self, observer: &Arc<O>) -> ObserverKey
    where
        O: DocumentObserver + 'static,
    {
        self.registry.register(observer)
    }

    /// Register an already type-erased observer.
    pub fn add_observer_dyn(&self, observer: &Arc<dyn DocumentObserver>) -> ObserverKey {
        self.registry.register_dyn(observer)
    }

    /// Unregister an observer. Returns false if it was not registered.
    pub fn remove_observer(&self, key: ObserverKey) -> bool {
        self.registry.unregister(key)
    }

    /// Whether the observer is registered and still alive.
    pub fn has_observer(&self, key: ObserverKey) -> bool {
        self.registry.contains(key)
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.registry.len()
    }

    /// Get the observer registry.
    pub fn registry(&self) -> &ObserverRegistry {
        &self.registry
    }

    // --- Update Scopes ---

    /// Open an update scope and notify observers.
    ///
    /// Observers see the scope already open.
    pub fn begin_update(&self, update_type: UpdateType) -> Result<ScopeState> {
        self.open_scope(update_type).map(|(state, _)| state)
    }

    /// Notify observers that the innermost scope is closing, then close it.
    ///
    /// Returns the state after closing. With no open scope this is a contract
    /// violation handled per [`ViolationPolicy`]; observers are not notified.
    pub fn end_update(&self, update_type: UpdateType) -> Result<ScopeState> {
        self.close_scope(update_type).map(|(state, _)| state)
    }

    /// Current scope depth and accumulated mask.
    pub fn update_state(&self) -> ScopeState {
        self.scopes.lock().current()
    }

    /// Number of open update scopes.
    pub fn update_depth(&self) -> u32 {
        self.scopes.lock().depth()
    }

    /// Whether any update scope is open.
    pub fn is_updating(&self) -> bool {
        self.scopes.lock().is_updating()
    }

    fn open_scope(&self, update_type: UpdateType) -> Result<(ScopeState, DispatchReport)> {
        let guard = self.dispatcher.enter(EventKind::BeginUpdate)?;
        let state = self.scopes.lock().begin(update_type);
        let report = self.run(&guard, &DocumentEvent::BeginUpdate { update_type });
        Ok((state, report))
    }

    fn close_scope(&self, update_type: UpdateType) -> Result<(ScopeState, DispatchReport)> {
        let guard = self.dispatcher.enter(EventKind::EndUpdate)?;

        let checked = self.scopes.lock().check_end(update_type);
        if let Err(e) = checked {
            return Err(self.contract_violation(e));
        }

        let report = self.run(&guard, &DocumentEvent::EndUpdate { update_type });

        // A handler may have closed scopes of its own meanwhile.
        let closed = self.scopes.lock().end(update_type);
        match closed {
            Ok(state) => Ok((state, report)),
            Err(e) => Err(self.contract_violation(e)),
        }
    }

    fn contract_violation(&self, error: ScopeError) -> NotifyError {
        let ScopeError::Unbalanced(mask) = error;
        tracing::error!(
            document = %self.id,
            mask = ?mask,
            "EndUpdate without matching BeginUpdate"
        );
        match self.config.violation_policy {
            ViolationPolicy::Panic => {
                panic!("document {}: {}", self.id, error)
            }
            ViolationPolicy::ClampAndLog => NotifyError::UnbalancedEndUpdate {
                document: self.id,
                mask,
            },
        }
    }

    // --- Load Lifecycle ---

    /// Notify that loading started.
    pub fn begin_load(&self) -> Result<DispatchReport> {
        let guard = self.dispatcher.enter(EventKind::BeginLoad)?;
        {
            let mut load = self.load.lock();
            if *load == LoadState::Loading {
                tracing::warn!(document = %self.id, "BeginLoad while a load is in progress");
            }
            *load = LoadState::Loading;
        }
        Ok(self.run(&guard, &DocumentEvent::BeginLoad))
    }

    /// Notify that loading finished.
    ///
    /// The loader must call this only after layout of the loaded content has
    /// completed; the document does not check that.
    pub fn end_load(&self) -> Result<DispatchReport> {
        let guard = self.dispatcher.enter(EventKind::EndLoad)?;
        {
            let mut load = self.load.lock();
            let previous = *load;
            if previous != LoadState::Loading {
                tracing::warn!(document = %self.id, state = ?previous, "EndLoad without BeginLoad");
            }
            *load = LoadState::Loaded;
        }
        Ok(self.run(&guard, &DocumentEvent::EndLoad))
    }

    /// Where the document is in its load cycle.
    pub fn load_state(&self) -> LoadState {
        *self.load.lock()
    }

    // --- State Changes ---

    /// Notify that state bits of one element changed.
    pub fn content_state_changed(
        &self,
        content: ContentId,
        changed: EventStates,
    ) -> Result<DispatchReport> {
        self.notify(&DocumentEvent::ContentStateChanged { content, changed })
    }

    /// Notify that document-level state bits changed.
    pub fn document_states_changed(&self, changed: EventStates) -> Result<DispatchReport> {
        self.notify(&DocumentEvent::DocumentStatesChanged { changed })
    }

    // --- Style Sheets ---

    /// Notify that a style sheet was added.
    pub fn style_sheet_added(&self, sheet: StyleSheetRef) -> Result<DispatchReport> {
        self.notify(&DocumentEvent::StyleSheetAdded { sheet })
    }

    /// Notify that a style sheet was removed.
    pub fn style_sheet_removed(&self, sheet: StyleSheetRef) -> Result<DispatchReport> {
        self.notify(&DocumentEvent::StyleSheetRemoved { sheet })
    }

    /// Notify that a style sheet was enabled or disabled.
    pub fn style_sheet_applicable_state_changed(
        &self,
        sheet: StyleSheetRef,
    ) -> Result<DispatchReport> {
        self.notify(&DocumentEvent::StyleSheetApplicableStateChanged { sheet })
    }

    /// Notify that a rule in `sheet` changed.
    pub fn style_rule_changed(&self, sheet: StyleSheetRef) -> Result<DispatchReport> {
        self.notify(&DocumentEvent::StyleRuleChanged { sheet })
    }

    /// Notify that a rule was added to `sheet`.
    pub fn style_rule_added(&self, sheet: StyleSheetRef) -> Result<DispatchReport> {
        self.notify(&DocumentEvent::StyleRuleAdded { sheet })
    }

    /// Notify that a rule was removed from `sheet`.
    pub fn style_rule_removed(&self, sheet: StyleSheetRef) -> Result<DispatchReport> {
        self.notify(&DocumentEvent::StyleRuleRemoved { sheet })
    }

    // --- Content Binding Extension ---

    /// Notify extension-capable observers that `content` was bound.
    pub fn bind_to_document(&self, content: ContentId) -> Result<DispatchReport> {
        self.notify(&DocumentEvent::BindToDocument { content })
    }

    /// Ask extension-capable observers whether a script may run.
    ///
    /// Every such observer in the snapshot is asked; any `Block` wins.
    pub fn attempt_to_execute_script(
        &self,
        content: ContentId,
        parser: ParserId,
    ) -> Result<ScriptExecution> {
        let guard = self.dispatcher.enter(EventKind::AttemptToExecuteScript)?;
        let mut verdict = ScriptExecution::Proceed;

        self.dispatcher.pass(
            &guard,
            &self.registry,
            EventKind::AttemptToExecuteScript,
            |observer| match observer.as_content_binding() {
                Some(binding) => {
                    let answer = binding.attempt_to_execute_script(self, content, parser);
                    verdict = verdict.combine(answer);
                    true
                }
                None => false,
            },
        );

        if verdict.is_blocked() {
            tracing::debug!(document = %self.id, content = ?content, "script execution blocked");
        }
        Ok(verdict)
    }

    // --- Generic Dispatch ---

    /// Dispatch any event.
    ///
    /// Scope events go through the update scope tracker exactly like
    /// [`begin_update`](Self::begin_update) and [`end_update`](Self::end_update);
    /// load events update the load state.
    pub fn notify(&self, event: &DocumentEvent) -> Result<DispatchReport> {
        match *event {
            DocumentEvent::BeginUpdate { update_type } => {
                self.open_scope(update_type).map(|(_, report)| report)
            }
            DocumentEvent::EndUpdate { update_type } => {
                self.close_scope(update_type).map(|(_, report)| report)
            }
            DocumentEvent::BeginLoad => self.begin_load(),
            DocumentEvent::EndLoad => self.end_load(),
            _ => {
                let guard = self.dispatcher.enter(event.kind())?;
                Ok(self.run(&guard, event))
            }
        }
    }

    /// Number of dispatch passes nested on the calling thread.
    pub fn dispatch_depth(&self) -> usize {
        self.dispatcher.in_flight()
    }

    fn run(&self, guard: &DispatchGuard<'_>, event: &DocumentEvent) -> DispatchReport {
        self.dispatcher
            .pass(guard, &self.registry, event.kind(), |observer| {
                event.deliver(self, observer)
            })
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("update", &self.update_state())
            .field("load", &self.load_state())
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::with_defaults()
    }
}
