//! # Document Observer
//!
//! Change notification for document trees: nested update scopes, ordered
//! multicast of change events, and observer registries that may be changed
//! while a dispatch is running.
//!
//! ## Core Concepts
//!
//! - **Documents**: Own one observer registry and one update scope tracker
//! - **Observers**: Implement [`DocumentObserver`], overriding only the handlers they need
//! - **Update scopes**: Nested begin/end brackets whose update types accumulate
//! - **Dispatch passes**: Deliver one event to a snapshot of the registry, in registration order
//! - **Sinks**: Buffered, filterable event streams for tooling
//!
//! ## Example
//!
//! ```ignore
//! use document_observer::{Document, DocumentObserver, UpdateType};
//!
//! struct LayoutScheduler;
//!
//! impl DocumentObserver for LayoutScheduler {
//!     fn end_update(&self, document: &Document, _update_type: UpdateType) {
//!         if document.update_state().is_outermost() {
//!             // flush deferred reflow
//!         }
//!     }
//! }
//!
//! let document = Document::with_defaults();
//! let scheduler = Arc::new(LayoutScheduler);
//! document.add_observer(&scheduler);
//!
//! document.begin_update(UpdateType::CONTENT_MODEL)?;
//! // mutate the tree
//! document.end_update(UpdateType::CONTENT_MODEL)?;
//! ```

pub mod dispatch;
pub mod document;
pub mod error;
pub mod events;
pub mod observer;
pub mod registry;
pub mod scope;
pub mod sink;
pub mod types;

// Re-exports
pub use dispatch::{DispatchReport, MidPassRemoval, MutationDispatcher, DEFAULT_MAX_DISPATCH_DEPTH};
pub use document::{Document, DocumentConfig, LoadState, ViolationPolicy};
pub use error::{NotifyError, Result};
pub use events::{DocumentEvent, EventCategory, EventKind};
pub use observer::{ContentBindingObserver, DocumentObserver, ObserverKey, ScriptExecution};
pub use registry::{ObserverRegistry, ObserverSnapshot};
pub use scope::{ScopeError, ScopeState, UpdateScopeTracker};
pub use sink::{EventFilter, EventSink, EventStream, RecordedEvent, SinkConfig};
pub use types::*;
