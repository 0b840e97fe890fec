//! Notification payloads.

use crate::document::Document;
use crate::observer::DocumentObserver;
use crate::types::{ContentId, EventStates, StyleSheetRef, UpdateType};
use serde::{Deserialize, Serialize};

/// A single notifiable change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentEvent {
    // --- Update Scopes ---
    BeginUpdate {
        update_type: UpdateType,
    },
    EndUpdate {
        update_type: UpdateType,
    },

    // --- Load Lifecycle ---
    BeginLoad,
    EndLoad,

    // --- State Changes ---
    /// Only the flags in `changed` moved.
    ContentStateChanged {
        content: ContentId,
        changed: EventStates,
    },
    DocumentStatesChanged {
        changed: EventStates,
    },

    // --- Style Sheets ---
    StyleSheetAdded {
        sheet: StyleSheetRef,
    },
    StyleSheetRemoved {
        sheet: StyleSheetRef,
    },
    StyleSheetApplicableStateChanged {
        sheet: StyleSheetRef,
    },

    // --- Style Rules ---
    StyleRuleChanged {
        sheet: StyleSheetRef,
    },
    StyleRuleAdded {
        sheet: StyleSheetRef,
    },
    StyleRuleRemoved {
        sheet: StyleSheetRef,
    },

    // --- Content Binding Extension ---
    /// Delivered only to observers exposing the content-binding capability.
    BindToDocument {
        content: ContentId,
    },
}

/// Discriminant of a [`DocumentEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeginUpdate,
    EndUpdate,
    BeginLoad,
    EndLoad,
    ContentStateChanged,
    DocumentStatesChanged,
    StyleSheetAdded,
    StyleSheetRemoved,
    StyleSheetApplicableStateChanged,
    StyleRuleChanged,
    StyleRuleAdded,
    StyleRuleRemoved,
    BindToDocument,
    /// Script execution query. Not carried by [`DocumentEvent`].
    AttemptToExecuteScript,
}

/// Coarse grouping used by event filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Update,
    Load,
    State,
    Style,
    Binding,
}

impl EventKind {
    /// Event name as used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::BeginUpdate => "BeginUpdate",
            EventKind::EndUpdate => "EndUpdate",
            EventKind::BeginLoad => "BeginLoad",
            EventKind::EndLoad => "EndLoad",
            EventKind::ContentStateChanged => "ContentStateChanged",
            EventKind::DocumentStatesChanged => "DocumentStatesChanged",
            EventKind::StyleSheetAdded => "StyleSheetAdded",
            EventKind::StyleSheetRemoved => "StyleSheetRemoved",
            EventKind::StyleSheetApplicableStateChanged => "StyleSheetApplicableStateChanged",
            EventKind::StyleRuleChanged => "StyleRuleChanged",
            EventKind::StyleRuleAdded => "StyleRuleAdded",
            EventKind::StyleRuleRemoved => "StyleRuleRemoved",
            EventKind::BindToDocument => "BindToDocument",
            EventKind::AttemptToExecuteScript => "AttemptToExecuteScript",
        }
    }

    /// Category used by sink filters.
    pub fn category(self) -> EventCategory {
        match self {
            EventKind::BeginUpdate | EventKind::EndUpdate => EventCategory::Update,
            EventKind::BeginLoad | EventKind::EndLoad => EventCategory::Load,
            EventKind::ContentStateChanged | EventKind::DocumentStatesChanged => {
                EventCategory::State
            }
            EventKind::StyleSheetAdded
            | EventKind::StyleSheetRemoved
            | EventKind::StyleSheetApplicableStateChanged
            | EventKind::StyleRuleChanged
            | EventKind::StyleRuleAdded
            | EventKind::StyleRuleRemoved => EventCategory::Style,
            EventKind::BindToDocument | EventKind::AttemptToExecuteScript => {
                EventCategory::Binding
            }
        }
    }
}

impl DocumentEvent {
    /// Get the event kind.
    pub fn kind(&self) -> EventKind {
        match self {
            DocumentEvent::BeginUpdate { .. } => EventKind::BeginUpdate,
            DocumentEvent::EndUpdate { .. } => EventKind::EndUpdate,
            DocumentEvent::BeginLoad => EventKind::BeginLoad,
            DocumentEvent::EndLoad => EventKind::EndLoad,
            DocumentEvent::ContentStateChanged { .. } => EventKind::ContentStateChanged,
            DocumentEvent::DocumentStatesChanged { .. } => EventKind::DocumentStatesChanged,
            DocumentEvent::StyleSheetAdded { .. } => EventKind::StyleSheetAdded,
            DocumentEvent::StyleSheetRemoved { .. } => EventKind::StyleSheetRemoved,
            DocumentEvent::StyleSheetApplicableStateChanged { .. } => {
                EventKind::StyleSheetApplicableStateChanged
            }
            DocumentEvent::StyleRuleChanged { .. } => EventKind::StyleRuleChanged,
            DocumentEvent::StyleRuleAdded { .. } => EventKind::StyleRuleAdded,
            DocumentEvent::StyleRuleRemoved { .. } => EventKind::StyleRuleRemoved,
            DocumentEvent::BindToDocument { .. } => EventKind::BindToDocument,
        }
    }

    /// Get the event category.
    pub fn category(&self) -> EventCategory {
        self.kind().category()
    }

    /// The style sheet this event concerns, if any.
    pub fn style_sheet(&self) -> Option<StyleSheetRef> {
        match self {
            DocumentEvent::StyleSheetAdded { sheet }
            | DocumentEvent::StyleSheetRemoved { sheet }
            | DocumentEvent::StyleSheetApplicableStateChanged { sheet }
            | DocumentEvent::StyleRuleChanged { sheet }
            | DocumentEvent::StyleRuleAdded { sheet }
            | DocumentEvent::StyleRuleRemoved { sheet } => Some(*sheet),
            _ => None,
        }
    }

    /// Invoke the handler matching this event on `observer`.
    ///
    /// Returns false when the observer has no handler for the event, which
    /// only happens for extension events and observers lacking the extension.
    pub fn deliver(&self, document: &Document, observer: &dyn DocumentObserver) -> bool {
        match *self {
            DocumentEvent::BeginUpdate { update_type } => {
                observer.begin_update(document, update_type)
            }
            DocumentEvent::EndUpdate { update_type } => observer.end_update(document, update_type),
            DocumentEvent::BeginLoad => observer.begin_load(document),
            DocumentEvent::EndLoad => observer.end_load(document),
            DocumentEvent::ContentStateChanged { content, changed } => {
                observer.content_state_changed(document, content, changed)
            }
            DocumentEvent::DocumentStatesChanged { changed } => {
                observer.document_states_changed(document, changed)
            }
            DocumentEvent::StyleSheetAdded { sheet } => observer.style_sheet_added(document, sheet),
            DocumentEvent::StyleSheetRemoved { sheet } => {
                observer.style_sheet_removed(document, sheet)
            }
            DocumentEvent::StyleSheetApplicableStateChanged { sheet } => {
                observer.style_sheet_applicable_state_changed(document, sheet)
            }
            DocumentEvent::StyleRuleChanged { sheet } => {
                observer.style_rule_changed(document, sheet)
            }
            DocumentEvent::StyleRuleAdded { sheet } => observer.style_rule_added(document, sheet),
            DocumentEvent::StyleRuleRemoved { sheet } => {
                observer.style_rule_removed(document, sheet)
            }
            DocumentEvent::BindToDocument { content } => match observer.as_content_binding() {
                Some(binding) => binding.bind_to_document(document, content),
                None => return false,
            },
        }
        true
    }
}
