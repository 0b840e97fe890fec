//! Sink configuration and stream types.

use crate::error::Result;
use crate::events::{DocumentEvent, EventCategory};
use crate::types::DocumentId;
use serde::{Deserialize, Serialize};

/// Configuration for an event sink.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    /// Max buffered events before new ones are discarded. At least 1.
    /// Default: 1000
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: EventFilter,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            filter: EventFilter::all(),
        }
    }
}

/// Which event categories a sink records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub include_updates: bool,
    pub include_loads: bool,
    pub include_states: bool,
    pub include_styles: bool,
    /// Content-binding extension events.
    pub include_bindings: bool,
}

impl EventFilter {
    /// Record everything.
    pub fn all() -> Self {
        Self {
            include_updates: true,
            include_loads: true,
            include_states: true,
            include_styles: true,
            include_bindings: true,
        }
    }

    /// Update scope boundaries only.
    pub fn updates() -> Self {
        Self {
            include_updates: true,
            ..Default::default()
        }
    }

    /// Load start and end only.
    pub fn loads() -> Self {
        Self {
            include_loads: true,
            ..Default::default()
        }
    }

    /// Content and document state changes.
    pub fn states() -> Self {
        Self {
            include_states: true,
            ..Default::default()
        }
    }

    /// Style sheet and style rule lifecycle.
    pub fn styles() -> Self {
        Self {
            include_styles: true,
            ..Default::default()
        }
    }

    /// Whether events of `category` pass the filter.
    pub fn matches(&self, category: EventCategory) -> bool {
        match category {
            EventCategory::Update => self.include_updates,
            EventCategory::Load => self.include_loads,
            EventCategory::State => self.include_states,
            EventCategory::Style => self.include_styles,
            EventCategory::Binding => self.include_bindings,
        }
    }
}

/// An event as captured by a sink.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub document: DocumentId,
    /// Sink-local position, starting at 0. Gaps mean discarded events.
    pub position: u64,
    pub event: DocumentEvent,
}

/// Receiving end of an event sink.
pub struct EventStream {
    pub(crate) receiver: crossbeam_channel::Receiver<RecordedEvent>,
}

impl EventStream {
    /// Receive the next event (blocking).
    ///
    /// Fails once the sink is gone and the buffer is empty.
    pub fn recv(&self) -> std::result::Result<RecordedEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(
        &self,
    ) -> std::result::Result<RecordedEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> std::result::Result<RecordedEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Take every buffered event.
    pub fn drain(&self) -> Vec<RecordedEvent> {
        self.receiver.try_iter().collect()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Drain the buffer as newline-delimited JSON.
    pub fn to_json_lines(&self) -> Result<String> {
        let mut out = String::new();
        for recorded in self.drain() {
            out.push_str(&serde_json::to_string(&recorded)?);
            out.push('\n');
        }
        Ok(out)
    }
}
