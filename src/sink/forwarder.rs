//! Observer that forwards events into a bounded buffer.

use crate::document::Document;
use crate::events::DocumentEvent;
use crate::observer::{ContentBindingObserver, DocumentObserver, ObserverKey};
use crate::types::{ContentId, EventStates, StyleSheetRef, UpdateType};
use crossbeam_channel::{bounded, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{EventFilter, EventStream, RecordedEvent, SinkConfig};

/// Records matching document events for later inspection.
pub struct EventSink {
    filter: EventFilter,
    sender: Sender<RecordedEvent>,
    /// Next position to assign, including discarded events.
    next_position: AtomicU64,
    dropped: AtomicU64,
    /// Set while the buffer is full, so overflow is logged once per episode.
    overflowing: AtomicBool,
}

impl EventSink {
    /// Create a sink and its stream. The sink still has to be registered.
    ///
    /// A `buffer_size` of 0 is raised to 1; a zero-capacity channel would
    /// discard every event.
    pub fn new(config: SinkConfig) -> (Arc<Self>, EventStream) {
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        let sink = Arc::new(Self {
            filter: config.filter,
            sender,
            next_position: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            overflowing: AtomicBool::new(false),
        });

        (sink, EventStream { receiver })
    }

    /// Create a sink and register it with `document`.
    ///
    /// The document holds the sink weakly; keep the returned `Arc` alive for
    /// as long as events should be recorded.
    pub fn attach(document: &Document, config: SinkConfig) -> (Arc<Self>, EventStream) {
        let (sink, stream) = Self::new(config);
        document.add_observer(&sink);
        (sink, stream)
    }

    /// Stop recording events from `document`.
    pub fn detach(&self, document: &Document) -> bool {
        document.remove_observer(ObserverKey::of(self))
    }

    /// Events discarded because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Filter this sink was created with.
    pub fn filter(&self) -> EventFilter {
        self.filter
    }

    fn record(&self, document: &Document, event: DocumentEvent) {
        if !self.filter.matches(event.category()) {
            return;
        }

        let position = self.next_position.fetch_add(1, Ordering::Relaxed);
        let recorded = RecordedEvent {
            document: document.id(),
            position,
            event,
        };

        match self.sender.try_send(recorded) {
            Ok(()) => {
                self.overflowing.store(false, Ordering::Relaxed);
            }
            Err(TrySendError::Full(recorded)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                if !self.overflowing.swap(true, Ordering::Relaxed) {
                    tracing::warn!(
                        document = %recorded.document,
                        position = recorded.position,
                        "event sink buffer full, discarding events"
                    );
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                // Nobody is listening any more.
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl DocumentObserver for EventSink {
    fn begin_update(&self, document: &Document, update_type: UpdateType) {
        self.record(document, DocumentEvent::BeginUpdate { update_type });
    }

    fn end_update(&self, document: &Document, update_type: UpdateType) {
        self.record(document, DocumentEvent::EndUpdate { update_type });
    }

    fn begin_load(&self, document: &Document) {
        self.record(document, DocumentEvent::BeginLoad);
    }

    fn end_load(&self, document: &Document) {
        self.record(document, DocumentEvent::EndLoad);
    }

    fn content_state_changed(&self, document: &Document, content: ContentId, changed: EventStates) {
        self.record(document, DocumentEvent::ContentStateChanged { content, changed });
    }

    fn document_states_changed(&self, document: &Document, changed: EventStates) {
        self.record(document, DocumentEvent::DocumentStatesChanged { changed });
    }

    fn style_sheet_added(&self, document: &Document, sheet: StyleSheetRef) {
        self.record(document, DocumentEvent::StyleSheetAdded { sheet });
    }

    fn style_sheet_removed(&self, document: &Document, sheet: StyleSheetRef) {
        self.record(document, DocumentEvent::StyleSheetRemoved { sheet });
    }

    fn style_sheet_applicable_state_changed(&self, document: &Document, sheet: StyleSheetRef) {
        self.record(document, DocumentEvent::StyleSheetApplicableStateChanged { sheet });
    }

    fn style_rule_changed(&self, document: &Document, sheet: StyleSheetRef) {
        self.record(document, DocumentEvent::StyleRuleChanged { sheet });
    }

    fn style_rule_added(&self, document: &Document, sheet: StyleSheetRef) {
        self.record(document, DocumentEvent::StyleRuleAdded { sheet });
    }

    fn style_rule_removed(&self, document: &Document, sheet: StyleSheetRef) {
        self.record(document, DocumentEvent::StyleRuleRemoved { sheet });
    }

    fn as_content_binding(&self) -> Option<&dyn ContentBindingObserver> {
        if self.filter.include_bindings {
            Some(self)
        } else {
            None
        }
    }
}

impl ContentBindingObserver for EventSink {
    fn bind_to_document(&self, document: &Document, content: ContentId) {
        self.record(document, DocumentEvent::BindToDocument { content });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::types::StyleSheetId;
    use std::time::Duration;

    #[test]
    fn test_attach_records_events() {
        let document = Document::with_defaults();
        let (_sink, stream) = EventSink::attach(&document, SinkConfig::default());

        document.begin_load().unwrap();

        let recorded = stream.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(recorded.event, DocumentEvent::BeginLoad);
        assert_eq!(recorded.document, document.id());
        assert_eq!(recorded.position, 0);
    }

    #[test]
    fn test_filter_excludes_non_matching() {
        let document = Document::with_defaults();
        let (_sink, stream) = EventSink::attach(
            &document,
            SinkConfig {
                filter: EventFilter::styles(),
                ..Default::default()
            },
        );

        document.begin_load().unwrap();
        document
            .style_rule_added(StyleSheetRef::document(StyleSheetId(4)))
            .unwrap();

        let events = stream.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.kind(), EventKind::StyleRuleAdded);
    }

    #[test]
    fn test_overflow_counts_dropped_events() {
        let document = Document::with_defaults();
        let (sink, stream) = EventSink::attach(
            &document,
            SinkConfig {
                buffer_size: 2,
                ..Default::default()
            },
        );

        for _ in 0..5 {
            document
                .document_states_changed(EventStates::WINDOW_INACTIVE)
                .unwrap();
        }

        assert_eq!(sink.dropped_count(), 3);
        // The sink stays registered; delivery never fails.
        assert_eq!(document.observer_count(), 1);

        let positions: Vec<u64> = stream.drain().iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn test_zero_buffer_size_keeps_one_event() {
        let document = Document::with_defaults();
        let (sink, stream) = EventSink::attach(
            &document,
            SinkConfig {
                buffer_size: 0,
                ..Default::default()
            },
        );

        document.begin_load().unwrap();
        document.end_load().unwrap();

        assert_eq!(sink.dropped_count(), 1);
        let events = stream.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, DocumentEvent::BeginLoad);
    }

    #[test]
    fn test_binding_events_need_binding_filter() {
        let document = Document::with_defaults();
        let (_all, all_stream) = EventSink::attach(&document, SinkConfig::default());
        let (_states, state_stream) = EventSink::attach(
            &document,
            SinkConfig {
                filter: EventFilter::states(),
                ..Default::default()
            },
        );

        let report = document.bind_to_document(ContentId(12)).unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.unsupported, 1);
        assert_eq!(all_stream.drain().len(), 1);
        assert!(state_stream.is_empty());
    }

    #[test]
    fn test_detach() {
        let document = Document::with_defaults();
        let (sink, stream) = EventSink::attach(&document, SinkConfig::default());

        assert!(sink.detach(&document));
        document.end_load().unwrap();

        assert!(stream.is_empty());
        assert!(!sink.detach(&document));
    }

    #[test]
    fn test_json_lines_export() {
        let document = Document::with_defaults();
        let (_sink, stream) = EventSink::attach(&document, SinkConfig::default());

        document
            .content_state_changed(ContentId(5), EventStates::HOVER)
            .unwrap();
        document.end_load().unwrap();

        let lines = stream.to_json_lines().unwrap();
        let parsed: Vec<serde_json::Value> = lines
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["event"]["type"], "content_state_changed");
        assert_eq!(parsed[0]["event"]["content"], 5);
        assert_eq!(parsed[1]["event"]["type"], "end_load");
        assert!(stream.is_empty());
    }
}
