//! Buffered event streams for tooling.
//!
//! An [`EventSink`] is an ordinary observer that copies matching events into
//! a bounded buffer. Tooling drains the buffer through the paired
//! [`EventStream`] whenever it likes; delivery to the sink never blocks and
//! never fails. Overflowing events are counted and discarded.
//!
//! # Example
//!
//! ```ignore
//! let document = Document::with_defaults();
//! let (sink, stream) = EventSink::attach(&document, SinkConfig {
//!     filter: EventFilter::styles(),
//!     ..Default::default()
//! });
//!
//! document.style_sheet_added(StyleSheetRef::document(StyleSheetId(1)))?;
//!
//! for recorded in stream.drain() {
//!     println!("{:?}", recorded.event);
//! }
//! ```

mod forwarder;
mod types;

pub use forwarder::EventSink;
pub use types::{EventFilter, EventStream, RecordedEvent, SinkConfig};
