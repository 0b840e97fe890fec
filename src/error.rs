//! Error types for document notification.

use crate::types::{DocumentId, UpdateType};
use thiserror::Error;

/// Main error type for notification operations.
///
/// Delivery to an individual observer never fails; these errors describe
/// calls the document refused to turn into a dispatch pass.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("EndUpdate({mask:?}) on document {document} with no open update scope")]
    UnbalancedEndUpdate { document: DocumentId, mask: UpdateType },

    #[error("Dispatch depth limit {limit} exceeded on document {document}; {event} dropped")]
    DispatchDepthExceeded {
        document: DocumentId,
        event: &'static str,
        limit: usize,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for NotifyError {
    fn from(e: serde_json::Error) -> Self {
        NotifyError::Serialization(e.to_string())
    }
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
