//! Update scope nesting.
//!
//! Scopes nest arbitrarily. The update types of every open scope are OR'd
//! into one accumulated mask, which resets when the outermost scope closes.
//! Masks passed to `end` are not matched against the corresponding `begin`.

use crate::types::UpdateType;
use thiserror::Error;

/// Nesting state after a transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScopeState {
    pub depth: u32,
    /// Union of the update types of all open scopes.
    pub mask: UpdateType,
}

impl ScopeState {
    /// Whether no scope is open.
    pub fn is_idle(&self) -> bool {
        self.depth == 0
    }

    /// True when exactly one scope is open.
    pub fn is_outermost(&self) -> bool {
        self.depth == 1
    }
}

/// Caller errors detected by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("EndUpdate({0:?}) with no open update scope")]
    Unbalanced(UpdateType),
}

/// Tracks update scope nesting for one document.
#[derive(Debug, Default)]
pub struct UpdateScopeTracker {
    depth: u32,
    mask: UpdateType,
}

impl UpdateScopeTracker {
    /// Create a tracker with no open scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a scope. Always succeeds.
    pub fn begin(&mut self, update_type: UpdateType) -> ScopeState {
        self.depth = self.depth.saturating_add(1);
        self.mask |= update_type;
        tracing::debug!(depth = self.depth, mask = ?self.mask, "update scope opened");
        self.current()
    }

    /// Close the innermost scope.
    ///
    /// At depth 0 this is a caller error: the depth stays at 0 and nothing
    /// changes.
    pub fn end(&mut self, update_type: UpdateType) -> Result<ScopeState, ScopeError> {
        self.check_end(update_type)?;

        if !self.mask.contains(update_type) {
            tracing::debug!(
                mask = ?self.mask,
                closing = ?update_type,
                "closing update type was never opened"
            );
        }

        self.depth -= 1;
        if self.depth == 0 {
            self.mask = UpdateType::NONE;
        }
        tracing::debug!(depth = self.depth, mask = ?self.mask, "update scope closed");
        Ok(self.current())
    }

    /// Whether `end` would succeed, without changing anything.
    pub fn check_end(&self, update_type: UpdateType) -> Result<(), ScopeError> {
        if self.depth == 0 {
            Err(ScopeError::Unbalanced(update_type))
        } else {
            Ok(())
        }
    }

    /// Current depth and accumulated mask.
    pub fn current(&self) -> ScopeState {
        ScopeState {
            depth: self.depth,
            mask: self.mask,
        }
    }

    /// Number of open scopes.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Union of the masks of every open scope.
    pub fn mask(&self) -> UpdateType {
        self.mask
    }

    /// Whether any scope is open.
    pub fn is_updating(&self) -> bool {
        self.depth > 0
    }
}
