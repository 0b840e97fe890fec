//! Core types for document notification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Unique identifier for a document.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a content node owned by the content tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(pub u64);

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

/// Identity of a style sheet owned by the style engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleSheetId(pub u64);

impl fmt::Debug for StyleSheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StyleSheetId({})", self.0)
    }
}

/// Identity of the parser driving a load.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParserId(pub u64);

impl fmt::Debug for ParserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParserId({})", self.0)
    }
}

/// A style sheet as seen by observers.
///
/// `is_document_sheet` is true when the sheet is in the document's authored
/// sheet list and false for user-agent or user sheets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleSheetRef {
    pub id: StyleSheetId,
    pub is_document_sheet: bool,
}

impl StyleSheetRef {
    /// Reference to a sheet owned by the document itself.
    pub fn document(id: StyleSheetId) -> Self {
        Self {
            id,
            is_document_sheet: true,
        }
    }

    /// A user-agent or user sheet.
    pub fn non_document(id: StyleSheetId) -> Self {
        Self {
            id,
            is_document_sheet: false,
        }
    }
}

/// Kinds of update bracketed by `BeginUpdate`/`EndUpdate`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateType(pub u32);

impl UpdateType {
    pub const NONE: UpdateType = UpdateType(0);
    pub const CONTENT_MODEL: UpdateType = UpdateType(0x0000_0001);
    pub const STYLE: UpdateType = UpdateType(0x0000_0002);
    pub const ALL: UpdateType = UpdateType(0x0000_0003);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set in `self`.
    pub fn contains(self, other: UpdateType) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set.
    pub fn intersects(self, other: UpdateType) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: UpdateType) -> UpdateType {
        UpdateType(self.0 | other.0)
    }
}

impl BitOr for UpdateType {
    type Output = UpdateType;

    fn bitor(self, rhs: UpdateType) -> UpdateType {
        self.union(rhs)
    }
}

impl BitOrAssign for UpdateType {
    fn bitor_assign(&mut self, rhs: UpdateType) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(UpdateType::CONTENT_MODEL) {
            names.push("CONTENT_MODEL");
        }
        if self.contains(UpdateType::STYLE) {
            names.push("STYLE");
        }
        let unknown = self.0 & !UpdateType::ALL.0;
        if names.is_empty() && unknown == 0 {
            return write!(f, "UpdateType(NONE)");
        }
        write!(f, "UpdateType({}", names.join(" | "))?;
        if unknown != 0 {
            if !names.is_empty() {
                write!(f, " | ")?;
            }
            write!(f, "{unknown:#x}")?;
        }
        write!(f, ")")
    }
}

/// Set of element or document state flags.
///
/// In notifications a value always carries the *changed* flags only. A
/// clear bit means "unchanged", never "false".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventStates(pub u64);

impl EventStates {
    pub const EMPTY: EventStates = EventStates(0);

    // Element states.
    pub const ACTIVE: EventStates = EventStates(1 << 0);
    pub const FOCUS: EventStates = EventStates(1 << 1);
    pub const HOVER: EventStates = EventStates(1 << 2);
    pub const DRAGOVER: EventStates = EventStates(1 << 3);
    pub const URLTARGET: EventStates = EventStates(1 << 4);
    pub const CHECKED: EventStates = EventStates(1 << 5);
    pub const ENABLED: EventStates = EventStates(1 << 6);
    pub const DISABLED: EventStates = EventStates(1 << 7);
    pub const FOCUS_VISIBLE: EventStates = EventStates(1 << 8);
    pub const VISITED: EventStates = EventStates(1 << 9);
    pub const UNVISITED: EventStates = EventStates(1 << 10);

    // Document states.
    pub const WINDOW_INACTIVE: EventStates = EventStates(1 << 32);
    pub const RTL_LOCALE: EventStates = EventStates(1 << 33);
    pub const LWTHEME: EventStates = EventStates(1 << 34);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set.
    pub fn contains(self, other: EventStates) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any flag of `other` changed.
    pub fn intersects(self, other: EventStates) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: EventStates) -> EventStates {
        EventStates(self.0 | other.0)
    }

    /// Flags that differ between two full state snapshots.
    pub fn changed_between(old: EventStates, new: EventStates) -> EventStates {
        EventStates(old.0 ^ new.0)
    }
}

impl BitOr for EventStates {
    type Output = EventStates;

    fn bitor(self, rhs: EventStates) -> EventStates {
        self.union(rhs)
    }
}

impl BitOrAssign for EventStates {
    fn bitor_assign(&mut self, rhs: EventStates) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for EventStates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventStates({:#x})", self.0)
    }
}
