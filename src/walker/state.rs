//! Walk state definitions for a single tracked source
//!
//! A walk moves strictly forward through these states; any failure ends the
//! walk where it is and is reported to the caller.
use std::fmt;

/// Represents how far a list walk has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkState {
    /// Nothing has happened yet
    Idle,

    /// The list page is loaded and its container is present
    Navigated,

    /// The newest number is known and the list is in walking order
    OrderDetermined,

    /// Windows are being loaded into the list
    Windowing,

    /// The newly revealed items are being read out
    Snapshotting,

    /// The walk finished and produced its snapshot
    Done,
}

impl WalkState {
    /// Returns true if the walk has produced its result
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if `next` is a legal successor of this state
    ///
    /// `OrderDetermined -> Done` covers sources that are already up to date
    /// and skip windowing entirely.
    pub fn can_transition_to(&self, next: WalkState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Navigated)
                | (Self::Navigated, Self::OrderDetermined)
                | (Self::OrderDetermined, Self::Windowing)
                | (Self::OrderDetermined, Self::Done)
                | (Self::Windowing, Self::Snapshotting)
                | (Self::Snapshotting, Self::Done)
        )
    }

    /// Short lowercase name, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Navigated => "navigated",
            Self::OrderDetermined => "order_determined",
            Self::Windowing => "windowing",
            Self::Snapshotting => "snapshotting",
            Self::Done => "done",
        }
    }

    /// Returns all walk states in order
    pub fn all_states() -> [Self; 6] {
        [
            Self::Idle,
            Self::Navigated,
            Self::OrderDetermined,
            Self::Windowing,
            Self::Snapshotting,
            Self::Done,
        ]
    }
}

impl fmt::Display for WalkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
