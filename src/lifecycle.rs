//! Promotion Lifecycle
//!
//! Status state machine. Manual transitions go through [`transition`]; the
//! passage of time is applied on read by [`effective_status`].
//!
//! ```text
//! draft     -> scheduled | active | archived
//! scheduled -> draft | active | archived
//! active    -> expired | archived
//! archived  -> draft
//! ```

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Promotion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    /// Being authored; never evaluated.
    #[default]
    Draft,

    /// Published, waiting for the validity window to open.
    Scheduled,

    /// Inside the validity window and evaluated against orders.
    Active,

    /// Past the validity window; frozen.
    Expired,

    /// Manually retired; never evaluated.
    Archived,
}

impl PromotionStatus {
    /// Storage name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Archived => "archived",
        }
    }

    /// Whether moving to this status publishes the promotion.
    pub const fn is_published(self) -> bool {
        matches!(self, Self::Scheduled | Self::Active)
    }

    /// Whether the promotion can no longer be edited.
    pub const fn is_frozen(self) -> bool {
        matches!(self, Self::Expired)
    }
}

impl fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A manual status change that is not permitted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot move promotion from {from} to {to}")]
pub struct TransitionError {
    /// Current status
    pub from: PromotionStatus,

    /// Requested status
    pub to: PromotionStatus,
}

/// Validate a manual status change.
///
/// Staying put is always allowed. Active promotions never move back to draft
/// or scheduled; archived promotions return to draft to be reviewed again.
///
/// # Errors
///
/// Returns a `TransitionError` if the change is not permitted.
pub fn transition(
    from: PromotionStatus,
    to: PromotionStatus,
) -> Result<PromotionStatus, TransitionError> {
    use self::PromotionStatus::{Active, Archived, Draft, Expired, Scheduled};

    let allowed = from == to
        || matches!(
            (from, to),
            (Draft, Scheduled | Active | Archived)
                | (Scheduled, Draft | Active | Archived)
                | (Active, Expired | Archived)
                | (Archived, Draft)
        );

    if allowed {
        Ok(to)
    } else {
        Err(TransitionError { from, to })
    }
}

/// Inclusive validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// First instant the promotion is valid
    pub start: Timestamp,

    /// Last instant the promotion is valid
    pub end: Timestamp,
}

impl ValidityWindow {
    /// Create a window.
    pub const fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Whether `start <= end`.
    pub fn is_well_formed(&self) -> bool {
        self.start <= self.end
    }

    /// Whether `now` lies inside the window.
    pub fn contains(&self, now: Timestamp) -> bool {
        self.start <= now && now <= self.end
    }

    /// Whether the window has opened.
    pub fn has_started(&self, now: Timestamp) -> bool {
        now >= self.start
    }

    /// Whether the window has closed.
    pub fn has_ended(&self, now: Timestamp) -> bool {
        now > self.end
    }
}

/// Apply date-driven changes to a stored status.
///
/// Scheduled promotions go live once the window opens, and scheduled or
/// active promotions expire once it closes. Other statuses are unaffected by
/// time.
pub fn effective_status(
    status: PromotionStatus,
    window: &ValidityWindow,
    now: Timestamp,
) -> PromotionStatus {
    match status {
        PromotionStatus::Scheduled | PromotionStatus::Active if window.has_ended(now) => {
            PromotionStatus::Expired
        }
        PromotionStatus::Scheduled if window.has_started(now) => PromotionStatus::Active,
        PromotionStatus::Active if !window.has_started(now) => PromotionStatus::Scheduled,
        other => other,
    }
}
