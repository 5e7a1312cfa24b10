use serde::Serialize;

use super::domain::EntityKind;
use super::store::StoreError;

/// Why a request collided with existing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    AlreadyApplied,
    NoOpTransition,
}

impl ConflictReason {
    pub const fn label(self) -> &'static str {
        match self {
            ConflictReason::AlreadyApplied => "already applied to this job posting",
            ConflictReason::NoOpTransition => "application already has the requested status",
        }
    }
}

/// Error raised by the marketplace services.
///
/// Absence and non-ownership collapse into `NotFound` on posting lookups so
/// callers cannot discover other employers' postings. `Internal` keeps the
/// store failure as its source but never prints it.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{0} not found")]
    NotFound(EntityKind),
    #[error("forbidden")]
    Forbidden,
    #[error("conflict: {}", .0.label())]
    Conflict(ConflictReason),
    #[error("internal failure")]
    Internal(#[source] StoreError),
}

impl From<StoreError> for MarketplaceError {
    fn from(value: StoreError) -> Self {
        Self::Internal(value)
    }
}
