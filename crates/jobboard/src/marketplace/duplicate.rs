use std::sync::Arc;

use tracing::debug;

use super::domain::{Application, PostingId, SeekerId};
use super::error::{ConflictReason, MarketplaceError};
use super::store::{MarketplaceStore, StoreError};

/// Enforces at most one application per (seeker, posting).
///
/// The read-side check only catches sequential duplicates. Concurrent
/// submissions can both pass it, so the store's compound unique key is the
/// real guarantee and [`DuplicateApplicationGuard::insert`] translates its
/// violation into the same conflict.
pub struct DuplicateApplicationGuard<S> {
    store: Arc<S>,
}

impl<S> DuplicateApplicationGuard<S>
where
    S: MarketplaceStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns the existing application, if any. Callers decide whether an
    /// existing one is a conflict or something to repair first.
    pub async fn existing(
        &self,
        seeker: &SeekerId,
        posting: &PostingId,
    ) -> Result<Option<Application>, MarketplaceError> {
        Ok(self.store.application_by_pair(seeker, posting).await?)
    }

    pub async fn check_not_duplicate(
        &self,
        seeker: &SeekerId,
        posting: &PostingId,
    ) -> Result<(), MarketplaceError> {
        match self.existing(seeker, posting).await? {
            Some(_) => Err(MarketplaceError::Conflict(ConflictReason::AlreadyApplied)),
            None => Ok(()),
        }
    }

    /// Insert behind the unique key.
    pub async fn insert(&self, application: Application) -> Result<Application, MarketplaceError> {
        match self.store.insert_application(application).await {
            Ok(stored) => Ok(stored),
            Err(StoreError::Conflict) => {
                debug!("unique key rejected concurrent duplicate application");
                Err(MarketplaceError::Conflict(ConflictReason::AlreadyApplied))
            }
            Err(other) => Err(other.into()),
        }
    }
}
