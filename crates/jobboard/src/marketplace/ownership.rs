use std::sync::Arc;

use super::domain::{Application, Employer, EntityKind, JobPosting, Seeker, UserId};
use super::error::MarketplaceError;
use super::store::MarketplaceStore;

/// Posting and employer behind an application, as far as the store could
/// resolve them. A hop is `None` when its document no longer exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipChain {
    pub posting: Option<JobPosting>,
    pub employer: Option<Employer>,
}

/// Resolves principals to their profiles and loads ownership chains.
pub struct OwnershipResolver<S> {
    store: Arc<S>,
}

impl<S> OwnershipResolver<S>
where
    S: MarketplaceStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn resolve_seeker(&self, principal: &UserId) -> Result<Seeker, MarketplaceError> {
        self.store
            .seeker_by_user(principal)
            .await?
            .ok_or(MarketplaceError::NotFound(EntityKind::Seeker))
    }

    pub async fn resolve_employer(&self, principal: &UserId) -> Result<Employer, MarketplaceError> {
        self.store
            .employer_by_user(principal)
            .await?
            .ok_or(MarketplaceError::NotFound(EntityKind::Employer))
    }

    /// Walk application -> posting -> employer. Stops at the first missing hop.
    pub async fn chain_for(
        &self,
        application: &Application,
    ) -> Result<OwnershipChain, MarketplaceError> {
        let Some(posting) = self.store.posting(&application.job_posting).await? else {
            return Ok(OwnershipChain::default());
        };
        let employer = self.store.employer(&posting.employer).await?;
        Ok(OwnershipChain {
            posting: Some(posting),
            employer,
        })
    }
}

pub fn authorize_posting_owner(employer: &Employer, posting: &JobPosting) -> bool {
    posting.employer == employer.id
}

/// True only when every hop resolved, the hops belong to each other, and the
/// posting's employer is backed by `principal`. Anything else denies.
pub fn authorize_application_owner(
    principal: &UserId,
    application: &Application,
    chain: &OwnershipChain,
) -> bool {
    let (Some(posting), Some(employer)) = (&chain.posting, &chain.employer) else {
        return false;
    };

    posting.id == application.job_posting
        && authorize_posting_owner(employer, posting)
        && employer.user == *principal
}
