use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::domain::{Employer, EmployerId, EntityKind, JobPosting, Principal, Role, UserId};
use super::error::MarketplaceError;
use super::integrity::{CascadeReport, RelationalIntegrityCoordinator};
use super::ownership::OwnershipResolver;
use super::store::MarketplaceStore;
use super::views::EmployerProfile;

/// Result of an employer closing their account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDeletion {
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employer_id: Option<EmployerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cascade: Option<CascadeReport>,
    /// False when the cascade failed part-way; reconciliation finishes it.
    pub cascade_complete: bool,
}

/// Employer-facing profile reads, posting publication and self-deletion.
pub struct EmployerAccountService<S> {
    store: Arc<S>,
    ownership: OwnershipResolver<S>,
    integrity: Arc<RelationalIntegrityCoordinator<S>>,
}

impl<S> EmployerAccountService<S>
where
    S: MarketplaceStore + 'static,
{
    pub fn new(store: Arc<S>, integrity: Arc<RelationalIntegrityCoordinator<S>>) -> Self {
        Self {
            ownership: OwnershipResolver::new(store.clone()),
            store,
            integrity,
        }
    }

    async fn profile_for(&self, employer: &Employer) -> Result<EmployerProfile, MarketplaceError> {
        let user = self
            .store
            .user(&employer.user)
            .await?
            .ok_or(MarketplaceError::NotFound(EntityKind::User))?;
        let postings = self.store.postings_by_ids(&employer.job_postings).await?;
        Ok(EmployerProfile::new(employer, &user, &postings))
    }

    pub async fn profile(&self, principal: &UserId) -> Result<EmployerProfile, MarketplaceError> {
        let employer = self.ownership.resolve_employer(principal).await?;
        self.profile_for(&employer).await
    }

    pub async fn employer(&self, id: &EmployerId) -> Result<EmployerProfile, MarketplaceError> {
        let employer = self
            .store
            .employer(id)
            .await?
            .ok_or(MarketplaceError::NotFound(EntityKind::Employer))?;
        self.profile_for(&employer).await
    }

    /// Every employer with a resolvable user record.
    pub async fn employers(&self) -> Result<Vec<EmployerProfile>, MarketplaceError> {
        let mut profiles = Vec::new();
        for employer in self.store.employers().await? {
            match self.profile_for(&employer).await {
                Ok(profile) => profiles.push(profile),
                Err(MarketplaceError::NotFound(_)) => {
                    warn!(employer_id = %employer.id, "employer without user record skipped");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(profiles)
    }

    /// Publish a posting under the employer principal and append it to the
    /// employer's ordered posting list.
    pub async fn publish_posting(
        &self,
        principal: &UserId,
        title: &str,
    ) -> Result<JobPosting, MarketplaceError> {
        let employer = self.ownership.resolve_employer(principal).await?;
        let posting = self
            .store
            .insert_posting(JobPosting::new(employer.id, title.trim()))
            .await?;

        if self
            .store
            .push_employer_posting(&employer.id, &posting.id)
            .await?
            .is_none()
        {
            // Employer deleted between resolve and push; do not leave a shell.
            self.store.delete_posting(&posting.id).await?;
            return Err(MarketplaceError::NotFound(EntityKind::Employer));
        }

        info!(employer_id = %employer.id, posting_id = %posting.id, "job posting published");
        Ok(posting)
    }

    /// Close the principal's own account and cascade over everything the
    /// employer owned. Once the user record is gone the deletion stands; a
    /// failing cascade is reported, not rolled back.
    pub async fn delete_account(
        &self,
        principal: &Principal,
        target: &UserId,
    ) -> Result<AccountDeletion, MarketplaceError> {
        if principal.id != *target {
            warn!(principal = %principal.id, target = %target, "attempt to delete another account");
            return Err(MarketplaceError::Forbidden);
        }

        let user = self
            .store
            .delete_user(target)
            .await?
            .ok_or(MarketplaceError::NotFound(EntityKind::User))?;

        let employer = match self.store.delete_employer_by_user(&user.id).await {
            Ok(employer) => employer,
            Err(err) => {
                error!(user_id = %user.id, error = %err, "employer profile deletion failed after user deletion");
                return Ok(AccountDeletion {
                    user_id: user.id,
                    employer_id: None,
                    cascade: None,
                    cascade_complete: false,
                });
            }
        };

        let Some(employer) = employer else {
            // An employer account whose profile is already gone lost it to a
            // reconciliation pass, which owns the cascade from there.
            let cascade_complete = user.role != Role::Employer;
            if cascade_complete {
                info!(user_id = %user.id, "user deleted without employer profile");
            } else {
                warn!(user_id = %user.id, "employer profile already removed; cascade left to reconciliation");
            }
            return Ok(AccountDeletion {
                user_id: user.id,
                employer_id: None,
                cascade: None,
                cascade_complete,
            });
        };

        let (cascade, cascade_complete) = match self.integrity.on_employer_deleted(&employer.id).await
        {
            Ok(report) => (Some(report), true),
            Err(err) => {
                error!(
                    employer_id = %employer.id,
                    error = ?err,
                    "employer cascade failed; left for reconciliation"
                );
                (None, false)
            }
        };

        info!(user_id = %user.id, employer_id = %employer.id, "employer account deleted");
        Ok(AccountDeletion {
            user_id: user.id,
            employer_id: Some(employer.id),
            cascade,
            cascade_complete,
        })
    }
}
