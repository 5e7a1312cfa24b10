use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, EntityKind, JobPosting, PostingId, UserId,
};
use super::duplicate::DuplicateApplicationGuard;
use super::error::{ConflictReason, MarketplaceError};
use super::integrity::RelationalIntegrityCoordinator;
use super::ownership::{authorize_application_owner, OwnershipResolver};
use super::store::{MarketplaceStore, StatusChange, StatusUpdate, StoreError};
use super::views::{PostingApplicationSummary, SeekerApplicationSummary};

/// Compare-and-set attempts before a contended transition is reported as an
/// internal failure.
const TRANSITION_ATTEMPTS: usize = 3;

/// Service composing ownership checks, the duplicate guard and the integrity
/// coordinator into the application lifecycle.
pub struct ApplicationLifecycleManager<S> {
    store: Arc<S>,
    ownership: OwnershipResolver<S>,
    duplicates: DuplicateApplicationGuard<S>,
    integrity: Arc<RelationalIntegrityCoordinator<S>>,
}

impl<S> ApplicationLifecycleManager<S>
where
    S: MarketplaceStore + 'static,
{
    pub fn new(store: Arc<S>, integrity: Arc<RelationalIntegrityCoordinator<S>>) -> Self {
        Self {
            ownership: OwnershipResolver::new(store.clone()),
            duplicates: DuplicateApplicationGuard::new(store.clone()),
            store,
            integrity,
        }
    }

    /// Submit an application for `posting` on behalf of a seeker principal.
    ///
    /// A retry of a submission that committed but did not finish its
    /// follow-up writes replays them before reporting the conflict, so
    /// repeated calls converge.
    pub async fn submit_application(
        &self,
        principal: &UserId,
        posting: &PostingId,
    ) -> Result<Application, MarketplaceError> {
        let seeker = self.ownership.resolve_seeker(principal).await?;
        let posting = self
            .store
            .posting(posting)
            .await?
            .ok_or(MarketplaceError::NotFound(EntityKind::JobPosting))?;

        if let Err(err) = self
            .duplicates
            .check_not_duplicate(&seeker.id, &posting.id)
            .await
        {
            if matches!(err, MarketplaceError::Conflict(_)) {
                if let Some(existing) = self.duplicates.existing(&seeker.id, &posting.id).await? {
                    self.complete_follow_up(&existing, &posting).await?;
                }
            }
            return Err(err);
        }

        self.integrity
            .ensure_employer_present(&posting.employer)
            .await?;
        let application = self
            .duplicates
            .insert(Application::submitted(seeker.id, &posting))
            .await?;

        self.complete_follow_up(&application, &posting).await?;

        info!(
            application_id = %application.id,
            seeker_id = %seeker.id,
            posting_id = %posting.id,
            "application submitted"
        );
        Ok(application)
    }

    /// Follow-up writes are retryable; only an employer that vanished
    /// mid-saga is reported, since the application was withdrawn for it.
    async fn complete_follow_up(
        &self,
        application: &Application,
        posting: &JobPosting,
    ) -> Result<(), MarketplaceError> {
        match self
            .integrity
            .on_application_created(application, posting)
            .await
        {
            Ok(_) => Ok(()),
            Err(err @ MarketplaceError::NotFound(_)) => Err(err),
            Err(err) => {
                error!(
                    application_id = %application.id,
                    posting_id = %posting.id,
                    error = ?err,
                    "application follow-up incomplete; left for reconciliation"
                );
                Ok(())
            }
        }
    }

    /// Every application the seeker principal has submitted, in submission
    /// order, joined with its posting.
    pub async fn applications_for_seeker(
        &self,
        principal: &UserId,
    ) -> Result<Vec<SeekerApplicationSummary>, MarketplaceError> {
        let seeker = self.ownership.resolve_seeker(principal).await?;
        let applications = self.store.applications_for_seeker(&seeker.id).await?;

        let posting_ids: Vec<PostingId> = applications
            .iter()
            .map(|application| application.job_posting)
            .collect();
        let postings = self.store.postings_by_ids(&posting_ids).await?;

        let summaries = applications
            .iter()
            .filter_map(|application| {
                let posting = postings
                    .iter()
                    .find(|posting| posting.id == application.job_posting);
                if posting.is_none() {
                    warn!(application_id = %application.id, "application references a missing posting");
                }
                posting.map(|posting| SeekerApplicationSummary::new(application, posting))
            })
            .collect();
        Ok(summaries)
    }

    /// Applicants for one of the employer principal's postings. A posting
    /// owned by someone else is reported exactly like a missing one.
    pub async fn applications_for_posting(
        &self,
        principal: &UserId,
        posting: &PostingId,
    ) -> Result<Vec<PostingApplicationSummary>, MarketplaceError> {
        let employer = self.ownership.resolve_employer(principal).await?;
        let posting = self
            .store
            .posting_for_employer(posting, &employer.id)
            .await?
            .ok_or(MarketplaceError::NotFound(EntityKind::JobPosting))?;

        let applications = self
            .store
            .applications_by_ids(&posting.applications)
            .await?;

        let mut summaries = Vec::with_capacity(applications.len());
        for application in applications
            .iter()
            .filter(|application| application.job_posting == posting.id)
        {
            let Some(seeker) = self.store.seeker(&application.job_seeker).await? else {
                warn!(application_id = %application.id, "application references a missing seeker");
                continue;
            };
            let Some(user) = self.store.user(&seeker.user).await? else {
                warn!(seeker_id = %seeker.id, "seeker references a missing user");
                continue;
            };
            summaries.push(PostingApplicationSummary::new(application, &seeker, &user));
        }
        Ok(summaries)
    }

    /// Move an application to `next`, flipping the chat flag with it.
    pub async fn transition_status(
        &self,
        principal: &UserId,
        application: &ApplicationId,
        next: ApplicationStatus,
    ) -> Result<Application, MarketplaceError> {
        let mut current = self
            .store
            .application(application)
            .await?
            .ok_or(MarketplaceError::NotFound(EntityKind::Application))?;

        let chain = self.ownership.chain_for(&current).await?;
        if !authorize_application_owner(principal, &current, &chain) {
            warn!(application_id = %current.id, principal = %principal, "status change denied");
            return Err(MarketplaceError::Forbidden);
        }

        for _ in 0..TRANSITION_ATTEMPTS {
            if !current.status.can_transition_to(next) {
                return Err(MarketplaceError::Conflict(ConflictReason::NoOpTransition));
            }

            let change = StatusChange {
                expected: current.status,
                next,
                chat_started: next.chat_enabled(),
            };
            match self
                .store
                .update_application_status(&current.id, change)
                .await?
            {
                StatusUpdate::Applied(updated) => {
                    info!(
                        application_id = %updated.id,
                        from = %change.expected,
                        to = %updated.status,
                        chat_started = updated.chat_started,
                        "application status changed"
                    );
                    return Ok(updated);
                }
                StatusUpdate::Stale(fresh) => {
                    debug!(application_id = %fresh.id, status = %fresh.status, "status changed concurrently; re-evaluating");
                    current = fresh;
                }
                StatusUpdate::Missing => {
                    return Err(MarketplaceError::NotFound(EntityKind::Application));
                }
            }
        }

        Err(MarketplaceError::Internal(StoreError::Unavailable(
            "status update kept losing to concurrent writers".to_string(),
        )))
    }
}
