//! Cross-collection side effects, written as sagas of idempotent steps.
//!
//! Submission: the application insert is the unit of truth; the posting
//! back-reference and the chat thread follow it and may be replayed any number
//! of times. Employer deletion: postings, then threads, then applications, then
//! cleanup sweeps for anything created while the primary pass ran.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::domain::{Application, ChatThread, EmployerId, EntityKind, JobPosting};
use super::error::MarketplaceError;
use super::store::{MarketplaceStore, StoreError};

/// Counts removed by an employer-deletion cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub postings: u64,
    pub chat_threads: u64,
    pub applications: u64,
    /// Cleanup sweeps that found leftovers after the primary pass.
    pub late_sweeps: u8,
}

impl CascadeReport {
    pub fn total(&self) -> u64 {
        self.postings + self.chat_threads + self.applications
    }
}

pub(super) struct OpenedThread {
    pub(super) thread: ChatThread,
    pub(super) created: bool,
}

impl OpenedThread {
    fn existing(thread: ChatThread) -> Self {
        Self {
            thread,
            created: false,
        }
    }
}

pub struct RelationalIntegrityCoordinator<S> {
    store: Arc<S>,
    cascade_sweeps: u8,
}

impl<S> RelationalIntegrityCoordinator<S>
where
    S: MarketplaceStore + 'static,
{
    pub fn new(store: Arc<S>, cascade_sweeps: u8) -> Self {
        Self {
            store,
            cascade_sweeps: cascade_sweeps.max(1),
        }
    }

    /// Fails with `NotFound(JobPosting)` when the posting's employer is gone.
    /// Checked before every write of the submission saga.
    pub async fn ensure_employer_present(
        &self,
        employer: &EmployerId,
    ) -> Result<(), MarketplaceError> {
        match self.store.employer(employer).await? {
            Some(_) => Ok(()),
            None => Err(MarketplaceError::NotFound(EntityKind::JobPosting)),
        }
    }

    /// Follow-up steps after an application insert: add it to the posting's
    /// application set and make sure it has its chat thread.
    ///
    /// If the employer disappears mid-way the saga compensates by removing the
    /// application again, so a cascade never loses the race.
    pub async fn on_application_created(
        &self,
        application: &Application,
        posting: &JobPosting,
    ) -> Result<ChatThread, MarketplaceError> {
        if let Err(err) = self.ensure_employer_present(&posting.employer).await {
            self.compensate(application).await;
            return Err(err);
        }

        let linked = self
            .store
            .add_posting_application(&posting.id, &application.id)
            .await?;
        if linked.is_none() {
            self.compensate(application).await;
            return Err(MarketplaceError::NotFound(EntityKind::JobPosting));
        }

        if let Err(err) = self.ensure_employer_present(&posting.employer).await {
            self.compensate(application).await;
            return Err(err);
        }

        let thread = self.ensure_chat_thread(application).await?;

        // A cascade that ran to completion between the check above and the
        // thread insert would not see the new thread.
        let employer_present = self.store.employer(&posting.employer).await?.is_some();
        let still_stored = self.store.application(&application.id).await?.is_some();
        if !(employer_present && still_stored) {
            self.compensate(application).await;
            return Err(MarketplaceError::NotFound(EntityKind::JobPosting));
        }
        Ok(thread)
    }

    /// Create the application's thread unless it already has one.
    pub async fn ensure_chat_thread(
        &self,
        application: &Application,
    ) -> Result<ChatThread, MarketplaceError> {
        self.open_chat_thread(application)
            .await
            .map(|opened| opened.thread)
    }

    /// Like [`Self::ensure_chat_thread`], but also reports whether this call
    /// wrote the thread or found one already stored.
    pub(super) async fn open_chat_thread(
        &self,
        application: &Application,
    ) -> Result<OpenedThread, MarketplaceError> {
        if let Some(existing) = self
            .store
            .chat_thread_for_application(&application.id)
            .await?
        {
            return Ok(OpenedThread::existing(existing));
        }

        match self
            .store
            .insert_chat_thread(ChatThread::for_application(application))
            .await
        {
            Ok(thread) => {
                debug!(application_id = %application.id, thread_id = %thread.id, "chat thread created");
                Ok(OpenedThread {
                    thread,
                    created: true,
                })
            }
            Err(StoreError::Conflict) => self
                .store
                .chat_thread_for_application(&application.id)
                .await?
                .map(OpenedThread::existing)
                .ok_or_else(|| {
                    MarketplaceError::Internal(StoreError::Malformed(
                        "thread conflict reported without a stored thread".to_string(),
                    ))
                }),
            Err(other) => Err(other.into()),
        }
    }

    /// Undo a submission whose employer vanished. Failures are logged; the
    /// reconciler removes whatever is left.
    async fn compensate(&self, application: &Application) {
        warn!(
            application_id = %application.id,
            employer_id = %application.job_employer,
            "employer removed during submission; withdrawing application"
        );
        if let Err(err) = self
            .store
            .delete_chat_threads_by_application(&application.id)
            .await
        {
            error!(application_id = %application.id, error = %err, "failed to remove chat thread during compensation");
        }
        if let Err(err) = self
            .store
            .remove_posting_application(&application.job_posting, &application.id)
            .await
        {
            error!(application_id = %application.id, error = %err, "failed to unlink posting during compensation");
        }
        if let Err(err) = self.store.delete_application(&application.id).await {
            error!(application_id = %application.id, error = %err, "failed to delete application during compensation");
        }
    }

    /// Remove everything that references `employer`.
    ///
    /// Postings go first: an interrupted cascade then leaves threads and
    /// applications pointing at a missing posting, which no read path trusts,
    /// rather than live postings pointing at a missing employer.
    pub async fn on_employer_deleted(
        &self,
        employer: &EmployerId,
    ) -> Result<CascadeReport, MarketplaceError> {
        let mut report = CascadeReport {
            postings: self.store.delete_postings_by_employer(employer).await?,
            chat_threads: self.store.delete_chat_threads_by_employer(employer).await?,
            applications: self.store.delete_applications_by_employer(employer).await?,
            late_sweeps: 0,
        };

        for _ in 0..self.cascade_sweeps {
            let postings = self.store.delete_postings_by_employer(employer).await?;
            let chat_threads = self.store.delete_chat_threads_by_employer(employer).await?;
            let applications = self.store.delete_applications_by_employer(employer).await?;
            if postings + chat_threads + applications == 0 {
                break;
            }
            report.postings += postings;
            report.chat_threads += chat_threads;
            report.applications += applications;
            report.late_sweeps += 1;
        }

        info!(
            employer_id = %employer,
            postings = report.postings,
            chat_threads = report.chat_threads,
            applications = report.applications,
            late_sweeps = report.late_sweeps,
            "employer cascade complete"
        );
        Ok(report)
    }
}
