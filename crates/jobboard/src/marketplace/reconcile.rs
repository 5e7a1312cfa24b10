use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{Application, ApplicationId, EmployerId, JobPosting, PostingId};
use super::error::MarketplaceError;
use super::integrity::RelationalIntegrityCoordinator;
use super::store::{MarketplaceStore, StatusChange, StatusUpdate};

/// Repairs performed by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub orphaned_employers: u64,
    pub orphaned_applications: u64,
    pub orphaned_postings: u64,
    pub orphaned_chat_threads: u64,
    pub duplicate_chat_threads: u64,
    pub chat_threads_created: u64,
    pub posting_links_added: u64,
    pub posting_links_pruned: u64,
    pub chat_flags_repaired: u64,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Memoized employer existence for one pass. Deleted employers never come
/// back, so a cached answer can only be stale in the safe direction.
#[derive(Default)]
struct EmployerLiveness {
    known: HashMap<EmployerId, bool>,
}

impl EmployerLiveness {
    async fn is_live<S>(&mut self, store: &S, id: &EmployerId) -> Result<bool, MarketplaceError>
    where
        S: MarketplaceStore,
    {
        if let Some(live) = self.known.get(id) {
            return Ok(*live);
        }
        let live = store.employer(id).await?.is_some();
        self.known.insert(*id, live);
        Ok(live)
    }
}

/// Brings derived fields and dependent documents back in line with the
/// authoritative ones after interrupted sagas or cascades. Every repair is
/// idempotent, so passes may overlap with live traffic and with each other.
pub struct IntegrityReconciler<S> {
    store: Arc<S>,
    integrity: Arc<RelationalIntegrityCoordinator<S>>,
}

impl<S> IntegrityReconciler<S>
where
    S: MarketplaceStore + 'static,
{
    pub fn new(store: Arc<S>, integrity: Arc<RelationalIntegrityCoordinator<S>>) -> Self {
        Self { store, integrity }
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport, MarketplaceError> {
        let mut report = ReconcileReport::default();
        let mut employers = EmployerLiveness::default();

        // Employer profiles whose account is gone: an account deletion that
        // stopped after removing the user. Taking the profile here means the
        // deletion call will not find it, so the cascade runs from here.
        for employer in self.store.employers().await? {
            if self.store.user(&employer.user).await?.is_some() {
                continue;
            }
            if let Some(removed) = self.store.delete_employer_by_user(&employer.user).await? {
                report.orphaned_employers += 1;
                let cascade = self.integrity.on_employer_deleted(&removed.id).await?;
                report.orphaned_postings += cascade.postings;
                report.orphaned_chat_threads += cascade.chat_threads;
                report.orphaned_applications += cascade.applications;
            }
        }

        // Postings of deleted employers: finish the cascade.
        let mut postings = HashMap::new();
        for posting in self.store.postings().await? {
            if employers.is_live(self.store.as_ref(), &posting.employer).await? {
                postings.insert(posting.id, posting);
            } else {
                report.orphaned_postings += self.store.delete_posting(&posting.id).await?;
            }
        }

        let mut live: HashMap<ApplicationId, Application> = HashMap::new();
        for application in self.store.applications().await? {
            if !postings.contains_key(&application.job_posting) {
                // Possibly published after the posting snapshot was taken.
                if let Some(posting) = self.store.posting(&application.job_posting).await? {
                    if employers.is_live(self.store.as_ref(), &posting.employer).await? {
                        postings.insert(posting.id, posting);
                    }
                }
            }

            let employer_live = employers
                .is_live(self.store.as_ref(), &application.job_employer)
                .await?;
            let posting = postings
                .get(&application.job_posting)
                .filter(|posting| employer_live && posting.employer == application.job_employer);
            let Some(posting) = posting else {
                report.orphaned_chat_threads += self
                    .store
                    .delete_chat_threads_by_application(&application.id)
                    .await?;
                report.orphaned_applications +=
                    self.store.delete_application(&application.id).await?;
                continue;
            };

            if !posting.applications.contains(&application.id)
                && self
                    .store
                    .add_posting_application(&posting.id, &application.id)
                    .await?
                    .is_some()
            {
                report.posting_links_added += 1;
            }

            let application = if application.chat_consistent() {
                application
            } else {
                let repair = StatusChange {
                    expected: application.status,
                    next: application.status,
                    chat_started: application.status.chat_enabled(),
                };
                match self
                    .store
                    .update_application_status(&application.id, repair)
                    .await?
                {
                    StatusUpdate::Applied(current) => {
                        report.chat_flags_repaired += 1;
                        current
                    }
                    // A concurrent transition writes both fields together.
                    StatusUpdate::Stale(current) => current,
                    StatusUpdate::Missing => continue,
                }
            };

            live.insert(application.id, application);
        }

        self.prune_posting_links(&postings, &live, &mut report)
            .await?;
        self.reconcile_threads(&live, &mut report).await?;

        if report.is_clean() {
            info!("reconciliation found nothing to repair");
        } else {
            warn!(?report, "reconciliation repaired inconsistencies");
        }
        Ok(report)
    }

    /// True when `id` exists now, for applications submitted after the
    /// application snapshot was taken.
    async fn application_exists_for(
        &self,
        id: &ApplicationId,
        posting: Option<&PostingId>,
    ) -> Result<bool, MarketplaceError> {
        let current = self.store.application(id).await?;
        Ok(match (current, posting) {
            (Some(application), Some(posting)) => application.job_posting == *posting,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    /// Drop cache entries that do not name a live application of that posting.
    async fn prune_posting_links(
        &self,
        postings: &HashMap<PostingId, JobPosting>,
        live: &HashMap<ApplicationId, Application>,
        report: &mut ReconcileReport,
    ) -> Result<(), MarketplaceError> {
        for posting in postings.values() {
            for entry in &posting.applications {
                let belongs = live
                    .get(entry)
                    .is_some_and(|application| application.job_posting == posting.id);
                if !belongs && !self.application_exists_for(entry, Some(&posting.id)).await? {
                    self.store
                        .remove_posting_application(&posting.id, entry)
                        .await?;
                    report.posting_links_pruned += 1;
                }
            }
        }
        Ok(())
    }

    /// One thread per live application: create missing ones, remove extras
    /// and threads whose application is gone.
    async fn reconcile_threads(
        &self,
        live: &HashMap<ApplicationId, Application>,
        report: &mut ReconcileReport,
    ) -> Result<(), MarketplaceError> {
        let mut seen = HashSet::new();
        for thread in self.store.chat_threads().await? {
            if !live.contains_key(&thread.application) {
                if self.application_exists_for(&thread.application, None).await? {
                    continue;
                }
                report.orphaned_chat_threads += self.store.delete_chat_thread(&thread.id).await?;
            } else if !seen.insert(thread.application) {
                report.duplicate_chat_threads += self.store.delete_chat_thread(&thread.id).await?;
            }
        }

        for application in live.values() {
            if !seen.contains(&application.id) {
                if self.integrity.open_chat_thread(application).await?.created {
                    report.chat_threads_created += 1;
                }
            }
        }
        Ok(())
    }
}
