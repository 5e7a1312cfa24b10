//! Job marketplace core: application submission and review, the chat thread
//! bound to each application, and the cross-collection upkeep that keeps the
//! four linked collections consistent without multi-document transactions.

pub mod domain;
pub mod duplicate;
pub mod employers;
pub mod error;
pub mod integrity;
pub mod lifecycle;
pub mod memory;
pub mod ownership;
pub mod reconcile;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::IntegrityConfig;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, ChatThread, ChatThreadId, Employer,
    EmployerId, EntityKind, JobPosting, PostingId, Principal, Role, Seeker, SeekerId, User,
    UserId,
};
pub use duplicate::DuplicateApplicationGuard;
pub use employers::{AccountDeletion, EmployerAccountService};
pub use error::{ConflictReason, MarketplaceError};
pub use integrity::{CascadeReport, RelationalIntegrityCoordinator};
pub use lifecycle::ApplicationLifecycleManager;
pub use memory::InMemoryStore;
pub use ownership::{
    authorize_application_owner, authorize_posting_owner, OwnershipChain, OwnershipResolver,
};
pub use reconcile::{IntegrityReconciler, ReconcileReport};
pub use store::{
    ApplicationStore, ChatStore, DirectoryStore, MarketplaceStore, PostingStore, StatusChange,
    StatusUpdate, StoreError,
};
pub use views::{
    EmployerProfile, PostingApplicationSummary, PostingHeadline, SeekerApplicationSummary,
};

/// The marketplace services wired over one shared store.
pub struct Marketplace<S> {
    pub applications: ApplicationLifecycleManager<S>,
    pub employers: EmployerAccountService<S>,
    pub reconciler: IntegrityReconciler<S>,
}

impl<S> Marketplace<S>
where
    S: MarketplaceStore + 'static,
{
    pub fn new(store: Arc<S>, config: IntegrityConfig) -> Self {
        let integrity = Arc::new(RelationalIntegrityCoordinator::new(
            store.clone(),
            config.cascade_sweeps,
        ));

        Self {
            applications: ApplicationLifecycleManager::new(store.clone(), integrity.clone()),
            employers: EmployerAccountService::new(store.clone(), integrity.clone()),
            reconciler: IntegrityReconciler::new(store, integrity),
        }
    }
}
