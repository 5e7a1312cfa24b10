//! Persistence ports consumed by the marketplace core.
//!
//! Adapters guarantee single-document atomicity and nothing more: every
//! cross-collection consistency rule lives in the core. Two compound keys are
//! expected from the adapter itself: one application per (seeker, posting)
//! and one chat thread per application. Violations surface as
//! [`StoreError::Conflict`].

use async_trait::async_trait;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ChatThread, ChatThreadId, Employer, EmployerId,
    JobPosting, PostingId, Seeker, SeekerId, User, UserId,
};

/// Error enumeration for adapter failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique key violated")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store returned malformed data: {0}")]
    Malformed(String),
}

/// Compare-and-set request for an application's review status. The adapter
/// writes `next` and `chat_started` together, and only while the stored
/// status still equals `expected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub expected: ApplicationStatus,
    pub next: ApplicationStatus,
    pub chat_started: bool,
}

/// Outcome of [`ApplicationStore::update_application_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied(Application),
    /// The stored status no longer matched; carries the current document.
    Stale(Application),
    Missing,
}

/// Users, seeker profiles and employer profiles. Registration is owned by the
/// auth collaborator, so there are no insert operations here.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn user(&self, id: &UserId) -> Result<Option<User>, StoreError>;
    async fn delete_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    async fn seeker(&self, id: &SeekerId) -> Result<Option<Seeker>, StoreError>;
    async fn seeker_by_user(&self, user: &UserId) -> Result<Option<Seeker>, StoreError>;

    async fn employer(&self, id: &EmployerId) -> Result<Option<Employer>, StoreError>;
    async fn employer_by_user(&self, user: &UserId) -> Result<Option<Employer>, StoreError>;
    async fn employers(&self) -> Result<Vec<Employer>, StoreError>;
    async fn delete_employer_by_user(&self, user: &UserId)
        -> Result<Option<Employer>, StoreError>;
    /// Append to the employer's ordered posting list.
    async fn push_employer_posting(
        &self,
        employer: &EmployerId,
        posting: &PostingId,
    ) -> Result<Option<Employer>, StoreError>;
}

#[async_trait]
pub trait PostingStore: Send + Sync {
    async fn insert_posting(&self, posting: JobPosting) -> Result<JobPosting, StoreError>;
    async fn posting(&self, id: &PostingId) -> Result<Option<JobPosting>, StoreError>;
    /// Single lookup filtered by id and owner.
    async fn posting_for_employer(
        &self,
        id: &PostingId,
        employer: &EmployerId,
    ) -> Result<Option<JobPosting>, StoreError>;
    async fn postings(&self) -> Result<Vec<JobPosting>, StoreError>;
    async fn postings_by_ids(&self, ids: &[PostingId]) -> Result<Vec<JobPosting>, StoreError>;
    /// Add-to-set on the posting's application cache; repeating is harmless.
    async fn add_posting_application(
        &self,
        id: &PostingId,
        application: &ApplicationId,
    ) -> Result<Option<JobPosting>, StoreError>;
    async fn remove_posting_application(
        &self,
        id: &PostingId,
        application: &ApplicationId,
    ) -> Result<Option<JobPosting>, StoreError>;
    async fn delete_posting(&self, id: &PostingId) -> Result<u64, StoreError>;
    async fn delete_postings_by_employer(&self, employer: &EmployerId) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the (seeker, posting) pair
    /// already has an application.
    async fn insert_application(&self, application: Application)
        -> Result<Application, StoreError>;
    async fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;
    async fn application_by_pair(
        &self,
        seeker: &SeekerId,
        posting: &PostingId,
    ) -> Result<Option<Application>, StoreError>;
    /// Insertion order.
    async fn applications_for_seeker(
        &self,
        seeker: &SeekerId,
    ) -> Result<Vec<Application>, StoreError>;
    async fn applications_by_ids(
        &self,
        ids: &[ApplicationId],
    ) -> Result<Vec<Application>, StoreError>;
    async fn applications(&self) -> Result<Vec<Application>, StoreError>;
    async fn update_application_status(
        &self,
        id: &ApplicationId,
        change: StatusChange,
    ) -> Result<StatusUpdate, StoreError>;
    async fn delete_application(&self, id: &ApplicationId) -> Result<u64, StoreError>;
    async fn delete_applications_by_employer(
        &self,
        employer: &EmployerId,
    ) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the application already has a
    /// thread.
    async fn insert_chat_thread(&self, thread: ChatThread) -> Result<ChatThread, StoreError>;
    async fn chat_thread_for_application(
        &self,
        application: &ApplicationId,
    ) -> Result<Option<ChatThread>, StoreError>;
    async fn chat_threads(&self) -> Result<Vec<ChatThread>, StoreError>;
    async fn delete_chat_thread(&self, id: &ChatThreadId) -> Result<u64, StoreError>;
    async fn delete_chat_threads_by_application(
        &self,
        application: &ApplicationId,
    ) -> Result<u64, StoreError>;
    async fn delete_chat_threads_by_employer(
        &self,
        employer: &EmployerId,
    ) -> Result<u64, StoreError>;
}

/// Every collection the core touches.
pub trait MarketplaceStore: DirectoryStore + PostingStore + ApplicationStore + ChatStore {}

impl<T> MarketplaceStore for T where T: DirectoryStore + PostingStore + ApplicationStore + ChatStore
{}
