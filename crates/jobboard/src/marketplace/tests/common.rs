use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::config::IntegrityConfig;
use crate::marketplace::domain::{
    Application, ApplicationId, ApplicationStatus, ChatThread, ChatThreadId, Employer,
    EmployerId, JobPosting, PostingId, Principal, Role, Seeker, SeekerId, User, UserId,
};
use crate::marketplace::memory::InMemoryStore;
use crate::marketplace::store::{
    ApplicationStore, ChatStore, DirectoryStore, MarketplaceStore, PostingStore, StatusChange,
    StatusUpdate, StoreError,
};
use crate::marketplace::Marketplace;

pub(super) fn user(role: Role, name: &str) -> User {
    User {
        id: UserId::new(),
        name: name.to_string(),
        email: format!("{}@example.test", name.to_ascii_lowercase().replace(' ', ".")),
        password_hash: "$argon2id$stub".to_string(),
        role,
        created_at: Utc::now(),
    }
}

pub(super) fn principal(user: &User) -> Principal {
    Principal {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}

pub(super) async fn seed_seeker(store: &InMemoryStore, name: &str) -> (User, Seeker) {
    let user = store.seed_user(user(Role::Seeker, name)).await;
    let seeker = store
        .seed_seeker(Seeker {
            id: SeekerId::new(),
            user: user.id,
            skills: vec!["espresso".to_string(), "inventory".to_string()],
        })
        .await;
    (user, seeker)
}

pub(super) async fn seed_employer(store: &InMemoryStore, name: &str) -> (User, Employer) {
    let user = store.seed_user(user(Role::Employer, name)).await;
    let employer = store
        .seed_employer(Employer {
            id: EmployerId::new(),
            user: user.id,
            job_postings: Vec::new(),
        })
        .await;
    (user, employer)
}

pub(super) async fn publish(store: &InMemoryStore, employer: &Employer, title: &str) -> JobPosting {
    let posting = store
        .insert_posting(JobPosting::new(employer.id, title))
        .await
        .expect("posting stored");
    store
        .push_employer_posting(&employer.id, &posting.id)
        .await
        .expect("employer updated")
        .expect("employer present");
    posting
}

pub(super) fn marketplace<S>(store: Arc<S>) -> Marketplace<S>
where
    S: MarketplaceStore + 'static,
{
    Marketplace::new(
        store,
        IntegrityConfig {
            cascade_sweeps: 3,
            reconcile_interval_secs: 0,
        },
    )
}

/// One seeker, one employer with one posting.
pub(super) struct World {
    pub(super) store: Arc<InMemoryStore>,
    pub(super) seeker_user: User,
    pub(super) seeker: Seeker,
    pub(super) employer_user: User,
    pub(super) employer: Employer,
    pub(super) posting: JobPosting,
}

pub(super) async fn world() -> World {
    let store = Arc::new(InMemoryStore::new());
    let (seeker_user, seeker) = seed_seeker(&store, "Sam Seeker").await;
    let (employer_user, employer) = seed_employer(&store, "Erin Employer").await;
    let posting = publish(&store, &employer, "Barista").await;
    World {
        store,
        seeker_user,
        seeker,
        employer_user,
        employer,
        posting,
    }
}

/// Failure modes injected by [`FaultyStore`]. Each fires once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum Fault {
    /// Posting back-reference update fails.
    LinkPosting,
    /// Chat thread insert fails.
    CreateThread,
    /// Thread deletion by employer fails mid-cascade.
    DeleteThreadsByEmployer,
    /// Another request inserts the same (seeker, posting) just before us.
    RacingDuplicate,
    /// The employer is deleted right after our application insert lands.
    EmployerVanishesAfterInsert,
    /// An in-flight submission lands after the cascade's application pass.
    ApplicationDuringCascade,
    /// The employer is deleted and its whole cascade runs just before a
    /// chat thread insert lands.
    CascadeBeforeThread,
    /// Another request opens the same application's thread just before us.
    RacingThread,
    /// A reviewer moves the application to rejected just before our status
    /// write.
    RejectedBeforeStatusWrite,
    /// A reconciliation pass removes the employer profile just before the
    /// account deletion reaches it.
    EmployerProfileTakenByReconcile,
}

/// Delegates to an [`InMemoryStore`] while injecting one-shot faults.
pub(super) struct FaultyStore {
    pub(super) inner: Arc<InMemoryStore>,
    faults: Mutex<HashSet<Fault>>,
}

impl FaultyStore {
    pub(super) fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashSet::new()),
        }
    }

    pub(super) fn arm(&self, fault: Fault) {
        self.faults.lock().expect("fault mutex poisoned").insert(fault);
    }

    fn fire(&self, fault: Fault) -> bool {
        self.faults.lock().expect("fault mutex poisoned").remove(&fault)
    }

    pub(super) fn armed(&self, fault: Fault) -> bool {
        self.faults.lock().expect("fault mutex poisoned").contains(&fault)
    }
}

fn injected(operation: &str) -> StoreError {
    StoreError::Unavailable(format!("injected failure in {operation}"))
}

#[async_trait]
impl DirectoryStore for FaultyStore {
    async fn user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.inner.user(id).await
    }

    async fn delete_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.inner.delete_user(id).await
    }

    async fn seeker(&self, id: &SeekerId) -> Result<Option<Seeker>, StoreError> {
        self.inner.seeker(id).await
    }

    async fn seeker_by_user(&self, user: &UserId) -> Result<Option<Seeker>, StoreError> {
        self.inner.seeker_by_user(user).await
    }

    async fn employer(&self, id: &EmployerId) -> Result<Option<Employer>, StoreError> {
        self.inner.employer(id).await
    }

    async fn employer_by_user(&self, user: &UserId) -> Result<Option<Employer>, StoreError> {
        self.inner.employer_by_user(user).await
    }

    async fn employers(&self) -> Result<Vec<Employer>, StoreError> {
        self.inner.employers().await
    }

    async fn delete_employer_by_user(
        &self,
        user: &UserId,
    ) -> Result<Option<Employer>, StoreError> {
        if self.fire(Fault::EmployerProfileTakenByReconcile) {
            self.inner.delete_employer_by_user(user).await?;
        }
        self.inner.delete_employer_by_user(user).await
    }

    async fn push_employer_posting(
        &self,
        employer: &EmployerId,
        posting: &PostingId,
    ) -> Result<Option<Employer>, StoreError> {
        self.inner.push_employer_posting(employer, posting).await
    }
}

#[async_trait]
impl PostingStore for FaultyStore {
    async fn insert_posting(&self, posting: JobPosting) -> Result<JobPosting, StoreError> {
        self.inner.insert_posting(posting).await
    }

    async fn posting(&self, id: &PostingId) -> Result<Option<JobPosting>, StoreError> {
        self.inner.posting(id).await
    }

    async fn posting_for_employer(
        &self,
        id: &PostingId,
        employer: &EmployerId,
    ) -> Result<Option<JobPosting>, StoreError> {
        self.inner.posting_for_employer(id, employer).await
    }

    async fn postings(&self) -> Result<Vec<JobPosting>, StoreError> {
        self.inner.postings().await
    }

    async fn postings_by_ids(&self, ids: &[PostingId]) -> Result<Vec<JobPosting>, StoreError> {
        self.inner.postings_by_ids(ids).await
    }

    async fn add_posting_application(
        &self,
        id: &PostingId,
        application: &ApplicationId,
    ) -> Result<Option<JobPosting>, StoreError> {
        if self.fire(Fault::LinkPosting) {
            return Err(injected("add_posting_application"));
        }
        self.inner.add_posting_application(id, application).await
    }

    async fn remove_posting_application(
        &self,
        id: &PostingId,
        application: &ApplicationId,
    ) -> Result<Option<JobPosting>, StoreError> {
        self.inner.remove_posting_application(id, application).await
    }

    async fn delete_posting(&self, id: &PostingId) -> Result<u64, StoreError> {
        self.inner.delete_posting(id).await
    }

    async fn delete_postings_by_employer(&self, employer: &EmployerId) -> Result<u64, StoreError> {
        self.inner.delete_postings_by_employer(employer).await
    }
}

#[async_trait]
impl ApplicationStore for FaultyStore {
    async fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, StoreError> {
        if self.fire(Fault::RacingDuplicate) {
            let winner = Application {
                id: ApplicationId::new(),
                ..application.clone()
            };
            self.inner.insert_application(winner).await?;
        }

        let stored = self.inner.insert_application(application).await?;

        if self.fire(Fault::EmployerVanishesAfterInsert) {
            self.inner.remove_employer(&stored.job_employer).await;
        }
        Ok(stored)
    }

    async fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        self.inner.application(id).await
    }

    async fn application_by_pair(
        &self,
        seeker: &SeekerId,
        posting: &PostingId,
    ) -> Result<Option<Application>, StoreError> {
        self.inner.application_by_pair(seeker, posting).await
    }

    async fn applications_for_seeker(
        &self,
        seeker: &SeekerId,
    ) -> Result<Vec<Application>, StoreError> {
        self.inner.applications_for_seeker(seeker).await
    }

    async fn applications_by_ids(
        &self,
        ids: &[ApplicationId],
    ) -> Result<Vec<Application>, StoreError> {
        self.inner.applications_by_ids(ids).await
    }

    async fn applications(&self) -> Result<Vec<Application>, StoreError> {
        self.inner.applications().await
    }

    async fn update_application_status(
        &self,
        id: &ApplicationId,
        change: StatusChange,
    ) -> Result<StatusUpdate, StoreError> {
        if self.fire(Fault::RejectedBeforeStatusWrite) {
            if let Some(current) = self.inner.application(id).await? {
                let rejection = StatusChange {
                    expected: current.status,
                    next: ApplicationStatus::Rejected,
                    chat_started: ApplicationStatus::Rejected.chat_enabled(),
                };
                self.inner.update_application_status(id, rejection).await?;
            }
        }
        self.inner.update_application_status(id, change).await
    }

    async fn delete_application(&self, id: &ApplicationId) -> Result<u64, StoreError> {
        self.inner.delete_application(id).await
    }

    async fn delete_applications_by_employer(
        &self,
        employer: &EmployerId,
    ) -> Result<u64, StoreError> {
        let removed = self.inner.delete_applications_by_employer(employer).await?;

        if self.fire(Fault::ApplicationDuringCascade) {
            // A submission that passed its employer check before the cascade
            // began lands only now.
            let late = Application {
                id: ApplicationId::new(),
                job_seeker: SeekerId::new(),
                job_posting: PostingId::new(),
                job_employer: *employer,
                status: ApplicationStatus::Pending,
                chat_started: false,
                created_at: Utc::now(),
            };
            self.inner
                .insert_chat_thread(ChatThread::for_application(&late))
                .await?;
            self.inner.insert_application(late).await?;
        }
        Ok(removed)
    }
}

#[async_trait]
impl ChatStore for FaultyStore {
    async fn insert_chat_thread(&self, thread: ChatThread) -> Result<ChatThread, StoreError> {
        if self.fire(Fault::CreateThread) {
            return Err(injected("insert_chat_thread"));
        }
        if self.fire(Fault::CascadeBeforeThread) {
            let employer = thread.employer;
            self.inner.remove_employer(&employer).await;
            self.inner.delete_postings_by_employer(&employer).await?;
            self.inner.delete_chat_threads_by_employer(&employer).await?;
            self.inner.delete_applications_by_employer(&employer).await?;
        }
        if self.fire(Fault::RacingThread) {
            let winner = ChatThread {
                id: ChatThreadId::new(),
                ..thread.clone()
            };
            self.inner.insert_chat_thread(winner).await?;
        }
        self.inner.insert_chat_thread(thread).await
    }

    async fn chat_thread_for_application(
        &self,
        application: &ApplicationId,
    ) -> Result<Option<ChatThread>, StoreError> {
        self.inner.chat_thread_for_application(application).await
    }

    async fn chat_threads(&self) -> Result<Vec<ChatThread>, StoreError> {
        self.inner.chat_threads().await
    }

    async fn delete_chat_thread(&self, id: &ChatThreadId) -> Result<u64, StoreError> {
        self.inner.delete_chat_thread(id).await
    }

    async fn delete_chat_threads_by_application(
        &self,
        application: &ApplicationId,
    ) -> Result<u64, StoreError> {
        self.inner.delete_chat_threads_by_application(application).await
    }

    async fn delete_chat_threads_by_employer(
        &self,
        employer: &EmployerId,
    ) -> Result<u64, StoreError> {
        if self.fire(Fault::DeleteThreadsByEmployer) {
            return Err(injected("delete_chat_threads_by_employer"));
        }
        self.inner.delete_chat_threads_by_employer(employer).await
    }
}

/// Store-wide snapshot used by consistency assertions.
pub(super) struct Snapshot {
    pub(super) postings: Vec<JobPosting>,
    pub(super) applications: Vec<Application>,
    pub(super) chat_threads: Vec<ChatThread>,
}

pub(super) async fn snapshot(store: &InMemoryStore) -> Snapshot {
    Snapshot {
        postings: store.postings().await.expect("postings"),
        applications: store.applications().await.expect("applications"),
        chat_threads: store.chat_threads().await.expect("threads"),
    }
}

impl Snapshot {
    pub(super) fn threads_for(&self, application: &ApplicationId) -> usize {
        self.chat_threads
            .iter()
            .filter(|thread| thread.application == *application)
            .count()
    }

    pub(super) fn posting(&self, id: &PostingId) -> Option<&JobPosting> {
        self.postings.iter().find(|posting| posting.id == *id)
    }

    /// No posting, thread or application references `employer`.
    pub(super) fn clear_of(&self, employer: &EmployerId) -> bool {
        self.postings.iter().all(|posting| posting.employer != *employer)
            && self
                .chat_threads
                .iter()
                .all(|thread| thread.employer != *employer)
            && self
                .applications
                .iter()
                .all(|application| application.job_employer != *employer)
    }
}
