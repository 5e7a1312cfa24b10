use async_trait::async_trait;
use tokio::sync::RwLock;

use super::domain::{
    Application, ApplicationId, ChatThread, ChatThreadId, Employer, EmployerId, JobPosting,
    PostingId, Seeker, SeekerId, User, UserId,
};
use super::store::{
    ApplicationStore, ChatStore, DirectoryStore, PostingStore, StatusChange, StatusUpdate,
    StoreError,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    seekers: Vec<Seeker>,
    employers: Vec<Employer>,
    postings: Vec<JobPosting>,
    applications: Vec<Application>,
    chat_threads: Vec<ChatThread>,
}

fn remove_where<T>(rows: &mut Vec<T>, predicate: impl Fn(&T) -> bool) -> u64 {
    let before = rows.len();
    rows.retain(|row| !predicate(row));
    (before - rows.len()) as u64
}

/// Process-local store used by the service binary, the demo and tests.
///
/// One lock guards every collection, so each call is atomic on its own while
/// consecutive calls interleave freely, matching a document store without
/// multi-document transactions. Collections keep insertion order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration is owned by the auth collaborator; these seed the
    /// directory the way that collaborator would.
    pub async fn seed_user(&self, user: User) -> User {
        let mut tables = self.tables.write().await;
        tables.users.push(user.clone());
        user
    }

    pub async fn seed_seeker(&self, seeker: Seeker) -> Seeker {
        let mut tables = self.tables.write().await;
        tables.seekers.push(seeker.clone());
        seeker
    }

    pub async fn seed_employer(&self, employer: Employer) -> Employer {
        let mut tables = self.tables.write().await;
        tables.employers.push(employer.clone());
        employer
    }

    /// Drop an employer document without any cascade, as a crashed or
    /// concurrent deletion would leave it.
    pub async fn remove_employer(&self, id: &EmployerId) -> u64 {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.employers, |employer| employer.id == *id)
    }
}

#[async_trait]
impl DirectoryStore for InMemoryStore {
    async fn user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|user| user.id == *id).cloned())
    }

    async fn delete_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        let position = tables.users.iter().position(|user| user.id == *id);
        Ok(position.map(|index| tables.users.remove(index)))
    }

    async fn seeker(&self, id: &SeekerId) -> Result<Option<Seeker>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.seekers.iter().find(|seeker| seeker.id == *id).cloned())
    }

    async fn seeker_by_user(&self, user: &UserId) -> Result<Option<Seeker>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .seekers
            .iter()
            .find(|seeker| seeker.user == *user)
            .cloned())
    }

    async fn employer(&self, id: &EmployerId) -> Result<Option<Employer>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .employers
            .iter()
            .find(|employer| employer.id == *id)
            .cloned())
    }

    async fn employer_by_user(&self, user: &UserId) -> Result<Option<Employer>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .employers
            .iter()
            .find(|employer| employer.user == *user)
            .cloned())
    }

    async fn employers(&self) -> Result<Vec<Employer>, StoreError> {
        Ok(self.tables.read().await.employers.clone())
    }

    async fn delete_employer_by_user(
        &self,
        user: &UserId,
    ) -> Result<Option<Employer>, StoreError> {
        let mut tables = self.tables.write().await;
        let position = tables
            .employers
            .iter()
            .position(|employer| employer.user == *user);
        Ok(position.map(|index| tables.employers.remove(index)))
    }

    async fn push_employer_posting(
        &self,
        employer: &EmployerId,
        posting: &PostingId,
    ) -> Result<Option<Employer>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .employers
            .iter_mut()
            .find(|row| row.id == *employer)
            .map(|row| {
                row.job_postings.push(*posting);
                row.clone()
            }))
    }
}

#[async_trait]
impl PostingStore for InMemoryStore {
    async fn insert_posting(&self, posting: JobPosting) -> Result<JobPosting, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.postings.iter().any(|row| row.id == posting.id) {
            return Err(StoreError::Conflict);
        }
        tables.postings.push(posting.clone());
        Ok(posting)
    }

    async fn posting(&self, id: &PostingId) -> Result<Option<JobPosting>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.postings.iter().find(|row| row.id == *id).cloned())
    }

    async fn posting_for_employer(
        &self,
        id: &PostingId,
        employer: &EmployerId,
    ) -> Result<Option<JobPosting>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .postings
            .iter()
            .find(|row| row.id == *id && row.employer == *employer)
            .cloned())
    }

    async fn postings(&self) -> Result<Vec<JobPosting>, StoreError> {
        Ok(self.tables.read().await.postings.clone())
    }

    async fn postings_by_ids(&self, ids: &[PostingId]) -> Result<Vec<JobPosting>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .postings
            .iter()
            .filter(|row| ids.contains(&row.id))
            .cloned()
            .collect())
    }

    async fn add_posting_application(
        &self,
        id: &PostingId,
        application: &ApplicationId,
    ) -> Result<Option<JobPosting>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .postings
            .iter_mut()
            .find(|row| row.id == *id)
            .map(|row| {
                if !row.applications.contains(application) {
                    row.applications.push(*application);
                }
                row.clone()
            }))
    }

    async fn remove_posting_application(
        &self,
        id: &PostingId,
        application: &ApplicationId,
    ) -> Result<Option<JobPosting>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .postings
            .iter_mut()
            .find(|row| row.id == *id)
            .map(|row| {
                row.applications.retain(|entry| entry != application);
                row.clone()
            }))
    }

    async fn delete_posting(&self, id: &PostingId) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.postings, |row| row.id == *id))
    }

    async fn delete_postings_by_employer(&self, employer: &EmployerId) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.postings, |row| {
            row.employer == *employer
        }))
    }
}

#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, StoreError> {
        let mut tables = self.tables.write().await;
        let taken = tables.applications.iter().any(|row| {
            row.id == application.id
                || (row.job_seeker == application.job_seeker
                    && row.job_posting == application.job_posting)
        });
        if taken {
            return Err(StoreError::Conflict);
        }
        tables.applications.push(application.clone());
        Ok(application)
    }

    async fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.applications.iter().find(|row| row.id == *id).cloned())
    }

    async fn application_by_pair(
        &self,
        seeker: &SeekerId,
        posting: &PostingId,
    ) -> Result<Option<Application>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .iter()
            .find(|row| row.job_seeker == *seeker && row.job_posting == *posting)
            .cloned())
    }

    async fn applications_for_seeker(
        &self,
        seeker: &SeekerId,
    ) -> Result<Vec<Application>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .iter()
            .filter(|row| row.job_seeker == *seeker)
            .cloned()
            .collect())
    }

    async fn applications_by_ids(
        &self,
        ids: &[ApplicationId],
    ) -> Result<Vec<Application>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .iter()
            .filter(|row| ids.contains(&row.id))
            .cloned()
            .collect())
    }

    async fn applications(&self) -> Result<Vec<Application>, StoreError> {
        Ok(self.tables.read().await.applications.clone())
    }

    async fn update_application_status(
        &self,
        id: &ApplicationId,
        change: StatusChange,
    ) -> Result<StatusUpdate, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.applications.iter_mut().find(|row| row.id == *id) else {
            return Ok(StatusUpdate::Missing);
        };
        if row.status != change.expected {
            return Ok(StatusUpdate::Stale(row.clone()));
        }
        row.status = change.next;
        row.chat_started = change.chat_started;
        Ok(StatusUpdate::Applied(row.clone()))
    }

    async fn delete_application(&self, id: &ApplicationId) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.applications, |row| row.id == *id))
    }

    async fn delete_applications_by_employer(
        &self,
        employer: &EmployerId,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.applications, |row| {
            row.job_employer == *employer
        }))
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn insert_chat_thread(&self, thread: ChatThread) -> Result<ChatThread, StoreError> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .chat_threads
            .iter()
            .any(|row| row.id == thread.id || row.application == thread.application);
        if taken {
            return Err(StoreError::Conflict);
        }
        tables.chat_threads.push(thread.clone());
        Ok(thread)
    }

    async fn chat_thread_for_application(
        &self,
        application: &ApplicationId,
    ) -> Result<Option<ChatThread>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .chat_threads
            .iter()
            .find(|row| row.application == *application)
            .cloned())
    }

    async fn chat_threads(&self) -> Result<Vec<ChatThread>, StoreError> {
        Ok(self.tables.read().await.chat_threads.clone())
    }

    async fn delete_chat_thread(&self, id: &ChatThreadId) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.chat_threads, |row| row.id == *id))
    }

    async fn delete_chat_threads_by_application(
        &self,
        application: &ApplicationId,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.chat_threads, |row| {
            row.application == *application
        }))
    }

    async fn delete_chat_threads_by_employer(
        &self,
        employer: &EmployerId,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.chat_threads, |row| {
            row.employer == *employer
        }))
    }
}
