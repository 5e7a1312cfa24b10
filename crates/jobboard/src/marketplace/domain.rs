use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// Account identifier issued by the auth collaborator.
    UserId
);
entity_id!(
    /// Seeker profile identifier.
    SeekerId
);
entity_id!(
    /// Employer profile identifier.
    EmployerId
);
entity_id!(
    /// Job posting identifier.
    PostingId
);
entity_id!(
    /// Identifier wrapper for submitted applications.
    ApplicationId
);
entity_id!(
    /// Chat thread identifier handed to the message transport.
    ChatThreadId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Seeker,
    Employer,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Seeker => "seeker",
            Role::Employer => "employer",
            Role::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "seeker" | "job_seeker" | "jobseeker" => Some(Role::Seeker),
            "employer" => Some(Role::Employer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Caller identity as vouched for by the auth collaborator. Passed explicitly
/// into every operation; the core never verifies credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seeker {
    pub id: SeekerId,
    pub user: UserId,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employer {
    pub id: EmployerId,
    pub user: UserId,
    pub job_postings: Vec<PostingId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: PostingId,
    pub employer: EmployerId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Derived back-reference cache. Authorization fast path only; the
    /// application collection is authoritative.
    pub applications: Vec<ApplicationId>,
}

impl JobPosting {
    pub fn new(employer: EmployerId, title: impl Into<String>) -> Self {
        Self {
            id: PostingId::new(),
            employer,
            title: title.into(),
            created_at: Utc::now(),
            applications: Vec::new(),
        }
    }
}

/// Review status tracked for each application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Whether the chat thread is enabled while in this status.
    pub const fn chat_enabled(self) -> bool {
        matches!(self, ApplicationStatus::Accepted)
    }

    /// Only self-to-self is refused. Reverse transitions between accepted and
    /// rejected remain open until product policy says otherwise.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        self != next
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub job_seeker: SeekerId,
    pub job_posting: PostingId,
    /// Copied from the posting at creation and never rewritten.
    pub job_employer: EmployerId,
    pub status: ApplicationStatus,
    pub chat_started: bool,
    pub created_at: DateTime<Utc>,
}

impl Application {
    /// Fresh pending application for `seeker` on `posting`.
    pub fn submitted(seeker: SeekerId, posting: &JobPosting) -> Self {
        Self {
            id: ApplicationId::new(),
            job_seeker: seeker,
            job_posting: posting.id,
            job_employer: posting.employer,
            status: ApplicationStatus::Pending,
            chat_started: false,
            created_at: Utc::now(),
        }
    }

    pub fn chat_consistent(&self) -> bool {
        self.chat_started == self.status.chat_enabled()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatThread {
    pub id: ChatThreadId,
    pub application: ApplicationId,
    pub employer: EmployerId,
    pub seeker: SeekerId,
}

impl ChatThread {
    pub fn for_application(application: &Application) -> Self {
        Self {
            id: ChatThreadId::new(),
            application: application.id,
            employer: application.job_employer,
            seeker: application.job_seeker,
        }
    }
}

/// Entity kinds named in not-found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Seeker,
    Employer,
    JobPosting,
    Application,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Seeker => "seeker",
            EntityKind::Employer => "employer",
            EntityKind::JobPosting => "job posting",
            EntityKind::Application => "application",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
