use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Employer, EmployerId, JobPosting, PostingId,
    Role, Seeker, SeekerId, User, UserId,
};

/// One row of a seeker's "my applications" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeekerApplicationSummary {
    pub app_id: ApplicationId,
    pub app_status: ApplicationStatus,
    pub app_date: DateTime<Utc>,
    pub chat_started: bool,
    pub job_id: PostingId,
    pub job_title: String,
    pub job_created_at: DateTime<Utc>,
}

impl SeekerApplicationSummary {
    pub fn new(application: &Application, posting: &JobPosting) -> Self {
        Self {
            app_id: application.id,
            app_status: application.status,
            app_date: application.created_at,
            chat_started: application.chat_started,
            job_id: posting.id,
            job_title: posting.title.clone(),
            job_created_at: posting.created_at,
        }
    }
}

/// One applicant row on an employer's posting review screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingApplicationSummary {
    pub app_id: ApplicationId,
    pub app_status: ApplicationStatus,
    pub app_created_at: DateTime<Utc>,
    pub seeker_id: SeekerId,
    pub seeker_skills: Vec<String>,
    pub seeker_user_id: UserId,
    pub seeker_user_name: String,
    pub seeker_user_email: String,
}

impl PostingApplicationSummary {
    pub fn new(application: &Application, seeker: &Seeker, user: &User) -> Self {
        Self {
            app_id: application.id,
            app_status: application.status,
            app_created_at: application.created_at,
            seeker_id: seeker.id,
            seeker_skills: seeker.skills.clone(),
            seeker_user_id: user.id,
            seeker_user_name: user.name.clone(),
            seeker_user_email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingHeadline {
    pub job_post_id: PostingId,
    pub job_post_title: String,
}

/// Employer profile joined with its user record and posting titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerProfile {
    pub employer_id: EmployerId,
    pub user_id: UserId,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub job_postings: Vec<PostingHeadline>,
}

impl EmployerProfile {
    /// `postings` may be in any order; the employer's own ordering wins and
    /// ids without a stored posting are skipped.
    pub fn new(employer: &Employer, user: &User, postings: &[JobPosting]) -> Self {
        let job_postings = employer
            .job_postings
            .iter()
            .filter_map(|id| postings.iter().find(|posting| posting.id == *id))
            .map(|posting| PostingHeadline {
                job_post_id: posting.id,
                job_post_title: posting.title.clone(),
            })
            .collect();

        Self {
            employer_id: employer.id,
            user_id: user.id,
            role: user.role,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            job_postings,
        }
    }
}
