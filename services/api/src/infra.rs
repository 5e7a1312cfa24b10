use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use jobboard::marketplace::{
    DirectoryStore, Employer, EmployerId, InMemoryStore, JobPosting, Marketplace,
    MarketplaceError, PostingStore, Principal, Role, Seeker, SeekerId, User, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

pub(crate) const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub(crate) const PRINCIPAL_EMAIL_HEADER: &str = "x-principal-email";
pub(crate) const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";

pub(crate) type Market = Marketplace<InMemoryStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Error surface of the HTTP adapter. Marketplace errors are mapped to status
/// codes here and nowhere else.
#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthenticated,
    WrongRole { required: Role },
    Marketplace(MarketplaceError),
}

impl From<MarketplaceError> for ApiError {
    fn from(value: MarketplaceError) -> Self {
        Self::Marketplace(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "missing or invalid principal".to_string(),
            ),
            ApiError::WrongRole { required } => {
                (StatusCode::FORBIDDEN, format!("{} role required", required.label()))
            }
            ApiError::Marketplace(err) => match &err {
                MarketplaceError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                MarketplaceError::Forbidden => (StatusCode::FORBIDDEN, err.to_string()),
                MarketplaceError::Conflict(reason) => {
                    (StatusCode::CONFLICT, reason.label().to_string())
                }
                MarketplaceError::Internal(source) => {
                    error!(error = ?source, "marketplace store failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
            },
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Principal forwarded by the upstream auth gateway.
#[derive(Debug, Clone)]
pub(crate) struct Caller(pub(crate) Principal);

impl Caller {
    pub(crate) fn require(self, role: Role) -> Result<Principal, ApiError> {
        if self.0.role == role {
            Ok(self.0)
        } else {
            warn!(principal = %self.0.id, role = self.0.role.label(), required = role.label(), "role check failed");
            Err(ApiError::WrongRole { required: role })
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        principal_from_headers(&parts.headers).map(Caller)
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub(crate) fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, ApiError> {
    let id = header_value(headers, PRINCIPAL_ID_HEADER)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .map(UserId::from)
        .ok_or(ApiError::Unauthenticated)?;
    let role = header_value(headers, PRINCIPAL_ROLE_HEADER)
        .and_then(Role::parse)
        .ok_or(ApiError::Unauthenticated)?;
    let email = header_value(headers, PRINCIPAL_EMAIL_HEADER)
        .unwrap_or_default()
        .to_string();

    Ok(Principal { id, email, role })
}

/// Accounts seeded for the demo and for `serve --seed-demo`. Registration is
/// owned by the auth service, so this stands in for it.
#[derive(Debug, Clone)]
pub(crate) struct DemoDirectory {
    pub(crate) seeker: User,
    pub(crate) seeker_profile: Seeker,
    pub(crate) employer: User,
    pub(crate) employer_profile: Employer,
    pub(crate) rival: User,
    pub(crate) admin: User,
    pub(crate) posting: JobPosting,
}

impl DemoDirectory {
    pub(crate) fn principal(user: &User) -> Principal {
        Principal {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

fn demo_user(role: Role, name: &str, email: &str) -> User {
    User {
        id: UserId::new(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: String::new(),
        role,
        created_at: Utc::now(),
    }
}

async fn demo_employer(store: &InMemoryStore, name: &str, email: &str) -> (User, Employer) {
    let user = store.seed_user(demo_user(Role::Employer, name, email)).await;
    let employer = store
        .seed_employer(Employer {
            id: EmployerId::new(),
            user: user.id,
            job_postings: Vec::new(),
        })
        .await;
    (user, employer)
}

/// Seeker S1, employers E1 and E2, an admin, and posting J1 owned by E1.
pub(crate) async fn seed_demo_directory(
    store: &InMemoryStore,
) -> Result<DemoDirectory, MarketplaceError> {
    let seeker = store
        .seed_user(demo_user(Role::Seeker, "Sam Rivera", "sam.rivera@example.test"))
        .await;
    let seeker_profile = store
        .seed_seeker(Seeker {
            id: SeekerId::new(),
            user: seeker.id,
            skills: vec!["barista".to_string(), "latte art".to_string()],
        })
        .await;
    let (employer, employer_profile) =
        demo_employer(store, "Harbor Coffee", "hiring@harbor.example.test").await;
    let (rival, _) = demo_employer(store, "Dockside Diner", "jobs@dockside.example.test").await;
    let admin = store
        .seed_user(demo_user(Role::Admin, "Operations", "ops@example.test"))
        .await;

    let employer_id = employer_profile.id;
    let posting = store
        .insert_posting(JobPosting::new(employer_id, "Barista"))
        .await?;
    let employer_profile = store
        .push_employer_posting(&employer_id, &posting.id)
        .await?
        .unwrap_or(employer_profile);

    Ok(DemoDirectory {
        seeker,
        seeker_profile,
        employer,
        employer_profile,
        rival,
        admin,
        posting,
    })
}
