use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{
    ApprovalDecision, ApprovalId, CompanyId, ExpenseId, ExpenseSubmission, ExpenseUpdate,
    NewUser, Principal, Role, UserId, UserUpdate,
};
use super::repository::{ExpenseStore, RepositoryError};
use super::service::{ExpenseService, ExpenseServiceError};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const COMPANY_ID_HEADER: &str = "x-company-id";
pub const MANAGER_ID_HEADER: &str = "x-manager-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Router builder exposing expense, approval, analytics, and directory endpoints.
pub fn expense_router<S>(service: Arc<ExpenseService<S>>) -> Router
where
    S: ExpenseStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/expenses",
            get(list_handler::<S>).post(submit_handler::<S>),
        )
        .route(
            "/api/v1/expenses/:expense_id",
            get(get_handler::<S>).put(update_handler::<S>),
        )
        .route("/api/v1/expenses/:expense_id/risk", get(risk_handler::<S>))
        .route("/api/v1/approvals/pending", get(pending_handler::<S>))
        .route("/api/v1/approvals/:approval_id", put(decide_handler::<S>))
        .route(
            "/api/v1/approvals/expense/:expense_id",
            get(expense_approvals_handler::<S>),
        )
        .route("/api/v1/analytics/dashboard", get(dashboard_handler::<S>))
        .route("/api/v1/analytics/user-stats", get(user_stats_handler::<S>))
        .route(
            "/api/v1/users",
            get(list_users_handler::<S>).post(create_user_handler::<S>),
        )
        .route("/api/v1/users/:user_id", put(update_user_handler::<S>))
        .with_state(service)
}

/// Principal asserted by the upstream gateway through request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal(pub Principal);

#[async_trait]
impl<T> FromRequestParts<T> for AuthenticatedPrincipal
where
    T: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &T) -> Result<Self, Self::Rejection> {
        principal_from_headers(&parts.headers)
            .map(Self)
            .map_err(|reason| {
                let payload = json!({ "error": reason });
                (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
            })
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, String> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::trim)
                .map_err(|_| format!("{name} is not valid text"))
        })
        .transpose()
}

fn parse_id(headers: &HeaderMap, name: &str) -> Result<Option<u64>, String> {
    header_value(headers, name)?
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|_| format!("{name} must be a numeric id"))
        })
        .transpose()
}

pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, String> {
    let id = parse_id(headers, USER_ID_HEADER)?
        .ok_or_else(|| format!("missing {USER_ID_HEADER} header"))?;
    let role = header_value(headers, USER_ROLE_HEADER)?
        .ok_or_else(|| format!("missing {USER_ROLE_HEADER} header"))
        .and_then(|raw| Role::parse(raw).ok_or_else(|| format!("unknown role {raw:?}")))?;
    let company_id = parse_id(headers, COMPANY_ID_HEADER)?
        .ok_or_else(|| format!("missing {COMPANY_ID_HEADER} header"))?;
    let manager_id = parse_id(headers, MANAGER_ID_HEADER)?;
    let display_name = header_value(headers, USER_NAME_HEADER)?
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("User {id}"));

    Ok(Principal {
        id: UserId(id),
        role,
        company_id: CompanyId(company_id),
        manager_id: manager_id.map(UserId),
        display_name,
    })
}

/// Body of `PUT /api/v1/approvals/:approval_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionPayload {
    pub status: ApprovalDecision,
    #[serde(default)]
    pub comments: Option<String>,
}

pub(crate) fn error_response(error: ExpenseServiceError) -> Response {
    let status = match &error {
        ExpenseServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ExpenseServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ExpenseServiceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        ExpenseServiceError::InvalidState(_) => StatusCode::CONFLICT,
        ExpenseServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ExpenseServiceError::Repository(_) => {
            error!(error = %error, "expense store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn respond<T>(result: Result<T, ExpenseServiceError>, success: StatusCode) -> Response
where
    T: serde::Serialize,
{
    match result {
        Ok(body) => (success, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    axum::Json(submission): axum::Json<ExpenseSubmission>,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(service.submit(&principal, submission), StatusCode::CREATED)
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(service.list(&principal), StatusCode::OK)
}

pub(crate) async fn get_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(expense_id): Path<u64>,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(service.get(&principal, ExpenseId(expense_id)), StatusCode::OK)
}

pub(crate) async fn update_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(expense_id): Path<u64>,
    axum::Json(changes): axum::Json<ExpenseUpdate>,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(
        service.update(&principal, ExpenseId(expense_id), changes),
        StatusCode::OK,
    )
}

pub(crate) async fn risk_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(expense_id): Path<u64>,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(
        service.risk_view(&principal, ExpenseId(expense_id)),
        StatusCode::OK,
    )
}

pub(crate) async fn pending_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(service.pending_approvals(&principal), StatusCode::OK)
}

pub(crate) async fn decide_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(approval_id): Path<u64>,
    axum::Json(payload): axum::Json<DecisionPayload>,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(
        service.decide(
            &principal,
            ApprovalId(approval_id),
            payload.status,
            payload.comments,
        ),
        StatusCode::OK,
    )
}

pub(crate) async fn expense_approvals_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(expense_id): Path<u64>,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(
        service.expense_approvals(&principal, ExpenseId(expense_id)),
        StatusCode::OK,
    )
}

pub(crate) async fn dashboard_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(service.dashboard(&principal), StatusCode::OK)
}

pub(crate) async fn user_stats_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(service.user_stats(&principal), StatusCode::OK)
}

pub(crate) async fn list_users_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(service.list_users(&principal), StatusCode::OK)
}

pub(crate) async fn create_user_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    axum::Json(user): axum::Json<NewUser>,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(service.create_user(&principal, user), StatusCode::CREATED)
}

pub(crate) async fn update_user_handler<S>(
    State(service): State<Arc<ExpenseService<S>>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(user_id): Path<u64>,
    axum::Json(update): axum::Json<UserUpdate>,
) -> Response
where
    S: ExpenseStore + 'static,
{
    respond(
        service.update_user(&principal, UserId(user_id), update),
        StatusCode::OK,
    )
}
