use super::common::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::expenses::domain::UserId;
use crate::workflows::expenses::router::{
    error_response, principal_from_headers, COMPANY_ID_HEADER, MANAGER_ID_HEADER,
    USER_ID_HEADER, USER_NAME_HEADER, USER_ROLE_HEADER,
};
use crate::workflows::expenses::repository::RepositoryError;
use crate::workflows::expenses::{expense_router, ExpenseServiceError, Role};

fn request(method: &str, uri: &str, actor: UserId, body: Option<Value>) -> Request<Body> {
    let principal = principal(actor);
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, principal.id.0.to_string())
        .header(USER_ROLE_HEADER, principal.role.label())
        .header(COMPANY_ID_HEADER, principal.company_id.0.to_string())
        .header(USER_NAME_HEADER, principal.display_name.clone());
    if let Some(manager) = principal.manager_id {
        builder = builder.header(MANAGER_ID_HEADER, manager.0.to_string());
    }
    match body {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

fn submission_json(amount: f64, date: &str) -> Value {
    json!({
        "amount": amount,
        "currency": "USD",
        "category": "travel",
        "description": "Airport taxi",
        "expense_date": date,
        "vendor": "Yellow Cab",
        "receipt": { "storage_key": "receipts/taxi.txt" }
    })
}

#[tokio::test]
async fn submit_then_approve_over_http() {
    let (service, _) = build_service();
    let app = expense_router(Arc::new(service));

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/expenses",
            EMPLOYEE,
            Some(submission_json(42.5, "2025-03-04T08:15:00")),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["risk_score"]["score"], json!(0));
    assert_eq!(created["risk_score"]["risk_level"], json!("low"));
    assert_eq!(created["expense"]["vendor"], json!("Yellow Cab"));
    let approval_id = created["approvals"][0]["id"]
        .as_u64()
        .expect("approval id");
    let expense_id = created["expense"]["id"].as_u64().expect("expense id");

    let pending = app
        .clone()
        .oneshot(request("GET", "/api/v1/approvals/pending", MANAGER, None))
        .await
        .expect("router responds");
    assert_eq!(pending.status(), StatusCode::OK);
    let pending = json_body(pending).await;
    assert_eq!(pending.as_array().map(Vec::len), Some(1));

    let decided = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/v1/approvals/{approval_id}"),
            MANAGER,
            Some(json!({ "status": "approved", "comments": "fine" })),
        ))
        .await
        .expect("router responds");
    assert_eq!(decided.status(), StatusCode::OK);
    let decided = json_body(decided).await;
    assert_eq!(decided["expense_status"], json!("approved"));

    let again = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/v1/approvals/{approval_id}"),
            MANAGER,
            Some(json!({ "status": "rejected" })),
        ))
        .await
        .expect("router responds");
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let chain = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/v1/approvals/expense/{expense_id}"),
            EMPLOYEE,
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(chain.status(), StatusCode::OK);
    assert_eq!(json_body(chain).await[0]["status"], json!("approved"));

    let risk = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/expenses/{expense_id}/risk"),
            EMPLOYEE,
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(risk.status(), StatusCode::OK);
    let risk = json_body(risk).await;
    assert!(risk["message"]
        .as_str()
        .is_some_and(|message| message.contains("Priya Patel")));
}

#[tokio::test]
async fn missing_principal_headers_are_unauthorized() {
    let (service, _) = build_service();
    let app = expense_router(Arc::new(service));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/expenses")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn foreign_viewer_is_forbidden_and_missing_is_not_found() {
    let (service, _) = build_service();
    let app = expense_router(Arc::new(service));

    let created = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/expenses",
            EMPLOYEE,
            Some(submission_json(12.0, "2025-03-04T08:15:00")),
        ))
        .await
        .expect("router responds");
    let expense_id = json_body(created).await["expense"]["id"]
        .as_u64()
        .expect("expense id");

    let forbidden = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/v1/expenses/{expense_id}"),
            OUTSIDER,
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let missing = app
        .oneshot(request("GET", "/api/v1/expenses/9999", ADMIN, None))
        .await
        .expect("router responds");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_submission_is_unprocessable() {
    let (service, _) = build_service();
    let app = expense_router(Arc::new(service));

    let response = app
        .oneshot(request(
            "POST",
            "/api/v1/expenses",
            EMPLOYEE,
            Some(submission_json(-5.0, "2025-03-04T08:15:00")),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn analytics_endpoints_respond() {
    let (service, _) = build_service();
    let app = expense_router(Arc::new(service));

    app.clone()
        .oneshot(request(
            "POST",
            "/api/v1/expenses",
            EMPLOYEE,
            Some(submission_json(250.0, "2025-03-04T08:15:00")),
        ))
        .await
        .expect("router responds");

    let dashboard = app
        .clone()
        .oneshot(request("GET", "/api/v1/analytics/dashboard", ADMIN, None))
        .await
        .expect("router responds");
    assert_eq!(dashboard.status(), StatusCode::OK);
    let dashboard = json_body(dashboard).await;
    assert_eq!(dashboard["currency"], json!("USD"));
    assert_eq!(dashboard["total_spend"], json!(250.0));
    assert_eq!(dashboard["approval_stats"]["pending"], json!(1));

    let stats = app
        .oneshot(request("GET", "/api/v1/analytics/user-stats", EMPLOYEE, None))
        .await
        .expect("router responds");
    assert_eq!(stats.status(), StatusCode::OK);
    assert_eq!(json_body(stats).await["total_submitted"], json!(1));
}

#[tokio::test]
async fn user_directory_over_http() {
    let (service, _) = build_service();
    let app = expense_router(Arc::new(service));

    let listed = app
        .clone()
        .oneshot(request("GET", "/api/v1/users", ADMIN, None))
        .await
        .expect("router responds");
    assert_eq!(listed.status(), StatusCode::OK);
    assert_eq!(
        json_body(listed).await.as_array().map(Vec::len),
        Some(6)
    );

    let created = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/users",
            ADMIN,
            Some(json!({ "full_name": "Nia Novak", "manager_id": 2 })),
        ))
        .await
        .expect("router responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = json_body(created).await;
    assert_eq!(created["id"], json!(10));
    assert_eq!(created["role"], json!("employee"));
    assert_eq!(created["manager_id"], json!(2));

    let updated = app
        .clone()
        .oneshot(request(
            "PUT",
            "/api/v1/users/10",
            ADMIN,
            Some(json!({ "role": "manager" })),
        ))
        .await
        .expect("router responds");
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = json_body(updated).await;
    assert_eq!(updated["role"], json!("manager"));
    assert_eq!(updated["manager_id"], Value::Null);

    let forbidden = app
        .oneshot(request("GET", "/api/v1/users", EMPLOYEE, None))
        .await
        .expect("router responds");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn repository_errors_map_to_status_codes() {
    let unavailable = error_response(ExpenseServiceError::Repository(
        RepositoryError::Unavailable("offline".to_string()),
    ));
    assert_eq!(unavailable.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(unavailable).await;
    assert_eq!(body["error"], json!("repository unavailable: offline"));

    let conflict = error_response(ExpenseServiceError::Repository(RepositoryError::Conflict));
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
}

#[test]
fn principal_headers_parse_and_validate() {
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(USER_ID_HEADER, "3".parse().expect("header value"));
    headers.insert(USER_ROLE_HEADER, "Employee".parse().expect("header value"));
    headers.insert(COMPANY_ID_HEADER, "1".parse().expect("header value"));

    let principal = principal_from_headers(&headers).expect("principal parses");
    assert_eq!(principal.id, EMPLOYEE);
    assert_eq!(principal.role, Role::Employee);
    assert_eq!(principal.manager_id, None);
    assert_eq!(principal.display_name, "User 3");

    headers.insert(MANAGER_ID_HEADER, "boss".parse().expect("header value"));
    assert!(principal_from_headers(&headers).is_err());

    headers.remove(MANAGER_ID_HEADER);
    headers.insert(USER_ROLE_HEADER, "auditor".parse().expect("header value"));
    assert!(principal_from_headers(&headers).is_err());
}
