use crate::infra::{deserialize_optional_date, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use spendguard::error::AppError;
use spendguard::workflows::expenses::{expense_router, DashboardReport, ExpenseService, ExpenseStore};
use spendguard::workflows::ledger::LedgerImporter;
use std::io::Cursor;
use std::sync::Arc;

/// Offline dashboard over an expense export posted inline.
#[derive(Debug, Deserialize)]
pub(crate) struct LedgerDashboardRequest {
    pub(crate) expenses_csv: String,
    #[serde(default = "default_currency")]
    pub(crate) currency: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

fn default_currency() -> String {
    "USD".to_string()
}

pub(crate) fn with_expense_routes<S>(service: Arc<ExpenseService<S>>) -> axum::Router
where
    S: ExpenseStore + 'static,
{
    expense_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/ledger/dashboard",
            axum::routing::post(ledger_dashboard_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn ledger_dashboard_endpoint(
    Json(payload): Json<LedgerDashboardRequest>,
) -> Result<Json<DashboardReport>, AppError> {
    let LedgerDashboardRequest {
        expenses_csv,
        currency,
        today,
    } = payload;

    let ledger = LedgerImporter::from_reader(Cursor::new(expenses_csv.into_bytes()))?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let currency = currency.trim().to_ascii_uppercase();

    Ok(Json(ledger.dashboard(&currency, today)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use rust_decimal_macros::dec;
    use spendguard::workflows::expenses::{
        Enrichment, ExpenseSettings, InMemoryExpenseStore, MessageComposer, StaticRateTable,
    };
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    const EXPORT: &str = "owner_id,amount,currency,converted_amount,category,description,expense_date,vendor,status,risk_level\n\
4,300.00,USD,300.00,travel,Flight,2025-05-02,SkyAir,approved,medium\n\
4,60.00,USD,60.00,meals,Dinner,2025-05-03,Bistro,pending,high\n";

    fn app(ready: bool) -> axum::Router {
        let service = Arc::new(ExpenseService::new(
            Arc::new(InMemoryExpenseStore::new()),
            Enrichment::local(StaticRateTable::new("USD", Vec::new())),
            MessageComposer::seeded(1),
            ExpenseSettings::default(),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_expense_routes(service).layer(Extension(state))
    }

    #[tokio::test]
    async fn ledger_dashboard_endpoint_summarizes_export() {
        let request = LedgerDashboardRequest {
            expenses_csv: EXPORT.to_string(),
            currency: "usd".to_string(),
            today: NaiveDate::from_ymd_opt(2025, 6, 1),
        };

        let Json(report) = ledger_dashboard_endpoint(Json(request))
            .await
            .expect("dashboard builds");

        assert_eq!(report.currency, "USD");
        assert_eq!(report.summary.total_spend, dec!(360.00));
        assert_eq!(report.summary.risk_distribution.high, 1);
        assert_eq!(report.policy_suggestions.len(), 1);
        assert_eq!(report.policy_suggestions[0].title, "Travel Policy Review");
    }

    #[tokio::test]
    async fn ledger_dashboard_endpoint_rejects_bad_rows() {
        let request = LedgerDashboardRequest {
            expenses_csv: EXPORT.replace("meals", "snacks"),
            currency: default_currency(),
            today: None,
        };

        let err = ledger_dashboard_endpoint(Json(request))
            .await
            .expect_err("unknown category rejected");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_and_readiness_endpoints_report_status() {
        let health = app(false)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(health.status(), StatusCode::OK);

        let initializing = app(false)
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(initializing.status(), StatusCode::SERVICE_UNAVAILABLE);

        let ready = app(true)
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn expense_routes_are_mounted() {
        let response = app(true)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/expenses")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        // No gateway headers.
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
