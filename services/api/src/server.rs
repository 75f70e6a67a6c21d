use crate::cli::ServeArgs;
use crate::infra::{seed_demo_directory, AppState, FinanceReviewRoute, DEMO_FINANCE};
use crate::routes::with_expense_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use spendguard::config::AppConfig;
use spendguard::error::AppError;
use spendguard::telemetry;
use spendguard::workflows::expenses::{ExpenseService, InMemoryExpenseStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryExpenseStore::new());
    let mut service = ExpenseService::from_config(store.clone(), &config.expenses);
    if args.seed_demo {
        match seed_demo_directory(&store, &config.expenses.reporting_currency) {
            Ok(()) => {
                info!("demo company registered with finance review");
                service = service.with_route(Arc::new(FinanceReviewRoute {
                    finance: DEMO_FINANCE,
                }));
            }
            Err(err) => warn!(error = %err, "demo directory could not be registered"),
        }
    }

    let app = with_expense_routes(Arc::new(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "expense service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
