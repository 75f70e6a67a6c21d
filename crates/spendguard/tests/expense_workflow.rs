//! End-to-end expense scenarios driven through the public service facade: submission,
//! scoring, the approval chain, and the dashboard it all feeds.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal_macros::dec;

use spendguard::config::ExpenseConfig;
use spendguard::workflows::expenses::analytics::InsightKind;
use spendguard::workflows::expenses::{
    ApprovalDecision, ApprovalStatus, Company, CompanyId, ExpenseCategory, ExpenseService,
    ExpenseServiceError, ExpenseStatus, ExpenseSubmission, FixedClock, InMemoryExpenseStore,
    Principal, RiskLevel, Role, User, UserId,
};

const ACME: CompanyId = CompanyId(10);
const LEAD: UserId = UserId(20);
const ANALYST: UserId = UserId(21);

fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(9, 0, 0))
        .expect("valid timestamp")
}

fn member(id: UserId, role: Role, manager_id: Option<UserId>, name: &str) -> User {
    User {
        id,
        company_id: ACME,
        role,
        manager_id,
        full_name: name.to_string(),
    }
}

fn setup() -> (ExpenseService<InMemoryExpenseStore>, Principal, Principal) {
    let store = InMemoryExpenseStore::new();
    store
        .register_company(Company {
            id: ACME,
            name: "Acme Corp".to_string(),
            country: "GB".to_string(),
            currency: "GBP".to_string(),
        })
        .expect("company registers");
    let lead = member(LEAD, Role::Manager, None, "Lena Lead");
    let analyst = member(ANALYST, Role::Employee, Some(LEAD), "Ari Analyst");
    store.register_user(lead.clone()).expect("lead registers");
    store
        .register_user(analyst.clone())
        .expect("analyst registers");

    let config = ExpenseConfig {
        reporting_currency: "GBP".to_string(),
        fx_rates: vec![("USD".to_string(), dec!(0.80))],
        message_seed: Some(7),
    };
    // Monday after the weekend trip.
    let service = ExpenseService::from_config(Arc::new(store), &config)
        .with_clock(Arc::new(FixedClock(at(2025, 3, 10))));

    (service, lead.principal(), analyst.principal())
}

fn trip(amount: rust_decimal::Decimal) -> ExpenseSubmission {
    ExpenseSubmission {
        amount,
        currency: "GBP".to_string(),
        category: ExpenseCategory::Travel,
        description: "Conference hotel".to_string(),
        // Saturday.
        expense_date: at(2025, 3, 8),
        vendor: Some("Grand Hotel".to_string()),
        receipt: None,
    }
}

#[test]
fn scored_submissions_flow_through_approval_into_the_dashboard() {
    let (service, lead, analyst) = setup();

    let first = service
        .submit(&analyst, trip(dec!(6000)))
        .expect("first submission");
    assert_eq!(first.risk_score.score, 45);
    assert_eq!(first.risk_score.risk_level, RiskLevel::Medium);
    assert!(first.message.contains("Ari Analyst"));
    assert_eq!(first.approvals.len(), 1);
    assert_eq!(first.approvals[0].approver_id, LEAD);

    let second = service
        .submit(&analyst, trip(dec!(6000)))
        .expect("second submission");
    assert_eq!(second.risk_score.score, 70);
    assert_eq!(second.risk_score.risk_level, RiskLevel::High);
    assert!(second
        .risk_score
        .factors
        .contains(&"Potential duplicate (1 similar expenses)".to_string()));

    let pending = service.pending_approvals(&lead).expect("pending loads");
    assert_eq!(pending.len(), 2);
    assert!(pending
        .iter()
        .all(|item| item.submitter.as_ref().map(|user| user.id) == Some(ANALYST)));

    let rejected = service
        .decide(
            &lead,
            first.approvals[0].id,
            ApprovalDecision::Rejected,
            Some("  duplicate booking ".to_string()),
        )
        .expect("rejection recorded");
    assert_eq!(rejected.expense_status, ExpenseStatus::Rejected);
    assert_eq!(rejected.approval.comments.as_deref(), Some("duplicate booking"));

    let approved = service
        .decide(&lead, second.approvals[0].id, ApprovalDecision::Approved, None)
        .expect("approval recorded");
    assert_eq!(approved.expense_status, ExpenseStatus::Approved);
    assert_eq!(approved.approval.status, ApprovalStatus::Approved);

    let again = service.decide(&lead, second.approvals[0].id, ApprovalDecision::Rejected, None);
    assert!(matches!(again, Err(ExpenseServiceError::InvalidState(_))));

    let report = service.dashboard(&lead).expect("dashboard builds");
    assert_eq!(report.currency, "GBP");
    assert_eq!(report.summary.total_spend, dec!(12000));
    assert_eq!(report.summary.risk_distribution.medium, 1);
    assert_eq!(report.summary.risk_distribution.high, 1);
    assert_eq!(report.summary.approval_stats.approved, 1);
    assert_eq!(report.summary.approval_stats.rejected, 1);
    assert_eq!(report.summary.approval_stats.pending, 0);
    assert!(report
        .insights
        .iter()
        .any(|insight| insight.kind == InsightKind::Risk));
    assert_eq!(
        report
            .policy_suggestions
            .iter()
            .map(|suggestion| suggestion.title)
            .collect::<Vec<_>>(),
        vec!["Travel Policy Review"]
    );

    let stats = service.user_stats(&analyst).expect("stats build");
    assert_eq!(stats.total_submitted, 2);
    assert_eq!(stats.total_amount, dec!(12000));
    assert_eq!(stats.approval_rate, 50.0);
}

#[test]
fn foreign_currency_is_reported_in_company_currency() {
    let (service, lead, analyst) = setup();
    let mut payload = trip(dec!(100));
    payload.currency = "usd".to_string();
    payload.expense_date = at(2025, 3, 4);

    let receipt = service.submit(&analyst, payload).expect("submission");
    assert_eq!(receipt.expense.currency, "USD");
    assert_eq!(receipt.expense.converted_amount, Some(dec!(80.00)));

    let view = service
        .risk_view(&analyst, receipt.expense.id)
        .expect("risk view");
    assert_eq!(view.factors, vec!["No receipt uploaded".to_string()]);
    assert_eq!(view.risk_level, RiskLevel::Low);

    let listed = service.list(&lead).expect("manager lists team");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, receipt.expense.id);
}
