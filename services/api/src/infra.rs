use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use spendguard::workflows::expenses::{
    ApprovalRoute, Company, CompanyId, Expense, InMemoryExpenseStore, Principal,
    RepositoryError, Role, User, UserId,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) const DEMO_COMPANY: CompanyId = CompanyId(1);
pub(crate) const DEMO_ADMIN: UserId = UserId(1);
pub(crate) const DEMO_MANAGER: UserId = UserId(2);
pub(crate) const DEMO_FINANCE: UserId = UserId(3);
pub(crate) const DEMO_EMPLOYEE: UserId = UserId(4);

pub(crate) fn demo_directory() -> Vec<User> {
    let member = |id, role, manager_id, name: &str| User {
        id,
        company_id: DEMO_COMPANY,
        role,
        manager_id,
        full_name: name.to_string(),
    };
    vec![
        member(DEMO_ADMIN, Role::Admin, None, "Avery Admin"),
        member(DEMO_MANAGER, Role::Manager, None, "Morgan Lee"),
        member(DEMO_FINANCE, Role::Manager, None, "Farah Khan"),
        member(DEMO_EMPLOYEE, Role::Employee, Some(DEMO_MANAGER), "Sam Rivera"),
    ]
}

pub(crate) fn demo_user(id: UserId) -> Option<User> {
    demo_directory().into_iter().find(|user| user.id == id)
}

/// Registers the demo company and its staff.
pub(crate) fn seed_demo_directory(
    store: &InMemoryExpenseStore,
    currency: &str,
) -> Result<(), RepositoryError> {
    store.register_company(Company {
        id: DEMO_COMPANY,
        name: "Northwind Traders".to_string(),
        country: "US".to_string(),
        currency: currency.to_string(),
    })?;
    for user in demo_directory() {
        store.register_user(user)?;
    }
    Ok(())
}

/// Manager sign-off followed by the demo finance reviewer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FinanceReviewRoute {
    pub(crate) finance: UserId,
}

impl ApprovalRoute for FinanceReviewRoute {
    fn approvers(&self, _expense: &Expense, submitter: &Principal) -> Vec<UserId> {
        let mut approvers: Vec<UserId> = submitter.manager_id.into_iter().collect();
        if submitter.id != self.finance && !approvers.contains(&self.finance) {
            approvers.push(self.finance);
        }
        approvers
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
