use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::workflows::expenses::approvals::ApprovalRoute;
use crate::workflows::expenses::domain::{
    Company, CompanyId, Expense, ExpenseCategory, ExpenseId, ExpenseStatus, ExpenseSubmission,
    Principal, ReceiptUpload, Role, User, UserId,
};
use crate::workflows::expenses::enrichment::{Enrichment, StaticRateTable};
use crate::workflows::expenses::repository::{
    ExpenseQueries, ExpenseStore, RepositoryError, StoreTransaction,
};
use crate::workflows::expenses::{
    ExpenseService, ExpenseSettings, FixedClock, InMemoryExpenseStore, MessageComposer,
};

pub(super) const COMPANY: CompanyId = CompanyId(1);
pub(super) const OTHER_COMPANY: CompanyId = CompanyId(2);
pub(super) const ADMIN: UserId = UserId(1);
pub(super) const MANAGER: UserId = UserId(2);
pub(super) const EMPLOYEE: UserId = UserId(3);
pub(super) const TEAMMATE: UserId = UserId(4);
pub(super) const FINANCE: UserId = UserId(5);
pub(super) const ORPHAN: UserId = UserId(6);
pub(super) const OUTSIDER: UserId = UserId(9);

pub(super) fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(10, 30, 0))
        .expect("valid timestamp")
}

/// Monday 2025-03-10.
pub(super) fn now() -> NaiveDateTime {
    at(2025, 3, 10)
}

/// Tuesday 2025-03-04.
pub(super) fn weekday() -> NaiveDateTime {
    at(2025, 3, 4)
}

/// Saturday 2025-03-08.
pub(super) fn saturday() -> NaiveDateTime {
    at(2025, 3, 8)
}

fn user(id: UserId, company_id: CompanyId, role: Role, manager: Option<UserId>, name: &str) -> User {
    User {
        id,
        company_id,
        role,
        manager_id: manager,
        full_name: name.to_string(),
    }
}

pub(super) fn directory() -> Vec<User> {
    vec![
        user(ADMIN, COMPANY, Role::Admin, None, "Alex Admin"),
        user(MANAGER, COMPANY, Role::Manager, None, "Morgan Manager"),
        user(EMPLOYEE, COMPANY, Role::Employee, Some(MANAGER), "Priya Patel"),
        user(TEAMMATE, COMPANY, Role::Employee, Some(MANAGER), "Tomas Ortiz"),
        user(FINANCE, COMPANY, Role::Manager, None, "Fran Finance"),
        user(ORPHAN, COMPANY, Role::Employee, None, "Olu Orphan"),
        user(OUTSIDER, OTHER_COMPANY, Role::Admin, None, "Olga Outside"),
    ]
}

pub(super) fn principal(id: UserId) -> Principal {
    directory()
        .into_iter()
        .find(|user| user.id == id)
        .map(|user| user.principal())
        .expect("user in directory")
}

pub(super) fn seeded_store() -> InMemoryExpenseStore {
    let store = InMemoryExpenseStore::new();
    store
        .register_company(Company {
            id: COMPANY,
            name: "Acme Corp".to_string(),
            country: "US".to_string(),
            currency: "USD".to_string(),
        })
        .expect("company registers");
    store
        .register_company(Company {
            id: OTHER_COMPANY,
            name: "Globex".to_string(),
            country: "DE".to_string(),
            currency: "EUR".to_string(),
        })
        .expect("company registers");
    for user in directory() {
        store.register_user(user).expect("user registers");
    }
    store
}

pub(super) fn enrichment() -> Enrichment {
    Enrichment::local(StaticRateTable::new(
        "USD",
        vec![("EUR".to_string(), dec!(1.10))],
    ))
}

pub(super) fn build_service() -> (
    ExpenseService<InMemoryExpenseStore>,
    Arc<InMemoryExpenseStore>,
) {
    let store = Arc::new(seeded_store());
    let service = ExpenseService::new(
        store.clone(),
        enrichment(),
        MessageComposer::seeded(42),
        ExpenseSettings::default(),
    )
    .with_clock(Arc::new(FixedClock(now())));
    (service, store)
}

pub(super) fn two_step_service() -> (
    ExpenseService<InMemoryExpenseStore>,
    Arc<InMemoryExpenseStore>,
) {
    let (service, store) = build_service();
    (service.with_route(Arc::new(ManagerThenFinance)), store)
}

pub(super) fn receipt(key: &str) -> ReceiptUpload {
    ReceiptUpload {
        storage_key: key.to_string(),
        content: b"Corner Bistro\n2025-03-04\nTotal $42.50".to_vec(),
    }
}

pub(super) fn submission(
    amount: Decimal,
    expense_date: NaiveDateTime,
    with_receipt: bool,
) -> ExpenseSubmission {
    ExpenseSubmission {
        amount,
        currency: "USD".to_string(),
        category: ExpenseCategory::Meals,
        description: "Client lunch".to_string(),
        expense_date,
        vendor: None,
        receipt: with_receipt.then(|| receipt("receipts/lunch.txt")),
    }
}

/// Bare expense for engine-level tests, already converted.
pub(super) fn expense(
    amount: Option<Decimal>,
    expense_date: NaiveDateTime,
    with_receipt: bool,
) -> Expense {
    Expense {
        id: ExpenseId(1),
        owner_id: EMPLOYEE,
        company_id: COMPANY,
        amount: amount.unwrap_or(dec!(10)),
        currency: "USD".to_string(),
        converted_amount: amount,
        category: ExpenseCategory::Travel,
        description: "Flight".to_string(),
        expense_date,
        vendor: None,
        receipt_key: with_receipt.then(|| "receipts/1.pdf".to_string()),
        suggested_category: None,
        status: ExpenseStatus::Pending,
        created_at: now(),
        updated_at: now(),
    }
}

/// Manager at step 1, finance at step 2.
pub(super) struct ManagerThenFinance;

impl ApprovalRoute for ManagerThenFinance {
    fn approvers(&self, _expense: &Expense, submitter: &Principal) -> Vec<UserId> {
        submitter
            .manager_id
            .into_iter()
            .chain(std::iter::once(FINANCE))
            .collect()
    }
}

pub(super) struct UnavailableStore;

impl ExpenseStore for UnavailableStore {
    fn read<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ExpenseQueries) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }

    fn transaction<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }
}
