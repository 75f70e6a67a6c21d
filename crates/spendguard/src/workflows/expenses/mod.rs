//! Expense intake, risk scoring, approval chains, and spend analytics.
//!
//! Submissions are enriched by best-effort collaborators, then stored together with their
//! risk score and approval steps in one store transaction. Decisions run through the
//! approval state machine under the same transactional guarantee.

pub mod analytics;
pub mod approvals;
pub mod authorization;
pub mod clock;
pub mod domain;
pub mod enrichment;
pub mod memory;
pub mod messaging;
pub mod repository;
pub mod risk;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use analytics::{DashboardReport, SpendRecord, UserStats};
pub use approvals::{
    ApprovalRoute, ApprovalWorkflow, DecisionOutcome, DecisionRequest, ManagerRoute,
    WorkflowError,
};
pub use authorization::{Authorization, ExpenseScope};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    Approval, ApprovalDecision, ApprovalId, ApprovalStatus, ApprovalWorkflowKind,
    ApprovalWorkflowRule, Company, CompanyId, Expense, ExpenseCategory, ExpenseId,
    ExpenseStatus, ExpenseSubmission, ExpenseUpdate, NewUser, Principal, ReceiptUpload, RiskLevel,
    RiskScore, Role, User, UserId, UserUpdate,
};
pub use enrichment::{
    CategoryClassifier, CurrencyConverter, Enrichment, ReceiptReader, StaticRateTable,
    UpstreamError,
};
pub use memory::InMemoryExpenseStore;
pub use messaging::MessageComposer;
pub use repository::{ExpenseFilter, ExpenseQueries, ExpenseStore, RepositoryError};
pub use risk::{RiskAssessment, RiskEngine, RiskPolicy};
pub use router::{expense_router, AuthenticatedPrincipal, DecisionPayload};
pub use service::{
    ExpenseService, ExpenseServiceError, ExpenseSettings, PendingApproval, RiskView,
    SubmissionReceipt,
};
