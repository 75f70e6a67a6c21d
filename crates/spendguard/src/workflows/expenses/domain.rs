use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for stored expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(pub u64);

/// Identifier wrapper for approval steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScoreId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Employee,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Employee => "employee",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "employee" => Some(Self::Employee),
            _ => None,
        }
    }
}

/// Authenticated actor handed to the service by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
    pub company_id: CompanyId,
    pub manager_id: Option<UserId>,
    pub display_name: String,
}

/// Directory entry for a company member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub company_id: CompanyId,
    pub role: Role,
    pub manager_id: Option<UserId>,
    pub full_name: String,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            role: self.role,
            company_id: self.company_id,
            manager_id: self.manager_id,
            display_name: self.full_name.clone(),
        }
    }
}

/// Member added by an admin. The store assigns the id; the company is the admin's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub manager_id: Option<UserId>,
}

/// Replaces a member's role and manager. An absent manager clears the reporting line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub role: Role,
    #[serde(default)]
    pub manager_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub country: String,
    /// Reporting currency for converted amounts.
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Travel,
    Meals,
    Accommodation,
    OfficeSupplies,
    Entertainment,
    Transportation,
    Utilities,
    Software,
    Training,
    Other,
}

impl ExpenseCategory {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::Travel,
            Self::Meals,
            Self::Accommodation,
            Self::OfficeSupplies,
            Self::Entertainment,
            Self::Transportation,
            Self::Utilities,
            Self::Software,
            Self::Training,
            Self::Other,
        ]
    }

    /// Wire identifier, matching the serde representation.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Travel => "travel",
            Self::Meals => "meals",
            Self::Accommodation => "accommodation",
            Self::OfficeSupplies => "office_supplies",
            Self::Entertainment => "entertainment",
            Self::Transportation => "transportation",
            Self::Utilities => "utilities",
            Self::Software => "software",
            Self::Training => "training",
            Self::Other => "other",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Travel => "Travel",
            Self::Meals => "Meals",
            Self::Accommodation => "Accommodation",
            Self::OfficeSupplies => "Office Supplies",
            Self::Entertainment => "Entertainment",
            Self::Transportation => "Transportation",
            Self::Utilities => "Utilities",
            Self::Software => "Software",
            Self::Training => "Training",
            Self::Other => "Other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ordered()
            .into_iter()
            .find(|category| category.code() == normalized)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
}

impl ExpenseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Stored expense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub owner_id: UserId,
    pub company_id: CompanyId,
    pub amount: Decimal,
    pub currency: String,
    /// Amount in the company's reporting currency; absent until conversion has run.
    pub converted_amount: Option<Decimal>,
    pub category: ExpenseCategory,
    pub description: String,
    pub expense_date: NaiveDateTime,
    pub vendor: Option<String>,
    pub receipt_key: Option<String>,
    pub suggested_category: Option<ExpenseCategory>,
    pub status: ExpenseStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Expense {
    pub fn has_receipt(&self) -> bool {
        self.receipt_key.is_some()
    }

    /// Converted amount, counting missing conversions as zero for rollups.
    pub fn reporting_amount(&self) -> Decimal {
        self.converted_amount.unwrap_or(Decimal::ZERO)
    }
}

/// Insert payload for a new expense; the store assigns the id and starts it as pending.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub owner_id: UserId,
    pub company_id: CompanyId,
    pub amount: Decimal,
    pub currency: String,
    pub converted_amount: Option<Decimal>,
    pub category: ExpenseCategory,
    pub description: String,
    pub expense_date: NaiveDateTime,
    pub vendor: Option<String>,
    pub receipt_key: Option<String>,
    pub suggested_category: Option<ExpenseCategory>,
    pub created_at: NaiveDateTime,
}

/// Receipt handed over with a submission. `content` feeds the OCR collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptUpload {
    pub storage_key: String,
    #[serde(default)]
    pub content: Vec<u8>,
}

/// Submitter provided expense payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSubmission {
    pub amount: Decimal,
    pub currency: String,
    pub category: ExpenseCategory,
    pub description: String,
    pub expense_date: NaiveDateTime,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub receipt: Option<ReceiptUpload>,
}

/// Content edits allowed while an expense is still awaiting its first decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub category: Option<ExpenseCategory>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expense_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Terminal verdict an approver can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

impl ApprovalDecision {
    pub const fn status(self) -> ApprovalStatus {
        match self {
            Self::Approved => ApprovalStatus::Approved,
            Self::Rejected => ApprovalStatus::Rejected,
        }
    }
}

/// One sign-off step in an expense's approval chain (1 = manager, 2 = finance, 3 = director).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub expense_id: ExpenseId,
    pub approver_id: UserId,
    pub workflow_step: u32,
    pub status: ApprovalStatus,
    pub comments: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApproval {
    pub expense_id: ExpenseId,
    pub approver_id: UserId,
    pub workflow_step: u32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn ordered() -> [Self; 3] {
        [Self::Low, Self::Medium, Self::High]
    }

    /// HIGH at 60 and above, MEDIUM from 30, LOW otherwise.
    pub const fn from_score(score: u8) -> Self {
        if score >= 60 {
            Self::High
        } else if score >= 30 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Persisted risk assessment; exactly one per expense and never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScore {
    pub id: RiskScoreId,
    pub expense_id: ExpenseId,
    pub score: u8,
    pub risk_level: RiskLevel,
    pub factors: Vec<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRiskScore {
    pub expense_id: ExpenseId,
    pub score: u8,
    pub risk_level: RiskLevel,
    pub factors: Vec<String>,
    pub created_at: NaiveDateTime,
}

/// Approval policy shapes a company can declare. Only the sequential chain is executed
/// by the workflow engine; the others are recorded for configuration screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApprovalWorkflowKind {
    Sequential,
    Percentage { percentage_required: f32 },
    SpecificApprover { approver_id: UserId },
    Hybrid {
        percentage_required: f32,
        approver_id: UserId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalWorkflowRule {
    pub company_id: CompanyId,
    pub name: String,
    pub kind: ApprovalWorkflowKind,
    pub min_amount: Decimal,
    pub max_amount: Option<Decimal>,
    pub is_active: bool,
}
