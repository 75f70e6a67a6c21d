//! Capability checks for each operation. Every check returns an explicit verdict instead of
//! branching on the caller's role at the query site.

use super::domain::{
    Approval, ApprovalStatus, CompanyId, Expense, ExpenseStatus, Principal, Role, User, UserId,
};
use super::repository::ExpenseFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Permit,
    Deny(String),
}

impl Authorization {
    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::Permit)
    }

    pub fn into_result<E>(self, deny: impl FnOnce(String) -> E) -> Result<(), E> {
        match self {
            Self::Permit => Ok(()),
            Self::Deny(reason) => Err(deny(reason)),
        }
    }
}

/// Only the assigned approver or an admin may record a decision.
pub fn can_decide(principal: &Principal, approval: &Approval) -> Authorization {
    if principal.id == approval.approver_id || principal.role == Role::Admin {
        Authorization::Permit
    } else {
        Authorization::Deny(format!(
            "user {} is not the approver for approval {}",
            principal.id.0, approval.id.0
        ))
    }
}

/// Company members may view expenses of their company; employees only their own.
pub fn can_view_expense(principal: &Principal, expense: &Expense) -> Authorization {
    if principal.company_id != expense.company_id {
        return Authorization::Deny("expense belongs to another company".to_string());
    }
    if principal.role == Role::Employee && principal.id != expense.owner_id {
        return Authorization::Deny("employees may only view their own expenses".to_string());
    }
    Authorization::Permit
}

/// Owners may edit content while the expense is pending and nobody has decided on it.
pub fn can_update_expense(
    principal: &Principal,
    expense: &Expense,
    approvals: &[Approval],
) -> Authorization {
    if principal.id != expense.owner_id {
        return Authorization::Deny("only the submitter may edit an expense".to_string());
    }
    if expense.status != ExpenseStatus::Pending {
        return Authorization::Deny(format!(
            "expense is already {}",
            expense.status.label()
        ));
    }
    if approvals
        .iter()
        .any(|approval| approval.status != ApprovalStatus::Pending)
    {
        return Authorization::Deny("an approver has already decided on this expense".to_string());
    }
    Authorization::Permit
}

/// The company directory is administered by admins only.
pub fn can_manage_users(principal: &Principal) -> Authorization {
    if principal.role == Role::Admin {
        Authorization::Permit
    } else {
        Authorization::Deny("admin access required".to_string())
    }
}

/// Which expenses a principal sees when listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseScope {
    Company(CompanyId),
    Team {
        company_id: CompanyId,
        members: Vec<UserId>,
    },
    Own(UserId),
}

impl ExpenseScope {
    /// Admins see the company, managers themselves plus direct reports, employees their own.
    pub fn for_principal(principal: &Principal, direct_reports: &[User]) -> Self {
        match principal.role {
            Role::Admin => Self::Company(principal.company_id),
            Role::Manager => {
                let mut members: Vec<UserId> = direct_reports
                    .iter()
                    .filter(|user| user.company_id == principal.company_id)
                    .map(|user| user.id)
                    .collect();
                members.push(principal.id);
                Self::Team {
                    company_id: principal.company_id,
                    members,
                }
            }
            Role::Employee => Self::Own(principal.id),
        }
    }

    pub fn filter(&self) -> ExpenseFilter {
        match self {
            Self::Company(company_id) => ExpenseFilter::company(*company_id),
            Self::Team {
                company_id,
                members,
            } => ExpenseFilter {
                company_id: Some(*company_id),
                ..ExpenseFilter::owners(members.clone())
            },
            Self::Own(user_id) => ExpenseFilter::owner(*user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::expenses::domain::{ApprovalId, ExpenseId};
    use chrono::NaiveDate;

    fn principal(id: u64, role: Role) -> Principal {
        Principal {
            id: UserId(id),
            role,
            company_id: CompanyId(1),
            manager_id: None,
            display_name: format!("user-{id}"),
        }
    }

    fn approval(approver: u64, status: ApprovalStatus) -> Approval {
        let created_at = NaiveDate::from_ymd_opt(2025, 3, 3)
            .and_then(|date| date.and_hms_opt(9, 0, 0))
            .expect("valid timestamp");
        Approval {
            id: ApprovalId(7),
            expense_id: ExpenseId(1),
            approver_id: UserId(approver),
            workflow_step: 1,
            status,
            comments: None,
            approved_at: None,
            created_at,
        }
    }

    #[test]
    fn approver_and_admin_may_decide() {
        let pending = approval(2, ApprovalStatus::Pending);
        assert!(can_decide(&principal(2, Role::Manager), &pending).is_permitted());
        assert!(can_decide(&principal(9, Role::Admin), &pending).is_permitted());
        assert!(matches!(
            can_decide(&principal(3, Role::Manager), &pending),
            Authorization::Deny(_)
        ));
    }

    #[test]
    fn manager_scope_includes_reports_and_self() {
        let manager = principal(2, Role::Manager);
        let reports = vec![
            User {
                id: UserId(5),
                company_id: CompanyId(1),
                role: Role::Employee,
                manager_id: Some(UserId(2)),
                full_name: "Ada".to_string(),
            },
            User {
                id: UserId(6),
                company_id: CompanyId(4),
                role: Role::Employee,
                manager_id: Some(UserId(2)),
                full_name: "Elsewhere".to_string(),
            },
        ];

        let scope = ExpenseScope::for_principal(&manager, &reports);
        assert_eq!(
            scope,
            ExpenseScope::Team {
                company_id: CompanyId(1),
                members: vec![UserId(5), UserId(2)],
            }
        );
        assert_eq!(
            ExpenseScope::for_principal(&principal(1, Role::Admin), &[]),
            ExpenseScope::Company(CompanyId(1))
        );
        assert_eq!(
            ExpenseScope::for_principal(&principal(3, Role::Employee), &reports),
            ExpenseScope::Own(UserId(3))
        );
    }

    #[test]
    fn only_admins_manage_users() {
        assert!(can_manage_users(&principal(1, Role::Admin)).is_permitted());
        assert_eq!(
            can_manage_users(&principal(2, Role::Manager)),
            Authorization::Deny("admin access required".to_string())
        );
        assert!(!can_manage_users(&principal(3, Role::Employee)).is_permitted());
    }

    #[test]
    fn into_result_maps_denials() {
        let denied: Result<(), String> =
            Authorization::Deny("nope".to_string()).into_result(|reason| reason);
        assert_eq!(denied, Err("nope".to_string()));
        assert_eq!(Authorization::Permit.into_result(|reason| reason), Ok(()));
    }
}
