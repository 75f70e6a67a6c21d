use crate::infra::{
    demo_user, seed_demo_directory, FinanceReviewRoute, DEMO_ADMIN, DEMO_EMPLOYEE, DEMO_FINANCE,
    DEMO_MANAGER,
};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use clap::Args;
use rust_decimal_macros::dec;
use spendguard::error::AppError;
use spendguard::workflows::expenses::{
    ApprovalDecision, DashboardReport, Enrichment, ExpenseCategory, ExpenseService,
    ExpenseServiceError, ExpenseSettings, ExpenseSubmission, FixedClock, InMemoryExpenseStore,
    MessageComposer, Principal, ReceiptUpload, StaticRateTable, SubmissionReceipt, UserId,
};
use spendguard::workflows::ledger::LedgerImporter;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DashboardArgs {
    /// Expense export with owner_id, amount, currency, converted_amount, category,
    /// description, expense_date, vendor, status, risk_level columns
    #[arg(long)]
    pub(crate) expenses_csv: PathBuf,
    /// Reporting currency used in the rendered figures
    #[arg(long, default_value = "USD")]
    pub(crate) currency: String,
    /// Evaluation date for the trend window (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Reporting currency of the demo company
    #[arg(long, default_value = "USD")]
    pub(crate) currency: String,
    /// Seed for the gamified message picker
    #[arg(long, default_value_t = 7)]
    pub(crate) seed: u64,
    /// Override the demo date (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let DashboardArgs {
        expenses_csv,
        currency,
        today,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let ledger = LedgerImporter::from_path(&expenses_csv)?;
    println!(
        "Imported {} expenses from {}",
        ledger.len(),
        expenses_csv.display()
    );

    let report = ledger.dashboard(&currency.trim().to_ascii_uppercase(), today);
    render_dashboard(&report, today);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        currency,
        seed,
        today,
    } = args;

    let currency = currency.trim().to_ascii_uppercase();
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let noon = today.and_hms_opt(12, 0, 0).unwrap_or_default();

    println!("Expense workflow demo ({today})");
    let store = Arc::new(InMemoryExpenseStore::new());
    if let Err(err) = seed_demo_directory(&store, &currency) {
        println!("  Demo directory unavailable: {}", err);
        return Ok(());
    }

    let rates = StaticRateTable::new(
        currency.clone(),
        vec![
            ("EUR".to_string(), dec!(1.08)),
            ("GBP".to_string(), dec!(1.27)),
        ],
    );
    let service = ExpenseService::new(
        store,
        Enrichment::local(rates),
        MessageComposer::seeded(seed),
        ExpenseSettings {
            default_currency: currency.clone(),
        },
    )
    .with_route(Arc::new(FinanceReviewRoute {
        finance: DEMO_FINANCE,
    }))
    .with_clock(Arc::new(FixedClock(noon)));

    let (Some(employee), Some(manager), Some(finance), Some(admin)) = (
        principal(DEMO_EMPLOYEE),
        principal(DEMO_MANAGER),
        principal(DEMO_FINANCE),
        principal(DEMO_ADMIN),
    ) else {
        println!("  Demo directory is incomplete");
        return Ok(());
    };

    println!("\nSubmissions by {}", employee.display_name);
    let lunch = match service.submit(&employee, lunch_submission(noon - Duration::days(1))) {
        Ok(receipt) => receipt,
        Err(err) => return skip("Lunch submission rejected", err),
    };
    render_submission(&lunch);
    let conference =
        match service.submit(&employee, conference_submission(noon - Duration::days(2))) {
            Ok(receipt) => receipt,
            Err(err) => return skip("Conference submission rejected", err),
        };
    render_submission(&conference);

    println!("\nApproval chain");
    let decisions = [
        (&manager, &lunch, 0, ApprovalDecision::Approved, None),
        (&manager, &conference, 0, ApprovalDecision::Approved, None),
        (&finance, &lunch, 1, ApprovalDecision::Approved, None),
        (
            &finance,
            &conference,
            1,
            ApprovalDecision::Rejected,
            Some("Book through the travel desk next time".to_string()),
        ),
    ];
    for (approver, receipt, step, decision, comments) in decisions {
        let Some(approval) = receipt.approvals.get(step) else {
            println!("  No step {} for expense {}", step + 1, receipt.expense.id.0);
            continue;
        };
        match service.decide(approver, approval.id, decision, comments) {
            Ok(outcome) => println!(
                "- {} {} step {} of expense {} -> expense {}",
                approver.display_name,
                outcome.approval.status.label(),
                outcome.approval.workflow_step,
                receipt.expense.id.0,
                outcome.expense_status.label()
            ),
            Err(err) => println!("- {} could not decide: {}", approver.display_name, err),
        }
    }

    match service.dashboard(&admin) {
        Ok(report) => render_dashboard(&report, today),
        Err(err) => println!("\nDashboard unavailable: {}", err),
    }

    match service.user_stats(&employee) {
        Ok(stats) => println!(
            "\n{}: {} submitted, {} approved, {} rejected, {} pending ({:.0}% approval rate)",
            employee.display_name,
            stats.total_submitted,
            stats.approved,
            stats.rejected,
            stats.pending,
            stats.approval_rate
        ),
        Err(err) => println!("\nUser statistics unavailable: {}", err),
    }

    Ok(())
}

fn principal(id: UserId) -> Option<Principal> {
    demo_user(id).map(|user| user.principal())
}

fn skip(context: &str, err: ExpenseServiceError) -> Result<(), AppError> {
    println!("  {}: {}", context, err);
    Ok(())
}

fn lunch_submission(expense_date: NaiveDateTime) -> ExpenseSubmission {
    let receipt_text = format!("Corner Bistro\n{}\nTotal $42.50", expense_date.date());
    ExpenseSubmission {
        amount: dec!(42.50),
        currency: "USD".to_string(),
        category: ExpenseCategory::Meals,
        description: "Client lunch".to_string(),
        expense_date,
        vendor: None,
        receipt: Some(ReceiptUpload {
            storage_key: "receipts/demo/lunch.txt".to_string(),
            content: receipt_text.into_bytes(),
        }),
    }
}

fn conference_submission(expense_date: NaiveDateTime) -> ExpenseSubmission {
    ExpenseSubmission {
        amount: dec!(6200),
        currency: "EUR".to_string(),
        category: ExpenseCategory::Travel,
        description: "Conference flight and hotel".to_string(),
        expense_date,
        vendor: Some("EuroConf Travel".to_string()),
        receipt: None,
    }
}

fn render_submission(receipt: &SubmissionReceipt) {
    let expense = &receipt.expense;
    let converted = expense
        .converted_amount
        .map(|amount| format!("{amount:.2}"))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "- Expense {} ({}): {:.2} {} -> {} | risk {} ({})",
        expense.id.0,
        expense.description,
        expense.amount,
        expense.currency,
        converted,
        receipt.risk_score.score,
        receipt.risk_score.risk_level.label()
    );
    for factor in &receipt.risk_score.factors {
        println!("    - {}", factor);
    }
    println!("  {}", receipt.message);
    println!(
        "  Approval steps: {}",
        receipt
            .approvals
            .iter()
            .map(|approval| format!("#{} user {}", approval.workflow_step, approval.approver_id.0))
            .collect::<Vec<_>>()
            .join(", ")
    );
}

pub(crate) fn render_dashboard(report: &DashboardReport, today: NaiveDate) {
    let summary = &report.summary;
    let currency = &report.currency;

    println!("\nSpend dashboard (evaluated {today})");
    println!("Total spend: {currency} {:.2}", summary.total_spend);

    println!("\nSpend by category");
    for entry in &summary.category_spend {
        println!("- {}: {currency} {:.2}", entry.category_label, entry.total);
    }

    if summary.monthly_trend.is_empty() {
        println!("\nMonthly trend: no expenses in the last six months");
    } else {
        println!("\nMonthly trend");
        for entry in &summary.monthly_trend {
            println!("- {}: {currency} {:.2}", entry.label, entry.total);
        }
    }

    let risk = &summary.risk_distribution;
    println!(
        "\nRisk distribution: {} low | {} medium | {} high",
        risk.low, risk.medium, risk.high
    );
    let approvals = &summary.approval_stats;
    println!(
        "Approval status: {} pending | {} approved | {} rejected",
        approvals.pending, approvals.approved, approvals.rejected
    );

    if !summary.top_vendors.is_empty() {
        println!("\nTop vendors");
        for entry in &summary.top_vendors {
            println!("- {}: {currency} {:.2}", entry.vendor, entry.total);
        }
    }

    if !report.insights.is_empty() {
        println!("\nInsights");
        for insight in &report.insights {
            println!("- {}: {}", insight.title, insight.message);
        }
    }

    if !report.policy_suggestions.is_empty() {
        println!("\nPolicy suggestions");
        for suggestion in &report.policy_suggestions {
            println!(
                "- [{}] {}: {}",
                suggestion.priority.label(),
                suggestion.title,
                suggestion.description
            );
        }
    }
}
