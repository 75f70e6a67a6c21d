//! Expense risk scoring, approval workflow, and spend analytics.
//!
//! The library owns the business rules; `spendguard-api` wires them into an HTTP service and CLI.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
