pub mod expenses;
pub mod ledger;
