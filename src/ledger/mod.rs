//! Ledger data structures and CSV loading

mod data;
pub mod loader;

pub use data::{
    Contract, ContractStatus, Payment, PortfolioSnapshot, ScheduleEntry, AMOUNT_EPS,
};
pub use loader::{load_contracts, load_payments, load_snapshot};
