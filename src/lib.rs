//! Credit-risk KPI engine for PayGo asset-financing loan portfolios
//!
//! Computes deterministic portfolio metrics over an immutable contract and
//! payment ledger: collection and repayment rates, PAR aging buckets,
//! write-off rate, first-payment defaults, vintage curves, and a
//! probability-weighted forward cash-flow projection with NPV.
//!
//! The [`engine::Engine`] facade orchestrates the individual calculators in
//! [`kpi`] and the projector in [`projection`]; every failure mode is
//! captured inside the returned bundle rather than propagated.

pub mod aging;
pub mod assumptions;
pub mod engine;
pub mod error;
pub mod kpi;
pub mod ledger;
pub mod projection;

pub use aging::{cohort_of, overdue_bucket, Bucket, YearMonth};
pub use assumptions::{CollectionProbabilities, DiscountAssumptions};
pub use engine::{Engine, EngineConfig, KpiBundle, KpiFailure};
pub use error::{ConfigError, KpiError, ValidationError};
pub use kpi::Grouping;
pub use ledger::{Contract, ContractStatus, Payment, PortfolioSnapshot, ScheduleEntry};
pub use projection::{CashflowPoint, ProjectionConfig, ProjectionResult};
