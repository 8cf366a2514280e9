//! Error taxonomy for the KPI engine
//!
//! Three families with different blast radii:
//! - `ValidationError` drops the offending record, the run continues
//! - `KpiError` drops one calculator result, recorded in the bundle
//! - `ConfigError` drops the cash-flow projection only

use crate::aging::Bucket;
use chrono::NaiveDate;
use thiserror::Error;

/// A malformed or inconsistent input record.
///
/// Fatal to that record's inclusion in the snapshot; the run continues with
/// the remaining valid records.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("contract {contract_id}: schedule dates are not in chronological order")]
    UnorderedSchedule { contract_id: String },

    #[error("contract {contract_id}: installment {index} has non-positive due amount {amount}")]
    NonPositiveInstallment {
        contract_id: String,
        index: usize,
        amount: f64,
    },

    #[error("contract {contract_id}: principal must be positive, got {principal}")]
    NonPositivePrincipal { contract_id: String, principal: f64 },

    #[error("contract {contract_id} appears more than once in the contract set")]
    DuplicateContract { contract_id: String },

    #[error("payment references unknown contract {contract_id}")]
    UnknownContract { contract_id: String },

    #[error(
        "contract {contract_id}: payment on {payment_date} predates origination {origination_date}"
    )]
    PaymentBeforeOrigination {
        contract_id: String,
        payment_date: NaiveDate,
        origination_date: NaiveDate,
    },

    #[error("contract {contract_id}: payment on {payment_date} has negative amount {amount}")]
    NegativePayment {
        contract_id: String,
        payment_date: NaiveDate,
        amount: f64,
    },
}

/// A KPI calculator had nothing to compute over.
///
/// Non-fatal: the facade records it in the bundle's error list and moves on.
#[derive(Debug, Clone, Error)]
pub enum KpiError {
    #[error("no contracts in scope for {kpi}")]
    InsufficientData { kpi: &'static str },
}

/// Invalid projector configuration.
///
/// Fatal to the cash-flow projection only; every other KPI still computes.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("discount rate {0} makes the discount factor non-positive")]
    InvalidDiscountRate(f64),

    #[error("collection probability table has no entry for bucket {0}")]
    MissingBucket(Bucket),

    #[error("collection probability {value} for bucket {bucket} is outside [0, 1]")]
    ProbabilityOutOfRange { bucket: Bucket, value: f64 },
}
