//! Forward cash-flow projection and portfolio NPV
//!
//! For every remaining installment of an active contract the expected flow
//! is the due amount weighted by the collection probability of the
//! contract's current overdue bucket. NPV discounts the series at the
//! configured annual rate on an actual/365 basis.

use crate::aging::overdue_bucket;
use crate::assumptions::{CollectionProbabilities, DiscountAssumptions};
use crate::error::ConfigError;
use crate::ledger::{Contract, ContractStatus, PortfolioSnapshot};
use chrono::{Months, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Expected cash inflow on one future date
#[derive(Debug, Clone, Serialize)]
pub struct CashflowPoint {
    pub date: NaiveDate,
    pub expected_amount: f64,
}

/// Projector configuration
#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    pub probabilities: CollectionProbabilities,
    pub discount: DiscountAssumptions,
    /// Cap on the projection window in months after the as-of date;
    /// `None` projects the full remaining schedule
    pub horizon_months: Option<u32>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            probabilities: CollectionProbabilities::default(),
            discount: DiscountAssumptions::default(),
            horizon_months: Some(12),
        }
    }
}

/// Projected series with its present value
#[derive(Debug, Clone, Serialize)]
pub struct ProjectionResult {
    pub cashflows: Vec<CashflowPoint>,
    pub npv: f64,
}

fn contract_flows(
    snapshot: &PortfolioSnapshot,
    contract: &Contract,
    as_of: NaiveDate,
    cutoff: Option<NaiveDate>,
    probabilities: &CollectionProbabilities,
) -> Vec<(NaiveDate, f64)> {
    let bucket = overdue_bucket(contract, snapshot.payments(&contract.contract_id), as_of);
    let probability = probabilities.probability(bucket);
    contract
        .schedule
        .iter()
        .filter(|e| e.due_date > as_of && cutoff.map_or(true, |c| e.due_date <= c))
        .map(|e| (e.due_date, e.due_amount * probability))
        .collect()
}

/// Project expected cash flows for all active contracts and discount them.
///
/// Fails with `ConfigError` when the probability table is incomplete or the
/// discount rate makes the discount factor non-positive; the caller treats
/// that as fatal to the projection only.
pub fn project_cashflows(
    snapshot: &PortfolioSnapshot,
    as_of: NaiveDate,
    config: &ProjectionConfig,
) -> Result<ProjectionResult, ConfigError> {
    config.probabilities.validate()?;
    config.discount.validate()?;

    let cutoff = config
        .horizon_months
        .map(|months| as_of + Months::new(months));

    // Per-contract flows are independent; merge order is fixed afterwards.
    let per_contract: Vec<Vec<(NaiveDate, f64)>> = snapshot
        .contracts()
        .par_iter()
        .filter(|c| c.status == ContractStatus::Active)
        .map(|c| contract_flows(snapshot, c, as_of, cutoff, &config.probabilities))
        .collect();

    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for flows in per_contract {
        for (date, amount) in flows {
            *by_date.entry(date).or_default() += amount;
        }
    }

    let npv = by_date
        .iter()
        .map(|(date, amount)| amount * config.discount.factor((*date - as_of).num_days()))
        .sum();

    let cashflows = by_date
        .into_iter()
        .map(|(date, expected_amount)| CashflowPoint {
            date,
            expected_amount,
        })
        .collect();

    Ok(ProjectionResult { cashflows, npv })
}
