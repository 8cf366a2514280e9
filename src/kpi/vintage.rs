//! Vintage analysis: cumulative repayment per cohort across months on book
//!
//! For each origination cohort (optionally split by product) the matrix
//! tracks cumulative payments received against the cohort's total scheduled
//! amount at each month on book. Values are observed, not idealized: early
//! write-offs and prepayments can make a curve dip or jump, so no
//! monotonicity is imposed.

use super::ratio;
use crate::aging::{cohort_of, YearMonth};
use crate::error::KpiError;
use crate::ledger::{Contract, PortfolioSnapshot};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One cell of the vintage matrix
#[derive(Debug, Clone, Serialize)]
pub struct VintageRow {
    pub cohort: YearMonth,
    /// Present when the matrix is additionally split by product
    pub product: Option<String>,
    pub months_on_book: u32,
    /// Total scheduled amount of the cohort (fixed denominator)
    pub scheduled: f64,
    /// Cumulative payments received by this month on book
    pub paid: f64,
    pub repayment_rate: Option<f64>,
}

/// Cohort × months-on-book repayment matrix as of `as_of`.
///
/// With `by_product`, each cohort is further split by product category. Rows
/// are ordered by (cohort, product, months_on_book).
pub fn repayment_matrix(
    snapshot: &PortfolioSnapshot,
    as_of: NaiveDate,
    by_product: bool,
) -> Result<Vec<VintageRow>, KpiError> {
    if snapshot.is_empty() {
        return Err(KpiError::InsufficientData { kpi: "repayment_rate" });
    }

    let mut groups: BTreeMap<(YearMonth, Option<String>), Vec<&Contract>> = BTreeMap::new();
    for contract in snapshot.contracts() {
        let product = by_product.then(|| contract.product.clone());
        groups
            .entry((cohort_of(contract), product))
            .or_default()
            .push(contract);
    }

    let horizon = YearMonth::of(as_of);
    let mut rows = Vec::new();
    for ((cohort, product), contracts) in groups {
        if cohort > horizon {
            continue; // originated after the as-of date
        }
        let scheduled: f64 = contracts.iter().map(|c| c.total_scheduled()).sum();
        let elapsed = cohort.months_until(horizon) as u32;

        for months_on_book in 0..=elapsed {
            // Observation point: end of the month, capped at the as-of date
            let observed_through = cohort.plus_months(months_on_book).last_day().min(as_of);
            let paid: f64 = contracts
                .iter()
                .map(|c| snapshot.paid_to_date(&c.contract_id, observed_through))
                .sum();
            rows.push(VintageRow {
                cohort,
                product: product.clone(),
                months_on_book,
                scheduled,
                paid,
                repayment_rate: ratio(paid, scheduled),
            });
        }
    }
    Ok(rows)
}
