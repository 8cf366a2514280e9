//! Collection rate: paid-to-date over expected-to-date
//!
//! The headline rate is a snapshot per group; the trend variant breaks the
//! same quantities out per calendar month and carries the cumulative
//! (repayment) rate alongside.

use super::{group_contracts, ratio, Grouping};
use crate::aging::YearMonth;
use crate::error::KpiError;
use crate::ledger::PortfolioSnapshot;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Σ paid-to-date / Σ expected-to-date per group as of `as_of`.
///
/// `None` when the group has nothing due yet; prepayment can push the rate
/// above 1.0.
pub fn collection_rate(
    snapshot: &PortfolioSnapshot,
    as_of: NaiveDate,
    grouping: Grouping,
) -> Result<BTreeMap<String, Option<f64>>, KpiError> {
    let groups = group_contracts(snapshot, grouping, "collection_rate")?;

    let mut rates = BTreeMap::new();
    for (key, contracts) in groups {
        let expected: f64 = contracts.iter().map(|c| c.expected_to_date(as_of)).sum();
        let paid: f64 = contracts
            .iter()
            .map(|c| snapshot.paid_to_date(&c.contract_id, as_of))
            .sum();
        rates.insert(key, ratio(paid, expected));
    }
    Ok(rates)
}

/// One month of a group's collection history
#[derive(Debug, Clone, Serialize)]
pub struct TrendRow {
    pub group: String,
    pub month: YearMonth,
    /// Amount falling due within the month
    pub expected: f64,
    /// Amount received within the month
    pub paid: f64,
    /// paid / expected for the month alone
    pub collection_rate: Option<f64>,
    /// Cumulative paid / cumulative expected up to this month
    pub repayment_rate: Option<f64>,
}

/// Monthly collection and cumulative repayment series per group, from each
/// group's first month with an installment due through the as-of month.
pub fn collection_trend(
    snapshot: &PortfolioSnapshot,
    as_of: NaiveDate,
    grouping: Grouping,
) -> Result<Vec<TrendRow>, KpiError> {
    let groups = group_contracts(snapshot, grouping, "collection_trend")?;
    let horizon = YearMonth::of(as_of);

    let mut rows = Vec::new();
    for (key, contracts) in groups {
        // Expected and paid amounts bucketed by calendar month
        let mut expected_by_month: BTreeMap<YearMonth, f64> = BTreeMap::new();
        let mut paid_by_month: BTreeMap<YearMonth, f64> = BTreeMap::new();
        for contract in &contracts {
            for entry in &contract.schedule {
                if entry.due_date <= as_of {
                    *expected_by_month
                        .entry(YearMonth::of(entry.due_date))
                        .or_default() += entry.due_amount;
                }
            }
            for payment in snapshot.payments(&contract.contract_id) {
                if payment.payment_date <= as_of {
                    *paid_by_month
                        .entry(YearMonth::of(payment.payment_date))
                        .or_default() += payment.amount_paid;
                }
            }
        }

        let start = match expected_by_month.keys().next() {
            Some(first) => *first,
            None => continue, // nothing due yet for this group
        };

        let mut cumulative_expected = 0.0;
        let mut cumulative_paid = 0.0;
        let mut month = start;
        while month <= horizon {
            let expected = expected_by_month.get(&month).copied().unwrap_or(0.0);
            let paid = paid_by_month.get(&month).copied().unwrap_or(0.0);
            cumulative_expected += expected;
            cumulative_paid += paid;
            rows.push(TrendRow {
                group: key.clone(),
                month,
                expected,
                paid,
                collection_rate: ratio(paid, expected),
                repayment_rate: ratio(cumulative_paid, cumulative_expected),
            });
            month = month.plus_months(1);
        }
    }
    Ok(rows)
}
