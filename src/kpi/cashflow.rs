//! Historical cash flow: disbursements against collections per month
//!
//! Disbursements are the cash principal of contracts originated in the
//! month; inflows are the amounts falling due and the amounts actually
//! received. Net cash flow is paid minus disbursed, accumulated per group
//! from its first month of activity.

use super::{group_contracts, Grouping};
use crate::aging::YearMonth;
use crate::error::KpiError;
use crate::ledger::PortfolioSnapshot;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One month of a group's cash-flow history
#[derive(Debug, Clone, Serialize)]
pub struct CashflowHistoryRow {
    pub group: String,
    pub month: YearMonth,
    /// Principal of contracts originated in the month
    pub disbursed: f64,
    /// Amount falling due within the month
    pub expected: f64,
    /// Amount received within the month
    pub paid: f64,
    /// paid − disbursed
    pub net_cashflow: f64,
    pub cumulative_net_cashflow: f64,
}

/// Monthly disbursed/expected/paid series with net and cumulative net cash
/// flow per group, from each group's first origination month through the
/// as-of month.
pub fn cashflow_history(
    snapshot: &PortfolioSnapshot,
    as_of: NaiveDate,
    grouping: Grouping,
) -> Result<Vec<CashflowHistoryRow>, KpiError> {
    let groups = group_contracts(snapshot, grouping, "cashflow_history")?;
    let horizon = YearMonth::of(as_of);

    let mut rows = Vec::new();
    for (key, contracts) in groups {
        let mut disbursed_by_month: BTreeMap<YearMonth, f64> = BTreeMap::new();
        let mut expected_by_month: BTreeMap<YearMonth, f64> = BTreeMap::new();
        let mut paid_by_month: BTreeMap<YearMonth, f64> = BTreeMap::new();

        for contract in &contracts {
            if contract.origination_date <= as_of {
                *disbursed_by_month
                    .entry(YearMonth::of(contract.origination_date))
                    .or_default() += contract.principal;
            }
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

        let start = match disbursed_by_month.keys().next() {
            Some(first) => *first,
            None => continue, // group originates after the as-of date
        };

        let mut cumulative = 0.0;
        let mut month = start;
        while month <= horizon {
            let disbursed = disbursed_by_month.get(&month).copied().unwrap_or(0.0);
            let expected = expected_by_month.get(&month).copied().unwrap_or(0.0);
            let paid = paid_by_month.get(&month).copied().unwrap_or(0.0);
            let net_cashflow = paid - disbursed;
            cumulative += net_cashflow;
            rows.push(CashflowHistoryRow {
                group: key.clone(),
                month,
                disbursed,
                expected,
                paid,
                net_cashflow,
                cumulative_net_cashflow: cumulative,
            });
            month = month.plus_months(1);
        }
    }
    Ok(rows)
}
