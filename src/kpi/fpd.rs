//! First Payment Default: contracts that missed their first installment
//!
//! A contract defaults on its first payment when the payments received by
//! `first due date + grace period` do not cover the first due amount. The
//! FPD-zero variant counts contracts that paid nothing at all by then.

use super::{group_contracts, ratio, Grouping};
use crate::error::KpiError;
use crate::ledger::{PortfolioSnapshot, AMOUNT_EPS};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// FPD statistics for one group
#[derive(Debug, Clone, Serialize)]
pub struct FpdStats {
    /// Contracts with at least one installment due by the as-of date
    pub contracts: usize,
    pub fpd_count: usize,
    pub fpd_rate: Option<f64>,
    /// Contracts that paid nothing by the grace deadline
    pub fpd_zero_count: usize,
    pub fpd_zero_rate: Option<f64>,
}

/// FPD and FPD-zero rates per group as of `as_of`, with a configurable
/// grace period in days (default convention: 30).
pub fn first_payment_default(
    snapshot: &PortfolioSnapshot,
    as_of: NaiveDate,
    grace_days: u32,
    grouping: Grouping,
) -> Result<BTreeMap<String, FpdStats>, KpiError> {
    let groups = group_contracts(snapshot, grouping, "fpd_rate")?;

    let mut results = BTreeMap::new();
    for (key, contracts) in groups {
        let mut in_scope = 0usize;
        let mut fpd_count = 0usize;
        let mut fpd_zero_count = 0usize;

        for contract in contracts {
            let first = match contract.first_installment() {
                Some(entry) if entry.due_date <= as_of => entry,
                _ => continue, // first installment not yet due
            };
            in_scope += 1;

            let deadline = first.due_date + Days::new(grace_days as u64);
            let paid_by_deadline: f64 = snapshot
                .payments(&contract.contract_id)
                .iter()
                .filter(|p| p.payment_date <= deadline)
                .map(|p| p.amount_paid)
                .sum();

            if paid_by_deadline + AMOUNT_EPS < first.due_amount {
                fpd_count += 1;
                if paid_by_deadline <= AMOUNT_EPS {
                    fpd_zero_count += 1;
                }
            }
        }

        results.insert(
            key,
            FpdStats {
                contracts: in_scope,
                fpd_count,
                fpd_rate: ratio(fpd_count as f64, in_scope as f64),
                fpd_zero_count,
                fpd_zero_rate: ratio(fpd_zero_count as f64, in_scope as f64),
            },
        );
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Contract, ContractStatus, Payment, ScheduleEntry};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(id: &str, origination: NaiveDate, first_due: NaiveDate) -> Contract {
        Contract {
            contract_id: id.to_string(),
            origination_date: origination,
            principal: 200.0,
            product: "Solar Home 200".to_string(),
            status: ContractStatus::Active,
            schedule: vec![
                ScheduleEntry {
                    due_date: first_due,
                    due_amount: 100.0,
                },
                ScheduleEntry {
                    due_date: first_due + Days::new(30),
                    due_amount: 100.0,
                },
            ],
        }
    }

    fn payment(id: &str, d: NaiveDate, amount: f64) -> Payment {
        Payment {
            contract_id: id.to_string(),
            payment_date: d,
            amount_paid: amount,
        }
    }

    #[test]
    fn test_fpd_classification() {
        let orig = date(2025, 1, 10);
        let first_due = date(2025, 2, 10);
        let contracts = vec![
            contract("PAID", orig, first_due),
            contract("LATE_IN_GRACE", orig, first_due),
            contract("PARTIAL", orig, first_due),
            contract("NOTHING", orig, first_due),
        ];
        let payments = vec![
            payment("PAID", first_due, 100.0),
            // 25 days late but inside the 30-day grace window
            payment("LATE_IN_GRACE", date(2025, 3, 7), 100.0),
            payment("PARTIAL", date(2025, 2, 15), 40.0),
        ];
        let snapshot = PortfolioSnapshot::assemble(contracts, payments);

        let stats = first_payment_default(&snapshot, date(2025, 6, 30), 30, Grouping::All).unwrap();
        let all = &stats["ALL"];
        assert_eq!(all.contracts, 4);
        assert_eq!(all.fpd_count, 2); // PARTIAL and NOTHING
        assert_eq!(all.fpd_zero_count, 1); // NOTHING
        assert_eq!(all.fpd_rate, Some(0.5));
        assert_eq!(all.fpd_zero_rate, Some(0.25));
    }

    #[test]
    fn test_payment_after_grace_still_defaults() {
        let contracts = vec![contract("C1", date(2025, 1, 10), date(2025, 2, 10))];
        // paid in full, but 40 days past due
        let payments = vec![payment("C1", date(2025, 3, 22), 100.0)];
        let snapshot = PortfolioSnapshot::assemble(contracts, payments);

        let stats = first_payment_default(&snapshot, date(2025, 6, 30), 30, Grouping::All).unwrap();
        assert_eq!(stats["ALL"].fpd_count, 1);
        assert_eq!(stats["ALL"].fpd_zero_count, 1);
    }

    #[test]
    fn test_not_yet_due_is_out_of_scope() {
        let contracts = vec![contract("C1", date(2025, 5, 10), date(2025, 6, 10))];
        let snapshot = PortfolioSnapshot::assemble(contracts, vec![]);

        let stats = first_payment_default(&snapshot, date(2025, 5, 31), 30, Grouping::All).unwrap();
        assert_eq!(stats["ALL"].contracts, 0);
        assert_eq!(stats["ALL"].fpd_rate, None);
    }

    #[test]
    fn test_grouped_by_cohort() {
        let contracts = vec![
            contract("C1", date(2025, 1, 10), date(2025, 2, 10)),
            contract("C2", date(2025, 2, 20), date(2025, 3, 20)),
        ];
        let payments = vec![payment("C1", date(2025, 2, 10), 100.0)];
        let snapshot = PortfolioSnapshot::assemble(contracts, payments);

        let stats =
            first_payment_default(&snapshot, date(2025, 6, 30), 30, Grouping::Cohort).unwrap();
        assert_eq!(stats["2025-01"].fpd_count, 0);
        assert_eq!(stats["2025-02"].fpd_count, 1);
    }
}
