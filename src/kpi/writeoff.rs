//! Write-off rate: lost balance relative to originated principal

use super::{group_contracts, ratio, Grouping};
use crate::aging::{overdue_bucket, Bucket};
use crate::error::KpiError;
use crate::ledger::{ContractStatus, PortfolioSnapshot};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Σ outstanding balance of contracts in bucket 121+ or explicitly flagged
/// written off, over Σ original principal of the group.
///
/// Each contract contributes at most its principal to the numerator:
/// PayGo schedules carry financing markup, so the outstanding balance can
/// exceed the cash principal, and the rate must stay within [0, 1].
pub fn write_off_rate(
    snapshot: &PortfolioSnapshot,
    as_of: NaiveDate,
    grouping: Grouping,
) -> Result<BTreeMap<String, Option<f64>>, KpiError> {
    let groups = group_contracts(snapshot, grouping, "write_off_rate")?;

    let mut rates = BTreeMap::new();
    for (key, contracts) in groups {
        let mut written_off = 0.0;
        let mut principal = 0.0;
        for contract in contracts {
            principal += contract.principal;
            let lost = contract.status == ContractStatus::WrittenOff
                || overdue_bucket(contract, snapshot.payments(&contract.contract_id), as_of)
                    == Bucket::Days121Plus;
            if lost {
                written_off += snapshot.outstanding(contract, as_of).min(contract.principal);
            }
        }
        rates.insert(key, ratio(written_off, principal));
    }
    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Contract, Payment, ScheduleEntry};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(id: &str, principal: f64, status: ContractStatus, due: NaiveDate) -> Contract {
        Contract {
            contract_id: id.to_string(),
            origination_date: date(2025, 1, 1),
            principal,
            product: "Lantern".to_string(),
            status,
            schedule: vec![ScheduleEntry {
                due_date: due,
                due_amount: principal,
            }],
        }
    }

    #[test]
    fn test_write_off_rate_bounds() {
        let contracts = vec![
            contract("A", 1000.0, ContractStatus::Active, date(2025, 6, 1)),
            contract("B", 300.0, ContractStatus::WrittenOff, date(2025, 2, 1)),
            // deep delinquency counts even without the flag
            contract("C", 200.0, ContractStatus::Active, date(2025, 1, 15)),
        ];
        let payments = vec![Payment {
            contract_id: "A".to_string(),
            payment_date: date(2025, 6, 1),
            amount_paid: 1000.0,
        }];
        let snapshot = PortfolioSnapshot::assemble(contracts, payments);

        // C is 167 days past due on 2025-07-01
        let rates = write_off_rate(&snapshot, date(2025, 7, 1), Grouping::All).unwrap();
        let rate = rates["ALL"].unwrap();
        assert!((rate - 500.0 / 1500.0).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&rate));
    }

    #[test]
    fn test_markup_schedule_stays_bounded() {
        // Financed at 300 cash principal but scheduled to collect 600:
        // the write-off contribution is capped at the principal.
        let marked_up = Contract {
            contract_id: "M".to_string(),
            origination_date: date(2025, 1, 1),
            principal: 300.0,
            product: "Lantern".to_string(),
            status: ContractStatus::WrittenOff,
            schedule: vec![ScheduleEntry {
                due_date: date(2025, 2, 1),
                due_amount: 600.0,
            }],
        };
        let snapshot = PortfolioSnapshot::assemble(vec![marked_up], vec![]);

        let rates = write_off_rate(&snapshot, date(2025, 7, 1), Grouping::All).unwrap();
        let rate = rates["ALL"].unwrap();
        assert_eq!(rate, 1.0);
        assert!((0.0..=1.0).contains(&rate));

        // Alongside a healthy contract the cap still holds
        let contracts = vec![
            Contract {
                contract_id: "M".to_string(),
                origination_date: date(2025, 1, 1),
                principal: 300.0,
                product: "Lantern".to_string(),
                status: ContractStatus::WrittenOff,
                schedule: vec![ScheduleEntry {
                    due_date: date(2025, 2, 1),
                    due_amount: 600.0,
                }],
            },
            contract("A", 700.0, ContractStatus::Active, date(2025, 6, 1)),
        ];
        let snapshot = PortfolioSnapshot::assemble(contracts, vec![]);
        let rates = write_off_rate(&snapshot, date(2025, 7, 1), Grouping::All).unwrap();
        assert_eq!(rates["ALL"].unwrap(), 0.3); // 300 / 1000
    }

    #[test]
    fn test_clean_portfolio_has_zero_write_offs() {
        let contracts = vec![contract("A", 100.0, ContractStatus::Active, date(2025, 6, 1))];
        let snapshot = PortfolioSnapshot::assemble(contracts, vec![]);
        let rates = write_off_rate(&snapshot, date(2025, 6, 15), Grouping::All).unwrap();
        assert_eq!(rates["ALL"], Some(0.0));
    }
}
