//! KPI calculators over a portfolio snapshot
//!
//! Each calculator is a pure function of (snapshot, as-of date, grouping).
//! Results are keyed by rendered group key and held in `BTreeMap`s so that
//! repeated runs over the same inputs produce identical output.

mod cashflow;
mod collection;
mod fpd;
mod par;
mod vintage;
mod writeoff;

pub use cashflow::{cashflow_history, CashflowHistoryRow};
pub use collection::{collection_rate, collection_trend, TrendRow};
pub use fpd::{first_payment_default, FpdStats};
pub use par::{portfolio_at_risk, ParRatios};
pub use vintage::{repayment_matrix, VintageRow};
pub use writeoff::write_off_rate;

use crate::aging::cohort_of;
use crate::error::KpiError;
use crate::ledger::{Contract, PortfolioSnapshot};
use std::collections::BTreeMap;

/// Group key used when no grouping dimension is requested
pub const ALL_KEY: &str = "ALL";

/// Grouping dimension(s) applied to a KPI calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grouping {
    /// Single portfolio-wide aggregate under the key `ALL`
    #[default]
    All,
    /// By origination month
    Cohort,
    /// By product category
    Product,
    /// By origination month and product category
    CohortProduct,
}

impl Grouping {
    /// Rendered group key for a contract under this grouping
    pub fn key(self, contract: &Contract) -> String {
        match self {
            Grouping::All => ALL_KEY.to_string(),
            Grouping::Cohort => cohort_of(contract).to_string(),
            Grouping::Product => contract.product.clone(),
            Grouping::CohortProduct => {
                format!("{}/{}", cohort_of(contract), contract.product)
            }
        }
    }

    /// Whether the product dimension participates
    pub fn includes_product(self) -> bool {
        matches!(self, Grouping::Product | Grouping::CohortProduct)
    }
}

/// Partition the snapshot's contracts by group key.
///
/// Fails with `InsufficientData` when the snapshot holds no contracts at
/// all; per-group sets are non-empty by construction.
pub(crate) fn group_contracts<'a>(
    snapshot: &'a PortfolioSnapshot,
    grouping: Grouping,
    kpi: &'static str,
) -> Result<BTreeMap<String, Vec<&'a Contract>>, KpiError> {
    if snapshot.is_empty() {
        return Err(KpiError::InsufficientData { kpi });
    }
    let mut groups: BTreeMap<String, Vec<&Contract>> = BTreeMap::new();
    for contract in snapshot.contracts() {
        groups.entry(grouping.key(contract)).or_default().push(contract);
    }
    Ok(groups)
}

/// Safe ratio: `None` instead of a divide-by-zero artefact
pub(crate) fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator > 0.0 {
        Some(numerator / denominator)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ContractStatus, ScheduleEntry};
    use chrono::NaiveDate;

    fn contract(id: &str, origination: NaiveDate, product: &str) -> Contract {
        Contract {
            contract_id: id.to_string(),
            origination_date: origination,
            principal: 100.0,
            product: product.to_string(),
            status: ContractStatus::Active,
            schedule: vec![ScheduleEntry {
                due_date: origination,
                due_amount: 100.0,
            }],
        }
    }

    #[test]
    fn test_group_keys() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let c = contract("C1", d, "Solar Home 200");

        assert_eq!(Grouping::All.key(&c), "ALL");
        assert_eq!(Grouping::Cohort.key(&c), "2025-03");
        assert_eq!(Grouping::Product.key(&c), "Solar Home 200");
        assert_eq!(Grouping::CohortProduct.key(&c), "2025-03/Solar Home 200");
    }

    #[test]
    fn test_empty_snapshot_is_insufficient_data() {
        let snapshot = PortfolioSnapshot::assemble(vec![], vec![]);
        let result = group_contracts(&snapshot, Grouping::All, "collection_rate");
        assert!(matches!(result, Err(KpiError::InsufficientData { .. })));
    }

    #[test]
    fn test_ratio_guards_zero_denominator() {
        assert_eq!(ratio(5.0, 10.0), Some(0.5));
        assert_eq!(ratio(5.0, 0.0), None);
    }
}
