//! Portfolio at Risk: outstanding balance past n days overdue
//!
//! PAR(n) counts the full outstanding balance of every contract whose
//! overdue bucket starts past n days, so PAR(30) ≥ PAR(60) ≥ PAR(90) ≥
//! PAR(120) for any snapshot. Written-off contracts are treated as 121+
//! regardless of their schedule-derived age.

use super::{group_contracts, ratio, Grouping};
use crate::aging::{overdue_bucket, Bucket};
use crate::error::KpiError;
use crate::ledger::{Contract, ContractStatus, PortfolioSnapshot};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// PAR ratios for one group; `None` when the group has no outstanding balance
#[derive(Debug, Clone, Serialize)]
pub struct ParRatios {
    pub par30: Option<f64>,
    pub par60: Option<f64>,
    pub par90: Option<f64>,
    pub par120: Option<f64>,
}

/// Overdue state of a single contract as of the snapshot date
struct ContractRisk {
    bucket: Bucket,
    outstanding: f64,
}

fn risk_state(snapshot: &PortfolioSnapshot, contract: &Contract, as_of: NaiveDate) -> ContractRisk {
    let bucket = if contract.status == ContractStatus::WrittenOff {
        Bucket::Days121Plus
    } else {
        overdue_bucket(contract, snapshot.payments(&contract.contract_id), as_of)
    };
    ContractRisk {
        bucket,
        outstanding: snapshot.outstanding(contract, as_of),
    }
}

/// PAR(30/60/90/120) per group as of `as_of`.
pub fn portfolio_at_risk(
    snapshot: &PortfolioSnapshot,
    as_of: NaiveDate,
    grouping: Grouping,
) -> Result<BTreeMap<String, ParRatios>, KpiError> {
    let groups = group_contracts(snapshot, grouping, "par")?;

    let mut results = BTreeMap::new();
    for (key, contracts) in groups {
        // Independent per-contract states; order of the collect is stable.
        let states: Vec<ContractRisk> = contracts
            .par_iter()
            .map(|c| risk_state(snapshot, c, as_of))
            .collect();

        let total: f64 = states.iter().map(|s| s.outstanding).sum();
        let past = |n: u32| -> f64 {
            states
                .iter()
                .filter(|s| s.bucket.lower_bound() > n)
                .map(|s| s.outstanding)
                .sum()
        };
        results.insert(
            key,
            ParRatios {
                par30: ratio(past(30), total),
                par60: ratio(past(60), total),
                par90: ratio(past(90), total),
                par120: ratio(past(120), total),
            },
        );
    }
    Ok(results)
}
