//! Aggregation facade: one call, one result bundle
//!
//! Runs every KPI family plus the cash-flow projection over a snapshot and
//! collects the results into a single serializable bundle. Failures are
//! partial: a calculator that cannot compute lands in the bundle's error
//! list and the rest of the run proceeds. `run` never returns an `Err`.

use crate::error::{ConfigError, KpiError};
use crate::kpi::{
    cashflow_history, collection_rate, collection_trend, first_payment_default, portfolio_at_risk,
    repayment_matrix, write_off_rate, CashflowHistoryRow, FpdStats, Grouping, ParRatios, TrendRow,
    VintageRow, ALL_KEY,
};
use crate::ledger::PortfolioSnapshot;
use crate::projection::{project_cashflows, CashflowPoint, ProjectionConfig};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Full configuration surface consumed by the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Snapshot date for every KPI and the projection start
    pub as_of: NaiveDate,
    /// Grouping dimension(s) for the per-group KPIs
    pub grouping: Grouping,
    /// Grace period for first-payment default, in days
    pub fpd_grace_days: u32,
    pub projection: ProjectionConfig,
}

impl EngineConfig {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            grouping: Grouping::All,
            fpd_grace_days: 30,
            projection: ProjectionConfig::default(),
        }
    }
}

/// One captured calculator failure
#[derive(Debug, Clone, Serialize)]
pub struct KpiFailure {
    pub kpi: String,
    pub group: String,
    pub reason: String,
}

impl KpiFailure {
    fn from_kpi(kpi: &str, err: &KpiError) -> Self {
        Self {
            kpi: kpi.to_string(),
            group: ALL_KEY.to_string(),
            reason: err.to_string(),
        }
    }

    fn from_config(err: &ConfigError) -> Self {
        Self {
            kpi: "cashflow_projection".to_string(),
            group: ALL_KEY.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Unified result bundle consumed by reporting collaborators.
///
/// Scalar KPI families map group key to a value or null; matrix families are
/// row lists. Serializes to stable JSON (all maps are ordered).
#[derive(Debug, Clone, Serialize)]
pub struct KpiBundle {
    pub as_of: NaiveDate,
    /// Input records dropped at snapshot assembly
    pub skipped_records: usize,
    pub collection_rate: BTreeMap<String, Option<f64>>,
    pub collection_trend: Vec<TrendRow>,
    /// Cohort-level repayment matrix (vintage curve)
    pub repayment_rate: Vec<VintageRow>,
    pub par: BTreeMap<String, ParRatios>,
    pub write_off_rate: BTreeMap<String, Option<f64>>,
    pub fpd: BTreeMap<String, FpdStats>,
    /// Historical monthly disbursements vs. collections with net cash flow
    pub cashflow_history: Vec<CashflowHistoryRow>,
    /// Repayment matrix split by product when the grouping requests it;
    /// identical to `repayment_rate` otherwise
    pub vintage: Vec<VintageRow>,
    pub cashflow_projection: Vec<CashflowPoint>,
    pub npv: Option<f64>,
    pub errors: Vec<KpiFailure>,
}

/// The KPI engine: orchestrates calculators and projector over one snapshot
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Compute the full bundle. Deterministic: identical inputs and
    /// configuration yield identical output.
    pub fn run(&self, snapshot: &PortfolioSnapshot) -> KpiBundle {
        let as_of = self.config.as_of;
        let grouping = self.config.grouping;
        let mut errors = Vec::new();

        log::info!(
            "running KPI engine over {} contracts as of {as_of}",
            snapshot.len()
        );

        let collection = collection_rate(snapshot, as_of, grouping)
            .map_err(|e| errors.push(KpiFailure::from_kpi("collection_rate", &e)))
            .unwrap_or_default();
        let trend = collection_trend(snapshot, as_of, grouping)
            .map_err(|e| errors.push(KpiFailure::from_kpi("collection_trend", &e)))
            .unwrap_or_default();
        let par = portfolio_at_risk(snapshot, as_of, grouping)
            .map_err(|e| errors.push(KpiFailure::from_kpi("par", &e)))
            .unwrap_or_default();
        let write_off = write_off_rate(snapshot, as_of, grouping)
            .map_err(|e| errors.push(KpiFailure::from_kpi("write_off_rate", &e)))
            .unwrap_or_default();
        let fpd = first_payment_default(snapshot, as_of, self.config.fpd_grace_days, grouping)
            .map_err(|e| errors.push(KpiFailure::from_kpi("fpd_rate", &e)))
            .unwrap_or_default();
        let cashflows_history = cashflow_history(snapshot, as_of, grouping)
            .map_err(|e| errors.push(KpiFailure::from_kpi("cashflow_history", &e)))
            .unwrap_or_default();

        let repayment = repayment_matrix(snapshot, as_of, false)
            .map_err(|e| errors.push(KpiFailure::from_kpi("repayment_rate", &e)))
            .unwrap_or_default();
        let vintage = if grouping.includes_product() {
            repayment_matrix(snapshot, as_of, true)
                .map_err(|e| errors.push(KpiFailure::from_kpi("vintage", &e)))
                .unwrap_or_default()
        } else {
            repayment.clone()
        };

        let (cashflow_projection, npv) =
            match project_cashflows(snapshot, as_of, &self.config.projection) {
                Ok(result) => (result.cashflows, Some(result.npv)),
                Err(e) => {
                    errors.push(KpiFailure::from_config(&e));
                    (Vec::new(), None)
                }
            };

        if !errors.is_empty() {
            log::warn!("{} KPI(s) could not be computed", errors.len());
        }

        KpiBundle {
            as_of,
            skipped_records: snapshot.skipped_records(),
            collection_rate: collection,
            collection_trend: trend,
            repayment_rate: repayment,
            par,
            write_off_rate: write_off,
            fpd,
            cashflow_history: cashflows_history,
            vintage,
            cashflow_projection,
            npv,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::DiscountAssumptions;
    use crate::ledger::{Contract, ContractStatus, Payment, PortfolioSnapshot, ScheduleEntry};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(
        id: &str,
        origination: NaiveDate,
        product: &str,
        status: ContractStatus,
        schedule: Vec<(NaiveDate, f64)>,
    ) -> Contract {
        Contract {
            contract_id: id.to_string(),
            origination_date: origination,
            principal: schedule.iter().map(|(_, a)| a).sum(),
            product: product.to_string(),
            status,
            schedule: schedule
                .into_iter()
                .map(|(due_date, due_amount)| ScheduleEntry {
                    due_date,
                    due_amount,
                })
                .collect(),
        }
    }

    fn sample_snapshot() -> PortfolioSnapshot {
        let contracts = vec![
            contract(
                "A",
                date(2025, 1, 10),
                "Solar Home 200",
                ContractStatus::Active,
                vec![(date(2025, 2, 10), 500.0), (date(2025, 8, 10), 500.0)],
            ),
            contract(
                "B",
                date(2025, 2, 5),
                "Lantern",
                ContractStatus::Active,
                vec![(date(2025, 3, 5), 250.0), (date(2025, 5, 5), 250.0)],
            ),
            contract(
                "C",
                date(2025, 1, 20),
                "Lantern",
                ContractStatus::WrittenOff,
                vec![(date(2025, 2, 20), 300.0)],
            ),
        ];
        let payments = vec![
            Payment {
                contract_id: "A".to_string(),
                payment_date: date(2025, 2, 10),
                amount_paid: 500.0,
            },
            Payment {
                contract_id: "B".to_string(),
                payment_date: date(2025, 3, 5),
                amount_paid: 250.0,
            },
        ];
        PortfolioSnapshot::assemble(contracts, payments)
    }

    #[test]
    fn test_full_run_produces_every_family() {
        let engine = Engine::new(EngineConfig::new(date(2025, 6, 30)));
        let bundle = engine.run(&sample_snapshot());

        assert!(bundle.errors.is_empty());
        assert!(bundle.collection_rate.contains_key("ALL"));
        assert!(!bundle.collection_trend.is_empty());
        assert!(!bundle.repayment_rate.is_empty());
        assert!(bundle.par.contains_key("ALL"));
        assert!(bundle.write_off_rate.contains_key("ALL"));
        assert!(bundle.fpd.contains_key("ALL"));
        assert!(!bundle.cashflow_history.is_empty());
        assert!(bundle.npv.is_some());
        // A's second installment falls inside the 12-month window
        assert!(!bundle.cashflow_projection.is_empty());
    }

    #[test]
    fn test_idempotent_runs() {
        let engine = Engine::new(EngineConfig::new(date(2025, 6, 30)));
        let snapshot = sample_snapshot();
        let first = serde_json::to_string(&engine.run(&snapshot)).unwrap();
        let second = serde_json::to_string(&engine.run(&snapshot)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_config_error_is_partial_failure() {
        let mut config = EngineConfig::new(date(2025, 6, 30));
        config.projection.discount = DiscountAssumptions::new(-2.0);
        let bundle = Engine::new(config).run(&sample_snapshot());

        assert_eq!(bundle.npv, None);
        assert!(bundle.cashflow_projection.is_empty());
        assert_eq!(bundle.errors.len(), 1);
        assert_eq!(bundle.errors[0].kpi, "cashflow_projection");
        // other KPIs unaffected
        assert!(bundle.collection_rate.contains_key("ALL"));
        assert!(bundle.par.contains_key("ALL"));
    }

    #[test]
    fn test_empty_portfolio_reports_insufficient_data() {
        let engine = Engine::new(EngineConfig::new(date(2025, 6, 30)));
        let bundle = engine.run(&PortfolioSnapshot::assemble(vec![], vec![]));

        assert!(bundle.collection_rate.is_empty());
        let kpis: Vec<&str> = bundle.errors.iter().map(|e| e.kpi.as_str()).collect();
        assert!(kpis.contains(&"collection_rate"));
        assert!(kpis.contains(&"par"));
        assert!(kpis.contains(&"repayment_rate"));
        // projection of an empty book is valid and empty, not an error
        assert_eq!(bundle.npv, Some(0.0));
    }

    #[test]
    fn test_malformed_contract_does_not_poison_the_run() {
        let good = contract(
            "GOOD",
            date(2025, 1, 10),
            "Lantern",
            ContractStatus::Active,
            vec![(date(2025, 2, 10), 100.0)],
        );
        let malformed = contract(
            "BAD",
            date(2025, 1, 10),
            "Lantern",
            ContractStatus::Active,
            vec![(date(2025, 3, 10), 100.0), (date(2025, 2, 10), 100.0)],
        );
        let snapshot = PortfolioSnapshot::assemble(vec![good, malformed], vec![]);
        let bundle = Engine::new(EngineConfig::new(date(2025, 6, 30))).run(&snapshot);

        assert_eq!(bundle.skipped_records, 1);
        assert!(bundle.errors.is_empty());
        assert_eq!(bundle.collection_rate["ALL"], Some(0.0));
    }

    #[test]
    fn test_product_grouping_splits_vintage() {
        let mut config = EngineConfig::new(date(2025, 6, 30));
        config.grouping = Grouping::Product;
        let bundle = Engine::new(config).run(&sample_snapshot());

        assert!(bundle.vintage.iter().all(|row| row.product.is_some()));
        assert!(bundle.repayment_rate.iter().all(|row| row.product.is_none()));
        assert!(bundle.collection_rate.contains_key("Lantern"));
        assert!(bundle.collection_rate.contains_key("Solar Home 200"));
    }
}
