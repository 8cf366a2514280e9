//! Contract and payment records held read-only for an analysis run

use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monetary comparison tolerance for float amounts (fractions of a cent)
pub const AMOUNT_EPS: f64 = 1e-6;

/// Contract lifecycle status as reported by the ingestion source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Completed,
    WrittenOff,
}

/// One expected installment of a contract's payment schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub due_date: NaiveDate,
    pub due_amount: f64,
}

/// A financed contract with its full expected payment schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub contract_id: String,
    pub origination_date: NaiveDate,
    pub principal: f64,
    pub product: String,
    pub status: ContractStatus,
    /// Expected installments in chronological order
    pub schedule: Vec<ScheduleEntry>,
}

impl Contract {
    /// Check the record-level invariants: positive principal, positive due
    /// amounts, non-decreasing schedule dates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.principal <= 0.0 {
            return Err(ValidationError::NonPositivePrincipal {
                contract_id: self.contract_id.clone(),
                principal: self.principal,
            });
        }
        for (index, entry) in self.schedule.iter().enumerate() {
            if entry.due_amount <= 0.0 {
                return Err(ValidationError::NonPositiveInstallment {
                    contract_id: self.contract_id.clone(),
                    index,
                    amount: entry.due_amount,
                });
            }
        }
        for pair in self.schedule.windows(2) {
            if pair[1].due_date < pair[0].due_date {
                return Err(ValidationError::UnorderedSchedule {
                    contract_id: self.contract_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Sum of due amounts for installments due on or before `as_of`
    pub fn expected_to_date(&self, as_of: NaiveDate) -> f64 {
        self.schedule
            .iter()
            .filter(|e| e.due_date <= as_of)
            .map(|e| e.due_amount)
            .sum()
    }

    /// Sum of due amounts over the whole schedule
    pub fn total_scheduled(&self) -> f64 {
        self.schedule.iter().map(|e| e.due_amount).sum()
    }

    /// The first scheduled installment, if any
    pub fn first_installment(&self) -> Option<&ScheduleEntry> {
        self.schedule.first()
    }
}

/// A payment received against a contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub contract_id: String,
    pub payment_date: NaiveDate,
    pub amount_paid: f64,
}

/// Immutable view of the ledger for one analysis run.
///
/// Assembly validates every record; invalid contracts and payments are
/// skipped with a warning and counted, never fatal to the run. Contracts are
/// held sorted by id so every pass over the snapshot is deterministic.
#[derive(Debug, Clone)]
pub struct PortfolioSnapshot {
    contracts: Vec<Contract>,
    payments_by_contract: BTreeMap<String, Vec<Payment>>,
    skipped_records: usize,
}

impl PortfolioSnapshot {
    /// Build a snapshot from raw record sets, dropping invalid records.
    pub fn assemble(contracts: Vec<Contract>, payments: Vec<Payment>) -> Self {
        let mut skipped = 0usize;
        let mut kept: BTreeMap<String, Contract> = BTreeMap::new();

        for contract in contracts {
            if kept.contains_key(&contract.contract_id) {
                let err = ValidationError::DuplicateContract {
                    contract_id: contract.contract_id.clone(),
                };
                log::warn!("skipping record: {err}");
                skipped += 1;
                continue;
            }
            match contract.validate() {
                Ok(()) => {
                    kept.insert(contract.contract_id.clone(), contract);
                }
                Err(err) => {
                    log::warn!("skipping record: {err}");
                    skipped += 1;
                }
            }
        }

        let mut payments_by_contract: BTreeMap<String, Vec<Payment>> = BTreeMap::new();
        for payment in payments {
            match Self::validate_payment(&payment, &kept) {
                Ok(()) => payments_by_contract
                    .entry(payment.contract_id.clone())
                    .or_default()
                    .push(payment),
                Err(err) => {
                    log::warn!("skipping record: {err}");
                    skipped += 1;
                }
            }
        }
        for series in payments_by_contract.values_mut() {
            series.sort_by_key(|p| p.payment_date);
        }

        Self {
            contracts: kept.into_values().collect(),
            payments_by_contract,
            skipped_records: skipped,
        }
    }

    fn validate_payment(
        payment: &Payment,
        contracts: &BTreeMap<String, Contract>,
    ) -> Result<(), ValidationError> {
        let contract = contracts.get(&payment.contract_id).ok_or_else(|| {
            ValidationError::UnknownContract {
                contract_id: payment.contract_id.clone(),
            }
        })?;
        if payment.amount_paid < 0.0 {
            return Err(ValidationError::NegativePayment {
                contract_id: payment.contract_id.clone(),
                payment_date: payment.payment_date,
                amount: payment.amount_paid,
            });
        }
        if payment.payment_date < contract.origination_date {
            return Err(ValidationError::PaymentBeforeOrigination {
                contract_id: payment.contract_id.clone(),
                payment_date: payment.payment_date,
                origination_date: contract.origination_date,
            });
        }
        Ok(())
    }

    /// Valid contracts, sorted by contract id
    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    /// Payments for one contract, sorted by payment date
    pub fn payments(&self, contract_id: &str) -> &[Payment] {
        self.payments_by_contract
            .get(contract_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total paid against a contract up to and including `as_of`
    pub fn paid_to_date(&self, contract_id: &str, as_of: NaiveDate) -> f64 {
        self.payments(contract_id)
            .iter()
            .filter(|p| p.payment_date <= as_of)
            .map(|p| p.amount_paid)
            .sum()
    }

    /// Outstanding balance: total scheduled minus paid to date, floored at 0
    pub fn outstanding(&self, contract: &Contract, as_of: NaiveDate) -> f64 {
        (contract.total_scheduled() - self.paid_to_date(&contract.contract_id, as_of)).max(0.0)
    }

    /// Number of input records dropped during assembly
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }
}
