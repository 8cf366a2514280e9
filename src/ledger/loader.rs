//! CSV ingestion for contract schedules and payment histories
//!
//! Column layout is a contract with the ingestion collaborator:
//! contracts:  contract_id, origination_date, principal, product, status,
//!             due_date, due_amount   (one row per schedule entry)
//! payments:   contract_id, payment_date, amount_paid

use super::{Contract, ContractStatus, Payment, ScheduleEntry, AMOUNT_EPS};
use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;

/// One contract-schedule row; contract-level fields repeat per installment
#[derive(Debug, Deserialize)]
struct ContractRow {
    contract_id: String,
    origination_date: NaiveDate,
    principal: f64,
    product: String,
    status: ContractStatus,
    due_date: NaiveDate,
    due_amount: f64,
}

#[derive(Debug, Deserialize)]
struct PaymentRow {
    contract_id: String,
    payment_date: NaiveDate,
    amount_paid: f64,
}

/// Load contracts from a schedule CSV, grouping installment rows by
/// contract id. Unreadable rows are skipped with a warning; contract-level
/// fields are taken from the first row seen for each id.
pub fn load_contracts(path: &Path) -> anyhow::Result<Vec<Contract>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening contracts file {}", path.display()))?;

    // BTreeMap keeps contract order independent of row order
    let mut contracts: BTreeMap<String, Contract> = BTreeMap::new();
    for (line, record) in reader.deserialize::<ContractRow>().enumerate() {
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                log::warn!("contracts row {}: {err}", line + 2);
                continue;
            }
        };
        let installment = ScheduleEntry {
            due_date: row.due_date,
            due_amount: row.due_amount,
        };
        match contracts.entry(row.contract_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(Contract {
                    contract_id: row.contract_id,
                    origination_date: row.origination_date,
                    principal: row.principal,
                    product: row.product,
                    status: row.status,
                    schedule: vec![installment],
                });
            }
            Entry::Occupied(mut slot) => {
                let contract = slot.get_mut();
                // Contract-level fields repeat per installment row; the
                // first row wins, disagreement is worth a warning.
                let consistent = contract.origination_date == row.origination_date
                    && (contract.principal - row.principal).abs() <= AMOUNT_EPS
                    && contract.product == row.product
                    && contract.status == row.status;
                if !consistent {
                    log::warn!(
                        "contracts row {}: contract-level fields for {} differ from the first row, keeping the first",
                        line + 2,
                        contract.contract_id
                    );
                }
                contract.schedule.push(installment);
            }
        }
    }

    Ok(contracts.into_values().collect())
}

/// Load the payment ledger. Unreadable rows are skipped with a warning;
/// referential and chronological checks happen at snapshot assembly.
pub fn load_payments(path: &Path) -> anyhow::Result<Vec<Payment>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening payments file {}", path.display()))?;

    let mut payments = Vec::new();
    for (line, record) in reader.deserialize::<PaymentRow>().enumerate() {
        match record {
            Ok(row) => payments.push(Payment {
                contract_id: row.contract_id,
                payment_date: row.payment_date,
                amount_paid: row.amount_paid,
            }),
            Err(err) => log::warn!("payments row {}: {err}", line + 2),
        }
    }
    Ok(payments)
}

/// Load both files and assemble the validated snapshot in one step.
pub fn load_snapshot(
    contracts_path: &Path,
    payments_path: &Path,
) -> anyhow::Result<super::PortfolioSnapshot> {
    let contracts = load_contracts(contracts_path)?;
    let payments = load_payments(payments_path)?;
    Ok(super::PortfolioSnapshot::assemble(contracts, payments))
}
