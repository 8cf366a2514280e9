//! Run the full KPI bundle over a portfolio loaded from CSV
//!
//! Writes the result bundle as JSON and prints a short console summary.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use credit_analytics::{
    ledger::load_snapshot, DiscountAssumptions, Engine, EngineConfig, Grouping,
};
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GroupBy {
    All,
    Cohort,
    Product,
    CohortProduct,
}

impl From<GroupBy> for Grouping {
    fn from(value: GroupBy) -> Self {
        match value {
            GroupBy::All => Grouping::All,
            GroupBy::Cohort => Grouping::Cohort,
            GroupBy::Product => Grouping::Product,
            GroupBy::CohortProduct => Grouping::CohortProduct,
        }
    }
}

#[derive(Debug, Parser)]
#[command(about = "Compute credit-risk KPIs over a PayGo loan portfolio")]
struct Args {
    /// Contract schedule CSV (one row per installment)
    #[arg(long)]
    contracts: PathBuf,

    /// Payment ledger CSV
    #[arg(long)]
    payments: PathBuf,

    /// Snapshot date for all KPIs, e.g. 2025-08-31
    #[arg(long)]
    as_of: NaiveDate,

    /// Annual discount rate for the NPV calculation
    #[arg(long, default_value_t = 0.15)]
    discount_rate: f64,

    /// Projection window in months (0 = full remaining schedule)
    #[arg(long, default_value_t = 12)]
    horizon_months: u32,

    /// Grace period in days for first-payment default
    #[arg(long, default_value_t = 30)]
    fpd_grace_days: u32,

    /// Grouping dimension for the per-group KPIs
    #[arg(long, value_enum, default_value_t = GroupBy::All)]
    group_by: GroupBy,

    /// Output path for the JSON bundle (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start = Instant::now();
    let snapshot = load_snapshot(&args.contracts, &args.payments)?;
    println!(
        "Loaded {} contracts ({} records skipped) in {:?}",
        snapshot.len(),
        snapshot.skipped_records(),
        start.elapsed()
    );

    let mut config = EngineConfig::new(args.as_of);
    config.grouping = args.group_by.into();
    config.fpd_grace_days = args.fpd_grace_days;
    config.projection.discount = DiscountAssumptions::new(args.discount_rate);
    config.projection.horizon_months = match args.horizon_months {
        0 => None,
        months => Some(months),
    };

    let run_start = Instant::now();
    let bundle = Engine::new(config).run(&snapshot);
    println!("KPI run complete in {:?}", run_start.elapsed());

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output file {}", path.display()))?;
            serde_json::to_writer_pretty(file, &bundle)?;
            println!("Bundle written to {}", path.display());
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout().lock(), &bundle)?;
            println!();
        }
    }

    // Console summary
    println!("\nPortfolio summary as of {}:", bundle.as_of);
    if let Some(rate) = bundle.collection_rate.get("ALL").copied().flatten() {
        println!("  Collection rate: {:.2}%", rate * 100.0);
    }
    if let Some(par) = bundle.par.get("ALL") {
        if let (Some(p30), Some(p90)) = (par.par30, par.par90) {
            println!("  PAR30: {:.2}%  PAR90: {:.2}%", p30 * 100.0, p90 * 100.0);
        }
    }
    if let Some(rate) = bundle.write_off_rate.get("ALL").copied().flatten() {
        println!("  Write-off rate: {:.2}%", rate * 100.0);
    }
    if let Some(npv) = bundle.npv {
        println!(
            "  Projected NPV ({} flows): ${:.2}",
            bundle.cashflow_projection.len(),
            npv
        );
    }
    for failure in &bundle.errors {
        println!("  [!] {}: {}", failure.kpi, failure.reason);
    }

    println!("\nTotal time: {:?}", start.elapsed());
    Ok(())
}
