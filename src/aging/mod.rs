//! Overdue-age buckets and origination cohorts
//!
//! Payment allocation is strictly FIFO: the oldest due installments are
//! considered satisfied first, so a contract's overdue age is the age of the
//! earliest installment its cumulative payments do not cover.

use crate::ledger::{Contract, Payment, AMOUNT_EPS};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overdue-age classification of a contract as of a given date.
///
/// Bucket intervals are closed on both ends: [1,30], [31,60], [61,90],
/// [91,120], [121,∞). A contract exactly 30 days late is still `1-30`.
/// `Days121Plus` doubles as the write-off proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bucket {
    Current,
    Days1To30,
    Days31To60,
    Days61To90,
    Days91To120,
    Days121Plus,
}

impl Bucket {
    /// All buckets, ordered by severity
    pub const ALL: [Bucket; 6] = [
        Bucket::Current,
        Bucket::Days1To30,
        Bucket::Days31To60,
        Bucket::Days61To90,
        Bucket::Days91To120,
        Bucket::Days121Plus,
    ];

    /// Map an overdue age in days to its bucket
    pub fn from_days_late(days: i64) -> Self {
        match days {
            d if d <= 0 => Bucket::Current,
            1..=30 => Bucket::Days1To30,
            31..=60 => Bucket::Days31To60,
            61..=90 => Bucket::Days61To90,
            91..=120 => Bucket::Days91To120,
            _ => Bucket::Days121Plus,
        }
    }

    /// Lower edge of the bucket interval in days (0 for `Current`)
    pub fn lower_bound(self) -> u32 {
        match self {
            Bucket::Current => 0,
            Bucket::Days1To30 => 1,
            Bucket::Days31To60 => 31,
            Bucket::Days61To90 => 61,
            Bucket::Days91To120 => 91,
            Bucket::Days121Plus => 121,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Bucket::Current => "Current",
            Bucket::Days1To30 => "1-30",
            Bucket::Days31To60 => "31-60",
            Bucket::Days61To90 => "61-90",
            Bucket::Days91To120 => "91-120",
            Bucket::Days121Plus => "121+",
        };
        f.write_str(label)
    }
}

/// Classify a contract's overdue age as of `as_of`.
///
/// Walks the schedule in due-date order accumulating the due amount; the
/// first installment whose cumulative due exceeds the total paid (FIFO
/// allocation) sets the overdue age. Contracts with no underpaid installment
/// due by `as_of` are `Current`.
pub fn overdue_bucket(contract: &Contract, payments: &[Payment], as_of: NaiveDate) -> Bucket {
    let paid: f64 = payments
        .iter()
        .filter(|p| p.payment_date <= as_of)
        .map(|p| p.amount_paid)
        .sum();

    let mut cumulative_due = 0.0;
    for entry in &contract.schedule {
        if entry.due_date > as_of {
            break;
        }
        cumulative_due += entry.due_amount;
        if cumulative_due > paid + AMOUNT_EPS {
            let days_late = (as_of - entry.due_date).num_days();
            return Bucket::from_days_late(days_late);
        }
    }
    Bucket::Current
}

/// A calendar year-month, used both as cohort key (origination month) and as
/// the axis of monthly trend series. Ordered chronologically, rendered and
/// serialized as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// The month containing `date`
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the month
    pub fn first_day(self) -> NaiveDate {
        // month is always 1..=12 for a value built via `of`/`plus_months`
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("year-month maps to a valid date")
    }

    /// Last day of the month
    pub fn last_day(self) -> NaiveDate {
        self.plus_months(1).first_day().pred_opt().expect("date has a predecessor")
    }

    /// The month `n` months later
    pub fn plus_months(self, n: u32) -> Self {
        let zero_based = self.year * 12 + (self.month as i32 - 1) + n as i32;
        Self {
            year: zero_based.div_euclid(12),
            month: (zero_based.rem_euclid(12) + 1) as u32,
        }
    }

    /// Whole months elapsed from `self` to `other` (negative if earlier)
    pub fn months_until(self, other: YearMonth) -> i32 {
        (other.year - self.year) * 12 + (other.month as i32 - self.month as i32)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Cohort key of a contract: origination date truncated to month
pub fn cohort_of(contract: &Contract) -> YearMonth {
    YearMonth::of(contract.origination_date)
}
