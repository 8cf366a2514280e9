//! Portfolio assumption tables: collection probabilities and discounting
//!
//! Defaults carry the standard pricing assumptions; callers can override
//! any entry from configuration.

use crate::aging::Bucket;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Probability that a scheduled amount is actually collected, keyed by the
/// contract's current overdue bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionProbabilities {
    table: BTreeMap<Bucket, f64>,
}

impl Default for CollectionProbabilities {
    fn default() -> Self {
        Self {
            table: BTreeMap::from([
                (Bucket::Current, 0.95),
                (Bucket::Days1To30, 0.80),
                (Bucket::Days31To60, 0.55),
                (Bucket::Days61To90, 0.30),
                (Bucket::Days91To120, 0.15),
                (Bucket::Days121Plus, 0.02),
            ]),
        }
    }
}

impl CollectionProbabilities {
    /// Build from explicit entries, e.g. loaded from configuration
    pub fn from_entries(entries: &[(Bucket, f64)]) -> Self {
        Self {
            table: entries.iter().copied().collect(),
        }
    }

    /// Every bucket must have a probability, and each must lie in [0, 1]
    pub fn validate(&self) -> Result<(), ConfigError> {
        for bucket in Bucket::ALL {
            let value = *self
                .table
                .get(&bucket)
                .ok_or(ConfigError::MissingBucket(bucket))?;
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { bucket, value });
            }
        }
        Ok(())
    }

    /// Collection probability for a bucket; 0 for a missing entry, which
    /// `validate` rules out before projection.
    pub fn probability(&self, bucket: Bucket) -> f64 {
        self.table.get(&bucket).copied().unwrap_or(0.0)
    }
}

/// Discounting assumptions for present-value calculations
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DiscountAssumptions {
    /// Annual discount rate, e.g. 0.15 for 15%
    pub annual_rate: f64,
}

impl Default for DiscountAssumptions {
    fn default() -> Self {
        Self { annual_rate: 0.15 }
    }
}

impl DiscountAssumptions {
    pub fn new(annual_rate: f64) -> Self {
        Self { annual_rate }
    }

    /// A rate at or below -100% makes the discount factor base non-positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.annual_rate <= -1.0 {
            return Err(ConfigError::InvalidDiscountRate(self.annual_rate));
        }
        Ok(())
    }

    /// Discount factor for a flow `days` days ahead: (1+r)^-(days/365)
    pub fn factor(&self, days: i64) -> f64 {
        (1.0 + self.annual_rate).powf(-(days as f64) / 365.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_table_is_complete() {
        let probs = CollectionProbabilities::default();
        assert!(probs.validate().is_ok());
        assert_eq!(probs.probability(Bucket::Current), 0.95);
        assert_eq!(probs.probability(Bucket::Days121Plus), 0.02);
    }

    #[test]
    fn test_incomplete_table_fails_validation() {
        let probs = CollectionProbabilities::from_entries(&[
            (Bucket::Current, 0.95),
            (Bucket::Days1To30, 0.80),
        ]);
        assert!(matches!(
            probs.validate(),
            Err(ConfigError::MissingBucket(Bucket::Days31To60))
        ));
    }

    #[test]
    fn test_probability_out_of_range() {
        let mut entries: Vec<(Bucket, f64)> =
            Bucket::ALL.iter().map(|b| (*b, 0.5)).collect();
        entries[0].1 = 1.5;
        let probs = CollectionProbabilities::from_entries(&entries);
        assert!(matches!(
            probs.validate(),
            Err(ConfigError::ProbabilityOutOfRange { .. })
        ));
    }

    #[test]
    fn test_discount_factor() {
        let discount = DiscountAssumptions::new(0.10);
        assert!(discount.validate().is_ok());
        assert_relative_eq!(discount.factor(365), 1.0 / 1.10, epsilon = 1e-12);
        assert_relative_eq!(discount.factor(0), 1.0, epsilon = 1e-12);

        assert!(DiscountAssumptions::new(-1.0).validate().is_err());
        assert!(DiscountAssumptions::new(-2.0).validate().is_err());
        assert!(DiscountAssumptions::new(-0.5).validate().is_ok());
    }
}
