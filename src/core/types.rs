use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

pub const MAX_HORIZON_MONTHS: u32 = 36;
pub const DAYS_PER_MONTH_STEP: u64 = 30;
pub const RETURN_PCT_RANGE: RangeInclusive<f64> = 0.5..=2.5;
pub const CONTRIBUTION_RANGE: RangeInclusive<f64> = 500.0..=5_000.0;
pub const RETURN_THRESHOLD_RANGE: RangeInclusive<f64> = 0.0..=5.0;
pub const CONTRIBUTION_THRESHOLD_RANGE: RangeInclusive<f64> = 0.0..=10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inputs {
    pub horizon_months: u32,
    pub initial_balance: f64,
    /// Only drawn as a reference line on the return chart.
    pub return_threshold_pct: f64,
    /// Only drawn as a reference line on the contribution chart.
    pub contribution_threshold: f64,
    pub seed: Option<u64>,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            horizon_months: 12,
            initial_balance: 0.0,
            return_threshold_pct: 2.0,
            contribution_threshold: 3_000.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("horizonMonths must be between 1 and 36, got {0}")]
    Horizon(u32),
    #[error("initialBalance must be a finite value >= 0, got {0}")]
    InitialBalance(f64),
    #[error("returnThresholdPct must be between 0 and 5, got {0}")]
    ReturnThreshold(f64),
    #[error("contributionThreshold must be between 0 and 10000, got {0}")]
    ContributionThreshold(f64),
}

impl Inputs {
    pub fn validate(self) -> Result<Self, InputError> {
        if !(1..=MAX_HORIZON_MONTHS).contains(&self.horizon_months) {
            return Err(InputError::Horizon(self.horizon_months));
        }

        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            return Err(InputError::InitialBalance(self.initial_balance));
        }

        if !RETURN_THRESHOLD_RANGE.contains(&self.return_threshold_pct) {
            return Err(InputError::ReturnThreshold(self.return_threshold_pct));
        }

        if !CONTRIBUTION_THRESHOLD_RANGE.contains(&self.contribution_threshold) {
            return Err(InputError::ContributionThreshold(
                self.contribution_threshold,
            ));
        }

        Ok(self)
    }

    /// A run only starts once a positive balance has been entered.
    pub fn should_start(&self) -> bool {
        self.initial_balance > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRecord {
    pub month: u32,
    pub date: NaiveDate,
    pub opening_balance: f64,
    pub monthly_return_pct: f64,
    pub voluntary_contribution: f64,
    pub balance_after_return: f64,
    pub closing_balance: f64,
}
