use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::types::{
    CONTRIBUTION_RANGE, DAYS_PER_MONTH_STEP, Inputs, RETURN_PCT_RANGE, SimulationRecord,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyDraw {
    pub return_pct: f64,
    pub contribution: f64,
}

/// Source of the synthetic monthly return and voluntary contribution.
pub trait DrawSource {
    fn next_draw(&mut self) -> MonthlyDraw;
}

pub struct UniformDraws<R> {
    rng: R,
}

impl UniformDraws<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn for_inputs(inputs: &Inputs) -> Self {
        match inputs.seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> UniformDraws<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DrawSource for UniformDraws<R> {
    fn next_draw(&mut self) -> MonthlyDraw {
        // Return is drawn before the contribution.
        let return_pct = self.rng.gen_range(RETURN_PCT_RANGE);
        let contribution = self.rng.gen_range(CONTRIBUTION_RANGE);
        MonthlyDraw {
            return_pct,
            contribution,
        }
    }
}

/// Replays a fixed list of draws, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct ScriptedDraws {
    draws: Vec<MonthlyDraw>,
    next: usize,
}

impl ScriptedDraws {
    /// Returns `None` for an empty list, which has nothing to replay.
    pub fn new(draws: Vec<MonthlyDraw>) -> Option<Self> {
        if draws.is_empty() {
            return None;
        }
        Some(Self { draws, next: 0 })
    }

    pub fn constant(return_pct: f64, contribution: f64) -> Self {
        Self {
            draws: vec![MonthlyDraw {
                return_pct,
                contribution,
            }],
            next: 0,
        }
    }
}

impl DrawSource for ScriptedDraws {
    fn next_draw(&mut self) -> MonthlyDraw {
        let draw = self.draws[self.next % self.draws.len()];
        self.next += 1;
        draw
    }
}

/// Accumulated state of one run. Records are only ever appended.
#[derive(Debug, Clone)]
pub struct SimulationState {
    inputs: Inputs,
    start_date: NaiveDate,
    records: Vec<SimulationRecord>,
}

impl SimulationState {
    pub fn new(inputs: Inputs, start_date: NaiveDate) -> Self {
        Self {
            inputs,
            start_date,
            records: Vec::with_capacity(inputs.horizon_months as usize),
        }
    }

    pub fn records(&self) -> &[SimulationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SimulationRecord> {
        self.records
    }

    pub fn is_complete(&self) -> bool {
        self.records.len() >= self.inputs.horizon_months as usize
    }

    /// Balance the next month opens with.
    pub fn next_opening_balance(&self) -> f64 {
        self.records
            .last()
            .map(|record| record.closing_balance)
            .unwrap_or(self.inputs.initial_balance)
    }

    /// Advances one month. Returns `None` once the horizon has been reached.
    pub fn step(&mut self, draw: MonthlyDraw) -> Option<&SimulationRecord> {
        if self.is_complete() {
            return None;
        }

        let index = self.records.len();
        let opening_balance = self.next_opening_balance();
        let balance_after_return = apply_monthly_return(opening_balance, draw.return_pct);

        self.records.push(SimulationRecord {
            month: index as u32 + 1,
            date: month_date(self.start_date, index),
            opening_balance,
            monthly_return_pct: draw.return_pct,
            voluntary_contribution: draw.contribution,
            balance_after_return,
            closing_balance: balance_after_return + draw.contribution,
        });
        self.records.last()
    }
}

pub fn apply_monthly_return(balance: f64, return_pct: f64) -> f64 {
    balance * (1.0 + return_pct / 100.0)
}

/// Synthetic monthly cadence: 30 days per step, not calendar months.
pub fn month_date(start: NaiveDate, index: usize) -> NaiveDate {
    let days = DAYS_PER_MONTH_STEP.saturating_mul(index as u64);
    start.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

pub fn run_to_completion<D: DrawSource>(
    inputs: &Inputs,
    start_date: NaiveDate,
    draws: &mut D,
) -> Vec<SimulationRecord> {
    if !inputs.should_start() {
        return Vec::new();
    }

    let mut state = SimulationState::new(*inputs, start_date);
    while !state.is_complete() {
        state.step(draws.next_draw());
    }
    state.into_records()
}
