use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use super::engine::{DrawSource, SimulationState};
use super::render::{Dashboard, FinalView, render_dashboard, render_final};
use super::types::{Inputs, SimulationRecord};

pub const DEFAULT_PACE: Duration = Duration::from_secs(1);

/// Presentation pacing between months. Has no effect on the numbers.
pub trait Pacer {
    fn pause(&mut self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(DEFAULT_PACE)
    }
}

impl Pacer for FixedDelay {
    fn pause(&mut self) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn pause(&mut self) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunEvent {
    Idle,
    Frame(Dashboard),
    Complete(FinalView),
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("event consumer went away after {completed} of {horizon} months")]
    ConsumerGone { completed: usize, horizon: u32 },
}

/// Runs the animated loop, publishing a fresh dashboard after every month and a
/// final view once the horizon is reached.
pub async fn animate<D, P>(
    inputs: &Inputs,
    start_date: NaiveDate,
    draws: &mut D,
    pacer: &mut P,
    events: &mpsc::Sender<RunEvent>,
) -> Result<Vec<SimulationRecord>, RunError>
where
    D: DrawSource + Send,
    P: Pacer + Send,
{
    if !inputs.should_start() {
        tracing::debug!("initial balance is zero, staying idle");
        publish(events, RunEvent::Idle, 0, inputs).await?;
        return Ok(Vec::new());
    }

    tracing::info!(
        horizon_months = inputs.horizon_months,
        initial_balance = inputs.initial_balance,
        %start_date,
        "simulation started"
    );

    let mut state = SimulationState::new(*inputs, start_date);
    while !state.is_complete() {
        if let Some(record) = state.step(draws.next_draw()) {
            tracing::debug!(
                month = record.month,
                return_pct = record.monthly_return_pct,
                contribution = record.voluntary_contribution,
                closing_balance = record.closing_balance,
                "month simulated"
            );
        }

        let frame = render_dashboard(inputs, state.records());
        publish(events, RunEvent::Frame(frame), state.records().len(), inputs).await?;
        pacer.pause().await;
    }

    let records = state.into_records();
    let final_view = render_final(inputs, &records);
    tracing::info!(
        months = final_view.summary.months,
        final_balance = final_view.summary.final_balance,
        "simulation completed"
    );
    publish(events, RunEvent::Complete(final_view), records.len(), inputs).await?;

    Ok(records)
}

async fn publish(
    events: &mpsc::Sender<RunEvent>,
    event: RunEvent,
    completed: usize,
    inputs: &Inputs,
) -> Result<(), RunError> {
    events.send(event).await.map_err(|_| {
        tracing::info!(completed, "event consumer disconnected, stopping run");
        RunError::ConsumerGone {
            completed,
            horizon: inputs.horizon_months,
        }
    })
}
