mod engine;
mod render;
mod runner;
mod types;

pub use engine::{
    DrawSource, MonthlyDraw, ScriptedDraws, SimulationState, UniformDraws, apply_monthly_return,
    month_date, run_to_completion,
};
pub use render::{
    COMPLETION_MESSAGE, Chart, ChartPoint, Dashboard, FinalView, ReferenceLine, RunSummary,
    TableRow, format_currency, render_dashboard, render_final, summarize, table_row,
};
pub use runner::{DEFAULT_PACE, FixedDelay, NoDelay, Pacer, RunError, RunEvent, animate};
pub use types::{
    CONTRIBUTION_RANGE, CONTRIBUTION_THRESHOLD_RANGE, DAYS_PER_MONTH_STEP, InputError, Inputs,
    MAX_HORIZON_MONTHS, RETURN_PCT_RANGE, RETURN_THRESHOLD_RANGE, SimulationRecord,
};
