//! Headless driver: animates a run in the terminal instead of the browser.

use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use tokio::sync::mpsc;

use crate::core::{
    Dashboard, DrawSource, FinalView, Inputs, Pacer, RunError, RunEvent, SimulationRecord,
    TableRow, animate, format_currency,
};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const HEADERS: [&str; 7] = [
    "Month",
    "Date",
    "Opening balance (MXN)",
    "Return (%)",
    "Contribution (MXN)",
    "After return",
    "Closing balance",
];

pub async fn run_in_terminal<D, P>(
    inputs: Inputs,
    start_date: NaiveDate,
    mut draws: D,
    mut pacer: P,
) -> Result<Vec<SimulationRecord>, RunError>
where
    D: DrawSource + Send,
    P: Pacer + Send,
{
    let (tx, mut rx) = mpsc::channel::<RunEvent>(8);
    let clear = io::stdout().is_terminal();

    let producer = async move {
        animate(&inputs, start_date, &mut draws, &mut pacer, &tx).await
    };
    let consumer = async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = write_event(&mut io::stdout(), &event, clear) {
                tracing::warn!("terminal output failed: {e}");
                break;
            }
        }
    };

    let (result, ()) = tokio::join!(producer, consumer);
    result
}

pub fn write_event<W: Write>(out: &mut W, event: &RunEvent, clear: bool) -> io::Result<()> {
    match event {
        RunEvent::Idle => writeln!(
            out,
            "Enter an initial balance greater than zero to start the simulation."
        ),
        RunEvent::Frame(dashboard) => {
            if clear {
                write!(out, "{CLEAR_SCREEN}")?;
            }
            write_dashboard(out, dashboard)
        }
        RunEvent::Complete(final_view) => write_final(out, final_view),
    }?;
    out.flush()
}

fn write_dashboard<W: Write>(out: &mut W, dashboard: &Dashboard) -> io::Result<()> {
    writeln!(out, "Month {}/{}", dashboard.month, dashboard.horizon_months)?;

    for chart in [&dashboard.monthly_return, &dashboard.contribution] {
        if let (Some(line), Some(latest)) = (&chart.reference_line, chart.points.last()) {
            let marker = if latest.value >= line.value {
                "above"
            } else {
                "below"
            };
            writeln!(
                out,
                "  {}: {:.2} ({marker} {})",
                chart.title, latest.value, line.label
            )?;
        }
    }
    writeln!(out)?;
    write!(out, "{}", render_table(&dashboard.table))
}

fn write_final<W: Write>(out: &mut W, final_view: &FinalView) -> io::Result<()> {
    let summary = &final_view.summary;
    writeln!(out)?;
    writeln!(out, "{}", final_view.message)?;
    writeln!(out, "  Months simulated:     {}", summary.months)?;
    writeln!(
        out,
        "  Initial balance:      {}",
        format_currency(summary.initial_balance)
    )?;
    writeln!(
        out,
        "  Final balance:        {}",
        format_currency(summary.final_balance)
    )?;
    writeln!(
        out,
        "  Total contributions:  {}",
        format_currency(summary.total_contributions)
    )?;
    writeln!(
        out,
        "  Gain from returns:    {}",
        format_currency(summary.total_return_gain)
    )?;
    writeln!(
        out,
        "  Average return:       {:.4}%",
        summary.average_return_pct
    )
}

/// Plain-text table with right-aligned columns sized to their widest cell.
pub fn render_table(rows: &[TableRow]) -> String {
    let cells: Vec<[String; 7]> = rows
        .iter()
        .map(|row| {
            [
                row.month.to_string(),
                row.date.clone(),
                row.opening_balance.clone(),
                row.monthly_return_pct.clone(),
                row.voluntary_contribution.clone(),
                row.balance_after_return.clone(),
                row.closing_balance.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut table = String::new();
    push_line(&mut table, &HEADERS[..], &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut table, &rule[..], &widths);
    for row in &cells {
        push_line(&mut table, &row[..], &widths);
    }
    table
}

fn push_line<S: AsRef<str>>(table: &mut String, cells: &[S], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:>width$}", cell.as_ref(), width = *width))
        .collect();
    table.push_str(line.join("  ").trim_end());
    table.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        NoDelay, ScriptedDraws, render_dashboard, render_final, run_to_completion,
    };

    fn scenario() -> (Inputs, Vec<SimulationRecord>) {
        let inputs = Inputs {
            horizon_months: 3,
            initial_balance: 10_000.0,
            ..Inputs::default()
        };
        let start = NaiveDate::from_ymd_opt(2024, 6, 13).expect("valid date");
        let mut draws = ScriptedDraws::constant(2.0, 1_000.0);
        let records = run_to_completion(&inputs, start, &mut draws);
        (inputs, records)
    }

    fn written(event: &RunEvent, clear: bool) -> String {
        let mut out = Vec::new();
        write_event(&mut out, event, clear).expect("writing to a Vec cannot fail");
        String::from_utf8(out).expect("output is UTF-8")
    }

    #[test]
    fn render_table_aligns_columns_and_lists_every_row() {
        let (inputs, records) = scenario();
        let table = render_table(&render_dashboard(&inputs, &records).table);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("Opening balance (MXN)"));
        assert!(lines[1].starts_with("-----"));
        assert!(lines[4].contains("2024-08-12"));
        assert!(lines[4].ends_with("13,672.48"));
        assert_eq!(lines[2].len(), lines[4].len());
    }

    #[test]
    fn frame_output_clears_screen_only_when_requested() {
        let (inputs, records) = scenario();
        let frame = RunEvent::Frame(render_dashboard(&inputs, &records[..1]));

        let cleared = written(&frame, true);
        assert!(cleared.starts_with(CLEAR_SCREEN));
        assert!(cleared.contains("Month 1/3"));

        let plain = written(&frame, false);
        assert!(!plain.contains(CLEAR_SCREEN));
        assert!(plain.contains("Monthly Return: 2.00 (above Return threshold (2%))"));
        assert!(plain.contains("Voluntary Contributions: 1000.00 (below"));
    }

    #[test]
    fn final_output_reports_summary() {
        let (inputs, records) = scenario();
        let output = written(&RunEvent::Complete(render_final(&inputs, &records)), false);

        assert!(output.contains("Simulation complete."));
        assert!(output.contains("Final balance:        13,672.48"));
        assert!(output.contains("Total contributions:  3,000.00"));
    }

    #[test]
    fn idle_output_explains_gating() {
        let output = written(&RunEvent::Idle, false);
        assert!(output.contains("initial balance greater than zero"));
    }

    #[tokio::test]
    async fn run_in_terminal_returns_every_month() {
        let (inputs, expected) = scenario();
        let start = NaiveDate::from_ymd_opt(2024, 6, 13).expect("valid date");

        let records = run_in_terminal(
            inputs,
            start,
            ScriptedDraws::constant(2.0, 1_000.0),
            NoDelay,
        )
        .await
        .expect("terminal run completes");
        assert_eq!(records, expected);
    }

    #[tokio::test]
    async fn run_in_terminal_stays_idle_without_balance() {
        let (mut inputs, _) = scenario();
        inputs.initial_balance = 0.0;
        let start = NaiveDate::from_ymd_opt(2024, 6, 13).expect("valid date");

        let draws = ScriptedDraws::constant(2.0, 1_000.0);
        let records = run_in_terminal(inputs, start, draws, NoDelay)
            .await
            .expect("idle run is not an error");
        assert!(records.is_empty());
    }
}
