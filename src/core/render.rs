//! Turns the accumulated records into the dashboard's chart and table views.
//!
//! Every call renders the full sequence so far; consumers replace the previous
//! view with the new one.

use serde::Serialize;

use super::types::{Inputs, SimulationRecord};

pub const COMPLETION_MESSAGE: &str = "Simulation complete.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub month: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceLine {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub color: &'static str,
    pub points: Vec<ChartPoint>,
    pub reference_line: Option<ReferenceLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub month: u32,
    pub date: String,
    pub opening_balance: String,
    pub monthly_return_pct: String,
    pub voluntary_contribution: String,
    pub balance_after_return: String,
    pub closing_balance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub month: u32,
    pub horizon_months: u32,
    pub balance: Chart,
    pub monthly_return: Chart,
    pub contribution: Chart,
    pub table: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub months: u32,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_contributions: f64,
    pub total_return_gain: f64,
    pub average_return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalView {
    pub message: &'static str,
    pub summary: RunSummary,
    pub records: Vec<SimulationRecord>,
}

pub fn render_dashboard(inputs: &Inputs, records: &[SimulationRecord]) -> Dashboard {
    Dashboard {
        month: records.len() as u32,
        horizon_months: inputs.horizon_months,
        balance: Chart {
            title: "Individual Account Balance",
            x_label: "Time (months)",
            y_label: "Balance (MXN)",
            color: "#1f4fd1",
            // Charted as the balance carried into each month.
            points: series(records, |record| record.opening_balance),
            reference_line: None,
        },
        monthly_return: Chart {
            title: "Monthly Return",
            x_label: "Time (months)",
            y_label: "Return (%)",
            color: "#1a8a3a",
            points: series(records, |record| record.monthly_return_pct),
            reference_line: Some(ReferenceLine {
                value: inputs.return_threshold_pct,
                label: format!("Return threshold ({}%)", inputs.return_threshold_pct),
            }),
        },
        contribution: Chart {
            title: "Voluntary Contributions",
            x_label: "Time (months)",
            y_label: "Contribution (MXN)",
            color: "#b0289c",
            points: series(records, |record| record.voluntary_contribution),
            reference_line: Some(ReferenceLine {
                value: inputs.contribution_threshold,
                label: format!(
                    "Contribution threshold ({} MXN)",
                    inputs.contribution_threshold
                ),
            }),
        },
        table: records.iter().map(table_row).collect(),
    }
}

pub fn render_final(inputs: &Inputs, records: &[SimulationRecord]) -> FinalView {
    FinalView {
        message: COMPLETION_MESSAGE,
        summary: summarize(inputs, records),
        records: records.to_vec(),
    }
}

pub fn summarize(inputs: &Inputs, records: &[SimulationRecord]) -> RunSummary {
    let total_contributions: f64 = records.iter().map(|r| r.voluntary_contribution).sum();
    let total_return_gain: f64 = records
        .iter()
        .map(|r| r.balance_after_return - r.opening_balance)
        .sum();
    let average_return_pct = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.monthly_return_pct).sum::<f64>() / records.len() as f64
    };

    RunSummary {
        months: records.len() as u32,
        initial_balance: inputs.initial_balance,
        final_balance: records
            .last()
            .map(|r| r.closing_balance)
            .unwrap_or(inputs.initial_balance),
        total_contributions,
        total_return_gain,
        average_return_pct,
    }
}

pub fn table_row(record: &SimulationRecord) -> TableRow {
    TableRow {
        month: record.month,
        date: record.date.format("%Y-%m-%d").to_string(),
        opening_balance: format_currency(record.opening_balance),
        monthly_return_pct: format!("{:.2}", record.monthly_return_pct),
        voluntary_contribution: format_currency(record.voluntary_contribution),
        balance_after_return: format_currency(record.balance_after_return),
        closing_balance: format_currency(record.closing_balance),
    }
}

/// Two decimals with comma thousands separators, e.g. `13,672.48`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // Keep "-0.00" from appearing for tiny negatives.
    let sign = if value < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{cents}")
}

fn series(
    records: &[SimulationRecord],
    value: impl Fn(&SimulationRecord) -> f64,
) -> Vec<ChartPoint> {
    records
        .iter()
        .map(|record| ChartPoint {
            month: record.month,
            value: value(record),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::{ScriptedDraws, run_to_completion};
    use chrono::NaiveDate;

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

    #[test]
    fn format_currency_groups_thousands_with_two_decimals() {
        assert_eq!(format_currency(0.0), "0.00");
        assert_eq!(format_currency(999.999), "1,000.00");
        assert_eq!(format_currency(1_234.5), "1,234.50");
        assert_eq!(format_currency(13_672.48), "13,672.48");
        assert_eq!(format_currency(1_234_567.891), "1,234,567.89");
        assert_eq!(format_currency(-2_500.0), "-2,500.00");
        assert_eq!(format_currency(-0.001), "0.00");
    }

    #[test]
    fn dashboard_has_one_point_per_record_and_threshold_lines() {
        let (inputs, records) = scenario();
        let dashboard = render_dashboard(&inputs, &records);

        assert_eq!(dashboard.month, 3);
        assert_eq!(dashboard.horizon_months, 3);
        for chart in [
            &dashboard.balance,
            &dashboard.monthly_return,
            &dashboard.contribution,
        ] {
            assert_eq!(chart.points.len(), 3);
            let months: Vec<u32> = chart.points.iter().map(|p| p.month).collect();
            assert_eq!(months, vec![1, 2, 3]);
        }

        assert!(dashboard.balance.reference_line.is_none());
        let return_line = dashboard
            .monthly_return
            .reference_line
            .as_ref()
            .expect("return chart has a threshold");
        assert_eq!(return_line.value, 2.0);
        assert_eq!(return_line.label, "Return threshold (2%)");

        let contribution_line = dashboard
            .contribution
            .reference_line
            .as_ref()
            .expect("contribution chart has a threshold");
        assert_eq!(contribution_line.value, 3_000.0);
    }

    #[test]
    fn balance_chart_plots_opening_balances() {
        let (inputs, records) = scenario();
        let dashboard = render_dashboard(&inputs, &records);
        let values: Vec<f64> = dashboard.balance.points.iter().map(|p| p.value).collect();
        assert_eq!(values[0], 10_000.0);
        assert!((values[2] - 12_424.0).abs() < 1e-6);
    }

    #[test]
    fn table_rows_use_currency_formatting() {
        let (inputs, records) = scenario();
        let dashboard = render_dashboard(&inputs, &records);
        let last = &dashboard.table[2];

        assert_eq!(last.date, "2024-08-12");
        assert_eq!(last.opening_balance, "12,424.00");
        assert_eq!(last.monthly_return_pct, "2.00");
        assert_eq!(last.voluntary_contribution, "1,000.00");
        assert_eq!(last.balance_after_return, "12,672.48");
        assert_eq!(last.closing_balance, "13,672.48");
    }

    #[test]
    fn empty_sequence_renders_empty_views() {
        let inputs = Inputs::default();
        let dashboard = render_dashboard(&inputs, &[]);
        assert_eq!(dashboard.month, 0);
        assert!(dashboard.table.is_empty());
        assert!(dashboard.balance.points.is_empty());

        let summary = summarize(&inputs, &[]);
        assert_eq!(summary.months, 0);
        assert_eq!(summary.final_balance, 0.0);
        assert_eq!(summary.average_return_pct, 0.0);
    }

    #[test]
    fn final_view_summarizes_growth_sources() {
        let (inputs, records) = scenario();
        let view = render_final(&inputs, &records);

        assert_eq!(view.message, COMPLETION_MESSAGE);
        assert_eq!(view.records, records);
        assert_eq!(view.summary.months, 3);
        assert!((view.summary.final_balance - 13_672.48).abs() < 1e-6);
        assert!((view.summary.total_contributions - 3_000.0).abs() < 1e-9);
        assert!((view.summary.average_return_pct - 2.0).abs() < 1e-9);

        let reconstructed = view.summary.initial_balance
            + view.summary.total_contributions
            + view.summary.total_return_gain;
        assert!((reconstructed - view.summary.final_balance).abs() < 1e-6);
    }
}
