//! Plain-text and JSON rendering of a [`PipelineRun`].
//!
//! Three sections, in order: the dashboard with the combined tables, the raw
//! data as published, and links to the source pages.

use std::fmt::Write;

use crate::{
    SourceOutcome,
    business_date::format_date,
    combined::combine,
    config::{FORWARD_POINTS_URL, INDICATORS_URL, RATES_URL},
    indicator_scraper::{IndicatorKind, IndicatorValue},
    numeric::format_display,
    pipeline::PipelineRun,
    rate_scraper::RateScrape,
    table_extractor::RawTable,
};

pub fn render_json(run: &PipelineRun) -> serde_json::Result<String> {
    serde_json::to_string_pretty(run)
}

pub fn render_text(run: &PipelineRun) -> String {
    let mut out = String::new();
    out.push_str(&render_dashboard(run));
    out.push('\n');
    out.push_str(&render_raw_data(run));
    out.push('\n');
    out.push_str(&render_links());
    out
}

pub fn render_dashboard(run: &PipelineRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== TCAM dashboard ===");
    let _ = writeln!(out, "Business date: {}", format_date(run.base_date));
    push_indicator_notice(&mut out, &run.forward_points, IndicatorKind::ForwardPoints);
    push_indicator_notice(&mut out, &run.differential, IndicatorKind::MatchedOperationDifferential);

    let indicators = [run.forward_points_value(), run.differential_value()];
    for (n, (date, outcome)) in run.dated_rates().enumerate() {
        let label = tcam_label(n);
        let _ = writeln!(out, "\n--- {label} ({}) ---", format_date(date));
        match outcome {
            SourceOutcome::Data { value } => {
                for indicator in &indicators {
                    out.push_str(&combined_table(&label, value, indicator));
                }
            }
            other => push_absent(&mut out, other),
        }
    }
    out
}

pub fn render_raw_data(run: &PipelineRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Raw data ===");

    for (n, (date, outcome)) in run.dated_rates().enumerate() {
        let _ = writeln!(out, "\n--- {} ({}) ---", tcam_label(n), format_date(date));
        match outcome {
            SourceOutcome::Data { value } => {
                let record = &value.record;
                let _ = writeln!(out, "Rates (OTC)");
                out.push_str(&text_table(
                    &["Date", "Closing", "Minimum", "Mean", "Maximum"],
                    &[vec![
                        format_date(record.date),
                        format_display(record.closing),
                        format_display(record.minimum),
                        format_display(record.mean),
                        format_display(record.maximum),
                    ]],
                ));
                push_raw_table(&mut out, "Settled values", &value.settlement);
                push_raw_table(&mut out, "Contracted volume", &value.volume);
            }
            other => push_absent(&mut out, other),
        }
    }

    let _ = writeln!(out, "\n--- FRP0 forward points ---");
    match &run.forward_points {
        SourceOutcome::Data { value } => {
            let headers: Vec<&str> = value.details.iter().map(|(label, _)| label.as_str()).collect();
            let row: Vec<String> = value.details.iter().map(|(_, cell)| cell.clone()).collect();
            out.push_str(&text_table(&headers, &[row]));
        }
        other => push_absent(&mut out, other),
    }

    let _ = writeln!(out, "\n--- DIF OPER CASADA - COMPRA ---");
    match &run.differential {
        SourceOutcome::Data { value } => {
            let _ = writeln!(out, "Current value: {}", value.raw_text);
            let _ = writeln!(out, "Last updated: {}", value.as_of);
        }
        other => push_absent(&mut out, other),
    }
    out
}

pub fn render_links() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Links ===");
    let _ = writeln!(out, "- Foreign exchange history: {RATES_URL}");
    let _ = writeln!(out, "- FRP0 bulletin: {FORWARD_POINTS_URL}");
    let _ = writeln!(out, "- Financial indicators (DIF OPER CASADA): {INDICATORS_URL}");
    out
}

fn tcam_label(n: usize) -> String {
    format!("TCAM {:02}", n + 1)
}

fn combined_table(label: &str, scrape: &RateScrape, indicator: &IndicatorValue) -> String {
    let short = match indicator.kind {
        IndicatorKind::ForwardPoints => "FRP0",
        IndicatorKind::MatchedOperationDifferential => "DIF",
    };
    let rows: Vec<Vec<String>> = combine(&scrape.record, indicator)
        .into_iter()
        .map(|row| vec![row.statistic.label().to_string(), row.rate, row.indicator, row.sum])
        .collect();
    let sum_header = format!("Sum (TCAM + {short})");

    let mut out = format!("{label} + {}\n", indicator.kind.title());
    out.push_str(&text_table(
        &["Statistic", "TCAM (OTC)", indicator.kind.title(), sum_header.as_str()],
        &rows,
    ));
    out
}

fn push_indicator_notice(out: &mut String, outcome: &SourceOutcome<IndicatorValue>, kind: IndicatorKind) {
    match outcome {
        SourceOutcome::Data { .. } => {}
        SourceOutcome::NoData { reason } => {
            let _ = writeln!(out, "{} unavailable: {reason}", kind.title());
        }
        SourceOutcome::Failed { error } => {
            let _ = writeln!(out, "{} unavailable: {error}", kind.title());
        }
    }
}

fn push_absent<T>(out: &mut String, outcome: &SourceOutcome<T>) {
    match outcome {
        SourceOutcome::Data { .. } => {}
        SourceOutcome::NoData { reason } => {
            let _ = writeln!(out, "{reason}");
        }
        SourceOutcome::Failed { error } => {
            let _ = writeln!(out, "error: {error}");
        }
    }
}

fn push_raw_table(out: &mut String, title: &str, table: &RawTable) {
    let _ = writeln!(out, "{title}");
    if table.is_empty() {
        let _ = writeln!(out, "(empty)");
        return;
    }
    let headers: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    out.push_str(&text_table(&headers, &table.rows));
}

/// Left-aligned columns separated by ` | `. Short rows just end early; extra
/// cells get an unnamed column.
fn text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(headers.len());
    let mut widths = vec![0; width];
    for (i, header) in headers.iter().enumerate() {
        widths[i] = header.chars().count();
    }
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<w$}", cell, w = widths[i]))
            .collect();
        format!("{}\n", padded.join(" | ").trim_end())
    };

    let mut out = line(headers.to_vec());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("{}\n", rule.join("-+-")));
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScrapeError, rate_scraper::RateRecord};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn sample_run() -> PipelineRun {
        let mut rates = BTreeMap::new();
        rates.insert(
            date(31),
            SourceOutcome::data(RateScrape {
                record: RateRecord {
                    date: date(31),
                    closing: 5234.1,
                    minimum: 5200.0,
                    mean: 5220.5,
                    maximum: 5250.0,
                },
                volume: RawTable::default(),
                settlement: RawTable::new(&["Date", "USD", "BRL"], vec![vec!["31/05/2024".into(), "10".into()]]),
            }),
        );
        rates.insert(date(30), SourceOutcome::no_data("no data for date 30/05/2024"));
        rates.insert(
            date(29),
            SourceOutcome::failed(ScrapeError::Timeout {
                source_name: "rates 29/05/2024".to_string(),
                seconds: 15,
            }),
        );

        let mut forward_points = IndicatorValue::new(IndicatorKind::ForwardPoints, "2,3", "N/A");
        forward_points.details = vec![("Last Price".to_string(), "2,3".to_string())];

        PipelineRun {
            today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            base_date: date(31),
            fetcher: "http",
            rates,
            forward_points: SourceOutcome::data(forward_points),
            differential: SourceOutcome::no_data("rendered by client-side script"),
        }
    }

    #[test]
    fn dashboard_orders_dates_newest_first() {
        let text = render_dashboard(&sample_run());
        let first = text.find("TCAM 01 (31/05/2024)").unwrap();
        let second = text.find("TCAM 02 (30/05/2024)").unwrap();
        let third = text.find("TCAM 03 (29/05/2024)").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn dashboard_shows_sums_and_notices() {
        let text = render_dashboard(&sample_run());
        assert!(text.contains("5.236,4"), "{text}");
        assert!(text.contains("no data for date 30/05/2024"));
        assert!(text.contains("error: rates 29/05/2024: timed out after 15s"));
        assert!(text.contains("DIF OPER CASADA (buy) unavailable: rendered by client-side script"));
        // The unavailable differential still yields a table, adding zero.
        assert!(text.contains("| N/A"));
    }

    #[test]
    fn raw_view_lists_tables() {
        let text = render_raw_data(&sample_run());
        assert!(text.contains("Settled values"));
        assert!(text.contains("31/05/2024 | 10"));
        assert!(text.contains("Contracted volume\n(empty)"));
        assert!(text.contains("Last Price"));
    }

    #[test]
    fn text_table_pads_columns() {
        let table = text_table(&["a", "bbb"], &[vec!["xx".into(), "y".into()], vec!["z".into()]]);
        assert_eq!(table, "a  | bbb\n---+----\nxx | y\nz\n");
    }

    #[test]
    fn json_keeps_outcome_tags() {
        let json = render_json(&sample_run()).unwrap();
        assert!(json.contains("\"status\": \"no_data\""));
        assert!(json.contains("\"2024-05-31\""));
    }
}
