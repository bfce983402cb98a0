use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tcam_scraper::{
    DocumentFetcher, ScrapeError, ScrapingContext, SourceOutcome,
    config::ScrapingConfig,
    fetcher::FetchRequest,
    indicator_scraper::IndicatorKind,
    pipeline,
    report::render_text,
};

const RATES_PAGE: &str = include_str!("fixtures/rates_page.html");
const NO_DATA_PAGE: &str = include_str!("fixtures/no_data_page.html");
const FRP_BULLETIN: &str = include_str!("fixtures/frp_bulletin.html");
const INDICATORS_PAGE: &str = include_str!("fixtures/indicators_page.html");

/// Serves canned pages keyed by request source name; anything else is a 404.
struct CannedFetcher {
    pages: HashMap<String, String>,
    runs_scripts: bool,
    requested: Vec<String>,
    closed: Arc<AtomicBool>,
}

impl CannedFetcher {
    fn new(pages: &[(&str, &str)], runs_scripts: bool) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
            runs_scripts,
            requested: vec![],
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl DocumentFetcher for CannedFetcher {
    fn name(&self) -> &'static str {
        "canned"
    }

    fn runs_scripts(&self) -> bool {
        self.runs_scripts
    }

    async fn fetch(&mut self, request: &FetchRequest) -> Result<String, ScrapeError> {
        self.requested.push(request.source_name.clone());
        self.pages
            .get(&request.source_name)
            .cloned()
            .ok_or_else(|| ScrapeError::Status {
                source_name: request.source_name.clone(),
                status: 404,
            })
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn tuesday_run_queries_monday_and_the_weekend() {
    let mut fetcher = CannedFetcher::new(
        &[
            ("rates 03/06/2024", RATES_PAGE),
            ("rates 02/06/2024", NO_DATA_PAGE),
            ("forward points", FRP_BULLETIN),
            ("differential", INDICATORS_PAGE),
        ],
        true,
    );

    let run = pipeline::run(&mut fetcher, date(2024, 6, 4)).await;

    assert_eq!(run.base_date, date(2024, 6, 3));
    assert_eq!(
        fetcher.requested,
        vec![
            "rates 03/06/2024",
            "rates 02/06/2024",
            "rates 01/06/2024",
            "forward points",
            "differential",
        ]
    );

    let monday = run.rates[&date(2024, 6, 3)].value().unwrap();
    // The record carries the date printed in the table row.
    assert_eq!(monday.record.date, date(2024, 5, 31));
    assert_eq!(monday.record.closing, 5234.1);
    assert_eq!(monday.record.minimum, 5201.0);
    assert_eq!(monday.record.mean, 5220.5);
    assert_eq!(monday.record.maximum, 5250.0);
    assert_eq!(monday.volume.rows.len(), 2);
    assert_eq!(monday.volume.get(1, "Date"), Some("Total"));
    assert_eq!(monday.settlement.get(0, "BRL"), Some("5.115.000"));

    match &run.rates[&date(2024, 6, 2)] {
        SourceOutcome::NoData { reason } => assert_eq!(reason, "no data for date 02/06/2024"),
        other => panic!("expected no data, got {other:?}"),
    }
    match &run.rates[&date(2024, 6, 1)] {
        SourceOutcome::Failed { error } => {
            assert_eq!(error.to_string(), "rates 01/06/2024: server answered with status 404")
        }
        other => panic!("expected a failure, got {other:?}"),
    }

    let forward_points = run.forward_points_value();
    assert_eq!(forward_points.raw_text, "2,30");
    assert_eq!(forward_points.numeric_value, 2.3);

    let differential = run.differential_value();
    assert_eq!(differential.raw_text, "4,95");
    assert_eq!(differential.as_of, "Atualizado em 31/05/2024 18:05");
}

#[tokio::test]
async fn static_fetcher_explains_missing_differential() {
    let mut fetcher = CannedFetcher::new(
        &[("differential", "<html><body><app-root></app-root></body></html>")],
        false,
    );

    let outcome = pipeline::scrape_differential_indicator(&mut fetcher).await;
    match outcome {
        SourceOutcome::NoData { reason } => {
            assert!(reason.contains("client-side script"), "{reason}");
            assert!(reason.contains("TCAM_FETCHER=browser"), "{reason}");
        }
        other => panic!("expected no data, got {other:?}"),
    }
}

#[tokio::test]
async fn failures_never_stop_the_run() {
    let mut fetcher = CannedFetcher::new(&[], false);
    let run = pipeline::run(&mut fetcher, date(2024, 6, 7)).await;

    assert_eq!(run.rates.len(), 3);
    assert!(run.rates.values().all(|outcome| !outcome.is_data()));
    assert_eq!(fetcher.requested.len(), 5);
    assert_eq!(
        run.differential_value(),
        tcam_scraper::indicator_scraper::IndicatorValue::unavailable(
            IndicatorKind::MatchedOperationDifferential
        )
    );

    let text = render_text(&run);
    assert!(text.contains("error: rates 06/06/2024: server answered with status 404"));
}

#[tokio::test]
async fn context_releases_the_fetcher_after_the_run() {
    let fetcher = CannedFetcher::new(&[("rates 31/05/2024", RATES_PAGE)], false);
    let closed = fetcher.closed.clone();
    let config = ScrapingConfig {
        today: Some(date(2024, 6, 1)),
        ..ScrapingConfig::default()
    };

    let mut context = ScrapingContext::with_fetcher(config, Box::new(fetcher));
    let run = context.run().await;

    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(run.base_date, date(2024, 5, 31));
    assert!(run.rates[&date(2024, 5, 31)].is_data());
    assert_eq!(run.fetcher, "canned");
}
