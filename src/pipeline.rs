//! One sequential run: three rate-history queries, then the two indicators.
//!
//! Every fetch-and-parse step is its own failure boundary. Whatever goes
//! wrong in one of them ends up as that source's [`SourceOutcome`] and the
//! run moves on to the next source.

use std::{collections::BTreeMap, time::Duration};

use chrono::NaiveDate;
use log::{error, info, warn};
use scraper::Html;
use serde::Serialize;

use crate::{
    ScrapeError, SourceOutcome,
    business_date::{format_date, query_dates, resolve_business_date},
    config::{FORWARD_POINTS_URL, INDICATORS_URL, RATES_URL},
    fetcher::{DateInput, DocumentFetcher, FetchRequest, WaitCondition},
    indicator_scraper::{
        DIFFERENTIAL_LABEL, IndicatorKind, IndicatorValue, scrape_differential, scrape_forward_points,
    },
    rate_scraper::{NO_DATA_MARKER, RateScrape, build_rate_scrape},
};

const RATES_WAIT: Duration = Duration::from_secs(30);
const FORWARD_POINTS_WAIT: Duration = Duration::from_secs(15);
const DIFFERENTIAL_WAIT: Duration = Duration::from_secs(20);

/// Everything one run produced. Nothing here outlives the run.
#[derive(Debug, Serialize)]
pub struct PipelineRun {
    pub today: NaiveDate,
    pub base_date: NaiveDate,
    pub fetcher: &'static str,
    pub rates: BTreeMap<NaiveDate, SourceOutcome<RateScrape>>,
    pub forward_points: SourceOutcome<IndicatorValue>,
    pub differential: SourceOutcome<IndicatorValue>,
}

impl PipelineRun {
    /// Queried dates, newest first, with what was found for each.
    pub fn dated_rates(&self) -> impl Iterator<Item = (NaiveDate, &SourceOutcome<RateScrape>)> {
        self.rates.iter().rev().map(|(date, outcome)| (*date, outcome))
    }

    pub fn forward_points_value(&self) -> IndicatorValue {
        indicator_or_unavailable(&self.forward_points, IndicatorKind::ForwardPoints)
    }

    pub fn differential_value(&self) -> IndicatorValue {
        indicator_or_unavailable(&self.differential, IndicatorKind::MatchedOperationDifferential)
    }
}

fn indicator_or_unavailable(outcome: &SourceOutcome<IndicatorValue>, kind: IndicatorKind) -> IndicatorValue {
    outcome
        .value()
        .cloned()
        .unwrap_or_else(|| IndicatorValue::unavailable(kind))
}

pub async fn run(fetcher: &mut dyn DocumentFetcher, today: NaiveDate) -> PipelineRun {
    let base_date = resolve_business_date(today);
    info!(
        "Business date for {} is {} (fetcher: {})",
        format_date(today),
        format_date(base_date),
        fetcher.name()
    );

    let mut rates = BTreeMap::new();
    for date in query_dates(base_date) {
        let outcome = scrape_rates(fetcher, date).await;
        rates.insert(date, outcome);
    }

    let forward_points = scrape_forward_points_quote(fetcher).await;
    let differential = scrape_differential_indicator(fetcher).await;

    PipelineRun {
        today,
        base_date,
        fetcher: fetcher.name(),
        rates,
        forward_points,
        differential,
    }
}

pub fn rates_request(date: NaiveDate) -> FetchRequest {
    FetchRequest {
        source_name: format!("rates {}", format_date(date)),
        url: RATES_URL.to_string(),
        date_input: Some(DateInput {
            value: format_date(date),
            query_param: "initialDate",
            field_selector: "input[name=\"initialDate\"]",
            submit_text: "Buscar",
        }),
        wait_for: vec![
            WaitCondition::Selector("table#ratesTable"),
            WaitCondition::Text(NO_DATA_MARKER),
        ],
        wait_timeout: RATES_WAIT,
    }
}

pub fn forward_points_request() -> FetchRequest {
    FetchRequest {
        source_name: "forward points".to_string(),
        url: FORWARD_POINTS_URL.to_string(),
        date_input: None,
        wait_for: vec![WaitCondition::Selector("#MercadoFut2")],
        wait_timeout: FORWARD_POINTS_WAIT,
    }
}

pub fn differential_request() -> FetchRequest {
    FetchRequest {
        source_name: "differential".to_string(),
        url: INDICATORS_URL.to_string(),
        date_input: None,
        wait_for: vec![WaitCondition::Text(DIFFERENTIAL_LABEL)],
        wait_timeout: DIFFERENTIAL_WAIT,
    }
}

pub async fn scrape_rates(fetcher: &mut dyn DocumentFetcher, date: NaiveDate) -> SourceOutcome<RateScrape> {
    let no_data = format!("no data for date {}", format_date(date));
    fetch_and_parse(fetcher, &rates_request(date), no_data, |document| {
        build_rate_scrape(document, date)
    })
    .await
}

pub async fn scrape_forward_points_quote(fetcher: &mut dyn DocumentFetcher) -> SourceOutcome<IndicatorValue> {
    let no_data = "FRP0 quote not found on the bulletin".to_string();
    fetch_and_parse(fetcher, &forward_points_request(), no_data, scrape_forward_points).await
}

pub async fn scrape_differential_indicator(fetcher: &mut dyn DocumentFetcher) -> SourceOutcome<IndicatorValue> {
    let no_data = if fetcher.runs_scripts() {
        format!("'{DIFFERENTIAL_LABEL}' not found on the indicators page")
    } else {
        format!(
            "'{DIFFERENTIAL_LABEL}' is rendered by client-side script and the {} fetcher does not run scripts (try TCAM_FETCHER=browser)",
            fetcher.name()
        )
    };
    fetch_and_parse(fetcher, &differential_request(), no_data, scrape_differential).await
}

async fn fetch_and_parse<T, F>(
    fetcher: &mut dyn DocumentFetcher,
    request: &FetchRequest,
    no_data_reason: String,
    parse: F,
) -> SourceOutcome<T>
where
    F: FnOnce(&Html) -> Result<Option<T>, ScrapeError>,
{
    info!("Fetching {} with {}", request.source_name, fetcher.name());
    let body = match fetcher.fetch(request).await {
        Ok(body) => body,
        Err(err) => {
            error!("{err}");
            return SourceOutcome::failed(err);
        }
    };

    let parsed = {
        let document = Html::parse_document(&body);
        parse(&document)
    };

    match parsed {
        Ok(Some(value)) => SourceOutcome::data(value),
        Ok(None) => {
            warn!("{}: {no_data_reason}", request.source_name);
            SourceOutcome::no_data(no_data_reason)
        }
        Err(err) => {
            error!("{err}");
            SourceOutcome::failed(err)
        }
    }
}
