use chrono::NaiveDate;
use log::warn;
use scraper::{ElementRef, Html};
use serde::Serialize;

use crate::{
    ScrapeError,
    business_date::{format_date, parse_date},
    numeric::decode_rate,
    table_extractor::{RawTable, TableExtractor},
};

pub const RATES_TABLE_ID: &str = "ratesTable";
pub const VOLUME_TABLE_ID: &str = "contractedVolume";
pub const SETTLEMENT_TABLE_ID: &str = "nettingTable";

/// Shown by the history page when nothing was published for the date.
pub const NO_DATA_MARKER: &str = "Não há registro";
const NON_RENDERED_TAGS: [&str; 4] = ["script", "style", "template", "noscript"];

/// Date, closing, OTC min/mean/max, exchange session min/mean/max.
const RATE_COLUMNS: usize = 8;

pub const VOLUME_COLUMNS: [&str; 10] = [
    "Date",
    "USD OTC",
    "BRL OTC",
    "Trades OTC",
    "USD Session",
    "BRL Session",
    "Trades Session",
    "USD Total",
    "BRL Total",
    "Trades Total",
];

pub const SETTLEMENT_COLUMNS: [&str; 3] = ["Date", "USD", "BRL"];

/// Published OTC rate statistics for one trading date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateRecord {
    pub date: NaiveDate,
    pub closing: f64,
    pub minimum: f64,
    pub mean: f64,
    pub maximum: f64,
}

/// Everything the history page holds for one queried date.
///
/// The auxiliary tables only exist next to a record; they may be empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateScrape {
    pub record: RateRecord,
    pub volume: RawTable,
    pub settlement: RawTable,
}

/// Builds a [`RateScrape`] out of a rendered rate-history page.
///
/// Returns `Ok(None)` when the page says nothing was published, or when the
/// rate table is missing or has no well-formed row.
pub fn build_rate_scrape(document: &Html, date: NaiveDate) -> Result<Option<RateScrape>, ScrapeError> {
    if has_no_data_marker(document) {
        return Ok(None);
    }

    let Some(record) = build_rate_record(document, date)? else {
        return Ok(None);
    };

    let volume = TableExtractor::lenient().extract(document, VOLUME_TABLE_ID, Some(VOLUME_COLUMNS.len()))?;
    let settlement =
        TableExtractor::lenient().extract(document, SETTLEMENT_TABLE_ID, Some(SETTLEMENT_COLUMNS.len()))?;

    Ok(Some(RateScrape {
        record,
        volume: RawTable::new(&VOLUME_COLUMNS, volume),
        settlement: RawTable::new(&SETTLEMENT_COLUMNS, settlement),
    }))
}

/// Looks for the marker in rendered text only. The page source of the
/// history app may carry the same phrase inside scripts and templates.
pub fn has_no_data_marker(document: &Html) -> bool {
    document.root_element().descendants().any(|node| {
        let Some(text) = node.value().as_text() else {
            return false;
        };
        let rendered = node
            .parent()
            .and_then(ElementRef::wrap)
            .is_none_or(|parent| !NON_RENDERED_TAGS.contains(&parent.value().name()));
        rendered && text.contains(NO_DATA_MARKER)
    })
}

fn build_rate_record(document: &Html, date: NaiveDate) -> Result<Option<RateRecord>, ScrapeError> {
    let rows = TableExtractor::strict().extract(document, RATES_TABLE_ID, Some(RATE_COLUMNS))?;
    let Some(row) = rows.first() else {
        return Ok(None);
    };

    // Columns 5..8 are the exchange session figures; only OTC is carried.
    let row_date = parse_date(&row[0]).unwrap_or_else(|| {
        warn!(
            "Rate row date {:?} is unreadable, using queried date {}",
            row[0],
            format_date(date)
        );
        date
    });

    Ok(Some(RateRecord {
        date: row_date,
        closing: decode_rate(&row[1]),
        minimum: decode_rate(&row[2]),
        mean: decode_rate(&row[3]),
        maximum: decode_rate(&row[4]),
    }))
}
