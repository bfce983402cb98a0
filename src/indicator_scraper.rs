use scraper::Html;
use serde::Serialize;

use crate::{
    ScrapeError,
    numeric::decode_indicator,
    table_extractor::row_cells,
    text_manipulators::{extract_text, first_token, nearest_ancestor, parse_selector},
};

/// Placeholder shown for values or timestamps that could not be read.
pub const UNAVAILABLE: &str = "N/A";

pub const FORWARD_POINTS_CONTAINER_ID: &str = "MercadoFut2";
pub const FORWARD_POINTS_TABLE_CLASS: &str = "tabConteudo";
/// The FRP0 contract sits on the third row of the bulletin table. Tied to the
/// current bulletin layout; recheck when the page changes.
pub const FORWARD_POINTS_ROW: usize = 2;
pub const FORWARD_POINTS_LABELS: [&str; 7] = [
    "Open",
    "Minimum",
    "Maximum",
    "Average",
    "Last Price",
    "Last Bid",
    "Last Offer",
];
const LAST_PRICE: &str = "Last Price";

pub const DIFFERENTIAL_LABEL: &str = "DIF OPER CASADA - COMPRA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    ForwardPoints,
    MatchedOperationDifferential,
}

impl IndicatorKind {
    pub fn title(&self) -> &'static str {
        match self {
            IndicatorKind::ForwardPoints => "FRP0 (last price)",
            IndicatorKind::MatchedOperationDifferential => "DIF OPER CASADA (buy)",
        }
    }
}

/// A single market indicator as read from its page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorValue {
    pub kind: IndicatorKind,
    pub raw_text: String,
    pub numeric_value: f64,
    pub as_of: String,
    /// Every labeled cell the value was picked from, for the raw data view.
    pub details: Vec<(String, String)>,
}

impl IndicatorValue {
    pub fn new(kind: IndicatorKind, raw_text: &str, as_of: &str) -> Self {
        Self {
            kind,
            raw_text: raw_text.to_string(),
            numeric_value: decode_indicator(raw_text),
            as_of: as_of.to_string(),
            details: vec![],
        }
    }

    /// Stand-in used when the indicator could not be read: `N/A`, worth `0.0`.
    pub fn unavailable(kind: IndicatorKind) -> Self {
        Self::new(kind, UNAVAILABLE, UNAVAILABLE)
    }
}

/// Reads the FRP0 forward points quote out of the bulletin page.
pub fn scrape_forward_points(document: &Html) -> Result<Option<IndicatorValue>, ScrapeError> {
    let source_name = "forward points";
    let container_selector = parse_selector(source_name, &format!("#{FORWARD_POINTS_CONTAINER_ID}"))?;
    let table_selector = parse_selector(source_name, &format!("table.{FORWARD_POINTS_TABLE_CLASS}"))?;
    let row_selector = parse_selector(source_name, "tr")?;

    let Some(container) = document.select(&container_selector).next() else {
        return Ok(None);
    };
    let Some(table) = container.select(&table_selector).next() else {
        return Ok(None);
    };
    let Some(row) = table.select(&row_selector).nth(FORWARD_POINTS_ROW) else {
        return Ok(None);
    };

    let cells = row_cells(row)?;
    if cells.len() != FORWARD_POINTS_LABELS.len() {
        return Ok(None);
    }

    let details: Vec<(String, String)> = FORWARD_POINTS_LABELS
        .iter()
        .map(|label| label.to_string())
        .zip(cells)
        .collect();
    let last_price = details
        .iter()
        .find(|(label, _)| label == LAST_PRICE)
        .map(|(_, value)| value.as_str())
        .unwrap_or_default();

    let mut value = IndicatorValue::new(IndicatorKind::ForwardPoints, last_price, UNAVAILABLE);
    value.details = details;
    Ok(Some(value))
}

/// Reads the matched-operation differential from the financial indicators
/// page: the labeled paragraph's enclosing `div` holds the value in an `h4`
/// and the update time in a `small`.
pub fn scrape_differential(document: &Html) -> Result<Option<IndicatorValue>, ScrapeError> {
    let source_name = "differential";
    let paragraph_selector = parse_selector(source_name, "p")?;
    let value_selector = parse_selector(source_name, "h4")?;
    let caption_selector = parse_selector(source_name, "small")?;

    let Some(block) = document
        .select(&paragraph_selector)
        .find(|p| extract_text(*p).contains(DIFFERENTIAL_LABEL))
    else {
        return Ok(None);
    };
    let Some(parent) = nearest_ancestor(block, "div") else {
        return Ok(None);
    };
    let (Some(value), Some(caption)) = (
        parent.select(&value_selector).next(),
        parent.select(&caption_selector).next(),
    ) else {
        return Ok(None);
    };

    let full_value = extract_text(value);
    let Some(token) = first_token(&full_value) else {
        return Ok(None);
    };
    let as_of = extract_text(caption);

    Ok(Some(IndicatorValue {
        details: vec![
            ("Value".to_string(), full_value.clone()),
            ("Last updated".to_string(), as_of.clone()),
        ],
        ..IndicatorValue::new(IndicatorKind::MatchedOperationDifferential, token, &as_of)
    }))
}
