use serde::Serialize;

use crate::{
    indicator_scraper::IndicatorValue,
    numeric::{format_display, sum_and_format},
    rate_scraper::RateRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Closing,
    Minimum,
    Mean,
    Maximum,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::Closing,
        Statistic::Minimum,
        Statistic::Mean,
        Statistic::Maximum,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Statistic::Closing => "Closing",
            Statistic::Minimum => "Minimum",
            Statistic::Mean => "Mean",
            Statistic::Maximum => "Maximum",
        }
    }

    pub fn of(&self, record: &RateRecord) -> f64 {
        match self {
            Statistic::Closing => record.closing,
            Statistic::Minimum => record.minimum,
            Statistic::Mean => record.mean,
            Statistic::Maximum => record.maximum,
        }
    }
}

/// One line of a rate + indicator table, already formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRow {
    pub statistic: Statistic,
    pub rate: String,
    pub indicator: String,
    pub sum: String,
}

/// Adds the indicator to each of the record's four statistics.
pub fn combine(record: &RateRecord, indicator: &IndicatorValue) -> [CombinedRow; 4] {
    Statistic::ALL.map(|statistic| {
        let rate = statistic.of(record);
        CombinedRow {
            statistic,
            rate: format_display(rate),
            indicator: indicator.raw_text.clone(),
            sum: sum_and_format(rate, indicator.numeric_value),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator_scraper::IndicatorKind;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn record() -> RateRecord {
        RateRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            closing: 105.0,
            minimum: 104.0,
            mean: 104.5,
            maximum: 1060.0,
        }
    }

    #[test]
    fn sums_every_statistic() {
        let indicator = IndicatorValue::new(IndicatorKind::ForwardPoints, "2,3", "N/A");
        let rows = combine(&record(), &indicator);

        assert_eq!(rows[0].statistic, Statistic::Closing);
        assert_eq!(rows[0].sum, "107,3");
        assert_eq!(
            rows.iter().map(|r| r.sum.as_str()).collect::<Vec<_>>(),
            vec!["107,3", "106,3", "106,8", "1.062,3"]
        );
        assert!(rows.iter().all(|r| r.indicator == "2,3"));
        assert_eq!(rows[3].rate, "1.060,0");
    }

    #[test]
    fn unavailable_indicator_adds_nothing() {
        let rows = combine(&record(), &IndicatorValue::unavailable(IndicatorKind::ForwardPoints));
        assert_eq!(rows[2].sum, "104,5");
        assert_eq!(rows[2].indicator, "N/A");
    }
}
