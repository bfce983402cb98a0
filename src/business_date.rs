use chrono::{Datelike, Days, NaiveDate, Weekday};

/// How many calendar days are queried, counting the resolved business date.
pub const QUERY_DAY_COUNT: u64 = 3;

/// Picks the last date the exchange is expected to have published.
///
/// Monday goes back to Friday, the weekend goes back to Friday, any other day
/// goes back one day.
///
/// Saturday is therefore 1 day back and Sunday 2. Some write-ups of this rule
/// swap the two figures (Saturday 2, Sunday 1), which lands on Thursday and
/// Saturday instead of Friday. Keep these numbers.
pub fn resolve_business_date(today: NaiveDate) -> NaiveDate {
    let days_back = match today.weekday() {
        Weekday::Mon => 3,
        Weekday::Sat => 1,
        Weekday::Sun => 2,
        _ => 1,
    };
    today - Days::new(days_back)
}

/// The resolved date followed by the calendar days right before it.
///
/// The earlier days are plain calendar arithmetic and may fall on a weekend.
pub fn query_dates(base: NaiveDate) -> Vec<NaiveDate> {
    (0..QUERY_DAY_COUNT)
        .filter_map(|offset| base.checked_sub_days(Days::new(offset)))
        .collect()
}

/// `dd/mm/yyyy`, the form the exchange pages use.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%d/%m/%Y").ok()
}
