use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_ONLY_COLUMNS: [&str; 3] = ["eta_date", "cut_off_date", "early_release_date"];
const DATE_TIME_COLUMNS: [&str; 2] = [
    "pickup_appointment_date_time",
    "delivery_appointment_date_time",
];

const DATE_TIME_INPUTS: [&str; 9] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_INPUTS: [&str; 7] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    DateOnly,
    DateTime,
}

pub fn date_rule(column_id: &str) -> Option<DateRule> {
    if DATE_ONLY_COLUMNS.contains(&column_id) {
        Some(DateRule::DateOnly)
    } else if DATE_TIME_COLUMNS.contains(&column_id) {
        Some(DateRule::DateTime)
    } else {
        None
    }
}

/// Formats a resolved cell value for its column. Unparseable dates are
/// returned unchanged.
pub fn format_value(column_id: &str, raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match date_rule(column_id) {
        Some(DateRule::DateOnly) => format_date(raw),
        Some(DateRule::DateTime) => format_date_time(raw),
        None => raw.to_string(),
    }
}

/// `MM/DD/YYYY`
pub fn format_date(input: &str) -> String {
    match parse_timestamp(input) {
        Some(ts) => ts.format("%m/%d/%Y").to_string(),
        None => input.to_string(),
    }
}

/// `MM/DD/YYYY HH:MM`, 24-hour clock.
pub fn format_date_time(input: &str) -> String {
    match parse_timestamp(input) {
        Some(ts) => ts.format("%m/%d/%Y %H:%M").to_string(),
        None => input.to_string(),
    }
}

// Offset-aware inputs keep the wall clock of their own offset.
fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.naive_local());
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(input) {
        return Some(ts.naive_local());
    }
    DATE_TIME_INPUTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            DATE_INPUTS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_by_column() {
        assert_eq!(date_rule("eta_date"), Some(DateRule::DateOnly));
        assert_eq!(date_rule("cut_off_date"), Some(DateRule::DateOnly));
        assert_eq!(
            date_rule("pickup_appointment_date_time"),
            Some(DateRule::DateTime)
        );
        assert_eq!(date_rule("vessel"), None);
    }

    #[test]
    fn date_only_inputs() {
        assert_eq!(format_date("2024-03-05"), "03/05/2024");
        assert_eq!(format_date("2024-03-05T17:45:00"), "03/05/2024");
        assert_eq!(format_date("3/5/2024"), "03/05/2024");
        assert_eq!(format_date("March 5, 2024"), "03/05/2024");
        assert_eq!(format_date("2024-03-05T23:30:00+02:00"), "03/05/2024");
    }

    #[test]
    fn date_time_inputs() {
        assert_eq!(format_date_time("2024-03-05T07:05:00"), "03/05/2024 07:05");
        assert_eq!(format_date_time("2024-03-05 19:30"), "03/05/2024 19:30");
        assert_eq!(format_date_time("2024-03-05T19:30:00.000Z"), "03/05/2024 19:30");
        assert_eq!(format_date_time("03/05/2024 02:15 PM"), "03/05/2024 14:15");
        assert_eq!(format_date_time("2024-03-05"), "03/05/2024 00:00");
    }

    #[test]
    fn unparseable_input_is_returned_unchanged() {
        assert_eq!(format_date("not-a-date"), "not-a-date");
        assert_eq!(format_date_time("not-a-date"), "not-a-date");
        assert_eq!(format_date("2024-13-45"), "2024-13-45");
        assert_eq!(format_date_time("TBD after 3pm"), "TBD after 3pm");
    }

    #[test]
    fn format_value_dispatches_on_column() {
        assert_eq!(format_value("eta_date", "2024-12-01"), "12/01/2024");
        assert_eq!(
            format_value("delivery_appointment_date_time", "2024-12-01T08:00:00"),
            "12/01/2024 08:00"
        );
        assert_eq!(format_value("voyage", "2024-12-01"), "2024-12-01");
        assert_eq!(format_value("eta_date", ""), "");
    }
}
