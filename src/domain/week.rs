//! ISO-8601 week keys (`"YYYY-Www"`), the addressing scheme for weekly
//! TODO notes and ritual grids.

use chrono::{Datelike, NaiveDate, Weekday};

/// Week key for a calendar date, e.g. `2024-09-12` -> `"2024-W37"`. The
/// week-year can differ from the calendar year around January 1st.
pub fn week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// Validates user-supplied week input and returns the canonical zero-padded
/// key. Week numbers are checked against the actual length of the ISO year.
pub fn parse_week_key(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    let Some((year_str, week_str)) = trimmed.split_once("-W") else {
        return Err(format!("week must be YYYY-Www, got `{trimmed}`"));
    };

    let year = year_str
        .parse::<i32>()
        .map_err(|_| format!("week must be YYYY-Www, got `{trimmed}`"))?;
    let week = week_str
        .parse::<u32>()
        .map_err(|_| format!("week must be YYYY-Www, got `{trimmed}`"))?;

    if NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).is_none() {
        return Err(format!("`{trimmed}` is not a valid ISO week"));
    }

    Ok(format!("{year}-W{week:02}"))
}
