use anyhow::Context;
use chrono::{Datelike, Days, NaiveDate};

/// First day of the month after `today`.
///
/// Jumps to the 28th (present in every month), moves four days forward, which
/// always lands in the following month, then truncates to the 1st.
pub fn first_day_of_next_month(today: NaiveDate) -> anyhow::Result<NaiveDate> {
    today
        .with_day(28)
        .and_then(|d| d.checked_add_days(Days::new(4)))
        .and_then(|d| d.with_day(1))
        .with_context(|| format!("no month after {today}"))
}
