use anyhow::Context;
use arena_core::domain::reservation::{ExplicitDateSet, RecurrenceRule, SlotOptions};
use arena_core::resolve::TargetSelection;
use chrono::{NaiveDate, Weekday};
use std::str::FromStr;

/// One `--date` argument: `YYYY-MM-DD[@HH][+1h|+2h][+light]`.
///
/// Unspecified parts take the form defaults (07:00, two hours, no lighting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualEntry {
    pub date: NaiveDate,
    pub slot: SlotOptions,
}

impl FromStr for ManualEntry {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let mut parts = s.trim().split('+');
        let head = parts.next().unwrap_or_default();

        let (date_part, hour_part) = match head.split_once('@') {
            Some((d, h)) => (d, Some(h)),
            None => (head, None),
        };
        let date = NaiveDate::parse_from_str(date_part.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid date {date_part:?} (expected YYYY-MM-DD)"))?;

        let defaults = SlotOptions::default();
        let start_hour = match hour_part {
            Some(h) => h
                .trim()
                .trim_end_matches(":00")
                .parse::<u32>()
                .with_context(|| format!("invalid start hour {h:?}"))?,
            None => defaults.start_hour(),
        };

        let mut extended = defaults.extended_duration();
        let mut light = defaults.lighting_requested();
        for flag in parts {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1h" => extended = false,
                "2h" => extended = true,
                "light" => light = true,
                other => anyhow::bail!("unknown option {other:?} in {s:?} (expected 1h, 2h or light)"),
            }
        }

        Ok(Self {
            date,
            slot: SlotOptions::new(start_hour, extended, light)?,
        })
    }
}

pub fn parse_manual_entry(s: &str) -> Result<ManualEntry, String> {
    s.parse::<ManualEntry>().map_err(|e| format!("{e:#}"))
}

pub fn parse_weekday(s: &str) -> Result<Weekday, String> {
    s.trim().parse::<Weekday>().map_err(|e| e.to_string())
}

pub fn recurrence(
    weekday: Weekday,
    start_hour: u32,
    extended: bool,
    light: bool,
) -> anyhow::Result<TargetSelection> {
    Ok(TargetSelection::Recurrence {
        rule: RecurrenceRule::new(weekday),
        slot: SlotOptions::new(start_hour, extended, light)?,
    })
}

pub fn manual(entries: &[ManualEntry]) -> TargetSelection {
    let mut dates = ExplicitDateSet::new();
    for entry in entries {
        if !dates.add(entry.date, entry.slot) {
            tracing::warn!(date = %entry.date, "duplicate --date ignored; keeping the first");
        }
    }
    TargetSelection::Manual(dates)
}
