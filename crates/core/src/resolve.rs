use crate::domain::reservation::{ExplicitDateSet, RecurrenceRule, ReservationTarget, SlotOptions};
use crate::time::calendar::first_day_of_next_month;
use chrono::{Datelike, NaiveDate};

// Upper bound on days scanned in the target month; the month check ends the scan earlier.
const MAX_SCAN_DAYS: usize = 35;

/// How the dates to submit are chosen.
#[derive(Debug, Clone)]
pub enum TargetSelection {
    /// Every occurrence of one weekday in the month after `today`, all sharing one slot.
    Recurrence {
        rule: RecurrenceRule,
        slot: SlotOptions,
    },
    /// Hand-picked dates with per-date slots.
    Manual(ExplicitDateSet),
}

/// Ordered targets, ascending by date. An empty result is returned as-is;
/// the run refuses to start on it.
pub fn resolve(
    selection: &TargetSelection,
    today: NaiveDate,
) -> anyhow::Result<Vec<ReservationTarget>> {
    match selection {
        TargetSelection::Recurrence { rule, slot } => resolve_recurrence(*rule, *slot, today),
        TargetSelection::Manual(dates) => Ok(resolve_manual(dates)),
    }
}

pub fn resolve_recurrence(
    rule: RecurrenceRule,
    slot: SlotOptions,
    today: NaiveDate,
) -> anyhow::Result<Vec<ReservationTarget>> {
    let first = first_day_of_next_month(today)?;
    let target_month = first.month();

    let mut out = Vec::new();
    for date in first.iter_days().take(MAX_SCAN_DAYS) {
        if date.month() != target_month {
            break;
        }
        if rule.matches(date) {
            out.push(ReservationTarget::new(date, slot));
        }
    }

    tracing::debug!(
        weekday = ?rule.weekday,
        year = first.year(),
        month = target_month,
        targets = out.len(),
        "resolved recurrence targets"
    );
    Ok(out)
}

pub fn resolve_manual(dates: &ExplicitDateSet) -> Vec<ReservationTarget> {
    let mut out: Vec<_> = dates
        .iter()
        .map(|(date, slot)| ReservationTarget::new(date, slot))
        .collect();
    out.sort_by_key(|t| t.date());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const WEEKDAYS: [Weekday; 7] = [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];

    #[test]
    fn saturdays_of_next_month() {
        let targets = resolve_recurrence(
            RecurrenceRule::new(Weekday::Sat),
            SlotOptions::default(),
            date(2025, 5, 20),
        )
        .unwrap();

        let dates: Vec<_> = targets.iter().map(|t| t.date()).collect();
        assert_eq!(
            dates,
            vec![
                date(2025, 6, 7),
                date(2025, 6, 14),
                date(2025, 6, 21),
                date(2025, 6, 28)
            ]
        );
        assert!(targets.iter().all(|t| t.start_hour() == 7 && t.extended_duration()));
    }

    #[test]
    fn five_occurrence_month_across_year_end() {
        // January 2026 has five Thursdays.
        let targets = resolve_recurrence(
            RecurrenceRule::new(Weekday::Thu),
            SlotOptions::default(),
            date(2025, 12, 25),
        )
        .unwrap();
        assert_eq!(targets.len(), 5);
        assert_eq!(targets[0].date(), date(2026, 1, 1));
        assert_eq!(targets[4].date(), date(2026, 1, 29));
    }

    #[test]
    fn recurrence_matches_weekday_count_of_every_month() {
        for month in 1..=12 {
            let today = date(2025, month, 10);
            let next = first_day_of_next_month(today).unwrap();
            for weekday in WEEKDAYS {
                let expected = next
                    .iter_days()
                    .take_while(|d| d.month() == next.month())
                    .filter(|d| d.weekday() == weekday)
                    .count();

                let targets = resolve_recurrence(
                    RecurrenceRule::new(weekday),
                    SlotOptions::default(),
                    today,
                )
                .unwrap();

                assert_eq!(targets.len(), expected, "{weekday:?} after {today}");
                assert!(targets.iter().all(|t| t.date().weekday() == weekday));
                assert!(targets.iter().all(|t| t.date().month() == next.month()));
                assert!(targets.windows(2).all(|w| w[0].date() < w[1].date()));
            }
        }
    }

    #[test]
    fn manual_dates_come_out_sorted_with_their_own_slots() {
        let mut set = ExplicitDateSet::new();
        let evening = SlotOptions::new(19, false, true).unwrap();
        let morning = SlotOptions::new(8, true, false).unwrap();
        set.add(date(2025, 6, 10), evening);
        set.add(date(2025, 6, 3), morning);

        let targets = resolve(&TargetSelection::Manual(set), date(2025, 5, 1)).unwrap();
        assert_eq!(
            targets,
            vec![
                ReservationTarget::new(date(2025, 6, 3), morning),
                ReservationTarget::new(date(2025, 6, 10), evening),
            ]
        );
    }

    #[test]
    fn empty_manual_set_resolves_to_nothing() {
        let targets =
            resolve(&TargetSelection::Manual(ExplicitDateSet::new()), date(2025, 5, 1)).unwrap();
        assert!(targets.is_empty());
    }
}
