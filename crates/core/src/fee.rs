use crate::domain::reservation::ReservationTarget;
use chrono::{Datelike, NaiveDate, Weekday};
use std::str::FromStr;

const DEFAULT_WEEKDAY_RATE: i64 = 12_500;
const DEFAULT_WEEKEND_RATE: i64 = 25_000;
const DEFAULT_LIGHTING_FEE: i64 = 10_000;

/// How the lighting surcharge combines with a two-hour booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingPolicy {
    /// Added once per booking regardless of duration.
    PerBooking,
    /// Multiplied by the booked hours, like the base rate.
    PerHour,
}

impl FromStr for LightingPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_booking" => Ok(Self::PerBooking),
            "per_hour" => Ok(Self::PerHour),
            other => anyhow::bail!("unknown lighting policy {other:?} (expected per_booking|per_hour)"),
        }
    }
}

/// Rates in the smallest currency unit (KRW).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub weekday_rate: i64,
    pub weekend_rate: i64,
    pub lighting_fee: i64,
    pub lighting_policy: LightingPolicy,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            weekday_rate: DEFAULT_WEEKDAY_RATE,
            weekend_rate: DEFAULT_WEEKEND_RATE,
            lighting_fee: DEFAULT_LIGHTING_FEE,
            lighting_policy: LightingPolicy::PerBooking,
        }
    }
}

impl FeeSchedule {
    pub fn base_rate(&self, date: NaiveDate) -> i64 {
        if is_weekend(date) {
            self.weekend_rate
        } else {
            self.weekday_rate
        }
    }

    pub fn amount(&self, date: NaiveDate, extended_duration: bool, lighting_requested: bool) -> i64 {
        let multiplier = if extended_duration { 2 } else { 1 };
        let lighting = if !lighting_requested {
            0
        } else {
            match self.lighting_policy {
                LightingPolicy::PerBooking => self.lighting_fee,
                LightingPolicy::PerHour => self.lighting_fee * multiplier,
            }
        };
        self.base_rate(date) * multiplier + lighting
    }

    pub fn amount_for(&self, target: &ReservationTarget) -> i64 {
        self.amount(
            target.date(),
            target.extended_duration(),
            target.lighting_requested(),
        )
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
