use crate::booking::EndpointResponse;
use crate::domain::contract::BookingRequest;
use crate::error::ValidationError;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

pub const EARLIEST_START_HOUR: u32 = 6;
pub const LATEST_START_HOUR: u32 = 22;
pub const PHONE_DIGITS: usize = 11;

/// Start time and options shared by one booking slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotOptions {
    start_hour: u32,
    extended_duration: bool,
    lighting_requested: bool,
}

impl SlotOptions {
    pub fn new(
        start_hour: u32,
        extended_duration: bool,
        lighting_requested: bool,
    ) -> Result<Self, ValidationError> {
        if !(EARLIEST_START_HOUR..=LATEST_START_HOUR).contains(&start_hour) {
            return Err(ValidationError::StartHourOutOfRange { hour: start_hour });
        }
        Ok(Self {
            start_hour,
            extended_duration,
            lighting_requested,
        })
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn extended_duration(&self) -> bool {
        self.extended_duration
    }

    pub fn lighting_requested(&self) -> bool {
        self.lighting_requested
    }
}

impl Default for SlotOptions {
    // 07:00, two hours, no lighting.
    fn default() -> Self {
        Self {
            start_hour: 7,
            extended_duration: true,
            lighting_requested: false,
        }
    }
}

/// One date to submit. Built by the resolver and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReservationTarget {
    date: NaiveDate,
    slot: SlotOptions,
}

impl ReservationTarget {
    pub fn new(date: NaiveDate, slot: SlotOptions) -> Self {
        Self { date, slot }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start_hour(&self) -> u32 {
        self.slot.start_hour
    }

    pub fn extended_duration(&self) -> bool {
        self.slot.extended_duration
    }

    pub fn lighting_requested(&self) -> bool {
        self.slot.lighting_requested
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub weekday: Weekday,
}

impl RecurrenceRule {
    pub fn new(weekday: Weekday) -> Self {
        Self { weekday }
    }

    /// 0 = Sunday .. 6 = Saturday.
    pub fn weekday_index(&self) -> u32 {
        self.weekday.num_days_from_sunday()
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        date.weekday().num_days_from_sunday() == self.weekday_index()
    }
}

impl Default for RecurrenceRule {
    fn default() -> Self {
        Self::new(Weekday::Sat)
    }
}

/// Caller-owned set of hand-picked dates, each with its own slot options.
/// Dates are unique; nothing is removed unless the caller removes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitDateSet {
    entries: BTreeMap<NaiveDate, SlotOptions>,
}

impl ExplicitDateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false (and keeps the existing options) if the date is already present.
    pub fn add(&mut self, date: NaiveDate, slot: SlotOptions) -> bool {
        if self.entries.contains_key(&date) {
            return false;
        }
        self.entries.insert(date, slot);
        true
    }

    /// Returns false if the date is not in the set.
    pub fn configure(&mut self, date: NaiveDate, slot: SlotOptions) -> bool {
        match self.entries.get_mut(&date) {
            Some(existing) => {
                *existing = slot;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, date: NaiveDate) -> bool {
        self.entries.remove(&date).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.entries.contains_key(&date)
    }

    pub fn get(&self, date: NaiveDate) -> Option<SlotOptions> {
        self.entries.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ascending by date.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, SlotOptions)> + '_ {
        self.entries.iter().map(|(d, s)| (*d, *s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicantIdentity {
    name: String,
    phone_digits: String,
}

impl ApplicantIdentity {
    /// Trims the name and strips every non-digit from the phone number.
    pub fn parse(name: &str, phone: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let phone_digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if phone_digits.len() != PHONE_DIGITS {
            return Err(ValidationError::InvalidPhone {
                digits: phone_digits.len(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            phone_digits,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone_digits(&self) -> &str {
        &self.phone_digits
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub target: ReservationTarget,
    pub amount: i64,
    pub succeeded: bool,
    pub error_detail: Option<String>,
    pub request: BookingRequest,
}

impl SubmissionOutcome {
    pub fn success(target: ReservationTarget, request: BookingRequest, amount: i64) -> Self {
        Self {
            target,
            amount,
            succeeded: true,
            error_detail: None,
            request,
        }
    }

    pub fn rejected(
        target: ReservationTarget,
        request: BookingRequest,
        amount: i64,
        response: &EndpointResponse,
    ) -> Self {
        Self {
            target,
            amount,
            succeeded: false,
            error_detail: Some(format!("HTTP {}: {}", response.status, response.body)),
            request,
        }
    }

    pub fn transport_failed(
        target: ReservationTarget,
        request: BookingRequest,
        amount: i64,
        err: &anyhow::Error,
    ) -> Self {
        Self {
            target,
            amount,
            succeeded: false,
            error_detail: Some(format!("{err:#}")),
            request,
        }
    }
}
