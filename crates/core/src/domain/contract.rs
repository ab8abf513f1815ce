use crate::domain::reservation::{ApplicantIdentity, ReservationTarget};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fixed fields identifying the bookable resource on the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Venue {
    pub object_id: String,
    pub member_count: String,
}

/// JSON body posted to the booking endpoint. Every value is sent as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub applicant_name: String,
    pub cellphone: String,
    pub team_name: String,
    pub member_count: String,
    pub object_id: String,
    pub booking_date: String,
    pub booking_time: String,
    pub use_light: String,
    pub amount: String,
}

impl BookingRequest {
    pub fn build(
        identity: &ApplicantIdentity,
        venue: &Venue,
        target: &ReservationTarget,
        amount: i64,
    ) -> Self {
        Self {
            applicant_name: identity.name().to_string(),
            cellphone: identity.phone_digits().to_string(),
            team_name: identity.name().to_string(),
            member_count: venue.member_count.clone(),
            object_id: venue.object_id.clone(),
            booking_date: booking_date_label(target.date()),
            booking_time: booking_time_label(target.start_hour(), target.extended_duration()),
            use_light: if target.lighting_requested() { "Y" } else { "N" }.to_string(),
            amount: amount.to_string(),
        }
    }
}

/// `YYYY/MM/DD`.
pub fn booking_date_label(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Two-digit hour list: `"19"` for one hour, `"19,20"` for two.
pub fn booking_time_label(start_hour: u32, extended_duration: bool) -> String {
    if extended_duration {
        format!("{start_hour:02},{:02}", start_hour + 1)
    } else {
        format!("{start_hour:02}")
    }
}
