pub mod booking;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod fee;
pub mod identity;
pub mod resolve;
pub mod run;
pub mod summary;
pub mod time;

pub mod config {
    use crate::booking::classify::{
        LegacyMarkerClassifier, StructuredFieldClassifier, SuccessClassifier,
    };
    use crate::fee::{FeeSchedule, LightingPolicy};
    use crate::time::deadline::DeadlineAnchor;
    use anyhow::Context;
    use std::str::FromStr;
    use std::time::Duration;

    const DEFAULT_ENDPOINT_URL: &str = "http://www.scdaedeok.or.kr//rest/arenas/bookingsheet";
    const DEFAULT_OBJECT_ID: &str = "SF0.1";
    const DEFAULT_MEMBER_COUNT: &str = "14";
    const DEFAULT_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_SUCCESS_FIELD: &str = "code";
    const DEFAULT_SUCCESS_MARKER: &str = "200";
    const DEFAULT_POLL_MILLIS: u64 = 500;
    const POLL_MILLIS_RANGE: std::ops::RangeInclusive<u64> = 1..=999;
    const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;
    const DEFAULT_IDENTITY_FILE: &str = "applicant.txt";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SuccessCheck {
        Legacy,
        Structured,
    }

    impl FromStr for SuccessCheck {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> anyhow::Result<Self> {
            match s.trim().to_ascii_lowercase().as_str() {
                "legacy" => Ok(Self::Legacy),
                "structured" => Ok(Self::Structured),
                other => anyhow::bail!("unknown success check {other:?} (expected legacy|structured)"),
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub endpoint_url: String,
        pub object_id: String,
        pub member_count: String,
        pub request_timeout: Duration,
        pub success_check: SuccessCheck,
        pub success_field: String,
        pub success_marker: String,
        pub fees: FeeSchedule,
        pub gate_anchor: DeadlineAnchor,
        pub gate_poll_interval: Duration,
        pub utc_offset_hours: i32,
        pub identity_file: String,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Builds settings from any key lookup. Blank or unparseable values take
        /// their defaults; parseable values outside their range are rejected.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let env_string = |key: &str, default: &str| {
                lookup_set(&lookup, key).unwrap_or_else(|| default.to_string())
            };

            let defaults = FeeSchedule::default();
            let lighting_policy = match lookup_set(&lookup, "FEE_LIGHTING_POLICY") {
                Some(s) => s.parse::<LightingPolicy>()?,
                None => defaults.lighting_policy,
            };
            let success_check = match lookup_set(&lookup, "BOOKING_SUCCESS_CHECK") {
                Some(s) => s.parse::<SuccessCheck>()?,
                None => SuccessCheck::Legacy,
            };

            let anchor_defaults = DeadlineAnchor::default();
            let gate_anchor = DeadlineAnchor::new(
                env_parse(&lookup, "GATE_DAY").unwrap_or(anchor_defaults.day),
                env_parse(&lookup, "GATE_HOUR").unwrap_or(anchor_defaults.hour),
                env_parse(&lookup, "GATE_MINUTE").unwrap_or(anchor_defaults.minute),
                env_parse(&lookup, "GATE_SECOND").unwrap_or(anchor_defaults.second),
            )?;

            let timeout_secs =
                env_parse(&lookup, "BOOKING_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);
            anyhow::ensure!(
                timeout_secs >= 1,
                "BOOKING_TIMEOUT_SECS must be at least 1, got {timeout_secs}"
            );

            let poll_millis = env_parse(&lookup, "GATE_POLL_MILLIS").unwrap_or(DEFAULT_POLL_MILLIS);
            anyhow::ensure!(
                POLL_MILLIS_RANGE.contains(&poll_millis),
                "GATE_POLL_MILLIS must be within 1..=999, got {poll_millis}"
            );

            Ok(Self {
                endpoint_url: env_string("BOOKING_ENDPOINT_URL", DEFAULT_ENDPOINT_URL),
                object_id: env_string("BOOKING_OBJECT_ID", DEFAULT_OBJECT_ID),
                member_count: env_string("BOOKING_MEMBER_COUNT", DEFAULT_MEMBER_COUNT),
                request_timeout: Duration::from_secs(timeout_secs),
                success_check,
                success_field: env_string("BOOKING_SUCCESS_FIELD", DEFAULT_SUCCESS_FIELD),
                success_marker: env_string("BOOKING_SUCCESS_MARKER", DEFAULT_SUCCESS_MARKER),
                fees: FeeSchedule {
                    weekday_rate: env_parse(&lookup, "FEE_WEEKDAY_RATE")
                        .unwrap_or(defaults.weekday_rate),
                    weekend_rate: env_parse(&lookup, "FEE_WEEKEND_RATE")
                        .unwrap_or(defaults.weekend_rate),
                    lighting_fee: env_parse(&lookup, "FEE_LIGHTING").unwrap_or(defaults.lighting_fee),
                    lighting_policy,
                },
                gate_anchor,
                gate_poll_interval: Duration::from_millis(poll_millis),
                utc_offset_hours: env_parse(&lookup, "BOOKING_UTC_OFFSET_HOURS")
                    .unwrap_or(DEFAULT_UTC_OFFSET_HOURS),
                identity_file: env_string("IDENTITY_FILE", DEFAULT_IDENTITY_FILE),
                sentry_dsn: lookup_set(&lookup, "SENTRY_DSN"),
            })
        }

        pub fn utc_offset(&self) -> anyhow::Result<chrono::FixedOffset> {
            chrono::FixedOffset::east_opt(self.utc_offset_hours * 3600)
                .with_context(|| format!("invalid BOOKING_UTC_OFFSET_HOURS {}", self.utc_offset_hours))
        }

        pub fn classifier(&self) -> Box<dyn SuccessClassifier> {
            match self.success_check {
                SuccessCheck::Legacy => Box::new(LegacyMarkerClassifier::new(&self.success_marker)),
                SuccessCheck::Structured => Box::new(StructuredFieldClassifier::new(
                    &self.success_field,
                    &self.success_marker,
                )),
            }
        }
    }

    fn lookup_set(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
        lookup(key).filter(|s| !s.trim().is_empty())
    }

    fn env_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
        lookup(key).and_then(|s| s.trim().parse::<T>().ok())
    }

}
