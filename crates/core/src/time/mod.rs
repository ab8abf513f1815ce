pub mod calendar;
pub mod deadline;

use chrono::{FixedOffset, NaiveDateTime, Utc};

/// Wall-clock source, in the venue's local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy)]
pub struct VenueClock {
    offset: FixedOffset,
}

impl VenueClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for VenueClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }
}
