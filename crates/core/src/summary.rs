use crate::domain::reservation::SubmissionOutcome;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_targets: usize,
    pub success_count: usize,
    pub total_amount: i64,
}

impl RunSummary {
    /// Every outcome counts towards `total_targets`; only successes add to the
    /// count and amount.
    pub fn record(&mut self, outcome: &SubmissionOutcome) {
        self.total_targets += 1;
        if outcome.succeeded {
            self.success_count += 1;
            self.total_amount += outcome.amount;
        }
    }

    pub fn failure_count(&self) -> usize {
        self.total_targets - self.success_count
    }
}

/// Collects outcomes for one run in submission order.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    planned: usize,
    summary: RunSummary,
    outcomes: Vec<SubmissionOutcome>,
}

impl ResultAggregator {
    pub fn new(planned: usize) -> Self {
        Self {
            planned,
            summary: RunSummary::default(),
            outcomes: Vec::with_capacity(planned),
        }
    }

    /// Records the outcome and returns the new progress fraction.
    pub fn record(&mut self, outcome: SubmissionOutcome) -> f64 {
        self.summary.record(&outcome);
        self.outcomes.push(outcome);
        self.progress()
    }

    /// processed / planned, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.planned == 0 {
            return 1.0;
        }
        self.summary.total_targets as f64 / self.planned as f64
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn outcomes(&self) -> &[SubmissionOutcome] {
        &self.outcomes
    }

    pub fn finish(self) -> (RunSummary, Vec<SubmissionOutcome>) {
        (self.summary, self.outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::BookingRequest;
    use crate::domain::reservation::{ReservationTarget, SlotOptions};
    use chrono::NaiveDate;

    fn outcome(day: u32, amount: i64, succeeded: bool) -> SubmissionOutcome {
        let target = ReservationTarget::new(
            NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            SlotOptions::default(),
        );
        let request = BookingRequest {
            applicant_name: "Hong".to_string(),
            cellphone: "01012345678".to_string(),
            team_name: "Hong".to_string(),
            member_count: "14".to_string(),
            object_id: "SF0.1".to_string(),
            booking_date: format!("2025/06/{day:02}"),
            booking_time: "07,08".to_string(),
            use_light: "N".to_string(),
            amount: amount.to_string(),
        };
        SubmissionOutcome {
            target,
            amount,
            succeeded,
            error_detail: (!succeeded).then(|| "rejected".to_string()),
            request,
        }
    }

    #[test]
    fn failures_count_towards_total_but_not_amount() {
        let mut agg = ResultAggregator::new(4);
        assert_eq!(agg.record(outcome(7, 50_000, true)), 0.25);
        assert_eq!(agg.record(outcome(14, 50_000, false)), 0.5);
        assert_eq!(agg.record(outcome(21, 60_000, true)), 0.75);

        let summary = agg.summary();
        assert_eq!(summary.total_targets, 3);
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.failure_count(), 1);
        assert_eq!(summary.total_amount, 110_000);
        assert_eq!(agg.outcomes().len(), 3);
    }

    #[test]
    fn empty_plan_reports_complete() {
        let agg = ResultAggregator::new(0);
        assert_eq!(agg.progress(), 1.0);
        assert_eq!(agg.summary(), RunSummary::default());
    }
}
