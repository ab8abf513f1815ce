use crate::booking::classify::SuccessClassifier;
use crate::booking::http::HttpBookingClient;
use crate::booking::BookingEndpoint;
use crate::config::Settings;
use crate::domain::contract::{BookingRequest, Venue};
use crate::domain::reservation::{ApplicantIdentity, ReservationTarget, SubmissionOutcome};
use crate::error::ValidationError;
use crate::fee::FeeSchedule;
use crate::run::RunEvent;
use crate::summary::ResultAggregator;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Build and price every request but never touch the network.
    DryRun,
    Live,
}

/// Sends one request per target, strictly in order, one at a time. A failure
/// on one date never stops the remaining dates.
pub struct Dispatcher {
    fees: FeeSchedule,
    venue: Venue,
    endpoint: Arc<dyn BookingEndpoint>,
    classifier: Box<dyn SuccessClassifier>,
}

impl Dispatcher {
    pub fn new(
        fees: FeeSchedule,
        venue: Venue,
        endpoint: Arc<dyn BookingEndpoint>,
        classifier: Box<dyn SuccessClassifier>,
    ) -> Self {
        Self {
            fees,
            venue,
            endpoint,
            classifier,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let endpoint = HttpBookingClient::from_settings(settings)?;
        Ok(Self::new(
            settings.fees,
            Venue {
                object_id: settings.object_id.clone(),
                member_count: settings.member_count.clone(),
            },
            Arc::new(endpoint),
            settings.classifier(),
        ))
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    pub fn prepare(
        &self,
        identity: &ApplicantIdentity,
        target: &ReservationTarget,
    ) -> (i64, BookingRequest) {
        let amount = self.fees.amount_for(target);
        let request = BookingRequest::build(identity, &self.venue, target, amount);
        (amount, request)
    }

    pub async fn submit_one(
        &self,
        identity: &ApplicantIdentity,
        target: &ReservationTarget,
        mode: DispatchMode,
    ) -> SubmissionOutcome {
        let (amount, request) = self.prepare(identity, target);
        let date = target.date();

        if mode == DispatchMode::DryRun {
            let payload = serde_json::to_string(&request).unwrap_or_default();
            tracing::info!(%date, amount, %payload, "dry-run: request not sent");
            return SubmissionOutcome::success(*target, request, amount);
        }

        match self.endpoint.submit(&request).await {
            Ok(response) => {
                if response.is_success_status() && self.classifier.is_success(&response) {
                    tracing::info!(%date, amount, status = response.status, "booking accepted");
                    SubmissionOutcome::success(*target, request, amount)
                } else {
                    tracing::warn!(
                        %date,
                        status = response.status,
                        body = %response.body,
                        "booking rejected"
                    );
                    SubmissionOutcome::rejected(*target, request, amount, &response)
                }
            }
            Err(err) => {
                tracing::warn!(
                    %date,
                    endpoint = self.endpoint.endpoint_name(),
                    error = %err,
                    "booking request failed"
                );
                SubmissionOutcome::transport_failed(*target, request, amount, &err)
            }
        }
    }

    /// Processes every target and returns the filled aggregator. Emits a
    /// `TargetProcessed` event after each one when `events` is given.
    pub async fn dispatch(
        &self,
        identity: &ApplicantIdentity,
        targets: &[ReservationTarget],
        mode: DispatchMode,
        events: Option<&UnboundedSender<RunEvent>>,
    ) -> Result<ResultAggregator, ValidationError> {
        if targets.is_empty() {
            return Err(ValidationError::NoTargets);
        }

        let total = targets.len();
        let mut aggregator = ResultAggregator::new(total);
        for (index, target) in targets.iter().enumerate() {
            let outcome = self.submit_one(identity, target, mode).await;
            let progress = aggregator.record(outcome.clone());
            if let Some(tx) = events {
                let _ = tx.send(RunEvent::TargetProcessed {
                    index,
                    total,
                    progress,
                    outcome,
                });
            }
        }

        Ok(aggregator)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::booking::classify::{LegacyMarkerClassifier, StructuredFieldClassifier};
    use crate::booking::EndpointResponse;
    use crate::domain::reservation::SlotOptions;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replies per booking date; dates without a script get a success body.
    #[derive(Default)]
    pub(crate) struct ScriptedEndpoint {
        pub(crate) calls: AtomicUsize,
        pub(crate) seen: Mutex<Vec<String>>,
        replies: HashMap<String, Result<EndpointResponse, String>>,
    }

    impl ScriptedEndpoint {
        pub(crate) fn reply(mut self, booking_date: &str, status: u16, body: &str) -> Self {
            self.replies.insert(
                booking_date.to_string(),
                Ok(EndpointResponse {
                    status,
                    body: body.to_string(),
                }),
            );
            self
        }

        pub(crate) fn fail(mut self, booking_date: &str, error: &str) -> Self {
            self.replies
                .insert(booking_date.to_string(), Err(error.to_string()));
            self
        }
    }

    #[async_trait::async_trait]
    impl BookingEndpoint for ScriptedEndpoint {
        fn endpoint_name(&self) -> &'static str {
            "scripted"
        }

        async fn submit(&self, request: &BookingRequest) -> anyhow::Result<EndpointResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.booking_date.clone());
            match self.replies.get(&request.booking_date) {
                Some(Ok(res)) => Ok(res.clone()),
                Some(Err(e)) => Err(anyhow::anyhow!("{e}")),
                None => Ok(EndpointResponse {
                    status: 200,
                    body: r#"{"code":200}"#.to_string(),
                }),
            }
        }
    }

    pub(crate) fn venue() -> Venue {
        Venue {
            object_id: "SF0.1".to_string(),
            member_count: "14".to_string(),
        }
    }

    pub(crate) fn identity() -> ApplicantIdentity {
        ApplicantIdentity::parse("Hong", "010-1234-5678").unwrap()
    }

    pub(crate) fn june_targets() -> Vec<ReservationTarget> {
        // Sat, Tue (lit, one hour), Sat (lit).
        vec![
            ReservationTarget::new(
                NaiveDate::from_ymd_opt(2025, 6, 7).unwrap(),
                SlotOptions::default(),
            ),
            ReservationTarget::new(
                NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
                SlotOptions::new(19, false, true).unwrap(),
            ),
            ReservationTarget::new(
                NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
                SlotOptions::new(7, true, true).unwrap(),
            ),
        ]
    }

    fn dispatcher(endpoint: Arc<ScriptedEndpoint>) -> Dispatcher {
        Dispatcher::new(
            FeeSchedule::default(),
            venue(),
            endpoint,
            Box::new(LegacyMarkerClassifier::default()),
        )
    }

    #[tokio::test]
    async fn dry_run_never_calls_the_endpoint() {
        let endpoint = Arc::new(ScriptedEndpoint::default());
        let d = dispatcher(endpoint.clone());
        let targets = june_targets();

        let agg = d
            .dispatch(&identity(), &targets, DispatchMode::DryRun, None)
            .await
            .unwrap();

        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
        let summary = agg.summary();
        assert_eq!(summary.total_targets, 3);
        assert_eq!(summary.success_count, 3);
        let expected: i64 = targets.iter().map(|t| d.fees().amount_for(t)).sum();
        assert_eq!(summary.total_amount, expected);
        assert_eq!(expected, 50_000 + 22_500 + 60_000);

        let second = &agg.outcomes()[1].request;
        assert_eq!(second.booking_date, "2025/06/10");
        assert_eq!(second.booking_time, "19");
        assert_eq!(second.use_light, "Y");
        assert_eq!(second.amount, "22500");
        assert_eq!(second.cellphone, "01012345678");
    }

    #[tokio::test]
    async fn rejection_of_one_target_does_not_stop_the_batch() {
        let endpoint = Arc::new(
            ScriptedEndpoint::default().reply("2025/06/10", 200, r#"{"code":409,"msg":"taken"}"#),
        );
        let d = dispatcher(endpoint.clone());

        let agg = d
            .dispatch(&identity(), &june_targets(), DispatchMode::Live, None)
            .await
            .unwrap();

        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *endpoint.seen.lock().unwrap(),
            vec!["2025/06/07", "2025/06/10", "2025/06/14"]
        );
        let summary = agg.summary();
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.total_targets, 3);
        assert_eq!(summary.total_amount, 50_000 + 60_000);

        let failed = &agg.outcomes()[1];
        assert!(!failed.succeeded);
        assert!(failed.error_detail.as_deref().unwrap().contains("taken"));
        assert!(agg.outcomes()[2].succeeded);
    }

    #[tokio::test]
    async fn transport_errors_and_error_statuses_are_per_target_failures() {
        let endpoint = Arc::new(
            ScriptedEndpoint::default()
                .fail("2025/06/07", "operation timed out")
                .reply("2025/06/10", 500, "error 200"),
        );
        let d = dispatcher(endpoint.clone());

        let agg = d
            .dispatch(&identity(), &june_targets(), DispatchMode::Live, None)
            .await
            .unwrap();

        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 3);
        let outcomes = agg.outcomes();
        assert!(!outcomes[0].succeeded);
        assert!(outcomes[0]
            .error_detail
            .as_deref()
            .unwrap()
            .contains("timed out"));
        assert!(!outcomes[1].succeeded);
        assert!(outcomes[2].succeeded);
        assert_eq!(agg.summary().success_count, 1);
        assert_eq!(agg.summary().total_amount, 60_000);
    }

    #[tokio::test]
    async fn structured_classifier_rejects_marker_lookalikes() {
        let endpoint = Arc::new(
            ScriptedEndpoint::default().reply("2025/06/14", 200, r#"{"code":500,"amount":"12000"}"#),
        );
        let d = Dispatcher::new(
            FeeSchedule::default(),
            venue(),
            endpoint,
            Box::new(StructuredFieldClassifier::new("code", "200")),
        );

        let agg = d
            .dispatch(&identity(), &june_targets(), DispatchMode::Live, None)
            .await
            .unwrap();
        assert_eq!(agg.summary().success_count, 2);
        assert!(!agg.outcomes()[2].succeeded);
    }

    #[tokio::test]
    async fn empty_target_list_is_a_validation_error() {
        let endpoint = Arc::new(ScriptedEndpoint::default());
        let d = dispatcher(endpoint.clone());

        let res = d
            .dispatch(&identity(), &[], DispatchMode::Live, None)
            .await;
        assert!(matches!(res, Err(ValidationError::NoTargets)));
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn emits_progress_after_each_target() {
        let d = dispatcher(Arc::new(ScriptedEndpoint::default()));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        d.dispatch(&identity(), &june_targets(), DispatchMode::DryRun, Some(&tx))
            .await
            .unwrap();
        drop(tx);

        let mut progress = Vec::new();
        while let Some(event) = rx.recv().await {
            if let RunEvent::TargetProcessed {
                index,
                total,
                progress: p,
                ..
            } = event
            {
                assert_eq!(total, 3);
                assert_eq!(index, progress.len());
                progress.push(p);
            }
        }
        assert_eq!(progress, vec![1.0 / 3.0, 2.0 / 3.0, 1.0]);
    }
}
