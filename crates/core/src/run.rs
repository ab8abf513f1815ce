use crate::dispatch::{DispatchMode, Dispatcher};
use crate::domain::reservation::{ApplicantIdentity, ReservationTarget, SubmissionOutcome};
use crate::error::ValidationError;
use crate::summary::RunSummary;
use crate::time::deadline::{DeadlineAnchor, DeadlineGate, GateOutcome};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Status updates for whoever is watching the run.
#[derive(Debug, Clone)]
pub enum RunEvent {
    GateWaiting {
        anchor: DeadlineAnchor,
    },
    GateOpened,
    GateAborted,
    Started {
        total: usize,
        mode: DispatchMode,
    },
    TargetProcessed {
        index: usize,
        total: usize,
        progress: f64,
        outcome: SubmissionOutcome,
    },
    Finished {
        summary: RunSummary,
    },
}

#[derive(Debug, Clone)]
pub struct RunPlan {
    pub identity: ApplicantIdentity,
    pub targets: Vec<ReservationTarget>,
    pub mode: DispatchMode,
}

#[derive(Debug, Clone)]
pub enum RunReport {
    Completed {
        summary: RunSummary,
        outcomes: Vec<SubmissionOutcome>,
    },
    /// Cancelled while waiting at the gate; nothing was submitted.
    Aborted,
}

/// Validate, wait at the gate (when given), then dispatch every target.
///
/// Cancellation is only observed at the gate. Once submission starts the batch
/// runs to the end.
pub async fn execute(
    plan: &RunPlan,
    dispatcher: &Dispatcher,
    gate: Option<&DeadlineGate>,
    cancel: &CancellationToken,
    events: Option<&UnboundedSender<RunEvent>>,
) -> Result<RunReport, ValidationError> {
    if plan.targets.is_empty() {
        return Err(ValidationError::NoTargets);
    }

    let emit = |event: RunEvent| {
        if let Some(tx) = events {
            let _ = tx.send(event);
        }
    };

    if let Some(gate) = gate {
        emit(RunEvent::GateWaiting {
            anchor: gate.anchor(),
        });
        match gate.wait(cancel).await {
            GateOutcome::Reached => emit(RunEvent::GateOpened),
            GateOutcome::Aborted => {
                emit(RunEvent::GateAborted);
                return Ok(RunReport::Aborted);
            }
        }
    }

    emit(RunEvent::Started {
        total: plan.targets.len(),
        mode: plan.mode,
    });

    let aggregator = dispatcher
        .dispatch(&plan.identity, &plan.targets, plan.mode, events)
        .await?;
    let (summary, outcomes) = aggregator.finish();

    emit(RunEvent::Finished { summary });
    Ok(RunReport::Completed { summary, outcomes })
}

/// A run executing on its own task.
pub struct RunHandle {
    pub events: UnboundedReceiver<RunEvent>,
    pub cancel: CancellationToken,
    pub join: JoinHandle<Result<RunReport, ValidationError>>,
}

pub fn spawn_run(
    plan: RunPlan,
    dispatcher: Arc<Dispatcher>,
    gate: Option<DeadlineGate>,
) -> RunHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    let join = tokio::spawn(async move {
        execute(&plan, &dispatcher, gate.as_ref(), &task_cancel, Some(&tx)).await
    });

    RunHandle {
        events: rx,
        cancel,
        join,
    }
}
