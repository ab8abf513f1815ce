use anyhow::Context;
use arena_core::config::Settings;
use arena_core::dispatch::{DispatchMode, Dispatcher};
use arena_core::domain::reservation::ApplicantIdentity;
use arena_core::identity::{FileIdentityStore, IdentityStore};
use arena_core::resolve::{resolve, TargetSelection};
use arena_core::run::{spawn_run, RunEvent, RunPlan, RunReport};
use arena_core::time::calendar::first_day_of_next_month;
use arena_core::time::deadline::DeadlineGate;
use arena_core::time::{Clock, VenueClock};
use chrono::Weekday;
use clap::{Parser, ValueEnum};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod targets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Every occurrence of one weekday next month.
    Recurrence,
    /// Only the dates given with --date.
    Manual,
}

#[derive(Debug, Parser)]
#[command(name = "arena_worker")]
struct Args {
    /// Applicant name. Defaults to the saved identity.
    #[arg(long)]
    name: Option<String>,

    /// Applicant phone number (11 digits; separators are stripped).
    #[arg(long)]
    phone: Option<String>,

    /// Target selection. Defaults to manual when --date is given, else recurrence.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Weekday to book next month (recurrence mode).
    #[arg(long, default_value = "sat", value_parser = targets::parse_weekday)]
    weekday: Weekday,

    /// Start hour, 6..=22 (recurrence mode).
    #[arg(long, default_value_t = 7)]
    start_hour: u32,

    /// Book a single hour instead of two (recurrence mode).
    #[arg(long)]
    one_hour: bool,

    /// Request lighting (recurrence mode).
    #[arg(long)]
    light: bool,

    /// Date to book, repeatable: YYYY-MM-DD[@HH][+1h|+2h][+light] (manual mode).
    #[arg(long = "date", value_parser = targets::parse_manual_entry)]
    dates: Vec<targets::ManualEntry>,

    /// Hold submissions until the monthly booking window opens.
    #[arg(long)]
    wait: bool,

    /// Do everything except sending requests.
    #[arg(long)]
    dry_run: bool,

    /// Where the applicant identity is remembered. Overrides IDENTITY_FILE.
    #[arg(long)]
    identity_file: Option<String>,
}

impl Args {
    fn selection_mode(&self) -> anyhow::Result<Mode> {
        match (self.mode, self.dates.is_empty()) {
            (Some(Mode::Recurrence), false) => {
                anyhow::bail!("--date only applies to manual mode; drop --mode recurrence")
            }
            (Some(mode), _) => Ok(mode),
            (None, true) => Ok(Mode::Recurrence),
            (None, false) => Ok(Mode::Manual),
        }
    }
}

/// What a Ctrl-C press does at the current stage of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    CancelWait,
    KeepSubmitting,
    Exit,
}

fn interrupt_action(presses: u32, submitting: bool) -> InterruptAction {
    match (presses, submitting) {
        (0 | 1, false) => InterruptAction::CancelWait,
        (0 | 1, true) => InterruptAction::KeepSubmitting,
        _ => InterruptAction::Exit,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let run_id = uuid::Uuid::new_v4();
    let result = run(args, &settings)
        .instrument(tracing::info_span!("run", %run_id))
        .await;

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(%run_id, error = %err, "booking run failed");
    }
    result
}

async fn run(args: Args, settings: &Settings) -> anyhow::Result<()> {
    let store = FileIdentityStore::new(
        args.identity_file
            .clone()
            .unwrap_or_else(|| settings.identity_file.clone()),
    );
    let identity = resolve_identity(&args, &store)?;
    let selection_mode = args.selection_mode()?;

    let clock = Arc::new(VenueClock::new(settings.utc_offset()?));
    let today = clock.now().date();

    let selection = match selection_mode {
        Mode::Recurrence => {
            let month = first_day_of_next_month(today)?;
            tracing::info!(
                target_month = %month.format("%Y-%m"),
                weekday = ?args.weekday,
                "recurrence mode"
            );
            targets::recurrence(args.weekday, args.start_hour, !args.one_hour, args.light)?
        }
        Mode::Manual => targets::manual(&args.dates),
    };

    let targets = resolve(&selection, today)?;
    if targets.is_empty() {
        tracing::warn!(
            manual = matches!(selection, TargetSelection::Manual(_)),
            "no reservation dates resolved"
        );
    } else {
        tracing::info!(targets = targets.len(), "resolved reservation dates");
    }

    let mode = if args.dry_run {
        DispatchMode::DryRun
    } else {
        DispatchMode::Live
    };
    let dispatcher = Arc::new(Dispatcher::from_settings(settings)?);
    let gate = args.wait.then(|| {
        DeadlineGate::new(
            settings.gate_anchor,
            settings.gate_poll_interval,
            clock.clone(),
        )
    });

    let plan = RunPlan {
        identity: identity.clone(),
        targets,
        mode,
    };
    let mut handle = spawn_run(plan, dispatcher, gate);

    let submitting = Arc::new(AtomicBool::new(false));
    let cancel = handle.cancel.clone();
    let interrupt_submitting = submitting.clone();
    tokio::spawn(async move {
        let mut presses = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            presses += 1;
            match interrupt_action(presses, interrupt_submitting.load(Ordering::SeqCst)) {
                InterruptAction::CancelWait => {
                    tracing::warn!("interrupt received; cancelling the wait (again to exit)");
                    cancel.cancel();
                }
                InterruptAction::KeepSubmitting => {
                    tracing::warn!("submission in progress; finishing the batch (again to exit)");
                }
                InterruptAction::Exit => {
                    tracing::error!("second interrupt; exiting without finishing the run");
                    std::process::exit(130);
                }
            }
        }
    });

    while let Some(event) = handle.events.recv().await {
        if matches!(event, RunEvent::Started { .. }) {
            submitting.store(true, Ordering::SeqCst);
        }
        render_event(&event);
    }

    let report = handle.join.await.context("booking run task failed")??;
    match report {
        RunReport::Completed { summary, .. } => {
            if let Err(err) = store.save(&identity) {
                tracing::warn!(error = %err, "failed to save applicant identity");
            }
            tracing::info!(
                success_count = summary.success_count,
                total_targets = summary.total_targets,
                total_amount = summary.total_amount,
                dry_run = args.dry_run,
                "booking run complete"
            );
        }
        RunReport::Aborted => {
            tracing::warn!("booking run aborted before submission");
        }
    }

    Ok(())
}

fn resolve_identity(args: &Args, store: &dyn IdentityStore) -> anyhow::Result<ApplicantIdentity> {
    if let (Some(name), Some(phone)) = (&args.name, &args.phone) {
        return Ok(ApplicantIdentity::parse(name, phone)?);
    }

    let saved = store.load()?;
    let name = args
        .name
        .clone()
        .or_else(|| saved.as_ref().map(|s| s.name().to_string()))
        .context("applicant name is required (--name or a saved identity)")?;
    let phone = args
        .phone
        .clone()
        .or_else(|| saved.as_ref().map(|s| s.phone_digits().to_string()))
        .context("applicant phone is required (--phone or a saved identity)")?;
    Ok(ApplicantIdentity::parse(&name, &phone)?)
}

fn render_event(event: &RunEvent) {
    match event {
        RunEvent::GateWaiting { anchor } => tracing::info!(
            day = anchor.day,
            time = %format!("{:02}:{:02}:{:02}", anchor.hour, anchor.minute, anchor.second),
            "waiting for the booking window"
        ),
        RunEvent::GateOpened => tracing::info!("booking window open"),
        RunEvent::GateAborted => tracing::warn!("wait cancelled"),
        RunEvent::Started { total, mode } => {
            tracing::info!(total, ?mode, "submitting reservations")
        }
        RunEvent::TargetProcessed {
            index,
            total,
            progress,
            outcome,
        } => {
            let date = outcome.target.date();
            if outcome.succeeded {
                tracing::info!(
                    n = index + 1,
                    total,
                    progress = %format!("{:.0}%", progress * 100.0),
                    %date,
                    time = %outcome.request.booking_time,
                    light = %outcome.request.use_light,
                    amount = outcome.amount,
                    "reservation ok"
                );
            } else {
                tracing::warn!(
                    n = index + 1,
                    total,
                    progress = %format!("{:.0}%", progress * 100.0),
                    %date,
                    error = outcome.error_detail.as_deref().unwrap_or("unknown"),
                    "reservation failed"
                );
            }
        }
        RunEvent::Finished { summary } => tracing::info!(
            success_count = summary.success_count,
            failures = summary.failure_count(),
            total_amount = summary.total_amount,
            "all dates processed"
        ),
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
