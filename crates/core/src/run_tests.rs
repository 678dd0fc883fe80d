use super::*;
use crate::clock::FakeClock;

#[yare::parameterized(
    queued_to_starting = { RunStatus::Queued, RunStatus::Starting, true },
    queued_to_cancelled = { RunStatus::Queued, RunStatus::Cancelled, true },
    queued_to_running = { RunStatus::Queued, RunStatus::Running, false },
    starting_to_running = { RunStatus::Starting, RunStatus::Running, true },
    starting_to_succeeded = { RunStatus::Starting, RunStatus::Succeeded, true },
    starting_to_failed = { RunStatus::Starting, RunStatus::Failed, true },
    starting_to_cancelled = { RunStatus::Starting, RunStatus::Cancelled, true },
    running_to_succeeded = { RunStatus::Running, RunStatus::Succeeded, true },
    running_to_failed = { RunStatus::Running, RunStatus::Failed, true },
    running_to_cancelled = { RunStatus::Running, RunStatus::Cancelled, true },
    succeeded_is_sink = { RunStatus::Succeeded, RunStatus::Failed, false },
    failed_is_sink = { RunStatus::Failed, RunStatus::Running, false },
    cancelled_is_sink = { RunStatus::Cancelled, RunStatus::Starting, false },
)]
fn transition_table_matches_spec(from: RunStatus, to: RunStatus, allowed: bool) {
    assert_eq!(from.can_transition(to), allowed, "{from} -> {to}");
}

#[test]
fn started_at_set_only_on_first_entry_to_running() {
    let mut run = Run::builder().status(RunStatus::Starting).build();
    let clock = FakeClock::default();
    run.mark_running(&clock).unwrap();
    let first = run.started_at;
    assert!(first.is_some());
}

#[test]
fn completed_at_set_iff_terminal() {
    let mut run = Run::builder().status(RunStatus::Running).build();
    assert!(run.completed_at.is_none());
    let clock = FakeClock::default();
    run.mark_succeeded(0, &clock).unwrap();
    assert!(run.completed_at.is_some());
}

#[test]
fn fast_run_can_go_straight_from_starting_to_succeeded() {
    let mut run = Run::builder().status(RunStatus::Starting).build();
    let clock = FakeClock::default();
    run.mark_succeeded(0, &clock).unwrap();
    assert_eq!(run.status, RunStatus::Succeeded);
    // started_at is never set in this path, per invariant 3 ("iff the run
    // ever entered running") — it simply never entered running.
    assert!(run.started_at.is_none());
}

#[test]
fn nonzero_exit_code_is_failed_not_cancelled() {
    let mut run = Run::builder().status(RunStatus::Running).build();
    let clock = FakeClock::default();
    run.transition_to(RunStatus::Failed, &clock, Some("exit 1".into())).unwrap();
    run.exit_code = Some(1);
    assert_eq!(run.status, RunStatus::Failed);
}

#[test]
fn cancel_after_terminal_is_invalid_transition_idempotent_failure() {
    let mut run = Run::builder().status(RunStatus::Succeeded).build();
    let clock = FakeClock::default();
    let err = run.mark_cancelled("double cancel", &clock).unwrap_err();
    assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
}

#[test]
fn cpu_hours_uses_started_and_completed_timestamps() {
    let mut run = Run::builder().status(RunStatus::Running).build();
    let clock = FakeClock::default();
    run.mark_running(&clock).unwrap();
    clock.advance(chrono::Duration::seconds(60));
    run.mark_succeeded(0, &clock).unwrap();

    let hours = run.cpu_hours(1.0).unwrap();
    assert!((hours - (1.0 / 60.0)).abs() < 1e-6);
}

#[test]
fn cpu_hours_is_none_before_completion() {
    let run = Run::builder().status(RunStatus::Running).build();
    assert!(run.cpu_hours(1.0).is_none());
}
