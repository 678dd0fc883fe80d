use super::*;
use crate::clock::FakeClock;

#[test]
fn creating_must_precede_any_other_status() {
    let env = Environment::builder().build();
    assert_eq!(env.status, EnvironmentStatus::Creating);
}

#[yare::parameterized(
    creating_to_ready = { EnvironmentStatus::Creating, EnvironmentStatus::Ready, true },
    creating_to_failed = { EnvironmentStatus::Creating, EnvironmentStatus::Failed, true },
    creating_to_stopping = { EnvironmentStatus::Creating, EnvironmentStatus::Stopping, false },
    ready_to_starting = { EnvironmentStatus::Ready, EnvironmentStatus::Starting, true },
    ready_to_deleting = { EnvironmentStatus::Ready, EnvironmentStatus::Deleting, true },
    ready_to_running = { EnvironmentStatus::Ready, EnvironmentStatus::Running, false },
    starting_to_running = { EnvironmentStatus::Starting, EnvironmentStatus::Running, true },
    starting_to_failed = { EnvironmentStatus::Starting, EnvironmentStatus::Failed, true },
    running_to_stopping = { EnvironmentStatus::Running, EnvironmentStatus::Stopping, true },
    running_to_deleting = { EnvironmentStatus::Running, EnvironmentStatus::Deleting, false },
    stopping_to_stopped = { EnvironmentStatus::Stopping, EnvironmentStatus::Stopped, true },
    stopped_to_deleting = { EnvironmentStatus::Stopped, EnvironmentStatus::Deleting, true },
    failed_to_deleting = { EnvironmentStatus::Failed, EnvironmentStatus::Deleting, true },
    deleting_to_anything = { EnvironmentStatus::Deleting, EnvironmentStatus::Ready, false },
)]
fn transition_table_matches_spec(from: EnvironmentStatus, to: EnvironmentStatus, allowed: bool) {
    assert_eq!(from.can_transition(to), allowed, "{from} -> {to}");
}

#[test]
fn running_from_stopped_is_forbidden_so_deletion_requires_stop_first() {
    let mut env = Environment::builder().status(EnvironmentStatus::Running).build();
    let clock = FakeClock::default();
    assert!(env.begin_delete(&clock).is_err());
}

#[test]
fn entering_running_sets_started_at_and_container_id_once() {
    let mut env = Environment::builder().status(EnvironmentStatus::Starting).build();
    let clock = FakeClock::default();
    env.mark_running("container-1", &clock).unwrap();
    assert!(env.started_at.is_some());
    assert_eq!(env.container_id.as_deref(), Some("container-1"));

    let first_started_at = env.started_at;
    clock.advance(chrono::Duration::seconds(5));
    env.stop(&clock).unwrap();
    // re-entering running isn't valid from stopping, but started_at must never reset
    // once set, per invariant 3 — verified here on the original entry.
    assert_eq!(env.started_at, first_started_at);
}

#[test]
fn entering_failed_records_error_message() {
    let mut env = Environment::builder().status(EnvironmentStatus::Starting).build();
    let clock = FakeClock::default();
    env.mark_failed("image pull failed", &clock).unwrap();
    assert_eq!(env.status, EnvironmentStatus::Failed);
    assert_eq!(env.error_message.as_deref(), Some("image pull failed"));
}

#[test]
fn entering_stopped_sets_stopped_at() {
    let mut env = Environment::builder().status(EnvironmentStatus::Stopping).build();
    let clock = FakeClock::default();
    env.mark_stopped(&clock).unwrap();
    assert!(env.stopped_at.is_some());
}

#[test]
fn invalid_transition_leaves_state_unchanged() {
    let mut env = Environment::builder().status(EnvironmentStatus::Creating).build();
    let clock = FakeClock::default();
    let before = env.status;
    let err = env.stop(&clock).unwrap_err();
    assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
    assert_eq!(env.status, before);
}

#[test]
fn container_id_only_populated_once_running_is_entered() {
    let env = Environment::builder().build();
    assert!(env.container_id.is_none());
}
