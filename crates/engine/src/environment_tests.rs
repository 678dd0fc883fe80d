use super::*;
use pg_core::{CoreError, FakeClock, ProgramId};
use tempfile::{tempdir, TempDir};

fn manager() -> (EnvironmentManager<FakeClock>, Arc<Store>, TempDir) {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let manager = EnvironmentManager::new(store.clone(), FakeClock::default());
    (manager, store, dir)
}

#[test]
fn create_environment_starts_in_creating() {
    let (manager, _store, _dir) = manager();
    let env = manager.create_environment(ProgramId::new(), "mellea-prog-abc").unwrap();
    assert_eq!(env.status, EnvironmentStatus::Creating);
    assert_eq!(manager.get_environment(env.id).unwrap().id, env.id);
}

#[test]
fn list_environments_filters_by_program_and_status() {
    let (manager, _store, _dir) = manager();
    let program_a = ProgramId::new();
    let program_b = ProgramId::new();
    let a1 = manager.create_environment(program_a, "img-a").unwrap();
    manager.mark_ready(a1.id).unwrap();
    manager.create_environment(program_a, "img-a2").unwrap();
    manager.create_environment(program_b, "img-b").unwrap();

    let only_a = manager.list_environments(Some(program_a), None);
    assert_eq!(only_a.len(), 2);

    let ready_only = manager.list_environments(None, Some(EnvironmentStatus::Ready));
    assert_eq!(ready_only.len(), 1);
    assert_eq!(ready_only[0].id, a1.id);
}

#[test]
fn full_lifecycle_through_ready_running_stopped() {
    let (manager, _store, _dir) = manager();
    let env = manager.create_environment(ProgramId::new(), "img").unwrap();

    let env = manager.mark_ready(env.id).unwrap();
    assert_eq!(env.status, EnvironmentStatus::Ready);

    let env = manager.start_environment(env.id).unwrap();
    assert_eq!(env.status, EnvironmentStatus::Starting);

    let env = manager.mark_running(env.id, "container-1").unwrap();
    assert_eq!(env.status, EnvironmentStatus::Running);
    assert_eq!(env.container_id.as_deref(), Some("container-1"));
    assert!(env.started_at.is_some());

    let env = manager.stop_environment(env.id).unwrap();
    assert_eq!(env.status, EnvironmentStatus::Stopping);

    let env = manager.mark_stopped(env.id).unwrap();
    assert_eq!(env.status, EnvironmentStatus::Stopped);
    assert!(env.stopped_at.is_some());
}

#[test]
fn rejects_deletion_from_running() {
    let (manager, _store, _dir) = manager();
    let env = manager.create_environment(ProgramId::new(), "img").unwrap();
    manager.mark_ready(env.id).unwrap();
    manager.start_environment(env.id).unwrap();
    manager.mark_running(env.id, "c1").unwrap();

    let err = manager.delete_environment(env.id).unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::InvalidStateTransition { .. })));
    assert!(manager.get_environment(env.id).is_some());
}

#[test]
fn deletes_from_ready_stopped_or_failed() {
    let (manager, _store, _dir) = manager();
    let env = manager.create_environment(ProgramId::new(), "img").unwrap();
    manager.mark_ready(env.id).unwrap();
    manager.delete_environment(env.id).unwrap();
    assert!(manager.get_environment(env.id).is_none());
}

#[test]
fn mark_failed_records_error_message() {
    let (manager, _store, _dir) = manager();
    let env = manager.create_environment(ProgramId::new(), "img").unwrap();
    let env = manager.mark_failed(env.id, "image pull failed").unwrap();
    assert_eq!(env.status, EnvironmentStatus::Failed);
    assert_eq!(env.error_message.as_deref(), Some("image pull failed"));
}

#[test]
fn update_status_on_missing_environment_is_not_found() {
    let (manager, _store, _dir) = manager();
    let err = manager.mark_ready(EnvironmentId::new()).unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::NotFound { .. })));
}
