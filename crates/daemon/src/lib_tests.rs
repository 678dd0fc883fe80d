use super::*;
use pg_adapters::FakeJobRuntime;
use pg_config::BuildBackend as ConfigBuildBackend;
use pg_core::FakeClock;
use std::sync::Arc;
use tempfile::tempdir;

fn settings_for(dir: &std::path::Path) -> Settings {
    Settings {
        data_dir: dir.to_path_buf(),
        build_backend: ConfigBuildBackend::Local,
        build_namespace: "pg-builds".to_string(),
        build_cpu_limit: 2.0,
        build_memory_limit_mb: 2048,
        build_timeout_seconds: 600,
        registry_url: None,
        registry_username: None,
        registry_password: None,
        registry_insecure: false,
        idle_controller_enabled: true,
        idle_controller_interval_seconds: 60,
        environment_idle_timeout_minutes: 30,
        run_retention_days: 30,
        stale_job_timeout_minutes: 120,
        warmup_enabled: true,
        warmup_interval_seconds: 300,
        warmup_pool_size: 1,
        warmup_max_age_minutes: 120,
        warmup_popular_deps_count: 5,
        run_executor_enabled: true,
        run_executor_interval_seconds: 1,
        artifact_retention_days: 14,
        artifact_max_single_size_mb: 512,
        artifact_cleanup_interval_seconds: 3600,
        retention_policy_enabled: true,
        retention_policy_interval_seconds: 3600,
        llm_metrics_retention_days: 90,
        credentials_namespace: "pg-credentials".to_string(),
    }
}

#[test]
fn bootstrap_creates_the_metadata_and_workspace_directories() {
    let dir = tempdir().unwrap();
    let settings = settings_for(dir.path());
    let job_runtime = Arc::new(FakeJobRuntime::new());

    let app = Application::bootstrap_with(settings, FakeClock::default(), job_runtime).unwrap();

    assert!(dir.path().join("metadata").is_dir());
    assert!(dir.path().join("workspaces").is_dir());
    assert!(dir.path().join("artifacts").is_dir());
    assert_eq!(app.store.programs.len(), 0);
}

#[tokio::test]
async fn run_exits_promptly_once_cancelled() {
    let dir = tempdir().unwrap();
    let settings = settings_for(dir.path());
    let job_runtime = Arc::new(FakeJobRuntime::new());
    let app = Arc::new(Application::bootstrap_with(settings, FakeClock::default(), job_runtime).unwrap());

    let cancellation = CancellationToken::new();
    cancellation.cancel();

    tokio::time::timeout(std::time::Duration::from_secs(5), app.run(cancellation)).await.unwrap().unwrap();
}

#[tokio::test]
async fn disabled_reconcilers_still_join_cleanly() {
    let dir = tempdir().unwrap();
    let mut settings = settings_for(dir.path());
    settings.warmup_enabled = false;
    settings.retention_policy_enabled = false;
    settings.idle_controller_enabled = false;
    settings.run_executor_enabled = false;
    let job_runtime = Arc::new(FakeJobRuntime::new());
    let app = Arc::new(Application::bootstrap_with(settings, FakeClock::default(), job_runtime).unwrap());

    let cancellation = CancellationToken::new();
    tokio::time::timeout(std::time::Duration::from_secs(5), app.run(cancellation)).await.unwrap().unwrap();
}
