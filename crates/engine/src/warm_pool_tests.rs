use super::*;
use crate::test_support::FakeBuildBackend;
use pg_adapters::RegistryCredentials;
use pg_core::{DependencySource, FakeClock, PackageSpec, ProgramBuilder, RunBuilder};
use tempfile::{tempdir, TempDir};

fn harness(config: WarmPoolConfig) -> (WarmPoolReconciler<FakeClock>, Arc<Store>, TempDir) {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let build_engine = Arc::new(BuildEngine::new(
        store.clone(),
        FakeClock::default(),
        Arc::new(FakeBuildBackend::default()),
        None,
        RegistryCredentials::default(),
        dir.path().to_path_buf(),
    ));
    let reconciler = WarmPoolReconciler::new(store.clone(), FakeClock::default(), build_engine, config);
    (reconciler, store, dir)
}

fn config(pool_size: usize) -> WarmPoolConfig {
    WarmPoolConfig {
        enabled: true,
        interval_seconds: 60,
        pool_size,
        max_age_minutes: 120,
        popular_deps_count: 5,
    }
}

fn program_with_packages() -> pg_core::Program {
    ProgramBuilder::default()
        .dependencies(pg_core::Dependencies {
            source: DependencySource::Pyproject,
            packages: vec![PackageSpec { name: "numpy".to_string(), version: "1.26.0".to_string(), extras: vec![] }],
            python_version: "3.12".to_string(),
            lockfile_hash: None,
        })
        .build()
}

#[tokio::test]
async fn tops_up_the_pool_by_building_and_provisioning_ready_environments() {
    let (reconciler, store, _dir) = harness(config(2));
    let program = program_with_packages();
    store.programs.put(program.clone()).unwrap();

    let metrics = reconciler.tick().await;

    assert_eq!(metrics.warm_pool_size, 2);
    assert_eq!(metrics.environments_created, 2);
    assert!(metrics.errors.is_empty());
    let ready = store.environments.list_filter(|e| e.status == pg_core::EnvironmentStatus::Ready);
    assert_eq!(ready.len(), 2);
}

#[tokio::test]
async fn reuses_an_already_built_image_tag_without_rebuilding() {
    let (reconciler, store, _dir) = harness(config(1));
    let mut program = program_with_packages();
    program.image_build_status = pg_core::ImageBuildStatus::Ready;
    program.image_tag = Some("mellea-prog-prebuilt".to_string());
    store.programs.put(program.clone()).unwrap();

    let metrics = reconciler.tick().await;
    assert_eq!(metrics.environments_created, 1);
    assert_eq!(metrics.layers_pre_built, 0);

    let env = store.environments.list().into_iter().next().unwrap();
    assert_eq!(env.image_tag, "mellea-prog-prebuilt");
}

#[tokio::test]
async fn recycles_environments_older_than_max_age() {
    let clock = FakeClock::default();
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let build_engine = Arc::new(BuildEngine::new(
        store.clone(),
        clock.clone(),
        Arc::new(FakeBuildBackend::default()),
        None,
        RegistryCredentials::default(),
        dir.path().to_path_buf(),
    ));
    let reconciler = WarmPoolReconciler::new(store.clone(), clock.clone(), build_engine, config(0));

    let env = pg_core::EnvironmentBuilder::default().status(pg_core::EnvironmentStatus::Ready).build();
    store.environments.put(env.clone()).unwrap();

    clock.advance(chrono::Duration::minutes(121));
    let metrics = reconciler.tick().await;

    assert_eq!(metrics.environments_recycled, 1);
    assert!(store.environments.get(env.id.as_uuid()).is_none());
}

#[tokio::test]
async fn ranks_popularity_by_recent_run_count() {
    let (reconciler, store, _dir) = harness(config(0));
    let popular = program_with_packages();
    let quiet = {
        let mut p = program_with_packages();
        p.id = pg_core::ProgramId::new();
        p
    };
    store.programs.put(popular.clone()).unwrap();
    store.programs.put(quiet.clone()).unwrap();

    // Both share a dependency set (same packages), so they'd tie on cache
    // use-count; give `popular` more recent runs to break the tie first.
    for _ in 0..3 {
        let mut run = RunBuilder::default().build();
        run.program_id = popular.id;
        store.runs.put(run).unwrap();
    }

    let ranked = reconciler.popular_programs(2);
    assert_eq!(ranked.first().map(|p| p.id), Some(popular.id));
    let _ = quiet;
}

#[tokio::test]
async fn records_errors_without_failing_the_whole_tick() {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let build_engine = Arc::new(BuildEngine::new(
        store.clone(),
        FakeClock::default(),
        Arc::new(FakeBuildBackend::failing()),
        None,
        RegistryCredentials::default(),
        dir.path().to_path_buf(),
    ));
    let reconciler = WarmPoolReconciler::new(store.clone(), FakeClock::default(), build_engine, config(1));
    store.programs.put(program_with_packages()).unwrap();

    let metrics = reconciler.tick().await;
    assert_eq!(metrics.environments_created, 0);
    assert_eq!(metrics.errors.len(), 1);
}
