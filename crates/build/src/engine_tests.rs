use super::*;
use async_trait::async_trait;
use pg_adapters::RegistryCredentials;
use pg_core::{FakeClock, PackageSpec, ProgramBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;
use tempfile::{tempdir, TempDir};

#[derive(Default)]
struct FakeBuildBackend {
    dep_calls: AtomicUsize,
    prog_calls: AtomicUsize,
    dep_delay: SyncMutex<StdDuration>,
    prog_delay: SyncMutex<StdDuration>,
    fail_deps: SyncMutex<bool>,
    fail_program: SyncMutex<bool>,
}

impl FakeBuildBackend {
    fn with_delay(mut self, dep: StdDuration, prog: StdDuration) -> Self {
        self.dep_delay = SyncMutex::new(dep);
        self.prog_delay = SyncMutex::new(prog);
        self
    }

    fn failing_deps() -> Self {
        let b = Self::default();
        *b.fail_deps.lock() = true;
        b
    }
}

#[async_trait]
impl BuildBackend for FakeBuildBackend {
    async fn build_dependency_layer(&self, req: DepLayerRequest) -> BuildEngineResult<crate::backend::BackendBuildOutput> {
        self.dep_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.dep_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_deps.lock() {
            return Err(crate::error::BuildError::Backend("pip install failed".to_string()));
        }
        Ok(crate::backend::BackendBuildOutput { image_tag: req.image_tag, size_bytes: Some(10), build_job_name: None })
    }

    async fn build_program_layer(&self, req: ProgramLayerRequest) -> BuildEngineResult<crate::backend::BackendBuildOutput> {
        self.prog_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.prog_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_program.lock() {
            return Err(crate::error::BuildError::Backend("copy failed".to_string()));
        }
        Ok(crate::backend::BackendBuildOutput { image_tag: req.image_tag, size_bytes: Some(20), build_job_name: None })
    }

    async fn image_exists(&self, _image_tag: &str) -> BuildEngineResult<bool> {
        Ok(true)
    }

    async fn delete_image(&self, _image_tag: &str) -> BuildEngineResult<()> {
        Ok(())
    }
}

fn program() -> pg_core::Program {
    ProgramBuilder::default()
        .dependencies(pg_core::Dependencies {
            source: pg_core::DependencySource::Pyproject,
            packages: vec![PackageSpec { name: "requests".to_string(), version: "2.31.0".to_string(), extras: vec![] }],
            python_version: "3.12".to_string(),
            lockfile_hash: None,
        })
        .build()
}

fn harness(backend: FakeBuildBackend) -> (BuildEngine<FakeClock>, Arc<Store>, TempDir) {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let engine = BuildEngine::new(
        store.clone(),
        FakeClock::default(),
        Arc::new(backend),
        None,
        RegistryCredentials::default(),
        dir.path().to_path_buf(),
    );
    (engine, store, dir)
}

#[tokio::test]
async fn cache_miss_builds_both_layers_and_records_cache_entry() {
    let (engine, store, _dir) = harness(FakeBuildBackend::default());
    let program = program();
    store.programs.put(program.clone()).unwrap();

    let result = engine.build_image(&program, false, false).await.unwrap();
    assert!(result.success);
    assert!(!result.cache_hit);
    assert_eq!(store.layer_cache.len(), 1);

    let updated = store.programs.get(program.id.as_uuid()).unwrap();
    assert_eq!(updated.image_build_status, pg_core::ImageBuildStatus::Ready);
    assert_eq!(updated.image_tag, result.image_tag);
}

#[tokio::test]
async fn second_build_with_same_dependencies_hits_the_cache() {
    let backend = Arc::new(FakeBuildBackend::default());
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let engine = BuildEngine::new(
        store.clone(),
        FakeClock::default(),
        backend.clone(),
        None,
        RegistryCredentials::default(),
        dir.path().to_path_buf(),
    );

    let program_a = program();
    store.programs.put(program_a.clone()).unwrap();
    engine.build_image(&program_a, false, false).await.unwrap();

    let program_b = program();
    store.programs.put(program_b.clone()).unwrap();
    let result_b = engine.build_image(&program_b, false, false).await.unwrap();

    assert!(result_b.cache_hit);
    assert_eq!(backend.dep_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.prog_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_builds_sharing_a_cache_key_coalesce_on_the_dependency_layer() {
    let backend = Arc::new(
        FakeBuildBackend::default().with_delay(StdDuration::from_millis(40), StdDuration::ZERO),
    );
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let engine = Arc::new(BuildEngine::new(
        store.clone(),
        FakeClock::default(),
        backend.clone(),
        None,
        RegistryCredentials::default(),
        dir.path().to_path_buf(),
    ));

    let program_a = program();
    let program_b = program();
    store.programs.put(program_a.clone()).unwrap();
    store.programs.put(program_b.clone()).unwrap();

    let (e1, a1) = (engine.clone(), program_a.clone());
    let h1 = tokio::spawn(async move { e1.build_image(&a1, false, false).await });
    tokio::time::sleep(StdDuration::from_millis(5)).await;
    let (e2, a2) = (engine.clone(), program_b.clone());
    let h2 = tokio::spawn(async move { e2.build_image(&a2, false, false).await });

    let (r1, r2) = tokio::join!(h1, h2);
    assert!(r1.unwrap().unwrap().success);
    assert!(r2.unwrap().unwrap().success);
    assert_eq!(backend.dep_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.layer_cache.len(), 1);
}

#[tokio::test]
async fn newer_build_for_the_same_program_supersedes_the_prior_one() {
    let backend = Arc::new(
        FakeBuildBackend::default().with_delay(StdDuration::from_millis(60), StdDuration::ZERO),
    );
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let engine = Arc::new(BuildEngine::new(
        store.clone(),
        FakeClock::default(),
        backend.clone(),
        None,
        RegistryCredentials::default(),
        dir.path().to_path_buf(),
    ));

    let program = program();
    store.programs.put(program.clone()).unwrap();

    let (e1, p1) = (engine.clone(), program.clone());
    let first = tokio::spawn(async move { e1.build_image(&p1, false, false).await });
    tokio::time::sleep(StdDuration::from_millis(5)).await;
    let (e2, p2) = (engine.clone(), program.clone());
    let second = tokio::spawn(async move { e2.build_image(&p2, false, false).await });

    let first_outcome = first.await.unwrap();
    let second_outcome = second.await.unwrap();

    assert!(matches!(first_outcome, Err(crate::error::BuildError::Superseded)));
    assert!(second_outcome.unwrap().success);
}

#[tokio::test]
async fn dependency_layer_failure_does_not_create_a_cache_entry() {
    let (engine, store, _dir) = harness(FakeBuildBackend::failing_deps());
    let program = program();
    store.programs.put(program.clone()).unwrap();

    let result = engine.build_image(&program, false, false).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error_message.as_deref(), Some("build backend unavailable: pip install failed"));
    assert!(store.layer_cache.is_empty());

    let updated = store.programs.get(program.id.as_uuid()).unwrap();
    assert_eq!(updated.image_build_status, pg_core::ImageBuildStatus::Failed);
}

#[tokio::test]
async fn invalidate_cache_entry_removes_the_row_without_touching_the_image() {
    let (engine, store, _dir) = harness(FakeBuildBackend::default());
    let program = program();
    store.programs.put(program.clone()).unwrap();
    engine.build_image(&program, false, false).await.unwrap();
    assert_eq!(store.layer_cache.len(), 1);

    let cache_key = pg_core::compute_cache_key(&program.dependencies.python_version, &program.dependencies.packages);
    assert!(engine.invalidate_cache_entry(&cache_key).unwrap());
    assert!(store.layer_cache.is_empty());
    assert!(!engine.invalidate_cache_entry(&cache_key).unwrap());
}

#[tokio::test]
async fn prune_stale_deletes_entries_older_than_the_cutoff() {
    let clock = FakeClock::default();
    let backend = Arc::new(FakeBuildBackend::default());
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let engine = BuildEngine::new(
        store.clone(),
        clock.clone(),
        backend,
        None,
        RegistryCredentials::default(),
        dir.path().to_path_buf(),
    );

    let program = program();
    store.programs.put(program.clone()).unwrap();
    engine.build_image(&program, false, false).await.unwrap();
    assert_eq!(store.layer_cache.len(), 1);

    clock.advance(chrono::Duration::days(31));
    let pruned = engine.prune_stale(30).await.unwrap();
    assert_eq!(pruned, 1);
    assert!(store.layer_cache.is_empty());
}
