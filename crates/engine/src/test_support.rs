//! Crate-internal test fakes shared by this crate's own test modules
//! (not a public `test-support` feature — nothing outside `pg-engine`
//! needs a fake [`BuildBackend`]).

use async_trait::async_trait;
use pg_build::{BackendBuildOutput, BuildBackend, BuildEngineResult};
use parking_lot::Mutex;

#[derive(Default)]
pub struct FakeBuildBackend {
    pub fail: Mutex<bool>,
}

impl FakeBuildBackend {
    pub fn failing() -> Self {
        Self { fail: Mutex::new(true) }
    }
}

#[async_trait]
impl BuildBackend for FakeBuildBackend {
    async fn build_dependency_layer(
        &self,
        req: pg_build::DepLayerRequest,
    ) -> BuildEngineResult<BackendBuildOutput> {
        if *self.fail.lock() {
            return Err(pg_build::BuildError::Backend("fake dependency build failed".to_string()));
        }
        Ok(BackendBuildOutput { image_tag: req.image_tag, size_bytes: Some(10), build_job_name: None })
    }

    async fn build_program_layer(
        &self,
        req: pg_build::ProgramLayerRequest,
    ) -> BuildEngineResult<BackendBuildOutput> {
        if *self.fail.lock() {
            return Err(pg_build::BuildError::Backend("fake program build failed".to_string()));
        }
        Ok(BackendBuildOutput { image_tag: req.image_tag, size_bytes: Some(20), build_job_name: None })
    }

    async fn image_exists(&self, _image_tag: &str) -> BuildEngineResult<bool> {
        Ok(true)
    }

    async fn delete_image(&self, _image_tag: &str) -> BuildEngineResult<()> {
        Ok(())
    }
}
