//! Cluster job runtime (spec §6 "Outbound integrations — Cluster job
//! runtime"): `createJob`/`getJobStatus`/`deleteJob`/`streamLogs`. Backs
//! both the Build Engine's cluster backend and the Run Executor.

use crate::error::{AdapterError, AdapterResult};
use async_trait::async_trait;
use std::collections::HashMap;

/// Resource + execution spec for a single cluster job. Used both for
/// builds (image build+push) and runs (program execution).
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name_prefix: String,
    pub namespace: String,
    pub image: String,
    pub command: Vec<String>,
    pub env: HashMap<String, String>,
    pub cpu_limit: f64,
    pub memory_limit_mb: u64,
    pub timeout_seconds: u64,
    /// Secret names to mount, resolved ahead of time via
    /// [`crate::CredentialService`].
    pub secret_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterJobPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ClusterJobStatus {
    pub phase: ClusterJobPhase,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub completion_time: Option<chrono::DateTime<chrono::Utc>>,
    pub pod_name: Option<String>,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
}

/// Minimal listing row for the Idle Reconciler's stale-job sweep (spec
/// §4.8): just enough to decide whether a job outlived its Run.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
pub trait ClusterJobRuntime: Send + Sync + 'static {
    async fn create_job(&self, spec: JobSpec) -> AdapterResult<String>;
    async fn get_job_status(&self, job_name: &str) -> AdapterResult<ClusterJobStatus>;
    async fn delete_job(&self, job_name: &str) -> AdapterResult<()>;
    /// Stream raw log lines for a job. Returns the accumulated output
    /// available at call time; callers needing live tailing poll again.
    async fn stream_logs(&self, job_name: &str) -> AdapterResult<Vec<String>>;
    /// List jobs carrying the `mellea-run-*` label prefix, for the Idle
    /// Reconciler's orphaned-job sweep (spec §4.8).
    async fn list_run_jobs(&self) -> AdapterResult<Vec<JobSummary>>;
}

pub mod kube_runtime {
    use super::*;
    use k8s_openapi::api::batch::v1::{Job as K8sJob, JobSpec as K8sJobSpec};
    use k8s_openapi::api::core::v1::{
        Container, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements, SecretVolumeSource,
        Volume, VolumeMount,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::api::{Api, DeleteParams, LogParams, PostParams};
    use kube::Client;
    use std::collections::BTreeMap;

    /// Cluster job runtime backed by a real Kubernetes `batch/v1::Job`.
    #[derive(Clone)]
    pub struct KubeJobRuntime {
        client: Client,
    }

    impl KubeJobRuntime {
        pub async fn connect() -> AdapterResult<Self> {
            let client = Client::try_default()
                .await
                .map_err(|e| AdapterError::ClusterUnavailable(e.to_string()))?;
            Ok(Self { client })
        }

        fn build_job(spec: &JobSpec) -> K8sJob {
            let job_name = format!("{}-{}", spec.name_prefix, uuid::Uuid::new_v4().simple());
            let mut env_vars: Vec<EnvVar> = spec
                .env
                .iter()
                .map(|(k, v)| EnvVar { name: k.clone(), value: Some(v.clone()), ..Default::default() })
                .collect();
            env_vars.sort_by(|a, b| a.name.cmp(&b.name));

            let mut limits = BTreeMap::new();
            limits.insert("cpu".to_string(), Quantity(spec.cpu_limit.to_string()));
            limits.insert("memory".to_string(), Quantity(format!("{}Mi", spec.memory_limit_mb)));

            let volumes: Vec<Volume> = spec
                .secret_names
                .iter()
                .map(|name| Volume {
                    name: format!("secret-{name}"),
                    secret: Some(SecretVolumeSource { secret_name: Some(name.clone()), ..Default::default() }),
                    ..Default::default()
                })
                .collect();
            let volume_mounts: Vec<VolumeMount> = spec
                .secret_names
                .iter()
                .map(|name| VolumeMount {
                    name: format!("secret-{name}"),
                    mount_path: format!("/var/run/secrets/{name}"),
                    read_only: Some(true),
                    ..Default::default()
                })
                .collect();

            K8sJob {
                metadata: ObjectMeta {
                    generate_name: Some(format!("{job_name}-")),
                    namespace: Some(spec.namespace.clone()),
                    ..Default::default()
                },
                spec: Some(K8sJobSpec {
                    backoff_limit: Some(0),
                    active_deadline_seconds: Some(spec.timeout_seconds as i64),
                    template: PodTemplateSpec {
                        spec: Some(PodSpec {
                            restart_policy: Some("Never".to_string()),
                            containers: vec![Container {
                                name: "main".to_string(),
                                image: Some(spec.image.clone()),
                                command: Some(spec.command.clone()),
                                env: Some(env_vars),
                                resources: Some(ResourceRequirements {
                                    limits: Some(limits),
                                    ..Default::default()
                                }),
                                volume_mounts: Some(volume_mounts),
                                ..Default::default()
                            }],
                            volumes: Some(volumes),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                    ..Default::default()
                }),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ClusterJobRuntime for KubeJobRuntime {
        async fn create_job(&self, spec: JobSpec) -> AdapterResult<String> {
            let api: Api<K8sJob> = Api::namespaced(self.client.clone(), &spec.namespace);
            let job = Self::build_job(&spec);
            let created = api
                .create(&PostParams::default(), &job)
                .await
                .map_err(|e| AdapterError::ClusterUnavailable(e.to_string()))?;
            let name = created.metadata.name.ok_or_else(|| {
                AdapterError::ClusterUnavailable("created job had no name".to_string())
            })?;
            tracing::info!(job_name = %name, namespace = %spec.namespace, "created cluster job");
            Ok(name)
        }

        async fn get_job_status(&self, job_name: &str) -> AdapterResult<ClusterJobStatus> {
            let api: Api<K8sJob> = Api::all(self.client.clone());
            let job = api
                .get(job_name)
                .await
                .map_err(|_| AdapterError::JobNotFound(job_name.to_string()))?;
            let status = job.status.unwrap_or_default();
            let phase = if status.succeeded.unwrap_or(0) > 0 {
                ClusterJobPhase::Succeeded
            } else if status.failed.unwrap_or(0) > 0 {
                ClusterJobPhase::Failed
            } else if status.active.unwrap_or(0) > 0 {
                ClusterJobPhase::Running
            } else {
                ClusterJobPhase::Pending
            };
            Ok(ClusterJobStatus {
                phase,
                start_time: status.start_time.map(|t| t.0),
                completion_time: status.completion_time.map(|t| t.0),
                pod_name: None,
                exit_code: None,
                error_message: None,
            })
        }

        async fn delete_job(&self, job_name: &str) -> AdapterResult<()> {
            let api: Api<K8sJob> = Api::all(self.client.clone());
            api.delete(job_name, &DeleteParams::background())
                .await
                .map_err(|e| AdapterError::ClusterUnavailable(e.to_string()))?;
            Ok(())
        }

        async fn stream_logs(&self, job_name: &str) -> AdapterResult<Vec<String>> {
            use k8s_openapi::api::core::v1::Pod;
            let pods: Api<Pod> = Api::all(self.client.clone());
            let list = pods
                .list(&kube::api::ListParams::default().labels(&format!("job-name={job_name}")))
                .await
                .map_err(|e| AdapterError::ClusterUnavailable(e.to_string()))?;
            let Some(pod) = list.items.into_iter().next() else {
                return Ok(Vec::new());
            };
            let pod_name = pod.metadata.name.unwrap_or_default();
            let logs = pods
                .logs(&pod_name, &LogParams::default())
                .await
                .map_err(|e| AdapterError::ClusterUnavailable(e.to_string()))?;
            Ok(logs.lines().map(str::to_string).collect())
        }

        async fn list_run_jobs(&self) -> AdapterResult<Vec<JobSummary>> {
            let api: Api<K8sJob> = Api::all(self.client.clone());
            let list = api
                .list(&kube::api::ListParams::default().labels("app=mellea-run"))
                .await
                .map_err(|e| AdapterError::ClusterUnavailable(e.to_string()))?;
            Ok(list
                .items
                .into_iter()
                .filter_map(|job| {
                    let name = job.metadata.name?;
                    let created_at = job.metadata.creation_timestamp.map(|t| t.0)?;
                    Some(JobSummary { name, created_at })
                })
                .collect())
        }
    }
}

pub use kube_runtime::KubeJobRuntime;

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct FakeJob {
        status: ClusterJobStatus,
        logs: Vec<String>,
        created_at: chrono::DateTime<chrono::Utc>,
    }

    /// In-memory [`ClusterJobRuntime`] for tests, gated behind
    /// `test-support` like this crate's other fake adapters.
    #[derive(Clone, Default)]
    pub struct FakeJobRuntime {
        jobs: Arc<Mutex<StdHashMap<String, FakeJob>>>,
    }

    impl FakeJobRuntime {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_status(&self, job_name: &str, status: ClusterJobStatus) {
            let mut jobs = self.jobs.lock();
            let entry = jobs.entry(job_name.to_string()).or_insert_with(|| FakeJob {
                status: status.clone(),
                logs: Vec::new(),
                created_at: chrono::Utc::now(),
            });
            entry.status = status;
        }

        pub fn push_log(&self, job_name: &str, line: impl Into<String>) {
            self.jobs.lock().entry(job_name.to_string()).or_insert_with(|| FakeJob {
                status: ClusterJobStatus {
                    phase: ClusterJobPhase::Pending,
                    start_time: None,
                    completion_time: None,
                    pod_name: None,
                    exit_code: None,
                    error_message: None,
                },
                logs: Vec::new(),
                created_at: chrono::Utc::now(),
            }).logs.push(line.into());
        }

        /// Back-date a job's `created_at` for stale-job-sweep tests.
        pub fn set_created_at(&self, job_name: &str, created_at: chrono::DateTime<chrono::Utc>) {
            if let Some(job) = self.jobs.lock().get_mut(job_name) {
                job.created_at = created_at;
            }
        }

        pub fn job_names(&self) -> Vec<String> {
            self.jobs.lock().keys().cloned().collect()
        }
    }

    #[async_trait]
    impl ClusterJobRuntime for FakeJobRuntime {
        async fn create_job(&self, spec: JobSpec) -> AdapterResult<String> {
            let name = format!("{}-fake", spec.name_prefix);
            self.jobs.lock().insert(
                name.clone(),
                FakeJob {
                    status: ClusterJobStatus {
                        phase: ClusterJobPhase::Pending,
                        start_time: None,
                        completion_time: None,
                        pod_name: Some(format!("{name}-pod")),
                        exit_code: None,
                        error_message: None,
                    },
                    logs: Vec::new(),
                    created_at: chrono::Utc::now(),
                },
            );
            Ok(name)
        }

        async fn get_job_status(&self, job_name: &str) -> AdapterResult<ClusterJobStatus> {
            self.jobs
                .lock()
                .get(job_name)
                .map(|j| j.status.clone())
                .ok_or_else(|| AdapterError::JobNotFound(job_name.to_string()))
        }

        async fn delete_job(&self, job_name: &str) -> AdapterResult<()> {
            self.jobs.lock().remove(job_name);
            Ok(())
        }

        async fn stream_logs(&self, job_name: &str) -> AdapterResult<Vec<String>> {
            Ok(self.jobs.lock().get(job_name).map(|j| j.logs.clone()).unwrap_or_default())
        }

        async fn list_run_jobs(&self) -> AdapterResult<Vec<JobSummary>> {
            Ok(self
                .jobs
                .lock()
                .iter()
                .map(|(name, job)| JobSummary { name: name.clone(), created_at: job.created_at })
                .collect())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeJobRuntime;

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
