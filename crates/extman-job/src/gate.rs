//! Single-flight admission of jobs.
//!
//! The gate admits one job at a time: a new job is rejected while the
//! current one has not reached [`JobState::Finished`]. Admission is
//! serialized by a mutex; the admitted job runs on its own thread.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, RwLock};

use crate::error::{JobError, Result};
use crate::job::{Job, JobContext, JobState};
use crate::registry::{HandlerRegistry, JobKind};
use crate::request::JobRequest;

#[derive(Debug)]
pub struct JobGate {
    registry: HandlerRegistry,
    admission: Mutex<()>,
    current: RwLock<Option<Arc<Job>>>,
}

impl JobGate {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            admission: Mutex::new(()),
            current: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// The most recently admitted job, finished or not.
    pub fn current_job(&self) -> Option<Arc<Job>> {
        self.current.read().clone()
    }

    /// Start the job registered as `task`.
    ///
    /// The returned job is already running.
    pub fn execute_job(&self, task: &str, request: JobRequest) -> Result<Arc<Job>> {
        let _admission = self.admission.lock();

        if let Some(current) = self.current_job()
            && current.state() != JobState::Finished
        {
            return Err(JobError::AlreadyRunning {
                task: current.task().to_string(),
                id: current.id(),
            });
        }

        let handler = self
            .registry
            .get(task)
            .ok_or_else(|| JobError::HandlerNotFound(task.to_string()))?;

        let job = Arc::new(Job::new(task, request.clone()));
        job.start();

        let worker = Arc::clone(&job);
        thread::Builder::new()
            .name(format!("extman-job-{task}"))
            .spawn(move || {
                let context = JobContext::new(Arc::clone(&worker));
                let outcome = catch_unwind(AssertUnwindSafe(|| handler.run(&request, &context)));
                let error = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(_) => Some("job handler panicked".to_string()),
                };
                match &error {
                    Some(message) => {
                        tracing::warn!(job = %worker.id(), task = %worker.task(), error = %message, "Job failed")
                    }
                    None => tracing::info!(job = %worker.id(), task = %worker.task(), "Job finished"),
                }
                worker.finish(error);
            })
            .map_err(JobError::Spawn)?;

        tracing::info!(job = %job.id(), task, "Job started");
        *self.current.write() = Some(Arc::clone(&job));
        Ok(job)
    }

    pub fn install(&self, request: JobRequest) -> Result<Arc<Job>> {
        self.execute_job(JobKind::Install.name(), request)
    }

    pub fn uninstall(&self, request: JobRequest) -> Result<Arc<Job>> {
        self.execute_job(JobKind::Uninstall.name(), request)
    }
}
