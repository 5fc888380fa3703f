//! Job handles and their status.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use uuid::Uuid;

use crate::request::JobRequest;

/// Lifecycle of a job. A job never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Running,
    Finished,
}

/// A progress message emitted by a running job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Snapshot of a job's progress.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub state: JobState,
    pub request: JobRequest,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set when the job finished with an error.
    pub error: Option<String>,
    pub log: Vec<LogEntry>,
}

impl JobStatus {
    fn new(request: JobRequest) -> Self {
        Self {
            state: JobState::Waiting,
            request,
            started_at: None,
            finished_at: None,
            error: None,
            log: Vec::new(),
        }
    }

    /// Whether the job finished without error.
    pub fn succeeded(&self) -> bool {
        self.state == JobState::Finished && self.error.is_none()
    }

    /// Log messages in emission order.
    pub fn messages(&self) -> Vec<&str> {
        self.log.iter().map(|entry| entry.message.as_str()).collect()
    }
}

/// Handle to a job admitted by the gate.
#[derive(Debug)]
pub struct Job {
    id: Uuid,
    task: String,
    status: Mutex<JobStatus>,
    finished: Condvar,
}

impl Job {
    pub(crate) fn new(task: &str, request: JobRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            task: task.to_string(),
            status: Mutex::new(JobStatus::new(request)),
            finished: Condvar::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name of the handler running this job.
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn request(&self) -> JobRequest {
        self.status.lock().request.clone()
    }

    pub fn status(&self) -> JobStatus {
        self.status.lock().clone()
    }

    pub fn state(&self) -> JobState {
        self.status.lock().state
    }

    pub fn is_finished(&self) -> bool {
        self.state() == JobState::Finished
    }

    /// Block until the job is finished and return its final status.
    pub fn wait(&self) -> JobStatus {
        let mut status = self.status.lock();
        while status.state != JobState::Finished {
            self.finished.wait(&mut status);
        }
        status.clone()
    }

    /// Like [`Job::wait`], giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<JobStatus> {
        let deadline = Instant::now() + timeout;
        let mut status = self.status.lock();
        while status.state != JobState::Finished {
            if self.finished.wait_until(&mut status, deadline).timed_out() {
                break;
            }
        }
        (status.state == JobState::Finished).then(|| status.clone())
    }

    pub(crate) fn start(&self) {
        let mut status = self.status.lock();
        status.state = JobState::Running;
        status.started_at = Some(Utc::now());
    }

    pub(crate) fn log(&self, message: String) {
        self.status.lock().log.push(LogEntry {
            at: Utc::now(),
            message,
        });
    }

    pub(crate) fn finish(&self, error: Option<String>) {
        let mut status = self.status.lock();
        status.state = JobState::Finished;
        status.finished_at = Some(Utc::now());
        status.error = error;
        self.finished.notify_all();
    }
}

/// What a running handler can see of its job.
#[derive(Debug, Clone)]
pub struct JobContext {
    job: Arc<Job>,
}

impl JobContext {
    pub(crate) fn new(job: Arc<Job>) -> Self {
        Self { job }
    }

    pub fn job_id(&self) -> Uuid {
        self.job.id()
    }

    /// Record a progress message in the job status.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(job = %self.job.id(), task = %self.job.task(), "{message}");
        self.job.log(message);
    }
}
