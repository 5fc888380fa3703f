use uuid::Uuid;

/// Errors raised by the job gate and the built-in jobs.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Another job has not finished yet.
    #[error("job [{task}] ({id}) is already running")]
    AlreadyRunning { task: String, id: Uuid },

    #[error("no job handler registered for [{0}]")]
    HandlerNotFound(String),

    #[error("failed to spawn job thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Extension(#[from] extman_core::Error),

    /// A dependency is neither provided by the core nor stored locally.
    #[error("extension [{extension}] depends on [{dependency}] which can't be found")]
    MissingDependency {
        extension: String,
        dependency: String,
    },
}

pub type Result<T> = std::result::Result<T, JobError>;
