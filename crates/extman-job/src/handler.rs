use std::fmt::Debug;

use crate::error::Result;
use crate::job::JobContext;
use crate::request::JobRequest;

/// Work executed by the gate on a job thread.
pub trait JobHandler: Send + Sync + Debug {
    fn run(&self, request: &JobRequest, context: &JobContext) -> Result<()>;
}
