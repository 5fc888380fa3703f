//! Jobs for the extension manager.
//!
//! [`JobGate`] runs at most one install or uninstall job at a time. Jobs are
//! looked up by name in a [`HandlerRegistry`]; the built-in `install` and
//! `uninstall` handlers act on a shared
//! [`extman_core::LocalExtensionRepository`].

pub mod error;
pub mod gate;
pub mod handler;
pub mod handlers;
pub mod job;
pub mod manager;
pub mod registry;
pub mod request;

pub use error::{JobError, Result};
pub use gate::JobGate;
pub use handler::JobHandler;
pub use handlers::{InstallHandler, UninstallHandler};
pub use job::{Job, JobContext, JobState, JobStatus, LogEntry};
pub use manager::ExtensionManager;
pub use registry::{HandlerRegistry, JobKind};
pub use request::JobRequest;
