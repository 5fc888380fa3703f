//! Built-in job handlers.

mod install;
mod uninstall;

pub use install::InstallHandler;
pub use uninstall::UninstallHandler;
