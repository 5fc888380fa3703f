//! Filesystem primitives for the extension manager.
//!
//! Provides normalized paths, locked atomic writes for extension descriptors,
//! and format-agnostic configuration loading.

pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use config::{ConfigStore, Format};
pub use error::{Error, Result};
pub use path::{NormalizedPath, encode_segment};
