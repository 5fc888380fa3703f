//! Local extension repository for the extension manager.
//!
//! This crate tracks which extensions are stored locally, which of them are
//! installed in which namespace, and keeps that state consistent with the
//! extensions' declared dependencies.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use extman_core::{
//!     Extension, ExtensionDependency, ExtensionId, LocalExtensionRepository, MemoryStorage,
//!     StaticCoreExtensions,
//! };
//!
//! let repo = LocalExtensionRepository::new(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(StaticCoreExtensions::new()),
//! );
//! repo.store_extension(Extension::new(ExtensionId::new("lib", "1.0"), "jar"), true)?;
//! repo.store_extension(
//!     Extension::new(ExtensionId::new("app", "1.0"), "jar")
//!         .with_dependency(ExtensionDependency::new("lib")),
//!     false,
//! )?;
//!
//! repo.install_extension(&ExtensionId::new("lib", "1.0"), Some("wiki1"))?;
//! repo.install_extension(&ExtensionId::new("app", "1.0"), Some("wiki1"))?;
//!
//! let dependents = repo.backward_dependencies("lib", Some("wiki1"))?;
//! assert_eq!(dependents[0].id(), &ExtensionId::new("app", "1.0"));
//! # Ok::<(), extman_core::Error>(())
//! ```

pub mod config;
pub mod core_extensions;
pub mod dependency;
pub mod error;
pub mod extension;
pub mod id;
pub mod installed;
pub mod logging;
pub mod repository;
pub mod storage;
pub mod version;

pub use config::{CoreExtensionEntry, ExtensionManagerConfig};
pub use core_extensions::{CoreExtensionRepository, StaticCoreExtensions};
pub use dependency::ExtensionDependency;
pub use error::{Error, Result};
pub use extension::{Extension, ExtensionDescriptor, InstallState, LocalExtension};
pub use id::ExtensionId;
pub use installed::InstalledExtension;
pub use repository::{BackwardDependencies, LocalExtensionRepository, ValidationReport};
pub use storage::{ExtensionStorage, FilesystemStorage, MemoryStorage};
pub use version::{DefaultVersionComparator, Version, VersionComparator, VersionConstraint};
