//! Built-in install and uninstall jobs

use std::sync::Arc;

use extman_core::{
    Extension, ExtensionDependency, ExtensionId, ExtensionManagerConfig,
    LocalExtensionRepository, MemoryStorage, StaticCoreExtensions,
};
use extman_job::{ExtensionManager, JobRequest, JobStatus};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn id(value: &str) -> ExtensionId {
    ExtensionId::parse(value).unwrap()
}

fn manager() -> ExtensionManager {
    let core = StaticCoreExtensions::with_extensions([id("platform:2.0")]);
    let repository = LocalExtensionRepository::new(Arc::new(MemoryStorage::new()), Arc::new(core));
    ExtensionManager::with_repository(Arc::new(repository))
}

fn store(manager: &ExtensionManager, extension: Extension) {
    manager
        .repository()
        .store_extension(extension, false)
        .unwrap();
}

fn install(manager: &ExtensionManager, request: JobRequest) -> JobStatus {
    manager.install(request).unwrap().wait()
}

fn uninstall(manager: &ExtensionManager, request: JobRequest) -> JobStatus {
    manager.uninstall(request).unwrap().wait()
}

#[test]
fn test_install_job_installs_dependencies_first() {
    let manager = manager();
    store(&manager, Extension::new(id("lib:1.0"), "jar"));
    store(&manager, Extension::new(id("lib:2.0"), "jar"));
    store(
        &manager,
        Extension::new(id("app:1.0"), "jar")
            .with_dependency(ExtensionDependency::new("lib"))
            .with_dependency(ExtensionDependency::new("platform")),
    );

    let status = install(
        &manager,
        JobRequest::new()
            .with_extension(id("app:1.0"))
            .with_namespace("wiki1"),
    );

    assert!(status.succeeded(), "{:?}", status.error);
    assert_eq!(
        status.messages(),
        vec![
            "Installed lib/2.0 in namespace wiki1",
            "Installed app/1.0 in namespace wiki1",
        ]
    );

    let repo = manager.repository();
    let lib = repo.installed_extension("lib", Some("wiki1")).unwrap();
    assert_eq!(lib.id(), &id("lib:2.0"));
    let dependents = repo.backward_dependencies("lib", Some("wiki1")).unwrap();
    assert_eq!(dependents.len(), 1);
    assert_eq!(dependents[0].id(), &id("app:1.0"));
    assert!(repo.installed_extension("lib", None).is_none());
}

#[test]
fn test_install_job_honors_dependency_constraint() {
    let manager = manager();
    store(&manager, Extension::new(id("lib:1.0"), "jar"));
    store(&manager, Extension::new(id("lib:2.0"), "jar"));
    store(
        &manager,
        Extension::new(id("app:1.0"), "jar")
            .with_dependency(ExtensionDependency::with_constraint("lib", ">=1.0, <2.0").unwrap()),
    );

    let status = install(&manager, JobRequest::new().with_extension(id("app:1.0")));

    assert!(status.succeeded(), "{:?}", status.error);
    assert_eq!(status.messages(), vec!["Installed lib/1.0", "Installed app/1.0"]);
    assert!(!manager.repository().resolve(&id("lib:2.0")).unwrap().is_installed(None));
}

#[test]
fn test_install_job_skips_satisfied_dependency() {
    let manager = manager();
    store(&manager, Extension::new(id("lib:1.0"), "jar"));
    store(
        &manager,
        Extension::new(id("app:1.0"), "jar").with_dependency(ExtensionDependency::new("lib")),
    );
    manager
        .repository()
        .install_extension(&id("lib:1.0"), None)
        .unwrap();

    let status = install(&manager, JobRequest::new().with_extension(id("app:1.0")));

    assert!(status.succeeded());
    assert_eq!(status.messages(), vec!["Installed app/1.0"]);
}

#[test]
fn test_install_job_reports_already_installed() {
    let manager = manager();
    store(&manager, Extension::new(id("lib:1.0"), "jar"));
    let request = JobRequest::new().with_extension(id("lib:1.0"));

    assert!(install(&manager, request.clone()).succeeded());
    let status = install(&manager, request);

    assert!(status.succeeded());
    assert_eq!(status.messages(), vec!["Extension lib/1.0 is already installed"]);
}

#[test]
fn test_install_job_fails_on_missing_dependency() {
    let manager = manager();
    store(
        &manager,
        Extension::new(id("app:1.0"), "jar").with_dependency(ExtensionDependency::new("ghost")),
    );

    let status = install(&manager, JobRequest::new().with_extension(id("app:1.0")));

    let error = status.error.clone().expect("job should fail");
    assert!(error.contains("ghost"), "{error}");
    assert!(status.messages().is_empty());
    assert!(manager.repository().installed_extension("app", None).is_none());
}

#[test]
fn test_install_job_rejects_unknown_extension() {
    let manager = manager();
    let status = install(&manager, JobRequest::new().with_extension(id("nope:1.0")));
    assert!(status.error.is_some());
}

#[test]
fn test_uninstall_job_removes_dependents_first() {
    let manager = manager();
    store(&manager, Extension::new(id("lib:1.0"), "jar"));
    store(
        &manager,
        Extension::new(id("app:1.0"), "jar").with_dependency(ExtensionDependency::new("lib")),
    );
    store(
        &manager,
        Extension::new(id("tool:1.0"), "jar").with_dependency(ExtensionDependency::new("app")),
    );
    assert!(install(&manager, JobRequest::new().with_extension(id("tool:1.0"))).succeeded());

    let status = uninstall(&manager, JobRequest::new().with_extension(id("lib:1.0")));

    assert!(status.succeeded(), "{:?}", status.error);
    assert_eq!(
        status.messages(),
        vec![
            "Uninstalled tool/1.0",
            "Uninstalled app/1.0",
            "Uninstalled lib/1.0",
        ]
    );
    assert!(manager.repository().installed_extensions().is_empty());
}

#[test]
fn test_uninstall_job_is_scoped_to_namespace() {
    let manager = manager();
    store(&manager, Extension::new(id("lib:1.0"), "jar"));
    let both = JobRequest::new()
        .with_extension(id("lib:1.0"))
        .with_namespace("wiki1")
        .with_namespace("wiki2");
    assert!(install(&manager, both).succeeded());

    let status = uninstall(
        &manager,
        JobRequest::new()
            .with_extension(id("lib:1.0"))
            .with_namespace("wiki1"),
    );

    assert!(status.succeeded(), "{:?}", status.error);
    assert_eq!(status.messages(), vec!["Uninstalled lib/1.0 from namespace wiki1"]);
    let lib = manager.repository().resolve(&id("lib:1.0")).unwrap();
    assert!(!lib.is_installed(Some("wiki1")));
    assert!(lib.is_installed(Some("wiki2")));
}

#[test]
fn test_uninstall_job_fails_when_not_installed() {
    let manager = manager();
    store(&manager, Extension::new(id("lib:1.0"), "jar"));

    let status = uninstall(&manager, JobRequest::new().with_extension(id("lib:1.0")));

    assert!(status.error.is_some());
}

#[test]
fn test_manager_opened_from_config_persists_installs() {
    let dir = TempDir::new().unwrap();
    let config = ExtensionManagerConfig::new(dir.path().join("repository"))
        .with_core_extension("platform", "2.0");
    let config_path = dir.path().join("extman.toml");
    config.save(&config_path).unwrap();

    let loaded = ExtensionManagerConfig::load(&config_path).unwrap();
    let manager = ExtensionManager::open(&loaded).unwrap();
    store(
        &manager,
        Extension::new(id("app:1.0"), "jar").with_dependency(ExtensionDependency::new("platform")),
    );
    let status = install(
        &manager,
        JobRequest::new()
            .with_extension(id("app:1.0"))
            .with_namespace("wiki1"),
    );
    assert!(status.succeeded(), "{:?}", status.error);
    drop(manager);

    let reopened = ExtensionManager::open(&loaded).unwrap();
    let app = reopened.repository().resolve(&id("app:1.0")).unwrap();
    assert!(app.is_installed(Some("wiki1")));
    assert!(
        reopened
            .repository()
            .installed_extension("app", Some("wiki1"))
            .is_some()
    );
}
