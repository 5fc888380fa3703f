//! Concurrent access to the shared repository

use std::sync::{Arc, Barrier};
use std::thread;

use extman_core::{
    Extension, ExtensionId, LocalExtensionRepository, MemoryStorage, StaticCoreExtensions,
};

fn repository() -> Arc<LocalExtensionRepository> {
    Arc::new(LocalExtensionRepository::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(StaticCoreExtensions::new()),
    ))
}

#[test]
fn test_concurrent_store_of_same_id_admits_one() {
    let repo = repository();
    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                repo.store_extension(Extension::new(ExtensionId::new("lib", "1.0"), "jar"), false)
                    .is_ok()
            })
        })
        .collect();

    let stored = handles
        .into_iter()
        .map(|handle| handle.join().expect("store thread should not panic"))
        .filter(|ok| *ok)
        .count();
    assert_eq!(stored, 1);
    assert_eq!(repo.versions("lib").len(), 1);
}

#[test]
fn test_concurrent_installs_in_distinct_namespaces() {
    let repo = repository();
    repo.store_extension(Extension::new(ExtensionId::new("lib", "1.0"), "jar"), false)
        .unwrap();

    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));
    let handles: Vec<_> = (0..num_threads)
        .map(|i| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let namespace = format!("wiki{i}");
                repo.install_extension(&ExtensionId::new("lib", "1.0"), Some(&namespace))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("install thread should not panic");
    }

    let lib = repo.resolve(&ExtensionId::new("lib", "1.0")).unwrap();
    assert_eq!(lib.namespaces().unwrap().len(), num_threads);
    for i in 0..num_threads {
        let namespace = format!("wiki{i}");
        assert!(repo.installed_extension("lib", Some(&namespace)).is_some());
    }
}
