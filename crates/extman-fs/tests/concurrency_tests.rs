//! Concurrent descriptor writes through write_atomic

use extman_fs::{NormalizedPath, io};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

#[test]
fn test_concurrent_writes_never_interleave() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("app-1.0.toml");
    let path = Arc::new(NormalizedPath::new(&file_path));

    let num_threads = 8;
    let writes_per_thread = 10;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..writes_per_thread {
                    let content = format!("writer = \"{thread_id}:{i}\"\n");
                    io::write_text(&path, &content).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread should not panic");
    }

    let content = std::fs::read_to_string(&file_path).unwrap();
    assert!(content.starts_with("writer = \""), "unexpected content: {content}");
    assert_eq!(content.matches("writer").count(), 1, "interleaved: {content}");
}
