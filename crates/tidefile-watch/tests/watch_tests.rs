use std::fs;
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tempfile::TempDir;
use tidefile_core::Path;
use tidefile_watch::{WatchConfig, WatchError, WatchService};

const WINDOW: Duration = Duration::from_millis(75);
const SETTLE: Duration = Duration::from_millis(400);

type Log = Arc<Mutex<Vec<(Path, Instant)>>>;

fn service() -> WatchService {
    WatchService::new(WatchConfig::builder().debounce(WINDOW).build().unwrap()).unwrap()
}

fn temp_root() -> (TempDir, Path) {
    let dir = TempDir::new().unwrap();
    let root = Path::from(dir.path().canonicalize().unwrap().as_path());
    (dir, root)
}

fn recorder() -> (Log, impl Fn(&Path) + Send + Sync + 'static) {
    let log: Log = Arc::default();
    let sink = log.clone();
    (log, move |dir: &Path| sink.lock().push((dir.clone(), Instant::now())))
}

#[test]
fn test_burst_of_creations_notifies_once() {
    let (dir, root) = temp_root();
    let service = service();
    let (log, listener) = recorder();
    service.register(root.clone(), listener).unwrap();

    let start = Instant::now();
    fs::write(dir.path().join("a"), b"").unwrap();
    sleep(Duration::from_millis(20));
    fs::write(dir.path().join("b"), b"").unwrap();
    sleep(SETTLE);

    let log = log.lock();
    assert_eq!(log.len(), 1, "{log:?}");
    assert_eq!(log[0].0, root);
    assert!(log[0].1.duration_since(start) >= WINDOW);
}

#[test]
fn test_unregister_stops_notifications() {
    let (dir, root) = temp_root();
    let service = service();
    let (log, listener) = recorder();
    let key = service.register(root.clone(), listener).unwrap();

    assert!(service.unregister(key).unwrap());
    assert!(!service.unregister(key).unwrap());
    assert!(service.watched().unwrap().is_empty());

    fs::write(dir.path().join("a"), b"").unwrap();
    sleep(SETTLE);
    assert!(log.lock().is_empty());
}

#[test]
fn test_directory_removal_is_reported() {
    let (dir, root) = temp_root();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let sub = root.child("sub");

    let service = service();
    let (log, listener) = recorder();
    service.register(sub.clone(), listener).unwrap();

    fs::remove_dir(dir.path().join("sub")).unwrap();
    sleep(SETTLE);

    let log = log.lock();
    assert!(!log.is_empty());
    assert!(log.iter().all(|(path, _)| *path == sub));
}

#[test]
fn test_listeners_share_one_watch() {
    let (dir, root) = temp_root();
    let service = service();
    let (first, l1) = recorder();
    let (second, l2) = recorder();
    let k1 = service.register(root.clone(), l1).unwrap();
    service.register(root.clone(), l2).unwrap();
    assert_eq!(service.watched().unwrap(), vec![root.clone()]);

    fs::create_dir(dir.path().join("d")).unwrap();
    sleep(SETTLE);
    assert_eq!(first.lock().len(), 1);
    assert_eq!(second.lock().len(), 1);

    // Dropping one listener keeps the other alive.
    service.unregister(k1).unwrap();
    fs::rename(dir.path().join("d"), dir.path().join("e")).unwrap();
    sleep(SETTLE);
    assert_eq!(first.lock().len(), 1);
    assert_eq!(second.lock().len(), 2);
}

#[test]
fn test_content_changes_are_ignored() {
    let (dir, root) = temp_root();
    let file = dir.path().join("f");
    fs::write(&file, b"one").unwrap();

    let service = service();
    let (log, listener) = recorder();
    service.register(root, listener).unwrap();

    fs::write(&file, b"two").unwrap();
    sleep(SETTLE);
    assert!(log.lock().is_empty(), "{:?}", log.lock());
}

#[test]
fn test_register_rejects_non_directories() {
    let (dir, root) = temp_root();
    fs::write(dir.path().join("f"), b"").unwrap();
    let service = service();

    let err = service.register(root.child("f"), |_: &Path| {}).unwrap_err();
    assert!(matches!(err, WatchError::NotADirectory { .. }));

    let err = service.register(root.child("missing"), |_: &Path| {}).unwrap_err();
    assert!(matches!(err, WatchError::Fs(ref e) if e.is_not_found()));
}
