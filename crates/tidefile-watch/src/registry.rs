//! Registration table. Lives on the reactor thread only.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};
use tidefile_core::Path;
use tracing::{debug, warn};

use crate::debounce::Debouncer;
use crate::error::WatchError;
use crate::event::affected_dirs;

/// Callback invoked with the directory whose listing may be stale.
pub type Listener = Arc<dyn Fn(&Path) + Send + Sync>;

/// Handle returned by [`WatchService::register`](crate::WatchService::register).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchKey(u64);

impl fmt::Display for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch#{}", self.0)
    }
}

struct DirState {
    listeners: Vec<(WatchKey, Listener)>,
    debouncer: Debouncer,
}

pub(crate) struct Registry {
    watcher: Box<dyn Watcher + Send>,
    window: Duration,
    dirs: HashMap<Path, DirState>,
    keys: HashMap<WatchKey, Path>,
    next_key: u64,
}

impl Registry {
    pub fn new(watcher: Box<dyn Watcher + Send>, window: Duration) -> Self {
        Self {
            watcher,
            window,
            dirs: HashMap::new(),
            keys: HashMap::new(),
            next_key: 1,
        }
    }

    /// Add a listener for `dir`, starting the OS watch if it is the first.
    pub fn register(&mut self, dir: Path, listener: Listener) -> Result<WatchKey, WatchError> {
        if !self.dirs.contains_key(&dir) {
            self.watcher
                .watch(&dir.to_path_buf(), RecursiveMode::NonRecursive)
                .map_err(|err| WatchError::backend(&dir, err))?;
            debug!(path = %dir, "Watch started");
            self.dirs.insert(
                dir.clone(),
                DirState {
                    listeners: Vec::new(),
                    debouncer: Debouncer::new(self.window),
                },
            );
        }

        let key = WatchKey(self.next_key);
        self.next_key += 1;
        if let Some(state) = self.dirs.get_mut(&dir) {
            state.listeners.push((key, listener));
        }
        self.keys.insert(key, dir);
        Ok(key)
    }

    /// Remove a listener. After the last one for a directory the OS watch
    /// is stopped and any pending notification is discarded.
    pub fn unregister(&mut self, key: WatchKey) -> bool {
        let Some(dir) = self.keys.remove(&key) else {
            return false;
        };
        let Some(state) = self.dirs.get_mut(&dir) else {
            return false;
        };
        state.listeners.retain(|(k, _)| *k != key);
        if state.listeners.is_empty() {
            self.dirs.remove(&dir);
            // The directory may already be gone, which also ends the watch.
            if let Err(err) = self.watcher.unwatch(&dir.to_path_buf()) {
                debug!(path = %dir, error = %err, "Unwatch failed");
            }
            debug!(path = %dir, "Watch stopped");
        }
        true
    }

    pub fn on_event(&mut self, event: &notify::Event, now: Instant) {
        for dir in affected_dirs(event, |p| self.dirs.contains_key(p)) {
            if let Some(state) = self.dirs.get_mut(&dir) {
                state.debouncer.record(now);
            }
        }
    }

    pub fn on_error(&self, err: &notify::Error) {
        warn!(error = %err, paths = ?err.paths, "Watch backend error");
    }

    /// The earliest pending firing.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.dirs.values().filter_map(|s| s.debouncer.deadline()).min()
    }

    /// Directories whose window has closed, with the listeners to notify.
    pub fn fire_due(&mut self, now: Instant) -> Vec<(Path, Vec<Listener>)> {
        self.dirs
            .iter_mut()
            .filter_map(|(dir, state)| {
                state.debouncer.fire(now).then(|| {
                    let listeners = state.listeners.iter().map(|(_, l)| l.clone()).collect();
                    (dir.clone(), listeners)
                })
            })
            .collect()
    }

    pub fn watched(&self) -> Vec<Path> {
        let mut dirs: Vec<Path> = self.dirs.keys().cloned().collect();
        dirs.sort();
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use notify::event::{CreateKind, EventKind};
    use notify::{Config, EventHandler, WatcherKind};
    use parking_lot::Mutex;

    /// Records watch calls instead of talking to the OS.
    #[derive(Default, Clone)]
    struct FakeWatcher {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Watcher for FakeWatcher {
        fn new<F: EventHandler>(_handler: F, _config: Config) -> notify::Result<Self> {
            Ok(Self::default())
        }

        fn watch(&mut self, path: &std::path::Path, _mode: RecursiveMode) -> notify::Result<()> {
            self.calls.lock().push(format!("watch {}", path.display()));
            Ok(())
        }

        fn unwatch(&mut self, path: &std::path::Path) -> notify::Result<()> {
            self.calls.lock().push(format!("unwatch {}", path.display()));
            Ok(())
        }

        fn kind() -> WatcherKind {
            WatcherKind::NullWatcher
        }
    }

    fn registry() -> (Registry, Arc<Mutex<Vec<String>>>) {
        let fake = FakeWatcher::default();
        let calls = fake.calls.clone();
        (Registry::new(Box::new(fake), Duration::from_millis(75)), calls)
    }

    fn counter() -> (Listener, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let listener: Listener = Arc::new(move |_: &Path| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (listener, count)
    }

    fn created(path: &str) -> notify::Event {
        notify::Event::new(EventKind::Create(CreateKind::File)).add_path(path.into())
    }

    #[test]
    fn test_one_os_watch_per_directory() {
        let (mut reg, calls) = registry();
        let (l1, _) = counter();
        let (l2, _) = counter();
        let k1 = reg.register(Path::from("/w"), l1).unwrap();
        let k2 = reg.register(Path::from("/w"), l2).unwrap();
        assert_ne!(k1, k2);
        assert_eq!(*calls.lock(), vec!["watch /w"]);

        assert!(reg.unregister(k1));
        assert_eq!(calls.lock().len(), 1);
        assert!(reg.unregister(k2));
        assert_eq!(*calls.lock(), vec!["watch /w", "unwatch /w"]);
        assert!(reg.watched().is_empty());
        assert!(!reg.unregister(k2));
    }

    #[test]
    fn test_burst_fires_every_listener_once() {
        let (mut reg, _) = registry();
        let (l1, c1) = counter();
        let (l2, c2) = counter();
        reg.register(Path::from("/w"), l1).unwrap();
        reg.register(Path::from("/w"), l2).unwrap();

        let t0 = Instant::now();
        reg.on_event(&created("/w/a"), t0);
        reg.on_event(&created("/w/b"), t0 + Duration::from_millis(50));
        assert_eq!(reg.next_deadline(), Some(t0 + Duration::from_millis(75)));
        assert!(reg.fire_due(t0 + Duration::from_millis(60)).is_empty());

        let due = reg.fire_due(t0 + Duration::from_millis(75));
        assert_eq!(due.len(), 1);
        for (dir, listeners) in due {
            assert_eq!(dir, Path::from("/w"));
            listeners.iter().for_each(|l| l(&dir));
        }
        assert_eq!(c1.load(Ordering::SeqCst), 1);
        assert_eq!(c2.load(Ordering::SeqCst), 1);
        assert!(reg.next_deadline().is_none());
    }

    #[test]
    fn test_unregister_discards_pending() {
        let (mut reg, _) = registry();
        let (l, _) = counter();
        let key = reg.register(Path::from("/w"), l).unwrap();
        let t0 = Instant::now();
        reg.on_event(&created("/w/a"), t0);
        reg.unregister(key);

        assert!(reg.next_deadline().is_none());
        reg.on_event(&created("/w/b"), t0);
        assert!(reg.fire_due(t0 + Duration::from_secs(1)).is_empty());
    }
}
