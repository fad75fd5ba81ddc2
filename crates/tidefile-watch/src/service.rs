//! The watch service and its reactor thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, after, bounded, never, select, unbounded};
use notify::{PollWatcher, Watcher};
use tidefile_core::{FsError, Path, stat};
use tracing::{debug, error, info};

use crate::config::WatchConfig;
use crate::error::WatchError;
use crate::registry::{Listener, Registry, WatchKey};

enum Command {
    Register {
        dir: Path,
        listener: Listener,
        reply: Sender<Result<WatchKey, WatchError>>,
    },
    Unregister {
        key: WatchKey,
        reply: Sender<bool>,
    },
    Watched {
        reply: Sender<Vec<Path>>,
    },
    Shutdown,
}

/// Debounced, non-recursive directory watching.
///
/// Each registration names a directory and a listener. Changes to the
/// directory's listing (entries created, removed or renamed, or the
/// directory itself removed or renamed) are coalesced per directory and
/// delivered at most once per debounce window. Content changes of the
/// entries are not reported.
///
/// Listeners run on the service's reactor thread. They must return
/// quickly and must not call back into the service, or the reactor will
/// deadlock waiting on itself.
pub struct WatchService {
    cmd_tx: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl WatchService {
    /// Start the reactor thread and the OS watch backend.
    pub fn new(config: WatchConfig) -> Result<Self, WatchError> {
        let (raw_tx, raw_rx) = unbounded::<notify::Result<notify::Event>>();
        let handler = move |res| {
            let _ = raw_tx.send(res);
        };

        let watcher: Box<dyn Watcher + Send> = match config.poll_interval {
            Some(interval) => {
                let poll = notify::Config::default().with_poll_interval(interval);
                Box::new(
                    PollWatcher::new(handler, poll)
                        .map_err(|err| WatchError::backend(&Path::root(), err))?,
                )
            }
            None => Box::new(
                notify::recommended_watcher(handler)
                    .map_err(|err| WatchError::backend(&Path::root(), err))?,
            ),
        };

        let registry = Registry::new(watcher, config.debounce);
        let (cmd_tx, cmd_rx) = unbounded();
        let thread = thread::Builder::new()
            .name("tidefile-watch".to_string())
            .spawn(move || reactor(registry, cmd_rx, raw_rx))
            .map_err(|err| WatchError::Backend {
                path: Path::root(),
                message: err.to_string(),
            })?;

        info!(debounce = ?config.debounce, poll = ?config.poll_interval, "Watch service started");
        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    /// Watch `dir` and call `listener` when its listing changes.
    ///
    /// Relative paths are resolved against the working directory. Several
    /// listeners on one directory share a single OS watch.
    pub fn register<F>(&self, dir: impl Into<Path>, listener: F) -> Result<WatchKey, WatchError>
    where
        F: Fn(&Path) + Send + Sync + 'static,
    {
        let dir: Path = dir.into();
        let dir = dir
            .to_absolute()
            .map_err(|err| FsError::io(dir.clone(), &err))?
            .normalize();
        if !stat(&dir)?.is_dir() {
            return Err(WatchError::NotADirectory { path: dir });
        }

        let (reply, rx) = bounded(1);
        self.send(Command::Register {
            dir,
            listener: Arc::new(listener),
            reply,
        })?;
        rx.recv().map_err(|_| WatchError::Shutdown)?
    }

    /// Remove a registration. Returns `false` if the key was unknown.
    pub fn unregister(&self, key: WatchKey) -> Result<bool, WatchError> {
        let (reply, rx) = bounded(1);
        self.send(Command::Unregister { key, reply })?;
        rx.recv().map_err(|_| WatchError::Shutdown)
    }

    /// Directories currently under watch, sorted.
    pub fn watched(&self) -> Result<Vec<Path>, WatchError> {
        let (reply, rx) = bounded(1);
        self.send(Command::Watched { reply })?;
        rx.recv().map_err(|_| WatchError::Shutdown)
    }

    fn send(&self, cmd: Command) -> Result<(), WatchError> {
        self.cmd_tx.send(cmd).map_err(|_| WatchError::Shutdown)
    }
}

impl Drop for WatchService {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!("Watch reactor panicked");
        }
    }
}

fn reactor(
    mut registry: Registry,
    cmd_rx: Receiver<Command>,
    raw_rx: Receiver<notify::Result<notify::Event>>,
) {
    loop {
        let timeout = match registry.next_deadline() {
            Some(deadline) => after(deadline.saturating_duration_since(Instant::now())),
            None => never(),
        };

        select! {
            recv(cmd_rx) -> cmd => match cmd {
                Ok(Command::Register { dir, listener, reply }) => {
                    let _ = reply.send(registry.register(dir, listener));
                }
                Ok(Command::Unregister { key, reply }) => {
                    let _ = reply.send(registry.unregister(key));
                }
                Ok(Command::Watched { reply }) => {
                    let _ = reply.send(registry.watched());
                }
                Ok(Command::Shutdown) | Err(_) => break,
            },
            recv(raw_rx) -> raw => match raw {
                Ok(Ok(event)) => registry.on_event(&event, Instant::now()),
                Ok(Err(err)) => registry.on_error(&err),
                // Backend dropped; only commands remain.
                Err(_) => {}
            },
            recv(timeout) -> _ => {}
        }

        for (dir, listeners) in registry.fire_due(Instant::now()) {
            debug!(path = %dir, listeners = listeners.len(), "Directory changed");
            for listener in listeners {
                listener(&dir);
            }
        }
    }
    debug!("Watch reactor stopped");
}
