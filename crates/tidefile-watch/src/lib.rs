//! Debounced directory watching for tidefile.
//!
//! A [`WatchService`] keeps one OS watch per directory, however many
//! listeners are registered on it, and turns bursts of listing changes
//! into single notifications.
//!
//! # Example
//!
//! ```no_run
//! use tidefile_watch::{WatchConfig, WatchService};
//!
//! let service = WatchService::new(WatchConfig::default())?;
//! let key = service.register("/tmp", |dir| println!("{dir} changed"))?;
//! // ...
//! service.unregister(key)?;
//! # Ok::<(), tidefile_watch::WatchError>(())
//! ```

mod config;
mod debounce;
mod error;
mod event;
mod registry;
mod service;

pub use config::{WatchConfig, WatchConfigBuilder, WatchConfigBuilderError};
pub use debounce::Debouncer;
pub use error::WatchError;
pub use registry::{Listener, WatchKey};
pub use service::WatchService;
