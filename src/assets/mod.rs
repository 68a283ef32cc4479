//! Lazily populated, keyed caches of loaded content.
//!
//! An [`AssetRegistry`] hands fetches to a host-supplied [`AssetLoader`]
//! running on bevy's IO task pool and polls them from the tick thread.
//! Screens gate user actions on [`AssetRegistry::is_ready`]; nothing in
//! here ever blocks waiting for a fetch.

use bevy::log::{debug, info, warn};
use bevy::tasks::{block_on, futures_lite::future, IoTaskPool, Task, TaskPool};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::config::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetFetchError {
    #[error("no asset named '{0}'")]
    NotFound(String),
    #[error("i/o error loading '{key}': {message}")]
    Io { key: String, message: String },
    #[error("could not parse '{key}': {message}")]
    Parse { key: String, message: String },
}

pub type FetchResult<T> = Result<T, AssetFetchError>;
pub type FetchFuture<T> = Pin<Box<dyn Future<Output = FetchResult<T>> + Send + 'static>>;

/// Host-side source of asset data (bundles, network, disk).
///
/// The returned future must eventually resolve; a fetch that can never
/// succeed should resolve to an error rather than stay pending.
pub trait AssetLoader<T>: Send + Sync + 'static {
    fn fetch(&self, key: &str) -> FetchFuture<T>;
}

/// Externally visible lifecycle of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

enum Entry<T> {
    Loading {
        task: Task<FetchResult<T>>,
        attempt: u32,
    },
    /// A failed attempt waiting for its retry slot. Reported as `Loading`.
    Backoff {
        attempt: u32,
        wait_secs: f32,
        last_error: AssetFetchError,
    },
    Ready(T),
    Failed(AssetFetchError),
}

impl<T> Entry<T> {
    fn status(&self) -> AssetStatus {
        match self {
            Entry::Loading { .. } | Entry::Backoff { .. } => AssetStatus::Loading,
            Entry::Ready(_) => AssetStatus::Ready,
            Entry::Failed(_) => AssetStatus::Failed,
        }
    }
}

fn io_pool() -> &'static IoTaskPool {
    IoTaskPool::get_or_init(TaskPool::new)
}

pub struct AssetRegistry<T> {
    label: &'static str,
    loader: Arc<dyn AssetLoader<T>>,
    retry: RetryPolicy,
    entries: HashMap<String, Entry<T>>,
}

impl<T: Send + Sync + 'static> AssetRegistry<T> {
    pub fn new(label: &'static str, loader: Arc<dyn AssetLoader<T>>, retry: RetryPolicy) -> Self {
        Self {
            label,
            loader,
            retry,
            entries: HashMap::new(),
        }
    }

    /// Starts loading `key` unless an entry already exists.
    ///
    /// At most one fetch is ever in flight per key: a second request while
    /// loading just reports `Loading`, and ready or failed entries are
    /// returned as-is until evicted.
    pub fn request(&mut self, key: &str) -> AssetStatus {
        if let Some(entry) = self.entries.get(key) {
            return entry.status();
        }
        debug!("[Assets] {}: fetching '{}'", self.label, key);
        let task = io_pool().spawn(self.loader.fetch(key));
        self.entries
            .insert(key.to_string(), Entry::Loading { task, attempt: 1 });
        AssetStatus::Loading
    }

    pub fn status(&self, key: &str) -> AssetStatus {
        self.entries
            .get(key)
            .map_or(AssetStatus::Unloaded, Entry::status)
    }

    pub fn is_ready(&self, key: &str) -> bool {
        self.status(key) == AssetStatus::Ready
    }

    pub fn try_get(&self, key: &str) -> Option<&T> {
        match self.entries.get(key) {
            Some(Entry::Ready(value)) => Some(value),
            _ => None,
        }
    }

    /// The terminal error for a failed key.
    pub fn failure(&self, key: &str) -> Option<&AssetFetchError> {
        match self.entries.get(key) {
            Some(Entry::Failed(err)) => Some(err),
            _ => None,
        }
    }

    /// Drops the entry for `key`, cancelling any fetch still in flight.
    /// The next `request` starts from scratch.
    pub fn evict(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            info!("[Assets] {}: evicted '{}'", self.label, key);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Polls in-flight fetches and advances retry timers. Called once per
    /// tick with the unscaled frame delta.
    pub fn update(&mut self, delta_secs: f32) {
        let Self {
            label,
            loader,
            retry,
            entries,
        } = self;

        for (key, entry) in entries.iter_mut() {
            let next = match entry {
                Entry::Loading { task, attempt } => {
                    match block_on(future::poll_once(task)) {
                        None => None,
                        Some(Ok(value)) => {
                            info!("[Assets] {}: '{}' ready", label, key);
                            Some(Entry::Ready(value))
                        }
                        Some(Err(err)) if retry.allows_attempt(*attempt + 1) => {
                            warn!(
                                "[Assets] {}: attempt {} for '{}' failed ({}), retrying in {}s",
                                label, attempt, key, err, retry.interval_secs
                            );
                            Some(Entry::Backoff {
                                attempt: *attempt,
                                wait_secs: retry.interval_secs,
                                last_error: err,
                            })
                        }
                        Some(Err(err)) => {
                            warn!("[Assets] {}: '{}' failed: {}", label, key, err);
                            Some(Entry::Failed(err))
                        }
                    }
                }
                Entry::Backoff {
                    attempt,
                    wait_secs,
                    last_error,
                } => {
                    *wait_secs -= delta_secs;
                    if *wait_secs > 0.0 {
                        None
                    } else {
                        debug!(
                            "[Assets] {}: retrying '{}' after: {}",
                            label, key, last_error
                        );
                        let task = io_pool().spawn(loader.fetch(key));
                        Some(Entry::Loading {
                            task,
                            attempt: *attempt + 1,
                        })
                    }
                }
                Entry::Ready(_) | Entry::Failed(_) => None,
            };

            if let Some(next) = next {
                *entry = next;
            }
        }
    }
}
