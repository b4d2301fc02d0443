//! Actor system for creating actors and managing their lifecycles.
//!
//! The ActorSystem binds every actor it creates to one shared scheduler and
//! keeps a registry of them for system-wide shutdown. The registry is a
//! sharded concurrent map: creating actors never waits on a global lock,
//! and `shutdown` closes a snapshot of the registry taken when the sweep
//! starts. An actor registered while the sweep is running is closed by its
//! own `create` call, which observes the stopped flag after inserting.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hive_core::error::{ActorError, ConfigError, Result};
use hive_core::id::ActorId;
use hive_core::traits::TaskScheduler;
use hive_core::utils::LogLevel;

use super::behavior::Behavior;
use super::dispatch::{Actor, ActorRef, ActorState};
use super::mailbox::{FifoMailbox, Mailbox};
use super::message::Envelope;
use crate::pool::thread::{ThreadPool, ThreadPoolConfig, ThreadPoolStats};

/// Batch quota used when neither the system config nor the actor options
/// name one.
pub const DEFAULT_BATCH_QUOTA: usize = 10;

/// Configuration for the actor system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Number of worker threads in the shared pool
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Batch quota for actors that do not set their own
    #[serde(default = "default_batch_quota")]
    pub default_batch_quota: usize,

    /// Name prefix for worker threads
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,

    /// Log level for binaries embedding the system
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_worker_threads() -> usize {
    num_cpus::get()
}

fn default_batch_quota() -> usize {
    DEFAULT_BATCH_QUOTA
}

fn default_thread_name_prefix() -> String {
    "hive-worker".to_string()
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            default_batch_quota: default_batch_quota(),
            thread_name_prefix: default_thread_name_prefix(),
            log_level: LogLevel::default(),
        }
    }
}

impl SystemConfig {
    /// Check that the configuration can be used to build a system.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::InvalidWorkerThreads);
        }
        if self.default_batch_quota == 0 {
            return Err(ConfigError::InvalidBatchQuota);
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing fields take defaults.
    pub fn from_toml_str(source: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(source).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&source)?)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> std::result::Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }
}

/// Per-actor options for [`ActorSystem::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorOptions {
    /// Explicit id; generated when `None`
    pub id: Option<ActorId>,

    /// Bounded mailbox capacity; unbounded when `None`
    pub mailbox_capacity: Option<usize>,

    /// Messages per drain pass; the system default when `None`
    pub batch_quota: Option<usize>,
}

impl ActorOptions {
    /// Options with every field defaulted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit actor id.
    pub fn with_id(mut self, id: impl Into<ActorId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Bound the mailbox to `capacity` queued messages.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = Some(capacity);
        self
    }

    /// Set the batch quota.
    pub fn with_batch_quota(mut self, quota: usize) -> Self {
        self.batch_quota = Some(quota);
        self
    }
}

/// The central actor system that creates and tracks actors
pub struct ActorSystem {
    /// Registry of all actors created by this system
    registry: DashMap<ActorId, Arc<dyn ActorRef>>,
    /// Scheduler shared by every actor
    scheduler: Arc<dyn TaskScheduler>,
    /// The pool behind `scheduler`, when this system built it
    pool: Option<Arc<ThreadPool>>,
    /// Quota for actors that do not set one
    default_batch_quota: usize,
    /// Set once by `shutdown`
    stopped: AtomicBool,
}

impl ActorSystem {
    /// Create an actor system with the default configuration
    pub fn new() -> Self {
        let config = SystemConfig::default();
        Self::from_pool(
            ThreadPool::with_config(Self::pool_config(&config)),
            config.default_batch_quota,
        )
    }

    /// Create an actor system with its own worker pool
    pub fn with_config(config: SystemConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_pool(
            ThreadPool::with_config(Self::pool_config(&config)),
            config.default_batch_quota,
        ))
    }

    /// Create an actor system on top of a caller-supplied scheduler.
    ///
    /// The scheduler is not shut down with the system.
    pub fn with_scheduler(
        scheduler: Arc<dyn TaskScheduler>,
        default_batch_quota: usize,
    ) -> std::result::Result<Self, ConfigError> {
        if default_batch_quota == 0 {
            return Err(ConfigError::InvalidBatchQuota);
        }

        info!(
            "Creating actor system on external scheduler (default batch quota {})",
            default_batch_quota
        );

        Ok(Self {
            registry: DashMap::new(),
            scheduler,
            pool: None,
            default_batch_quota,
            stopped: AtomicBool::new(false),
        })
    }

    fn pool_config(config: &SystemConfig) -> ThreadPoolConfig {
        ThreadPoolConfig {
            queue_size: None,
            max_threads: config.worker_threads,
            thread_name_prefix: config.thread_name_prefix.clone(),
            collect_stats: true,
        }
    }

    fn from_pool(pool: ThreadPool, default_batch_quota: usize) -> Self {
        info!(
            "Creating actor system with {} worker threads (default batch quota {})",
            pool.worker_count(),
            default_batch_quota
        );

        let pool = Arc::new(pool);
        Self {
            registry: DashMap::new(),
            scheduler: pool.clone(),
            pool: Some(pool),
            default_batch_quota,
            stopped: AtomicBool::new(false),
        }
    }

    /// Create an actor with the default FIFO mailbox.
    pub fn create<T, R, B>(&self, behavior: B, options: ActorOptions) -> Result<Actor<T, R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        B: Behavior<T, R>,
    {
        let mailbox = match options.mailbox_capacity {
            Some(capacity) => FifoMailbox::bounded(capacity)?,
            None => FifoMailbox::unbounded(),
        };
        self.create_with_mailbox(behavior, options, mailbox)
    }

    /// Create an actor with a caller-supplied mailbox.
    ///
    /// `options.mailbox_capacity` is ignored; the mailbox decides its own
    /// capacity.
    pub fn create_with_mailbox<T, R, B, M>(
        &self,
        behavior: B,
        options: ActorOptions,
        mailbox: M,
    ) -> Result<Actor<T, R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        B: Behavior<T, R>,
        M: Mailbox<Envelope<T, R>> + 'static,
    {
        if !self.is_running() {
            return Err(ActorError::SystemStopped.into());
        }

        let batch_quota = options.batch_quota.unwrap_or(self.default_batch_quota);
        if batch_quota == 0 {
            return Err(ConfigError::InvalidBatchQuota.into());
        }

        let id = options.id.unwrap_or_else(ActorId::generate);

        let actor = match self.registry.entry(id) {
            Entry::Occupied(entry) => {
                return Err(ConfigError::DuplicateActorId(entry.key().clone()).into());
            }
            Entry::Vacant(entry) => {
                let actor = Actor::new(
                    entry.key().clone(),
                    Box::new(behavior),
                    Box::new(mailbox),
                    batch_quota,
                    Arc::clone(&self.scheduler),
                );
                entry.insert(actor.as_ref_handle());
                actor
            }
        };

        debug!(
            "Registered actor: {} (batch quota {})",
            actor.id(),
            batch_quota
        );

        // Shutdown may have taken its snapshot before this insert
        if !self.is_running() {
            let _ = actor.close();
            return Err(ActorError::SystemStopped.into());
        }

        Ok(actor)
    }

    /// Close a single actor by id.
    pub fn close_actor(&self, id: &ActorId) -> std::result::Result<(), ActorError> {
        let actor = self
            .registry
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ActorError::NotFound(id.clone()))?;
        actor.close()
    }

    /// Get the state of a registered actor
    pub fn state_of(&self, id: &ActorId) -> Option<ActorState> {
        self.registry.get(id).map(|entry| entry.value().state())
    }

    /// Get the number of registered actors
    pub fn actor_count(&self) -> usize {
        self.registry.len()
    }

    /// Ids of all registered actors, in no particular order
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.registry.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Total messages queued across all actors
    pub fn pending_messages(&self) -> usize {
        self.registry
            .iter()
            .map(|entry| entry.value().pending())
            .sum()
    }

    /// Quota for actors that do not set one
    pub fn default_batch_quota(&self) -> usize {
        self.default_batch_quota
    }

    /// Whether `shutdown` has not been called yet
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
    }

    /// Statistics of the worker pool, when this system owns one
    pub fn pool_stats(&self) -> Option<ThreadPoolStats> {
        self.pool.as_ref().map(|pool| pool.get_stats())
    }

    /// Shut down the actor system.
    ///
    /// Closes every registered actor, then stops the worker pool if this
    /// system built it. Close failures are logged and do not stop the
    /// sweep. Calling this again only logs a warning.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            warn!("Shutdown is already in progress");
            return;
        }

        info!("Shutting down actor system");

        let actors: Vec<Arc<dyn ActorRef>> = self
            .registry
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for actor in actors {
            debug!("Stopping actor: {}", actor.id());
            if let Err(e) = actor.close() {
                warn!("Failed to close actor {}: {}", actor.id(), e);
            }
        }

        if let Some(pool) = &self.pool {
            pool.shutdown();
        }

        info!("Actor system shutdown complete");
    }
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ActorSystem {
    fn drop(&mut self) {
        if self.is_running() {
            self.shutdown();
        }
    }
}
