//! Shared application state: storage handle, external host handle, lock
//! registry, and the SSE broadcast hub.

pub mod locks;
mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    dao::game_store::GameStore,
    error::ServiceError,
    host::GameHost,
    state::locks::LockRegistry,
};

pub use self::sse::SseHub;

/// Cheaply clonable handle on [`AppState`].
pub type SharedState = Arc<AppState>;

/// Central application state shared by routes, services, and supervisors.
pub struct AppState {
    config: AppConfig,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    host: Arc<dyn GameHost>,
    events: SseHub,
    locks: LockRegistry,
    degraded: watch::Sender<bool>,
    host_healthy: watch::Sender<bool>,
    shutdown: CancellationToken,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`].
    ///
    /// The application starts in degraded mode until a storage backend is
    /// installed, and assumes the external host is unreachable until the host
    /// supervisor's first successful ping.
    pub fn new(config: AppConfig, host: Arc<dyn GameHost>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let (host_healthy_tx, _rx) = watch::channel(false);
        let sse_capacity = config.sse_capacity;
        Arc::new(Self {
            config,
            game_store: RwLock::new(None),
            host,
            events: SseHub::new(sse_capacity),
            locks: LockRegistry::new(),
            degraded: degraded_tx,
            host_healthy: host_healthy_tx,
            shutdown: CancellationToken::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current game store or fail with a degraded-mode error.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.game_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        if *self.degraded.borrow() == value {
            return;
        }

        let _ = self.degraded.send(value);
    }

    /// Handle on the external resource host.
    pub fn host(&self) -> Arc<dyn GameHost> {
        self.host.clone()
    }

    /// Publish the latest host connectivity probe result.
    pub fn set_host_healthy(&self, value: bool) {
        let _ = self.host_healthy.send(value);
    }

    /// Whether the last host probe succeeded.
    pub fn is_host_healthy(&self) -> bool {
        *self.host_healthy.borrow()
    }

    /// Broadcast hub for the events SSE stream.
    pub fn events(&self) -> &SseHub {
        &self.events
    }

    /// Registry of named async mutexes guarding start and grading sequences.
    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Process-wide shutdown token. Cancelled once when the server begins its
    /// graceful shutdown; request handlers derive child tokens from it so
    /// in-flight orchestrations stop before acquiring locks or contacting
    /// external systems.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}
