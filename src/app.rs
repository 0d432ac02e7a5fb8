//! Application wiring.
//!
//! Builds the listeners from configuration and runs them, together with
//! the signal watcher, as one task group sharing a shutdown coordinator.

use std::future::Future;

use crate::config::{socket_addr, validate_config, AppConfig, ConfigError};
use crate::error::Error;
use crate::http::{api_router, health_router, HttpListener};
use crate::lifecycle::signals::{self, ShutdownSignal, SignalWatcher};
use crate::lifecycle::{run_listener, ListenerHandle, ShutdownCoordinator, TaskGroup};

/// A set of listeners stopped together.
pub struct App {
    coordinator: ShutdownCoordinator,
    listeners: Vec<HttpListener>,
}

impl App {
    /// Build the API listener and, if enabled, the health listener.
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        validate_config(config).map_err(ConfigError::Validation)?;
        let invalid = |e| ConfigError::Validation(vec![e]);

        let api_addr = socket_addr("api.bind_address", &config.api.bind_address).map_err(invalid)?;
        let mut listeners = vec![HttpListener::new("api", api_addr, api_router())];

        if config.health.enabled {
            let health_addr = socket_addr("health.bind_address", &config.health.bind_address)
                .map_err(invalid)?;
            listeners.push(HttpListener::new(
                "health",
                health_addr,
                health_router(&config.health.path),
            ));
        }

        let coordinator = ShutdownCoordinator::new(config.shutdown.grace_period());
        Ok(Self::from_listeners(coordinator, listeners))
    }

    /// Group arbitrary listeners under `coordinator`.
    pub fn from_listeners(coordinator: ShutdownCoordinator, listeners: Vec<HttpListener>) -> Self {
        Self {
            coordinator,
            listeners,
        }
    }

    pub fn coordinator(&self) -> &ShutdownCoordinator {
        &self.coordinator
    }

    /// Shutdown handles of every listener, in start order.
    pub fn handles(&self) -> Vec<ListenerHandle> {
        self.listeners.iter().map(HttpListener::handle).collect()
    }

    /// Run every listener until SIGINT/SIGTERM or until one of them exits.
    ///
    /// Returns the first error of any task; `Error::Interrupted` when an
    /// operator signal started the shutdown.
    pub async fn run(self) -> Result<(), Error> {
        let watcher = SignalWatcher::install(self.coordinator.clone())?;
        self.run_with_watcher(watcher.run()).await
    }

    /// Like [`App::run`], with `signal` standing in for the OS signals.
    pub async fn run_until<S>(self, signal: S) -> Result<(), Error>
    where
        S: Future<Output = ShutdownSignal> + Send + 'static,
    {
        let coordinator = self.coordinator.clone();
        self.run_with_watcher(async move { signals::watch(&coordinator, signal).await })
            .await
    }

    async fn run_with_watcher<W>(self, watcher: W) -> Result<(), Error>
    where
        W: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let Self {
            coordinator,
            listeners,
        } = self;

        let mut group = TaskGroup::new();
        for listener in listeners {
            coordinator.register(listener.handle());
            let name = listener.name().to_string();
            group.spawn(
                format!("{name} listener"),
                run_listener(name, coordinator.clone(), listener.serve()),
            );
        }
        group.spawn("signal watcher", watcher);

        group.wait().await
    }
}
