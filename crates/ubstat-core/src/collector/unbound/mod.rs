//! Unbound resolver statistics collector.
//!
//! One [`UnboundCollector`] polls one resolver over its remote-control
//! channel. Initialization merges the resolver's own configuration file into
//! the job settings, then every cycle sends `stats_noreset`, parses the
//! reply, grows the chart set and reconciles counters.

pub mod client;
pub mod conf;
mod pem;
pub mod stats;

use std::fmt;

use tracing::{debug, error, info};

pub use client::{ClientConfig, ControlClient, RemoteControlClient, TlsSettings, TransportError};
pub use conf::{Resolution, ServiceOverrides};
pub use stats::ParseError;

use crate::charts::ChartSet;
use crate::collector::traits::{FileSystem, RealFs};
use crate::config::UnboundConfig;
use crate::module::{Module, RegistryError};
use crate::rates::{CounterReconciler, EmittedMetrics, ReconcileMode};

/// Name the collector is registered under.
pub const MODULE_NAME: &str = "unbound";

/// Reads counters without resetting them on the server.
pub const STATS_COMMAND: &str = "stats_noreset";

/// Error type for a failed collection cycle.
#[derive(Debug)]
pub enum CollectError {
    /// `collect` was called before a successful `init`, or after `cleanup`.
    NotInitialized,
    Transport(TransportError),
    Parse(ParseError),
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::NotInitialized => write!(f, "collector is not initialized"),
            CollectError::Transport(e) => write!(f, "sending '{}': {}", STATS_COMMAND, e),
            CollectError::Parse(e) => write!(f, "parsing '{}' response: {}", STATS_COMMAND, e),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::NotInitialized => None,
            CollectError::Transport(e) => Some(e),
            CollectError::Parse(e) => Some(e),
        }
    }
}

/// Collector for one resolver instance.
pub struct UnboundCollector<F: FileSystem = RealFs> {
    fs: F,
    config: UnboundConfig,
    client: Option<Box<dyn ControlClient>>,
    reconciler: CounterReconciler,
    charts: ChartSet,
    uptime_enabled: bool,
    extended_enabled: bool,
    last_error: Option<String>,
}

impl UnboundCollector<RealFs> {
    pub fn new(config: UnboundConfig) -> Self {
        Self::with_fs(RealFs::new(), config)
    }
}

impl<F: FileSystem> UnboundCollector<F> {
    /// Creates a collector reading the native configuration through `fs`.
    pub fn with_fs(fs: F, config: UnboundConfig) -> Self {
        let mode = ReconcileMode::from_cumulative(config.cumulative_stats);
        Self {
            fs,
            config,
            client: None,
            reconciler: CounterReconciler::new(mode),
            charts: ChartSet::new(),
            uptime_enabled: false,
            extended_enabled: false,
            last_error: None,
        }
    }

    /// Uses `client` instead of building a remote-control client in `init`.
    pub fn with_client(mut self, client: impl ControlClient + 'static) -> Self {
        self.client = Some(Box::new(client));
        self
    }

    /// Effective configuration; reflects overrides once `init` has run.
    pub fn config(&self) -> &UnboundConfig {
        &self.config
    }

    pub fn mode(&self) -> ReconcileMode {
        self.reconciler.mode()
    }

    /// Error of the most recent cycle, cleared by a successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn init_config(&mut self) -> bool {
        match conf::resolve(&self.fs, self.config.conf_path()) {
            Resolution::Disabled => false,
            Resolution::Overrides(overrides) => {
                if !overrides.is_empty() {
                    debug!(overrides = %overrides, "applying native configuration");
                    overrides.apply(&mut self.config);
                }
                true
            }
        }
    }

    fn init_client(&mut self) -> Result<(), TransportError> {
        if self.client.is_some() {
            return Ok(());
        }
        let config = ClientConfig::new(&self.config.connection())?;
        let client = RemoteControlClient::new(config)?;
        debug!(
            address = %self.config.address,
            unix = client.is_unix(),
            tls = client.uses_tls(),
            "remote control client created"
        );
        self.client = Some(Box::new(client));
        Ok(())
    }

    fn collect_cycle(&mut self) -> Result<EmittedMetrics, CollectError> {
        let client = self.client.as_mut().ok_or(CollectError::NotInitialized)?;
        let lines = client.send(STATS_COMMAND).map_err(CollectError::Transport)?;

        let snapshot = match stats::parse(&lines) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Next cycle must not difference across the unusable one.
                self.reconciler.skip();
                return Err(CollectError::Parse(e));
            }
        };

        for key in snapshot.keys() {
            if !self.charts.ensure(key) {
                continue;
            }
            let extended = self
                .charts
                .series(key)
                .is_some_and(|s| s.family == "extended");
            if key == "time.up" && !self.uptime_enabled {
                self.uptime_enabled = true;
                info!("uptime reported, enabling uptime chart");
            } else if extended && !self.extended_enabled {
                self.extended_enabled = true;
                info!("extended statistics detected, enabling extended charts");
            } else {
                debug!(dimension = key, "new dimension");
            }
        }

        Ok(self.reconciler.reconcile(snapshot, &self.charts))
    }
}

impl<F: FileSystem + 'static> Module for UnboundCollector<F> {
    fn init(&mut self) -> bool {
        if let Err(e) = self.config.validate() {
            error!(error = %e, "invalid configuration");
            return false;
        }
        if !self.init_config() {
            return false;
        }
        if let Err(e) = self.init_client() {
            error!(error = %e, "creating remote control client");
            return false;
        }

        self.reconciler =
            CounterReconciler::new(ReconcileMode::from_cumulative(self.config.cumulative_stats));
        debug!(
            address = %self.config.address,
            cumulative = self.config.cumulative_stats,
            use_tls = self.config.use_tls,
            timeout = ?self.config.timeout,
            "using settings"
        );
        if self.config.use_tls {
            debug!(
                tls_cert = %self.config.tls_cert.display(),
                tls_key = %self.config.tls_key.display(),
                tls_skip_verify = self.config.tls_skip_verify,
                "using tls settings"
            );
        }
        true
    }

    fn check(&mut self) -> bool {
        !self.collect().is_empty()
    }

    fn collect(&mut self) -> EmittedMetrics {
        match self.collect_cycle() {
            Ok(metrics) => {
                self.last_error = None;
                metrics
            }
            Err(e) => {
                error!(address = %self.config.address, error = %e, "collection failed");
                self.last_error = Some(e.to_string());
                EmittedMetrics::new()
            }
        }
    }

    fn charts(&self) -> &ChartSet {
        &self.charts
    }

    fn cleanup(&mut self) {
        if self.client.take().is_some() {
            debug!(address = %self.config.address, "remote control client released");
        }
    }
}

/// Registry factory: binds `config` to [`UnboundConfig`].
///
/// `null` is accepted and means all defaults.
pub fn create(config: &serde_json::Value) -> Result<Box<dyn Module>, RegistryError> {
    let config: UnboundConfig = if config.is_null() {
        UnboundConfig::default()
    } else {
        serde_json::from_value(config.clone())
            .map_err(|e| RegistryError::InvalidConfig(MODULE_NAME.to_string(), e.to_string()))?
    };
    Ok(Box::new(UnboundCollector::new(config)))
}
