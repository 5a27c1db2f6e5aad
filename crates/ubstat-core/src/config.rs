//! Configuration surface exposed to the host.
//!
//! [`UnboundConfig`] is what a job definition binds to; every field has a
//! default so an empty object is a valid configuration. [`ConnectionConfig`]
//! is the transport-relevant subset after native-config overrides have been
//! applied.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8953";
pub const DEFAULT_CONF_PATH: &str = "/etc/unbound/unbound.conf";
pub const DEFAULT_TLS_CERT: &str = "/etc/unbound/unbound_control.pem";
pub const DEFAULT_TLS_KEY: &str = "/etc/unbound/unbound_control.key";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration of one resolver statistics collector instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnboundConfig {
    /// `host:port` of the control interface, or a domain socket path.
    pub address: String,
    /// Native configuration file used for autodetection. `None` or an empty
    /// path disables autodetection.
    pub conf_path: Option<PathBuf>,
    /// Bound on one whole exchange, in (fractional) seconds.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Report life-of-service totals instead of per-cycle deltas.
    pub cumulative_stats: bool,
    pub use_tls: bool,
    pub tls_cert: PathBuf,
    pub tls_key: PathBuf,
    pub tls_ca: Option<PathBuf>,
    pub tls_skip_verify: bool,
}

impl Default for UnboundConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            conf_path: Some(PathBuf::from(DEFAULT_CONF_PATH)),
            timeout: DEFAULT_TIMEOUT,
            cumulative_stats: false,
            use_tls: true,
            tls_cert: PathBuf::from(DEFAULT_TLS_CERT),
            tls_key: PathBuf::from(DEFAULT_TLS_KEY),
            tls_ca: None,
            tls_skip_verify: true,
        }
    }
}

impl UnboundConfig {
    /// Autodetection source, if enabled.
    pub fn conf_path(&self) -> Option<&Path> {
        self.conf_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Checks values that no override can repair.
    pub fn validate(&self) -> Result<(), String> {
        if self.address.trim().is_empty() {
            return Err("'address' must not be empty".to_string());
        }
        if self.timeout.is_zero() {
            return Err("'timeout' must be positive".to_string());
        }
        Ok(())
    }

    /// Transport settings derived from this configuration.
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            address: self.address.clone(),
            use_tls: self.use_tls,
            tls_cert: self.tls_cert.clone(),
            tls_key: self.tls_key.clone(),
            tls_ca: self.tls_ca.clone(),
            tls_skip_verify: self.tls_skip_verify,
            timeout: self.timeout,
        }
    }
}

/// Transport parameters for the remote-control client.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub address: String,
    pub use_tls: bool,
    pub tls_cert: PathBuf,
    pub tls_key: PathBuf,
    pub tls_ca: Option<PathBuf>,
    pub tls_skip_verify: bool,
    pub timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        UnboundConfig::default().connection()
    }
}

/// Serializes a `Duration` as a floating-point number of seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| de::Error::custom(format!("invalid timeout {}: {}", secs, e)))
    }
}
