// Resolved Option Models (output of the configuration resolver)

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Recognized option names
pub mod keys {
    pub const SERVER: &str = "server";
    pub const PROCESS: &str = "process";
    pub const NAMESPACE: &str = "namespace";
    pub const POOL: &str = "pool";
    pub const POOL_MAX_ACTIVE: &str = "pool_max_active";
    pub const POLL_INTERVAL: &str = "poll_interval";
    pub const TLS: &str = "tls";
    pub const TLS_SKIP_VERIFY: &str = "tls_skip_verify";
    pub const TLS_CERT: &str = "tls_cert";
    pub const TLS_KEY: &str = "tls_key";
    pub const TLS_CA: &str = "tls_ca";
    pub const TLS_SERVER_NAME: &str = "tls_server_name";
    pub const PASSWORD: &str = "password";
    pub const DATABASE: &str = "database";
}

/// Separator appended to a non-empty namespace
pub const NAMESPACE_SEPARATOR: char = ':';

/// Key prefix isolating one deployment's keys from others sharing the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Build from a raw option value; empty stays empty, anything else gets the separator.
    pub fn from_option(raw: &str) -> Self {
        if raw.is_empty() {
            Self(String::new())
        } else {
            Self(format!("{}{}", raw, NAMESPACE_SEPARATOR))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Prefix a key with this namespace
    pub fn key(&self, key: &str) -> String {
        format!("{}{}", self.0, key)
    }
}

/// Minimum TLS protocol version accepted on the dial path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TlsVersion {
    #[serde(rename = "TLSv1.2")]
    Tls12,
}

/// Client certificate/key path pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientCertificatePaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Transport security policy (only built when TLS is requested)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsPolicy {
    pub min_version: TlsVersion,
    pub skip_verify: bool,
    pub client_certificate: Option<ClientCertificatePaths>,
    pub ca_bundle: Option<PathBuf>,
    /// Name the server certificate is validated against
    pub server_name: Option<String>,
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self {
            min_version: TlsVersion::Tls12,
            skip_verify: false,
            client_certificate: None,
            ca_bundle: None,
            server_name: None,
        }
    }
}

/// Everything needed to open one ready-to-use connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialSpec {
    pub address: String,
    pub tls: Option<TlsPolicy>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: Option<String>,
}

impl DialSpec {
    pub fn plain(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            tls: None,
            password: None,
            database: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_tls(mut self, tls: TlsPolicy) -> Self {
        self.tls = Some(tls);
        self
    }
}

/// Sizing and eviction policy of the connection pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolPolicy {
    /// Maximum number of idle connections retained for reuse
    pub max_idle: usize,
    /// Cap on checked-out connections; `None` dials on demand without limit
    pub max_active: Option<usize>,
    pub idle_timeout: Duration,
    /// Period of the background idle reaper
    pub reap_interval: Duration,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        use super::constants::*;
        Self {
            max_idle: DEFAULT_MAX_IDLE,
            max_active: None,
            idle_timeout: IDLE_TIMEOUT,
            reap_interval: REAP_INTERVAL,
        }
    }
}

/// Validated options, ready to build the pool and the process configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOptions {
    pub process_id: String,
    pub namespace: Namespace,
    pub poll_interval: Duration,
    pub pool: PoolPolicy,
    pub dial: DialSpec,
}
