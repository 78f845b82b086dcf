// Configuration Resolver
//
// Validates the flat option map and derives every default. Missing mandatory
// options fail hard; numeric options degrade to their defaults.

use crate::domain::error::{ConfigurationError, Result};
use crate::domain::options::{
    keys, ClientCertificatePaths, DialSpec, Namespace, PoolPolicy, ResolvedOptions, TlsPolicy,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Poll interval used when the option is absent or not a positive integer
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Resolve raw string options into validated options.
///
/// An empty value is treated as if the option were absent.
///
/// # Errors
/// `ConfigurationError::MissingOption` when `server` or `process` is absent.
/// TLS material is only validated later, when the transport adapter loads it.
pub fn resolve(options: &HashMap<String, String>) -> Result<ResolvedOptions> {
    let server = required(
        options,
        keys::SERVER,
        "identifies the store instance to connect to",
    )?;
    let process_id = required(
        options,
        keys::PROCESS,
        "uniquely identifies this process among all sharing the store",
    )?;

    let namespace = Namespace::from_option(option(options, keys::NAMESPACE).unwrap_or_default());
    let poll_interval = Duration::from_secs(parse_poll_interval(option(options, keys::POLL_INTERVAL)));

    let pool = PoolPolicy {
        max_idle: parse_pool_size(option(options, keys::POOL)),
        max_active: option(options, keys::POOL_MAX_ACTIVE)
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0),
        ..PoolPolicy::default()
    };

    let tls = if flag(options, keys::TLS) {
        Some(tls_policy(options, server))
    } else {
        None
    };

    let dial = DialSpec {
        address: server.to_string(),
        tls,
        password: option(options, keys::PASSWORD).map(str::to_string),
        database: option(options, keys::DATABASE).map(str::to_string),
    };

    Ok(ResolvedOptions {
        process_id: process_id.to_string(),
        namespace,
        poll_interval,
        pool,
        dial,
    })
}

fn option<'a>(options: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    options
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn required<'a>(
    options: &'a HashMap<String, String>,
    key: &'static str,
    hint: &'static str,
) -> Result<&'a str> {
    option(options, key).ok_or(ConfigurationError::MissingOption { option: key, hint })
}

fn flag(options: &HashMap<String, String>, key: &str) -> bool {
    option(options, key) == Some("true")
}

fn parse_poll_interval(raw: Option<&str>) -> u64 {
    match raw.map(|v| v.parse::<u64>()) {
        Some(Ok(seconds)) if seconds > 0 => seconds,
        Some(_) => {
            debug!(value = ?raw, "poll_interval is not a positive integer, using default");
            DEFAULT_POLL_INTERVAL_SECS
        }
        None => DEFAULT_POLL_INTERVAL_SECS,
    }
}

fn parse_pool_size(raw: Option<&str>) -> usize {
    match raw {
        None => PoolPolicy::default().max_idle,
        Some(value) => value.parse::<usize>().unwrap_or_else(|_| {
            debug!(value, "pool is not numeric, retaining no idle connections");
            0
        }),
    }
}

fn tls_policy(options: &HashMap<String, String>, server: &str) -> TlsPolicy {
    let skip_verify = flag(options, keys::TLS_SKIP_VERIFY);

    let client_certificate = match (
        option(options, keys::TLS_CERT),
        option(options, keys::TLS_KEY),
    ) {
        (Some(cert), Some(key)) => Some(ClientCertificatePaths {
            cert: PathBuf::from(cert),
            key: PathBuf::from(key),
        }),
        _ => None,
    };

    let server_name = option(options, keys::TLS_SERVER_NAME)
        .map(str::to_string)
        .or_else(|| {
            if skip_verify {
                return None;
            }
            split_host_port(server)
                .map(|(host, _)| host)
                .filter(|host| !host.is_empty())
                .map(str::to_string)
        });

    TlsPolicy {
        skip_verify,
        client_certificate,
        ca_bundle: option(options, keys::TLS_CA).map(PathBuf::from),
        server_name,
        ..TlsPolicy::default()
    }
}

/// Split `host:port` or `[ipv6]:port`; `None` if the address has no port or
/// too many colons.
pub fn split_host_port(address: &str) -> Option<(&str, &str)> {
    let (host, port) = match address.strip_prefix('[') {
        Some(rest) => {
            let (host, tail) = rest.split_once(']')?;
            (host, tail.strip_prefix(':')?)
        }
        None => {
            let (host, port) = address.rsplit_once(':')?;
            if host.contains(':') {
                return None;
            }
            (host, port)
        }
    };

    if host.contains(['[', ']']) || port.contains([':', '[', ']']) {
        return None;
    }
    Some((host, port))
}
