// Configuration Error Types (startup-fatal)

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("missing required option '{option}': {hint}")]
    MissingOption {
        option: &'static str,
        hint: &'static str,
    },

    #[error("failed to load client certificate ({cert:?}, {key:?}): {reason}")]
    ClientCertificate {
        cert: PathBuf,
        key: PathBuf,
        reason: String,
    },

    #[error("failed to read CA file {path:?}: {source}")]
    CaBundleRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append CA certs from {0:?}: no valid PEM data found")]
    CaBundleEmpty(PathBuf),

    #[error("invalid TLS policy: {0}")]
    Tls(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;
