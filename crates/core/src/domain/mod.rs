// Domain Layer - Pure models

pub mod command;
pub mod constants;
pub mod error;
pub mod message;
pub mod options;
pub mod process;

// Re-exports
pub use command::{Command, Reply};
pub use error::ConfigurationError;
pub use message::Message;
pub use options::{
    ClientCertificatePaths, DialSpec, Namespace, PoolPolicy, ResolvedOptions, TlsPolicy,
    TlsVersion,
};
pub use process::ProcessConfiguration;
