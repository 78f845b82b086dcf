// Command line and option sources

use clap::Parser;
use config::{Config, ConfigError, Environment, File, FileFormat};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use taskforge_infra_metrics::MetricsServerConfig;

/// Prefix of environment variables carrying worker options
pub const ENV_PREFIX: &str = "TASKFORGE";

#[derive(Parser, Debug)]
#[command(name = "taskforge")]
#[command(about = "Taskforge background job worker", long_about = None)]
#[command(version)]
pub struct Args {
    /// TOML file with worker options (server, process, pool, tls, ...)
    #[arg(short, long, env = "TASKFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address of the metrics scrape endpoint
    #[arg(long, env = "TASKFORGE_METRICS_ADDR", default_value = "127.0.0.1:9540")]
    pub metrics_addr: SocketAddr,

    /// Acquire one connection, PING the store and exit
    #[arg(long)]
    pub check: bool,
}

impl Args {
    pub fn metrics_config(&self) -> MetricsServerConfig {
        MetricsServerConfig {
            host: self.metrics_addr.ip().to_string(),
            port: self.metrics_addr.port(),
        }
    }
}

/// Collect the flat option map: the optional TOML file first, then
/// `TASKFORGE_*` environment variables on top.
pub fn load_options(file: Option<&Path>) -> Result<HashMap<String, String>, ConfigError> {
    collect(file, Environment::with_prefix(ENV_PREFIX))
}

fn collect(
    file: Option<&Path>,
    environment: Environment,
) -> Result<HashMap<String, String>, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = file {
        builder = builder.add_source(File::from(path).format(FileFormat::Toml));
    }
    builder
        .add_source(environment)
        .build()?
        .try_deserialize::<HashMap<String, String>>()
}
