// Application Layer - Use Cases

pub mod configure;
pub mod fetch;
pub mod pool;
pub mod shutdown;

// Re-exports
pub use configure::resolve;
pub use fetch::{default_fetcher_factory, ChannelFetcher};
pub use pool::{ConnectionPool, PoolStats, PooledConnection};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
