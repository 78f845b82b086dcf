// Pool defaults (No magic values)
use std::time::Duration;

/// Idle connections unused for longer than this are closed (240s)
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(240);

/// Idle connections retained when the `pool` option is absent
pub const DEFAULT_MAX_IDLE: usize = 1;

/// How often the background reaper scans for expired idle connections (30s)
pub const REAP_INTERVAL: Duration = Duration::from_secs(30);
