//! Time utilities for the race simulation

use std::time::{Duration, Instant};

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Tick rate configuration
pub const DEFAULT_TICK_MILLIS: u64 = 1_000; // 1 refresh per second
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(DEFAULT_TICK_MILLIS);
