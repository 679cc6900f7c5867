//! Tunables that are part of the observable contract between a manager
//! and its subscriber: window size, eviction policy, and registry bounds.

use std::time::Duration;

/// Steady-state size of a manager's filtered window.
pub const BUFFER: usize = 10_000;

/// How far the window is allowed to grow past `BUFFER` before a trim.
pub const TRIM_SLACK: usize = 1_000;

/// Maximum number of concurrently live managers in a registry.
pub const MAX_MANAGERS: usize = 5;

/// A manager idle longer than this is eligible for eviction.
pub const MAX_IDLE: Duration = Duration::from_secs(60);

/// Interval between background cleanup sweeps.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(10);
