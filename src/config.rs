use serde::Deserialize;

/// Ceiling on transport sessions in flight across all tasks.
pub const MAX_ACTIVE_SESSIONS: usize = 16;

/// Per-operation timeout applied when a task requests 0 seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 30;

/// Timeout for establishing a connection, shared by every request.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// User-Agent header sent with every request.
pub const USER_AGENT: &str = concat!("fetchmux/", env!("CARGO_PKG_VERSION"));

/// Top-level configuration for the download manager.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    /// Maximum number of concurrent transport sessions, shared by all tasks.
    /// Tasks beyond the ceiling stay queued; there is no per-task override.
    pub max_sessions: usize,
    /// Verify TLS peer certificates.
    pub verify_tls: bool,
    /// Follow HTTP redirects.
    pub follow_redirects: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_sessions: MAX_ACTIVE_SESSIONS,
            verify_tls: false,
            follow_redirects: true,
        }
    }
}
