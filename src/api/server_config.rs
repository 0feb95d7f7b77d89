//! HTTP server limits

use std::time::Duration;

/// Concurrent in-flight requests
pub const MAX_CONCURRENCY: usize = 256;

/// Request body limit (JSON and webhook payloads)
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// CORS preflight cache
pub const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// How often idle rate-limit entries are dropped
pub const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);
