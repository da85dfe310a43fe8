/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Returns the current Unix timestamp in seconds.
pub fn current_unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Returns true once `ttl_ms` has elapsed since `stored_unix_ms`.
///
/// A clock that moved backwards never expires an entry early.
pub fn is_expired_unix_ms(stored_unix_ms: u64, ttl_ms: u64, now_unix_ms: u64) -> bool {
    if now_unix_ms < stored_unix_ms {
        return false;
    }
    now_unix_ms - stored_unix_ms >= ttl_ms
}
