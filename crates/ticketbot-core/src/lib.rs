//! Foundational low-level utilities shared across ticketbot crates.
//!
//! Provides clock helpers used by cache expiry and request verification,
//! plus the retry and truncation helpers shared by the Slack and Jira
//! HTTP clients.

pub mod http_retry;
pub mod text_utils;
pub mod time_utils;

pub use http_retry::{
    is_retryable_http_status, is_retryable_transport_error, parse_retry_after, retry_delay,
};
pub use text_utils::{truncate_chars, truncate_for_error};
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms, is_expired_unix_ms};
