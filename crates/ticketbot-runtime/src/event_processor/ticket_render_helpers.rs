//! Ticket title, body, and reply rendering.

use ticketbot_core::truncate_chars;

pub const TICKET_TITLE_MAX_CHARS: usize = 100;

/// First line of the message, hard-truncated to [`TICKET_TITLE_MAX_CHARS`].
pub fn render_ticket_title(text: &str) -> String {
    let first_line = text.split('\n').next().unwrap_or_default();
    let single_line = first_line.replace('\r', "");
    truncate_chars(&single_line, TICKET_TITLE_MAX_CHARS)
}

pub fn render_ticket_body(permalink: &str, text: &str) -> String {
    format!("From slack: {permalink}\n\n{text}")
}

pub fn render_ticket_browse_url(browse_base_url: &str, ticket_key: &str) -> String {
    format!("{}/browse/{ticket_key}", browse_base_url.trim_end_matches('/'))
}

/// The browse link is left out when no base URL is configured.
pub fn render_ticket_reply(ticket_key: &str, browse_base_url: &str) -> String {
    if browse_base_url.trim().is_empty() {
        return format!("I've created your jira ticket {ticket_key}");
    }
    format!(
        "I've created your jira ticket {ticket_key}: {}",
        render_ticket_browse_url(browse_base_url, ticket_key)
    )
}
