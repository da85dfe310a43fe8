//! Slack request signature verification (`v0` HMAC-SHA256 scheme).

use anyhow::{anyhow, bail, Context, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SLACK_SIGNATURE_HEADER: &str = "x-slack-signature";
pub const SLACK_TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
/// Requests whose timestamp is further than this from now are rejected as replays.
pub const SLACK_SIGNATURE_MAX_AGE_SECONDS: u64 = 300;

/// Verifies `signature_header` against `v0:<timestamp>:<body>` keyed by the signing secret.
pub fn verify_slack_signature(
    signing_secret: &str,
    timestamp_header: &str,
    signature_header: &str,
    body: &[u8],
    now_unix: u64,
) -> Result<()> {
    let timestamp = timestamp_header
        .trim()
        .parse::<u64>()
        .with_context(|| format!("invalid slack request timestamp '{timestamp_header}'"))?;
    if now_unix.abs_diff(timestamp) > SLACK_SIGNATURE_MAX_AGE_SECONDS {
        bail!("slack request timestamp outside replay window");
    }

    let digest_hex = signature_header
        .trim()
        .strip_prefix("v0=")
        .ok_or_else(|| anyhow!("signature must use v0=<hex> format"))?;
    let signature_bytes = decode_hex(digest_hex)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes())
        .context("failed to initialize hmac verifier")?;
    mac.update(b"v0:");
    mac.update(timestamp_header.trim().as_bytes());
    mac.update(b":");
    mac.update(body);
    mac.verify_slice(&signature_bytes)
        .map_err(|_| anyhow!("signature verification failed"))
}

fn decode_hex(raw: &str) -> Result<Vec<u8>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("signature digest cannot be empty");
    }
    if trimmed.len() % 2 != 0 {
        bail!("signature digest must have an even number of hex characters");
    }
    let mut bytes = Vec::with_capacity(trimmed.len() / 2);
    let mut index = 0usize;
    while index < trimmed.len() {
        let next = index.saturating_add(2);
        let chunk = trimmed
            .get(index..next)
            .ok_or_else(|| anyhow!("signature digest must be ascii hex"))?;
        let byte = u8::from_str_radix(chunk, 16)
            .with_context(|| format!("invalid hex byte '{chunk}' in signature digest"))?;
        bytes.push(byte);
        index = next;
    }
    Ok(bytes)
}
