//! Share-link snapshots.
//!
//! A snapshot is the JSON record list encoded as URL-safe base64 without padding,
//! carried in the `share` fragment (or query) parameter of a link. Decoding is
//! lenient per record: malformed entries are dropped, whole-token corruption is
//! an error.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;
use tempdrop_core::FileRecord;

use crate::error::ShareError;

const SHARE_PARAM: &str = "share=";

/// Encode records into a share token.
pub fn encode_snapshot(records: &[FileRecord]) -> Result<String, ShareError> {
    let json = serde_json::to_vec(records)
        .map_err(|e| ShareError::InvalidPayload(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode a share token back into records.
///
/// Entries missing a required string field are dropped; a missing expiry is
/// back-filled with `now + retention`.
pub fn decode_snapshot(
    token: &str,
    now: DateTime<Utc>,
    retention: Duration,
) -> Result<Vec<FileRecord>, ShareError> {
    let raw = URL_SAFE_NO_PAD
        .decode(token.trim().trim_end_matches('='))
        .map_err(|e| ShareError::InvalidEncoding(e.to_string()))?;

    let value: JsonValue = serde_json::from_slice(&raw)
        .map_err(|e| ShareError::InvalidPayload(e.to_string()))?;

    let entries = value
        .as_array()
        .ok_or_else(|| ShareError::InvalidPayload("expected a JSON array".to_string()))?;

    let records: Vec<FileRecord> = entries
        .iter()
        .filter_map(|entry| FileRecord::restore(entry, now, retention))
        .map(|restored| restored.record)
        .collect();

    if records.len() < entries.len() {
        tracing::debug!(
            dropped = entries.len() - records.len(),
            kept = records.len(),
            "Dropped malformed share-link entries"
        );
    }

    Ok(records)
}

/// Build a share link: `{base_url}#share={token}`.
pub fn build_share_url(base_url: &str, records: &[FileRecord]) -> Result<String, ShareError> {
    let token = encode_snapshot(records)?;
    let base = base_url.split('#').next().unwrap_or(base_url);
    Ok(format!("{}#{}{}", base, SHARE_PARAM, token))
}

/// Pull the token out of a share link, or return the input when it is already a
/// bare token. Accepts the parameter in the fragment or the query string.
pub fn extract_token(url_or_token: &str) -> &str {
    let input = url_or_token.trim();
    match input.rfind(SHARE_PARAM) {
        Some(pos) => {
            let rest = &input[pos + SHARE_PARAM.len()..];
            let end = rest.find(['&', '#']).unwrap_or(rest.len());
            &rest[..end]
        }
        None => input,
    }
}
