use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::models::status::{JobState, StatusResult};

// The status webhook answers with near-JSON: bare keys, bare scalar values,
// raw URLs, stray whitespace. These passes repair the body into something
// serde_json accepts. The passes mirror the scenario's observed output and
// must be applied in this order.
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static BARE_KEYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([{,]\s*)(\w+)(\s*:)"#).expect("bare key regex"));
static BARE_VALUES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#":\s*([^\s,{}"]+)"#).expect("bare value regex"));
static QUOTED_URLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(https?://[^"]+)""#).expect("url regex"));

/// Repair a near-JSON status body into parseable JSON.
///
/// 1. Collapse whitespace runs and trim.
/// 2. Quote bare object keys.
/// 3. Quote bare scalar values (this also wraps raw URLs).
/// 4. Re-serialize quoted `http(s)://` values so URLs survive pass 3 as
///    clean JSON strings.
pub fn repair(raw: &str) -> String {
    let text = WHITESPACE.replace_all(raw, " ");
    let text = text.trim();
    let text = BARE_KEYS.replace_all(text, r#"${1}"${2}"${3}"#);
    let text = BARE_VALUES.replace_all(&text, r#":"${1}""#);
    let text = QUOTED_URLS.replace_all(&text, |caps: &regex::Captures<'_>| {
        serde_json::to_string(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    text.into_owned()
}

/// Repair and parse a raw status body into a typed result.
///
/// Projection rules: a missing or `processing` status means the job is still
/// running; `completed` is only honored when a usable `imageUrl` accompanies
/// it (a completed marker without a reference stays `Processing`); any other
/// token maps to `Unknown`, which the poller also treats as still-running.
pub fn parse(raw: &str) -> Result<StatusResult, NormalizeError> {
    let repaired = repair(raw);
    debug!(repaired = %repaired, "repaired status body");

    let value: serde_json::Value = serde_json::from_str(&repaired)?;

    let status = value.get("status").and_then(|v| v.as_str());
    let result_reference = value
        .get("imageUrl")
        .and_then(|v| v.as_str())
        // Pass 3 turns a bare `null` into the string "null".
        .filter(|url| !url.is_empty() && *url != "null")
        .map(str::to_string);

    let result = match status {
        Some("completed") => match result_reference {
            Some(url) => StatusResult {
                state: JobState::Completed,
                result_reference: Some(url),
            },
            // Completed marker without an image is not a completion.
            None => StatusResult::processing(),
        },
        None | Some("processing") => StatusResult {
            state: JobState::Processing,
            result_reference,
        },
        Some(_) => StatusResult {
            state: JobState::Unknown,
            result_reference,
        },
    };

    Ok(result)
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("status body is not valid JSON even after repair: {0}")]
    Malformed(#[from] serde_json::Error),
}
