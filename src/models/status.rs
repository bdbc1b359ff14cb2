use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote job state as projected from a repaired status body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// The scenario is still working (or the status field was absent).
    Processing,
    /// A generated image is ready; `result_reference` is guaranteed present.
    Completed,
    /// A status token we do not recognize. Treated as still-processing.
    Unknown,
}

/// Normalized decoding of one status response.
///
/// Invariant: `state == Completed` implies a non-empty `result_reference`.
/// A completed status token without a usable image URL is downgraded to
/// `Processing` by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResult {
    pub state: JobState,
    pub result_reference: Option<String>,
}

impl StatusResult {
    pub fn processing() -> Self {
        Self {
            state: JobState::Processing,
            result_reference: None,
        }
    }
}

/// How a single poll attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Well-formed answer, job not done yet.
    Pending,
    /// Well-formed answer with the generated image URL.
    Completed(String),
    /// Network error, non-2xx status, or the per-attempt deadline elapsed.
    TransportError,
    /// Body unparseable even after repair.
    ParseError,
}

/// Record of one status-check request/response cycle.
#[derive(Debug, Clone)]
pub struct PollAttempt {
    /// Monotonic within a polling phase, starting at 0.
    pub seq: u32,
    /// Polling phase this attempt belongs to; bumped on each manual retry so
    /// late responses from an abandoned phase are identifiable.
    pub epoch: u32,
    /// Offset from the start of the phase when the attempt fired.
    pub offset: Duration,
    pub outcome: AttemptOutcome,
    pub at: DateTime<Utc>,
}
