use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything persisted for one user's flow, from photo confirmation until
/// the flow is explicitly restarted. Field names match the keys the UI
/// collaborators read and write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionData {
    /// Client-generated correlation id shared between the submission and
    /// every status query. Created at most once per flow, never mutated.
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,

    pub nombre: String,
    pub estado: String,
    pub telefono: String,

    /// Questionnaire answer identifiers.
    pub q1: String,
    pub q2: String,

    /// Base64 data URL of the captured photo, produced by the capture page.
    pub photo: String,

    /// URL of the generated image. Absent until the job completes.
    #[serde(rename = "resultUrl")]
    pub result_url: Option<String>,

    /// Set when the polling deadline expired so the result page can render
    /// the apologetic fallback.
    #[serde(rename = "timeoutExpired")]
    pub timeout_expired: bool,

    /// Whether the submission for the current session id has been sent (or
    /// is in flight). Backs the single-submission guard.
    #[serde(skip)]
    pub submitted: bool,

    #[serde(skip)]
    pub created_at: Option<DateTime<Utc>>,
}

/// The one outbound POST for a session: all form fields plus the decoded
/// photo bytes. Built exactly once per session and never resent.
#[derive(Debug, Clone)]
pub struct JobSubmission {
    pub session_id: String,
    pub nombre: String,
    pub estado: String,
    pub telefono: String,
    pub q1: String,
    pub q2: String,
    pub photo_bytes: Vec<u8>,
}
