use base64::Engine;
use std::sync::Arc;
use tracing::info;

use crate::models::session::JobSubmission;
use crate::services::store::SessionStore;
use crate::services::webhook::{EndpointError, JobEndpoint};

/// Builds and sends the one-shot submission for a session.
///
/// The submitter itself never retries: the remote side has no duplicate
/// protection beyond the shared session id, so a failed submission is
/// surfaced immediately and resubmission is left to a full flow restart.
/// The single-submission guard lives in the orchestrator, not here.
pub struct JobSubmitter {
    endpoint: Arc<dyn JobEndpoint>,
}

impl JobSubmitter {
    pub fn new(endpoint: Arc<dyn JobEndpoint>) -> Self {
        Self { endpoint }
    }

    /// Validate the session, decode the photo and perform exactly one
    /// outbound request.
    pub async fn submit(&self, store: &SessionStore) -> Result<(), SubmitError> {
        let submission = build_submission(store)?;

        info!(
            session_id = %submission.session_id,
            photo_bytes = submission.photo_bytes.len(),
            "submitting job"
        );
        metrics::counter!("flow_submissions_total").increment(1);

        self.endpoint
            .submit(&submission)
            .await
            .map_err(SubmitError::Transport)
    }
}

/// Project the session into the outbound submission, enforcing the
/// must-not-submit-incomplete constraint.
fn build_submission(store: &SessionStore) -> Result<JobSubmission, SubmitError> {
    let data = store.snapshot();

    let session_id = data
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or(SubmitError::MissingData { field: "sessionId" })?;

    if data.photo.is_empty() {
        return Err(SubmitError::MissingData { field: "photo" });
    }

    let photo_bytes = decode_photo(&data.photo)?;

    // The capture page should only ever hand us a real encoded image, but a
    // truncated data URL would otherwise surface as an opaque remote error.
    image::guess_format(&photo_bytes).map_err(|_| SubmitError::InvalidPhoto)?;

    Ok(JobSubmission {
        session_id,
        nombre: data.nombre,
        estado: data.estado,
        telefono: data.telefono,
        q1: data.q1,
        q2: data.q2,
        photo_bytes,
    })
}

/// Decode a `data:image/...;base64,` URL (or bare base64) into bytes.
fn decode_photo(data_url: &str) -> Result<Vec<u8>, SubmitError> {
    let payload = match data_url.split_once(";base64,") {
        Some((_, payload)) => payload,
        None => data_url,
    };

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| SubmitError::InvalidPhoto)
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("session is missing required field `{field}`")]
    MissingData { field: &'static str },

    #[error("photo payload is not a decodable image")]
    InvalidPhoto,

    #[error("submission failed: {0}")]
    Transport(#[from] EndpointError),
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG.
    const TINY_PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn tiny_png_data_url() -> String {
        format!("data:image/png;base64,{}", TINY_PNG_B64)
    }

    #[test]
    fn decodes_data_url_photo() {
        let bytes = decode_photo(&tiny_png_data_url()).unwrap();
        assert_eq!(&bytes[1..4], &b"PNG"[..]);
    }

    #[test]
    fn decodes_bare_base64_photo() {
        let bytes = decode_photo(TINY_PNG_B64).unwrap();
        assert_eq!(&bytes[1..4], &b"PNG"[..]);
    }

    #[test]
    fn rejects_session_without_photo() {
        let store = SessionStore::new();
        store.session_id();
        let err = build_submission(&store).unwrap_err();
        assert!(matches!(err, SubmitError::MissingData { field: "photo" }));
    }

    #[test]
    fn rejects_session_without_id() {
        let store = SessionStore::new();
        store.set_photo(&tiny_png_data_url());
        let err = build_submission(&store).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::MissingData { field: "sessionId" }
        ));
    }

    #[test]
    fn rejects_garbage_photo_payload() {
        let store = SessionStore::new();
        store.session_id();
        store.set_photo("data:image/png;base64,!!!not-base64!!!");
        let err = build_submission(&store).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidPhoto));
    }

    #[test]
    fn builds_submission_from_complete_session() {
        let store = SessionStore::new();
        let id = store.session_id();
        store.set_nombre("Ana");
        store.set_estado("Jalisco");
        store.set_telefono("5512345678");
        store.set_q1("ruta");
        store.set_q2("cafe-racer");
        store.set_photo(&tiny_png_data_url());

        let submission = build_submission(&store).unwrap();
        assert_eq!(submission.session_id, id);
        assert_eq!(submission.nombre, "Ana");
        assert_eq!(submission.q2, "cafe-racer");
        assert!(!submission.photo_bytes.is_empty());
    }
}
