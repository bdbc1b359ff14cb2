use chrono::Utc;
use std::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::models::session::SessionData;

/// Durable (for the lifetime of one flow) session store.
///
/// The orchestrator is the single writer of `result_url`, `timeout_expired`
/// and the submission flag; the UI collaborators fill in the form fields and
/// photo before the flow starts. Form fields are write-once until `reset()`:
/// a second write to a populated field is dropped with a warning rather than
/// applied.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<SessionData>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session id for the current flow, generated on first access and
    /// stable until `reset()`. Reused across reloads so the remote side can
    /// correlate a re-mounted processing page with the already-running job.
    pub fn session_id(&self) -> String {
        let mut data = self.inner.lock().unwrap();
        match &data.session_id {
            Some(id) => id.clone(),
            None => {
                let id = Uuid::new_v4().to_string();
                data.session_id = Some(id.clone());
                data.created_at = Some(Utc::now());
                id
            }
        }
    }

    pub fn set_nombre(&self, value: &str) {
        self.write_once("nombre", value, |d| &mut d.nombre);
    }

    pub fn set_estado(&self, value: &str) {
        self.write_once("estado", value, |d| &mut d.estado);
    }

    pub fn set_telefono(&self, value: &str) {
        self.write_once("telefono", value, |d| &mut d.telefono);
    }

    pub fn set_q1(&self, value: &str) {
        self.write_once("q1", value, |d| &mut d.q1);
    }

    pub fn set_q2(&self, value: &str) {
        self.write_once("q2", value, |d| &mut d.q2);
    }

    pub fn set_photo(&self, data_url: &str) {
        self.write_once("photo", data_url, |d| &mut d.photo);
    }

    /// Test-and-set for the single-submission invariant. Returns `false` if
    /// a submission is already in flight or has succeeded for the current
    /// session id, in which case the caller must not submit again.
    pub fn begin_submission(&self) -> bool {
        let mut data = self.inner.lock().unwrap();
        if data.submitted {
            return false;
        }
        data.submitted = true;
        true
    }

    /// Write the generated image URL. Write-once: a second completion for
    /// the same flow is ignored.
    pub fn set_result_url(&self, url: &str) {
        let mut data = self.inner.lock().unwrap();
        if let Some(existing) = &data.result_url {
            warn!(existing = %existing, dropped = %url, "result URL already set, ignoring overwrite");
            return;
        }
        data.result_url = Some(url.to_string());
    }

    pub fn result_url(&self) -> Option<String> {
        self.inner.lock().unwrap().result_url.clone()
    }

    pub fn mark_timeout_expired(&self) {
        self.inner.lock().unwrap().timeout_expired = true;
    }

    pub fn timeout_expired(&self) -> bool {
        self.inner.lock().unwrap().timeout_expired
    }

    /// Start a brand-new flow: every field is cleared and the next
    /// `session_id()` call generates a fresh id.
    pub fn reset(&self) {
        *self.inner.lock().unwrap() = SessionData::default();
    }

    pub fn snapshot(&self) -> SessionData {
        self.inner.lock().unwrap().clone()
    }

    fn write_once(
        &self,
        field: &'static str,
        value: &str,
        accessor: impl FnOnce(&mut SessionData) -> &mut String,
    ) {
        let mut data = self.inner.lock().unwrap();
        let slot = accessor(&mut data);
        if !slot.is_empty() {
            warn!(field, "session field already set, ignoring overwrite");
            return;
        }
        *slot = value.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_stable_until_reset() {
        let store = SessionStore::new();
        let first = store.session_id();
        assert_eq!(first, store.session_id());

        store.reset();
        let second = store.session_id();
        assert_ne!(first, second);
    }

    #[test]
    fn form_fields_are_write_once() {
        let store = SessionStore::new();
        store.set_nombre("Ana");
        store.set_nombre("Luis");
        assert_eq!(store.snapshot().nombre, "Ana");
    }

    #[test]
    fn result_url_is_write_once() {
        let store = SessionStore::new();
        store.set_result_url("https://x/one.png");
        store.set_result_url("https://x/two.png");
        assert_eq!(store.result_url().as_deref(), Some("https://x/one.png"));
    }

    #[test]
    fn begin_submission_fires_once() {
        let store = SessionStore::new();
        assert!(store.begin_submission());
        assert!(!store.begin_submission());

        store.reset();
        assert!(store.begin_submission());
    }

    #[test]
    fn reset_clears_everything() {
        let store = SessionStore::new();
        store.set_nombre("Ana");
        store.set_photo("data:image/png;base64,AAAA");
        store.set_result_url("https://x/img.png");
        store.mark_timeout_expired();

        store.reset();
        let data = store.snapshot();
        assert!(data.nombre.is_empty());
        assert!(data.photo.is_empty());
        assert!(data.result_url.is_none());
        assert!(!data.timeout_expired);
    }

    #[test]
    fn session_keys_serialize_with_ui_names() {
        let store = SessionStore::new();
        store.session_id();
        store.set_result_url("https://x/img.png");
        let json = serde_json::to_value(store.snapshot()).unwrap();
        assert!(json.get("sessionId").is_some());
        assert!(json.get("resultUrl").is_some());
        assert!(json.get("timeoutExpired").is_some());
    }
}
