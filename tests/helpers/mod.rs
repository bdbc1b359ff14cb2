//! Test doubles for driving the flow without the network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use selfie_flow::models::session::JobSubmission;
use selfie_flow::services::store::SessionStore;
use selfie_flow::services::webhook::{EndpointError, JobEndpoint};

/// 1x1 transparent PNG, the smallest payload the submitter accepts.
pub const TINY_PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// One scripted answer from the status webhook.
#[derive(Debug, Clone)]
pub enum StatusReply {
    Body(&'static str),
    /// Simulates a transport-level failure (HTTP 500).
    Fail,
}

/// Endpoint fake with a scripted status sequence and call accounting.
///
/// Status replies are consumed front to back; once the script is empty every
/// further call answers `{ status: processing }`.
pub struct ScriptedEndpoint {
    accept_submissions: bool,
    statuses: Mutex<VecDeque<StatusReply>>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    last_submission: Mutex<Option<JobSubmission>>,
}

impl ScriptedEndpoint {
    pub fn new(statuses: Vec<StatusReply>) -> Arc<Self> {
        Arc::new(Self {
            accept_submissions: true,
            statuses: Mutex::new(statuses.into()),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            last_submission: Mutex::new(None),
        })
    }

    /// An endpoint whose submission webhook answers HTTP 500.
    pub fn rejecting_submissions() -> Arc<Self> {
        Arc::new(Self {
            accept_submissions: false,
            statuses: Mutex::new(VecDeque::new()),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            last_submission: Mutex::new(None),
        })
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn last_submission(&self) -> Option<JobSubmission> {
        self.last_submission.lock().unwrap().clone()
    }

    /// Append more scripted replies (used after a manual retry).
    pub fn push_statuses(&self, replies: Vec<StatusReply>) {
        self.statuses.lock().unwrap().extend(replies);
    }
}

#[async_trait]
impl JobEndpoint for ScriptedEndpoint {
    async fn submit(&self, submission: &JobSubmission) -> Result<(), EndpointError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_submission.lock().unwrap() = Some(submission.clone());
        if self.accept_submissions {
            Ok(())
        } else {
            Err(EndpointError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }

    async fn fetch_status(&self, _session_id: &str) -> Result<String, EndpointError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.statuses.lock().unwrap().pop_front() {
            Some(StatusReply::Body(body)) => Ok(body.to_string()),
            Some(StatusReply::Fail) => Err(EndpointError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            )),
            None => Ok("{ status: processing }".to_string()),
        }
    }
}

/// A session the way the questionnaire and capture pages leave it.
pub fn populated_store() -> Arc<SessionStore> {
    let store = Arc::new(SessionStore::new());
    store.set_nombre("Ana");
    store.set_estado("Jalisco");
    store.set_telefono("5512345678");
    store.set_q1("ruta");
    store.set_q2("cafe-racer");
    store.set_photo(&format!("data:image/png;base64,{TINY_PNG_B64}"));
    store
}
