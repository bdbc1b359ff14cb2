use base64::Engine;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use selfie_flow::config::FlowConfig;
use selfie_flow::orchestrator::{FlowState, Orchestrator};
use selfie_flow::services::store::SessionStore;
use selfie_flow::services::webhook::MakeWebhookClient;

/// Smoke driver: runs one complete flow against the live webhooks with a
/// photo from disk. The real entry points are UI lifecycle events; this
/// binary exists to exercise the whole pipeline end to end.
#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    metrics::describe_counter!("flow_submissions_total", "Total job submissions sent");
    metrics::describe_counter!("poll_attempts_total", "Total status poll attempts");
    metrics::describe_counter!("poll_failures_total", "Poll attempts that failed");
    metrics::describe_counter!("flows_completed_total", "Flows that produced an image");
    metrics::describe_counter!("flows_timed_out_total", "Flows that hit the deadline");

    let config = FlowConfig::from_env().expect("Failed to load configuration");

    let photo_path = std::env::var("PHOTO_FILE").expect("PHOTO_FILE must point to a photo");
    let photo_bytes = std::fs::read(&photo_path).expect("Failed to read photo file");
    let photo_data_url = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&photo_bytes)
    );

    let store = Arc::new(SessionStore::new());
    store.set_nombre(&std::env::var("NOMBRE").unwrap_or_else(|_| "Prueba".to_string()));
    store.set_estado(&std::env::var("ESTADO").unwrap_or_default());
    store.set_telefono(&std::env::var("TELEFONO").unwrap_or_default());
    store.set_q1(&std::env::var("Q1").unwrap_or_default());
    store.set_q2(&std::env::var("Q2").unwrap_or_default());
    store.set_photo(&photo_data_url);

    let endpoint = Arc::new(MakeWebhookClient::new(&config));

    tracing::info!(session_id = %store.session_id(), "starting flow");
    let mut handle = Orchestrator::spawn(store.clone(), endpoint, config);

    // Mirror what the processing page shows: every state change as it lands.
    while handle.state.changed().await.is_ok() {
        let state = handle.state.borrow().clone();
        tracing::info!(state = ?state, "flow progress");
        if state.is_terminal() {
            break;
        }
    }

    match handle.task.await.expect("flow task panicked") {
        FlowState::Completed { result_url } => {
            println!("Generated image: {result_url}");
        }
        FlowState::TimedOut => {
            eprintln!("The job did not finish before the deadline.");
            std::process::exit(1);
        }
        other => {
            eprintln!("Flow ended without a result: {other:?}");
            std::process::exit(1);
        }
    }
}
