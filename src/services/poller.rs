use chrono::Utc;
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::FlowConfig;
use crate::models::status::{AttemptOutcome, JobState, PollAttempt};
use crate::services::normalizer;
use crate::services::webhook::JobEndpoint;

/// How one polling phase ended. The overall deadline lives outside the
/// poller (the orchestrator races a `TimeoutGuard` against the phase).
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseEnd {
    /// A poll attempt came back completed with the generated image URL.
    Completed(String),
    /// The consecutive-failure threshold was hit, or the planned attempt
    /// budget ran out. Either way the user gets a manual retry affordance
    /// instead of silent polling forever.
    RetryOffered,
}

/// Drives the fixed-rate status-check schedule for one job.
///
/// Scheduling policy: fixed-rate ticking at `poll_interval`, first attempt
/// immediately on entering the phase. Attempts never run concurrently; an
/// attempt that overruns its slot makes the ticker skip the missed slot and
/// fire at the next interval boundary. Each attempt is bounded by
/// `attempt_timeout`.
pub struct ResultPoller {
    endpoint: Arc<dyn JobEndpoint>,
    config: FlowConfig,
}

impl ResultPoller {
    pub fn new(endpoint: Arc<dyn JobEndpoint>, config: FlowConfig) -> Self {
        Self { endpoint, config }
    }

    /// Issue a single bounded status request. Failures are recorded, never
    /// propagated: one bad attempt is not terminal.
    pub async fn poll_once(
        &self,
        session_id: &str,
        epoch: u32,
        seq: u32,
        phase_start: Instant,
    ) -> PollAttempt {
        let request = self.endpoint.fetch_status(session_id);
        let outcome = match tokio::time::timeout(self.config.attempt_timeout(), request).await {
            Err(_) => {
                warn!(session_id, epoch, seq, "status request hit the per-attempt deadline");
                AttemptOutcome::TransportError
            }
            Ok(Err(e)) => {
                warn!(session_id, epoch, seq, error = %e, "status request failed");
                AttemptOutcome::TransportError
            }
            Ok(Ok(body)) => match normalizer::parse(&body) {
                Err(e) => {
                    warn!(session_id, epoch, seq, error = %e, "status body unparseable");
                    AttemptOutcome::ParseError
                }
                Ok(status) => match (status.state, status.result_reference) {
                    (JobState::Completed, Some(url)) => AttemptOutcome::Completed(url),
                    _ => AttemptOutcome::Pending,
                },
            },
        };

        PollAttempt {
            seq,
            epoch,
            offset: phase_start.elapsed(),
            outcome,
            at: Utc::now(),
        }
    }

    /// Run one polling phase to its natural end: completion, the
    /// consecutive-failure threshold, or attempt-budget exhaustion.
    pub async fn run_phase(&self, session_id: &str, epoch: u32) -> PhaseEnd {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let phase_start = Instant::now();
        let mut consecutive_failures = 0u32;

        for seq in 0..self.config.max_poll_attempts {
            ticker.tick().await;

            let attempt = self.poll_once(session_id, epoch, seq, phase_start).await;
            metrics::counter!("poll_attempts_total").increment(1);
            info!(
                session_id,
                epoch,
                seq,
                offset_ms = attempt.offset.as_millis() as u64,
                outcome = ?attempt.outcome,
                "poll attempt finished"
            );

            match attempt.outcome {
                AttemptOutcome::Completed(url) => return PhaseEnd::Completed(url),
                AttemptOutcome::Pending => consecutive_failures = 0,
                AttemptOutcome::TransportError | AttemptOutcome::ParseError => {
                    metrics::counter!("poll_failures_total").increment(1);
                    consecutive_failures += 1;
                    if consecutive_failures >= self.config.failure_threshold {
                        warn!(
                            session_id,
                            epoch, consecutive_failures, "failure threshold reached"
                        );
                        return PhaseEnd::RetryOffered;
                    }
                }
            }
        }

        warn!(session_id, epoch, "attempt budget exhausted without completion");
        PhaseEnd::RetryOffered
    }
}
