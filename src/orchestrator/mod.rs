//! The submission-and-polling state machine.
//!
//! One orchestrator drives one user's flow: a single outbound submission,
//! then fixed-rate status polling bounded by a global deadline, ending in a
//! completed, timed-out, failed, or abandoned flow. All session mutation
//! happens on the orchestrator task; the UI observes state through a watch
//! channel and steers through a [`FlowController`].

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info};

use crate::config::FlowConfig;
use crate::services::poller::{PhaseEnd, ResultPoller};
use crate::services::store::SessionStore;
use crate::services::submitter::JobSubmitter;
use crate::services::timeout::TimeoutGuard;
use crate::services::webhook::JobEndpoint;

/// User-visible state of one flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Idle,
    Submitting,
    /// Polling is live; `deadline` lets the processing page render the
    /// countdown without reaching into the orchestrator.
    Polling {
        epoch: u32,
        deadline: tokio::time::Instant,
    },
    /// Polling paused after repeated failures; waiting for the user to
    /// retry (same session id, no resubmission) or give up.
    ManualRetryOffered { epoch: u32 },
    Completed { result_url: String },
    /// Submission failed. Recovering means restarting the whole flow, not
    /// just polling, so this is terminal for the orchestrator.
    Failed { reason: String },
    TimedOut,
    Abandoned,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::TimedOut | Self::Abandoned
        )
    }
}

/// Commands the UI can send into a running flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowCommand {
    Retry,
    Cancel,
}

/// Handle the UI uses to steer the flow. Cloneable; dropping every clone
/// while the flow is waiting abandons it, which matches the user navigating
/// away from the processing page.
#[derive(Clone)]
pub struct FlowController {
    commands: mpsc::UnboundedSender<FlowCommand>,
}

impl FlowController {
    /// Start a fresh polling phase: attempt counters and the deadline reset,
    /// the session id stays, nothing is resubmitted.
    pub fn retry(&self) {
        let _ = self.commands.send(FlowCommand::Retry);
    }

    pub fn cancel(&self) {
        let _ = self.commands.send(FlowCommand::Cancel);
    }
}

/// Everything the processing page needs: the controller, a state feed, and
/// the join handle resolving to the terminal state.
pub struct FlowHandle {
    pub controller: FlowController,
    pub state: watch::Receiver<FlowState>,
    pub task: JoinHandle<FlowState>,
}

/// Composes submitter, poller and timeout guard into the flow state machine.
pub struct Orchestrator {
    store: Arc<SessionStore>,
    submitter: JobSubmitter,
    poller: ResultPoller,
    config: FlowConfig,
    state_tx: watch::Sender<FlowState>,
    commands: mpsc::UnboundedReceiver<FlowCommand>,
}

enum PhaseEvent {
    Ended(PhaseEnd),
    TimedOut,
    Command(Option<FlowCommand>),
}

impl Orchestrator {
    pub fn new(
        store: Arc<SessionStore>,
        endpoint: Arc<dyn JobEndpoint>,
        config: FlowConfig,
    ) -> (Self, FlowController, watch::Receiver<FlowState>) {
        let (state_tx, state_rx) = watch::channel(FlowState::Idle);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let orchestrator = Self {
            store,
            submitter: JobSubmitter::new(endpoint.clone()),
            poller: ResultPoller::new(endpoint, config.clone()),
            config,
            state_tx,
            commands: cmd_rx,
        };
        let controller = FlowController { commands: cmd_tx };

        (orchestrator, controller, state_rx)
    }

    /// Build and launch a flow on the runtime. This is what the processing
    /// page calls on mount.
    pub fn spawn(
        store: Arc<SessionStore>,
        endpoint: Arc<dyn JobEndpoint>,
        config: FlowConfig,
    ) -> FlowHandle {
        let (orchestrator, controller, state) = Self::new(store, endpoint, config);
        let task = tokio::spawn(orchestrator.run());
        FlowHandle {
            controller,
            state,
            task,
        }
    }

    /// Drive the flow to a terminal state.
    pub async fn run(mut self) -> FlowState {
        let session_id = self.store.session_id();

        // Single-submission invariant: a duplicate mount of the processing
        // page finds the flag already set and produces zero outbound traffic.
        if !self.store.begin_submission() {
            info!(session_id = %session_id, "submission already triggered for this session, duplicate start is a no-op");
            return self.state_tx.borrow().clone();
        }

        self.set_state(FlowState::Submitting);
        if let Err(e) = self.submitter.submit(&self.store).await {
            error!(session_id = %session_id, error = %e, "submission failed, flow will not poll");
            return self.finish(FlowState::Failed {
                reason: e.to_string(),
            });
        }

        // Give the remote scenario a moment to register the job before the
        // first status check.
        tokio::select! {
            _ = sleep(self.config.grace_delay()) => {}
            cmd = self.commands.recv() => {
                if let Some(FlowCommand::Cancel) | None = cmd {
                    return self.finish(FlowState::Abandoned);
                }
            }
        }

        let mut epoch = 0u32;
        loop {
            let mut guard = TimeoutGuard::start(self.config.overall_timeout());
            self.set_state(FlowState::Polling {
                epoch,
                deadline: guard.deadline(),
            });

            // Racing the phase against the guard and the command channel
            // means a timeout or cancellation drops the phase future, and
            // with it any in-flight attempt: a late completed answer from a
            // stale attempt can never mutate state.
            let event = tokio::select! {
                end = self.poller.run_phase(&session_id, epoch) => PhaseEvent::Ended(end),
                _ = guard.fired() => PhaseEvent::TimedOut,
                cmd = self.commands.recv() => PhaseEvent::Command(cmd),
            };

            match event {
                PhaseEvent::Ended(PhaseEnd::Completed(url)) => {
                    self.store.set_result_url(&url);
                    metrics::counter!("flows_completed_total").increment(1);
                    info!(session_id = %session_id, epoch, result_url = %url, "flow completed");
                    return self.finish(FlowState::Completed { result_url: url });
                }
                PhaseEvent::Ended(PhaseEnd::RetryOffered) => {
                    self.set_state(FlowState::ManualRetryOffered { epoch });
                    // No automatic ticks while the offer stands.
                    match self.commands.recv().await {
                        Some(FlowCommand::Retry) => {
                            info!(session_id = %session_id, epoch, "manual retry requested");
                            epoch += 1;
                        }
                        Some(FlowCommand::Cancel) | None => {
                            return self.finish(FlowState::Abandoned);
                        }
                    }
                }
                PhaseEvent::TimedOut => {
                    self.store.mark_timeout_expired();
                    metrics::counter!("flows_timed_out_total").increment(1);
                    info!(session_id = %session_id, epoch, "polling deadline expired");
                    return self.finish(FlowState::TimedOut);
                }
                PhaseEvent::Command(Some(FlowCommand::Retry)) => {
                    // Retry during an active phase: fresh epoch, fresh
                    // counters, fresh deadline.
                    info!(session_id = %session_id, epoch, "retry requested mid-phase");
                    epoch += 1;
                }
                PhaseEvent::Command(Some(FlowCommand::Cancel)) | PhaseEvent::Command(None) => {
                    return self.finish(FlowState::Abandoned);
                }
            }
        }
    }

    fn set_state(&self, state: FlowState) {
        info!(state = ?state, "flow state change");
        let _ = self.state_tx.send(state);
    }

    fn finish(&self, state: FlowState) -> FlowState {
        self.set_state(state.clone());
        state
    }
}
