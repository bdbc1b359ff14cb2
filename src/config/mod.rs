use serde::Deserialize;
use std::time::Duration;

/// Flow configuration.
///
/// Every timing constant here has varied across revisions of the flow, so all
/// of them are environment-overridable with the current production values as
/// defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowConfig {
    /// Make.com webhook receiving the one-shot multipart submission.
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,

    /// Make.com webhook answering status queries (`?sessionId=`).
    #[serde(default = "default_poll_url")]
    pub poll_url: String,

    /// Delay between a successful submission and the first status check,
    /// giving the remote scenario time to register the job.
    #[serde(default = "default_grace_delay_secs")]
    pub grace_delay_secs: u64,

    /// Fixed inter-attempt polling interval.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound on a single status request.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Global deadline for one polling phase.
    #[serde(default = "default_overall_timeout_secs")]
    pub overall_timeout_secs: u64,

    /// Planned attempts per polling phase. The overall timeout is normally
    /// the tighter bound; this caps a phase if the timeout is raised.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Consecutive failed attempts before a manual retry is offered.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

fn default_webhook_url() -> String {
    "https://hook.us2.make.com/ie7cprxmog22liwjj293tomqtnx7ftkw".to_string()
}

fn default_poll_url() -> String {
    "https://hook.us2.make.com/uixynbx5eroomd434tu96wxbf2zjdduv".to_string()
}

fn default_grace_delay_secs() -> u64 {
    3
}

fn default_poll_interval_secs() -> u64 {
    7
}

fn default_attempt_timeout_secs() -> u64 {
    10
}

fn default_overall_timeout_secs() -> u64 {
    60
}

fn default_max_poll_attempts() -> u32 {
    13
}

fn default_failure_threshold() -> u32 {
    5
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            webhook_url: default_webhook_url(),
            poll_url: default_poll_url(),
            grace_delay_secs: default_grace_delay_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            overall_timeout_secs: default_overall_timeout_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

impl FlowConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_secs(self.grace_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_values() {
        let config = FlowConfig::default();
        assert_eq!(config.grace_delay(), Duration::from_secs(3));
        assert_eq!(config.poll_interval(), Duration::from_secs(7));
        assert_eq!(config.attempt_timeout(), Duration::from_secs(10));
        assert_eq!(config.overall_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_poll_attempts, 13);
        assert_eq!(config.failure_threshold, 5);
    }
}
