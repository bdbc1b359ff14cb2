use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Bounds the total wait for one polling phase.
///
/// Started the moment the orchestrator enters the polling state. `fired()`
/// resolves at the deadline at most once; if the phase ends first the guard
/// is simply dropped, which cancels it. `elapsed()`/`remaining()` back the
/// countdown the processing screen shows.
#[derive(Debug)]
pub struct TimeoutGuard {
    started: Instant,
    deadline: Instant,
    fired: bool,
}

impl TimeoutGuard {
    pub fn start(limit: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + limit,
            fired: false,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Resolve when the deadline passes. After firing once, never resolves
    /// again so a stray second await cannot retrigger the timeout path.
    pub async fn fired(&mut self) {
        if self.fired {
            return std::future::pending().await;
        }
        sleep_until(self.deadline).await;
        self.fired = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_at_the_deadline() {
        let mut guard = TimeoutGuard::start(Duration::from_secs(60));
        assert!(!guard.has_fired());
        guard.fired().await;
        assert!(guard.has_fired());
        assert!(guard.elapsed() >= Duration::from_secs(60));
        assert_eq!(guard.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_remaining_time() {
        let guard = TimeoutGuard::start(Duration::from_secs(60));
        tokio::time::advance(Duration::from_secs(25)).await;
        assert_eq!(guard.remaining(), Duration::from_secs(35));
        assert_eq!(guard.elapsed(), Duration::from_secs(25));
    }

    #[tokio::test(start_paused = true)]
    async fn second_await_never_resolves() {
        let mut guard = TimeoutGuard::start(Duration::from_millis(5));
        guard.fired().await;

        let second = tokio::time::timeout(Duration::from_secs(120), guard.fired()).await;
        assert!(second.is_err(), "guard fired a second time");
    }
}
