//! Rearmable deadline owned by a bridge session.
//!
//! The silence prompt and the post-turn nudge are the bridge's only delayed
//! actions. Each is a single outstanding deadline: rearming replaces the
//! previous one, disarming cancels it, and because the deadline lives on the
//! session's select loop it dies with the session - nothing can fire against
//! a torn-down call.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// A single-shot, rearmable deadline.
#[derive(Debug)]
pub struct ResetTimer {
    period: Duration,
    deadline: Option<Instant>,
}

impl ResetTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            deadline: None,
        }
    }

    /// Arm (or re-arm) the timer `period` from now. Only one deadline is
    /// ever outstanding; rearming replaces the prior one.
    pub fn rearm(&mut self) {
        self.deadline = Some(Instant::now() + self.period);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Future that completes at the deadline, or never while disarmed.
    ///
    /// Captures the current deadline by value, so select arms using it hold
    /// no borrow and handlers may rearm/disarm freely; the next loop
    /// iteration picks up the new deadline.
    pub fn wait(&self) -> impl Future<Output = ()> + 'static {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_one_period_after_rearm() {
        let mut timer = ResetTimer::new(Duration::from_secs(10));
        let start = Instant::now();
        timer.rearm();
        timer.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_deadline() {
        // Rearming twice within the window yields exactly one deadline,
        // timed from the second rearm.
        let mut timer = ResetTimer::new(Duration::from_secs(10));
        let start = Instant::now();

        timer.rearm();
        tokio::time::advance(Duration::from_secs(5)).await;
        timer.rearm();

        timer.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(15));
        // One outstanding deadline, not two: disarming leaves nothing to fire.
        timer.disarm();
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_timer_never_fires() {
        let timer = ResetTimer::new(Duration::from_millis(10));
        let fired = tokio::time::timeout(Duration::from_secs(60), timer.wait()).await;
        assert!(fired.is_err(), "disarmed timer must not fire");
    }
}
