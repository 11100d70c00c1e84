//! Cancellation and deadline carried through one invocation.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct Invocation {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Invocation {
    pub fn new() -> Self { Self::default() }

    pub fn with_deadline(deadline: Instant) -> Self { Self { token: CancellationToken::new(), deadline: Some(deadline) } }

    pub fn with_timeout(timeout: Duration) -> Self { Self::with_deadline(Instant::now() + timeout) }

    /// Same token, deadline moved earlier by `margin`; no-op without a deadline.
    pub fn shortened(&self, margin: Duration) -> Self {
        let deadline = self.deadline.map(|d| d.checked_sub(margin).unwrap_or(d));
        Self { token: self.token.clone(), deadline }
    }

    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    /// Time left before the deadline; `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> { self.deadline.map(|d| d.saturating_duration_since(Instant::now())) }

    /// Upper bound for one remote call: `cap`, or less when the deadline is closer.
    pub fn bound(&self, cap: Duration) -> Duration { self.remaining().map(|r| r.min(cap)).unwrap_or(cap) }

    pub fn cancel(&self) { self.token.cancel() }

    pub fn is_cancelled(&self) -> bool { self.token.is_cancelled() }

    /// Resolves once the invocation is cancelled.
    pub async fn cancelled(&self) { self.token.cancelled().await }

    pub fn token(&self) -> &CancellationToken { &self.token }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_calls() {
        let inv = Invocation::with_timeout(Duration::from_secs(5));
        assert_eq!(inv.bound(Duration::from_secs(30)), Duration::from_secs(5));
        assert_eq!(inv.bound(Duration::from_secs(2)), Duration::from_secs(2));
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(inv.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn shortened_keeps_token() {
        let inv = Invocation::with_timeout(Duration::from_secs(1));
        let short = inv.shortened(Duration::from_millis(100));
        assert_eq!(short.remaining(), Some(Duration::from_millis(900)));
        inv.cancel();
        assert!(short.is_cancelled());
        short.cancelled().await;
    }

    #[test]
    fn unbounded_by_default() {
        let inv = Invocation::new();
        assert_eq!(inv.remaining(), None);
        assert_eq!(inv.shortened(Duration::from_millis(100)).deadline(), None);
        assert_eq!(inv.bound(Duration::from_secs(30)), Duration::from_secs(30));
    }
}
