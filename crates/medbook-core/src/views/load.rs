use std::sync::atomic::{AtomicU64, Ordering};

/// Proof that a load was started; see [`LoadGuard::is_current`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Generation counter for "is this result still wanted?".
///
/// Start each fetch with [`begin`](Self::begin) and apply its result only if
/// the ticket is still current. A newer `begin` or an `invalidate` (the view
/// was left) makes older tickets stale.
#[derive(Debug, Default)]
pub struct LoadGuard {
    generation: AtomicU64,
}

impl LoadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> LoadTicket {
        LoadTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// `Some(value)` if the ticket is still current, else the value is dropped.
    pub fn accept<T>(&self, ticket: LoadTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            tracing::debug!(ticket = ticket.0, "Discarding stale load result");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_load_supersedes() {
        let guard = LoadGuard::new();
        let first = guard.begin();
        assert!(guard.is_current(first));

        let second = guard.begin();
        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));
        assert_eq!(guard.accept(first, "old"), None);
        assert_eq!(guard.accept(second, "new"), Some("new"));
    }

    #[test]
    fn test_invalidate_drops_pending() {
        let guard = LoadGuard::new();
        let ticket = guard.begin();
        guard.invalidate();
        assert!(!guard.is_current(ticket));
        assert!(guard.accept(ticket, vec![1, 2]).is_none());
    }

    #[tokio::test]
    async fn test_out_of_order_completion() {
        let guard = std::sync::Arc::new(LoadGuard::new());
        let slow = guard.begin();
        let fast = guard.begin();

        let g = guard.clone();
        let late = tokio::spawn(async move {
            tokio::task::yield_now().await;
            g.accept(slow, "slow result")
        });
        assert_eq!(guard.accept(fast, "fast result"), Some("fast result"));
        assert_eq!(late.await.unwrap(), None);
    }
}
