//! Contexto de un batch: cancelación y deadline.
//!
//! El committer consulta el contexto entre fases; si está cancelado antes del
//! commit, la transacción se revierte.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CommitContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CommitContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contexto que se considera cancelado pasado `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)),
               deadline: Some(Instant::now() + timeout) }
    }

    /// Cancela el contexto (y todas sus copias).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_shared_between_clones() {
        let ctx = CommitContext::new();
        let other = ctx.clone();
        assert!(!other.is_cancelled());
        ctx.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn expired_deadline_counts_as_cancelled() {
        let ctx = CommitContext::with_timeout(Duration::ZERO);
        assert!(ctx.is_cancelled());
    }
}
