// Cancellable scopes and the handles that cancel them

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

/// Capability that marks a scope as finished
///
/// Implementations must be idempotent. `cancel` returns `true` only for the
/// call that performed the transition to cancelled.
pub trait Canceller: Send + Sync {
    fn cancel(&self) -> bool;
}

/// Lifecycle state of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Active,
    Cancelled,
}

/// A cancellable unit of work
///
/// Clones observe the same state. Scopes derived with [`CancellableScope::child`]
/// are cancelled together with their parent but not the other way around.
#[derive(Debug, Clone)]
pub struct CancellableScope {
    token: CancellationToken,
}

impl CancellableScope {
    /// Create a root scope together with the handle that cancels it
    pub fn root() -> (Self, ScopeHandle) {
        let token = CancellationToken::new();
        let handle = ScopeHandle {
            token: token.clone(),
            fired: Arc::new(AtomicBool::new(false)),
        };
        (Self { token }, handle)
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn state(&self) -> ScopeState {
        if self.is_cancelled() {
            ScopeState::Cancelled
        } else {
            ScopeState::Active
        }
    }

    /// Resolves once the scope is cancelled
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Derive a scope that is cancelled whenever this one is
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Underlying token, for APIs that take a `CancellationToken` directly
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Cancellation handle of a root scope
#[derive(Debug, Clone)]
pub struct ScopeHandle {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl Canceller for ScopeHandle {
    fn cancel(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        debug!("Root scope cancelled");
        true
    }
}
