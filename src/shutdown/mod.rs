// Shutdown Coordination Module
// Owns the process cancellation handle and the audited stop path

pub mod audit;
pub mod scope;

pub use audit::{AuditLogger, TracingLogger};
pub use scope::{CancellableScope, Canceller, ScopeHandle, ScopeState};

use chrono::{DateTime, Utc};
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::RefCell;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::signals::{self, OsSignalSource, ShutdownSignal, ShutdownSignalSource};

/// Reasons a stop request is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShutdownError {
    #[error("configuration error: {0}")]
    Configuration(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// What triggered a cancellation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// OS signal delivered to the listener
    Signal(ShutdownSignal),
    /// Audited stop request
    Stop { reason: String },
    /// Unvalidated `exec_cancel`
    Direct,
}

/// Audit record of the cancellation that took effect
#[derive(Debug, Clone)]
pub struct ShutdownCause {
    pub trigger: ShutdownTrigger,
    pub at: DateTime<Utc>,
}

/// Process-wide shutdown coordinator
///
/// Holds the single registered cancellation handle. Share it behind an `Arc`
/// with every component that may need to request shutdown.
pub struct ShutdownCoordinator {
    /// Currently registered handle (replaced, never stacked)
    registration: RwLock<Option<Registration>>,
}

/// A handle together with the cause slot of its own lifecycle
#[derive(Clone)]
struct Registration {
    handle: Arc<dyn Canceller>,
    cause: Arc<CauseSlot>,
}

/// Held by the firing thread for the whole cancellation; reentrant so the
/// canceller itself may read it
type CauseSlot = ReentrantMutex<RefCell<Option<ShutdownCause>>>;

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            registration: RwLock::new(None),
        }
    }

    /// Create the root scope and start listening for SIGTERM/SIGINT
    ///
    /// Must be called from within a Tokio runtime. If the OS signal
    /// subscription fails the scope is still returned, without a listener.
    pub fn new_scope(self: &Arc<Self>) -> CancellableScope {
        match OsSignalSource::new() {
            Ok(source) => {
                let scope = self.new_scope_with(source);
                info!("Signal handlers installed (SIGTERM, SIGINT)");
                scope
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handlers, shutdown only via stop requests");
                self.new_detached_scope()
            }
        }
    }

    /// Create the root scope with a custom signal source
    pub fn new_scope_with<S: ShutdownSignalSource>(self: &Arc<Self>, source: S) -> CancellableScope {
        let scope = self.new_detached_scope();
        tokio::spawn(signals::listen(source, Arc::clone(self)));
        scope
    }

    /// Create and register a root scope without any signal listener
    pub fn new_detached_scope(&self) -> CancellableScope {
        let (scope, handle) = CancellableScope::root();
        self.set_cancel(Arc::new(handle));
        scope
    }

    /// Replace the registered cancellation handle
    ///
    /// Low-level override for wiring and tests. Clears the recorded cause.
    pub fn set_cancel(&self, handle: Arc<dyn Canceller>) {
        *self.registration.write() = Some(Registration {
            handle,
            cause: Arc::new(ReentrantMutex::new(RefCell::new(None))),
        });
    }

    /// Currently registered handle, if any
    pub fn registered(&self) -> Option<Arc<dyn Canceller>> {
        self.registration.read().as_ref().map(|r| Arc::clone(&r.handle))
    }

    /// Cause of the cancellation of the registered handle, if it took effect
    pub fn cause(&self) -> Option<ShutdownCause> {
        let slot = self.registration.read().as_ref().map(|r| Arc::clone(&r.cause))?;
        let guard = slot.lock();
        let cause = guard.borrow().clone();
        cause
    }

    /// Request a graceful shutdown
    ///
    /// A non-empty `reason` is mandatory and is logged before cancelling. This
    /// is the only sanctioned way for application code to stop the process.
    /// Safe to call after the scope was already cancelled.
    pub fn stop(&self, logger: Option<&dyn AuditLogger>, reason: &str) -> Result<(), ShutdownError> {
        let Some(logger) = logger else {
            return Err(ShutdownError::Configuration("logger unset"));
        };

        if self.registered().is_none() {
            return Err(report(logger, ShutdownError::Configuration("no cancellation registered")));
        }

        if reason.is_empty() {
            return Err(report(logger, ShutdownError::InvalidArgument("empty reason")));
        }

        logger.info("stopping", &[("reason", reason)]);
        self.fire(ShutdownTrigger::Stop {
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// Invoke the registered handle without any validation
    ///
    /// Bypasses the audit trail of [`ShutdownCoordinator::stop`]; meant for
    /// internal wiring and tests. Returns `false` if no handle is registered.
    pub fn exec_cancel(&self) -> bool {
        if self.registered().is_none() {
            debug!("exec_cancel called without a registered handle");
            return false;
        }
        self.fire(ShutdownTrigger::Direct);
        true
    }

    /// Invoke the registered handle, recording `trigger` if this call cancels
    ///
    /// Returns `true` only for the call that performed the cancellation. The
    /// registry lock is released before the handle runs, so a canceller may
    /// call back into the coordinator from the same thread. Only the cause
    /// slot stays locked, which makes `cause()` on other threads wait for the
    /// record instead of observing a cancelled scope with no cause. A
    /// canceller must not block on other threads that use the coordinator.
    ///
    /// The cause lands in the slot of the handle that was invoked; a handle
    /// registered meanwhile keeps its own empty slot.
    pub(crate) fn fire(&self, trigger: ShutdownTrigger) -> bool {
        let Some(registration) = self.registration.read().clone() else {
            return false;
        };

        let slot = registration.cause.lock();
        if !registration.handle.cancel() {
            return false;
        }

        let mut cause = slot.borrow_mut();
        if cause.is_none() {
            *cause = Some(ShutdownCause {
                trigger,
                at: Utc::now(),
            });
        }
        true
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

fn report(logger: &dyn AuditLogger, err: ShutdownError) -> ShutdownError {
    let message = err.to_string();
    logger.error("failed stopping", &[("error", message.as_str())]);
    err
}
