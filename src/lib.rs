//! Vigil: process-wide shutdown coordination
//!
//! One cancellation handle per process, fired by whichever comes first:
//! a SIGINT/SIGTERM delivered to the signal listener, or an audited
//! [`ShutdownCoordinator::stop`] request carrying a mandatory reason.
//!
//! ```text
//!   OS signal ──▶ signals::listen ──┐
//!                                   ├──▶ registered Canceller ──▶ root scope cancelled
//!   stop(logger, reason) ──────────┘
//! ```

pub mod cli;
pub mod config;
pub mod observability;
pub mod preferences;
pub mod shutdown;
pub mod signals;
pub mod update;

pub use config::VigilConfig;
pub use shutdown::{
    AuditLogger, CancellableScope, Canceller, ScopeState, ShutdownCause, ShutdownCoordinator,
    ShutdownError, ShutdownTrigger, TracingLogger,
};
pub use signals::{ShutdownSignal, ShutdownSignalSource};
