// Integration Tests for Vigil
// Exercise the shutdown coordinator through its public API

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::Level;
use vigil::shutdown::ScopeHandle;
use vigil::signals::{signal_channel, ShutdownSignal};
use vigil::{
    AuditLogger, CancellableScope, Canceller, ScopeState, ShutdownCoordinator, ShutdownError,
    ShutdownTrigger, TracingLogger,
};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct RecordingLogger {
    messages: Mutex<Vec<(Level, String)>>,
}

impl AuditLogger for RecordingLogger {
    fn log(&self, level: Level, message: &str, _fields: &[(&str, &str)]) {
        self.messages.lock().push((level, message.to_string()));
    }
}

/// Wraps a real scope handle and counts effective cancellations
struct CountingHandle {
    inner: ScopeHandle,
    effective: AtomicUsize,
}

impl Canceller for CountingHandle {
    fn cancel(&self) -> bool {
        let first = self.inner.cancel();
        if first {
            self.effective.fetch_add(1, Ordering::SeqCst);
        }
        first
    }
}

#[tokio::test]
async fn test_simulated_interrupt_cancels_scope() {
    let coordinator = Arc::new(ShutdownCoordinator::new());
    let (sender, source) = signal_channel();
    let scope = coordinator.new_scope_with(source);
    assert_eq!(scope.state(), ScopeState::Active);

    assert!(sender.deliver(ShutdownSignal::Interrupt));
    timeout(WAIT, scope.cancelled()).await.expect("scope cancelled by signal");

    assert_eq!(scope.state(), ScopeState::Cancelled);
    let cause = coordinator.cause().expect("cause recorded");
    assert_eq!(cause.trigger, ShutdownTrigger::Signal(ShutdownSignal::Interrupt));
}

#[tokio::test]
async fn test_stop_then_signal_keeps_stop_as_cause() {
    let coordinator = Arc::new(ShutdownCoordinator::new());
    let (sender, source) = signal_channel();
    let scope = coordinator.new_scope_with(source);
    let derived = scope.child();
    let logger = RecordingLogger::default();

    coordinator.stop(Some(&logger), "deploy finished").unwrap();
    timeout(WAIT, derived.cancelled()).await.expect("derived scope cancelled");

    // Late signal and repeated stop are harmless
    sender.deliver(ShutdownSignal::Terminate);
    coordinator.stop(Some(&logger), "second request").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let cause = coordinator.cause().expect("cause recorded");
    assert_eq!(
        cause.trigger,
        ShutdownTrigger::Stop {
            reason: "deploy finished".to_string()
        }
    );

    let messages = logger.messages.lock();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|(level, msg)| *level == Level::INFO && msg == "stopping"));
}

#[tokio::test]
async fn test_failed_stop_leaves_scope_active() {
    let coordinator = Arc::new(ShutdownCoordinator::new());
    let (_sender, source) = signal_channel();
    let scope = coordinator.new_scope_with(source);
    let logger = RecordingLogger::default();

    assert_eq!(
        coordinator.stop(None, "reason"),
        Err(ShutdownError::Configuration("logger unset"))
    );
    assert_eq!(
        coordinator.stop(Some(&logger), ""),
        Err(ShutdownError::InvalidArgument("empty reason"))
    );

    assert_eq!(scope.state(), ScopeState::Active);
    assert!(coordinator.cause().is_none());
    assert_eq!(logger.messages.lock().as_slice(), &[(Level::ERROR, "failed stopping".to_string())]);
}

#[test]
fn test_stop_without_scope() {
    let coordinator = ShutdownCoordinator::new();
    assert_eq!(
        coordinator.stop(Some(&TracingLogger), "reason"),
        Err(ShutdownError::Configuration("no cancellation registered"))
    );
    assert!(!coordinator.exec_cancel());
}

#[test]
fn test_exec_cancel_twice() {
    let coordinator = ShutdownCoordinator::new();
    let scope = coordinator.new_detached_scope();

    assert!(coordinator.exec_cancel());
    assert!(coordinator.exec_cancel());
    assert!(scope.is_cancelled());
    assert_eq!(coordinator.cause().map(|c| c.trigger), Some(ShutdownTrigger::Direct));
}

#[test]
fn test_concurrent_stops_cancel_once() {
    const CALLERS: usize = 32;

    let coordinator = Arc::new(ShutdownCoordinator::new());
    let (scope, handle) = CancellableScope::root();
    let counting = Arc::new(CountingHandle {
        inner: handle,
        effective: AtomicUsize::new(0),
    });
    coordinator.set_cancel(counting.clone());

    let barrier = Arc::new(std::sync::Barrier::new(CALLERS));
    let callers: Vec<_> = (0..CALLERS)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                coordinator.stop(Some(&TracingLogger), &format!("caller {}", i))
            })
        })
        .collect();

    for caller in callers {
        assert!(caller.join().unwrap().is_ok());
    }

    assert!(scope.is_cancelled());
    assert_eq!(counting.effective.load(Ordering::SeqCst), 1);
    assert!(matches!(
        coordinator.cause().map(|c| c.trigger),
        Some(ShutdownTrigger::Stop { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_signal_races_with_stop() {
    let coordinator = Arc::new(ShutdownCoordinator::new());
    let (sender, source) = signal_channel();
    let scope = coordinator.new_scope_with(source);

    let stopper = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.stop(Some(&TracingLogger), "racing stop") })
    };
    sender.deliver(ShutdownSignal::Terminate);

    assert!(stopper.await.unwrap().is_ok());
    timeout(WAIT, scope.cancelled()).await.expect("scope cancelled");

    let trigger = coordinator.cause().expect("cause recorded").trigger;
    assert!(matches!(
        trigger,
        ShutdownTrigger::Signal(ShutdownSignal::Terminate) | ShutdownTrigger::Stop { .. }
    ));
}
