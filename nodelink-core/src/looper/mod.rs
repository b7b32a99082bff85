//! Restartable periodic execution of async actions
//!
//! A [`FunctionLooper`] runs one bound action repeatedly: execute, wait the
//! configured interval after it settles, repeat. Stopping never interrupts an
//! action that is already running; it only prevents the next cycle.

pub mod registry;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

pub use registry::{ActionLooper, ActionLooperConfig, LooperRegistry};

type BoxedAction =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync>;
type ErrorObserver = Arc<dyn Fn(&anyhow::Error) + Send + Sync>;

/// Cloneable handle to a periodic action
///
/// All clones drive the same loop.
#[derive(Clone)]
pub struct FunctionLooper {
    inner: Arc<LooperInner>,
}

struct LooperInner {
    action: BoxedAction,
    interval: Duration,
    observers: Mutex<Vec<ErrorObserver>>,
    state: Mutex<LoopState>,
    next_generation: AtomicU64,
}

enum LoopState {
    Idle,
    Running(RunningLoop),
}

struct RunningLoop {
    generation: u64,
    stop_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
    /// `start()` arrived after stop was requested
    restart_requested: bool,
}

impl FunctionLooper {
    /// Create an idle looper for `action`, repeated every `interval`
    pub fn new<F, Fut>(action: F, interval: Duration) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let action: BoxedAction = Arc::new(move || Box::pin(action()));
        Self {
            inner: Arc::new(LooperInner {
                action,
                interval,
                observers: Mutex::new(Vec::new()),
                state: Mutex::new(LoopState::Idle),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Begin looping; no-op when already running
    ///
    /// The first execution happens immediately. Must be called from within a
    /// tokio runtime.
    pub fn start(&self) {
        let launch = {
            let mut state = self.inner.lock_state();
            match &mut *state {
                LoopState::Running(running) => {
                    if *running.stop_tx.borrow() {
                        debug!("Looper start requested while stopping, restarting afterwards");
                        running.restart_requested = true;
                    } else {
                        debug!("Looper already running, ignoring start");
                    }
                    return;
                }
                LoopState::Idle => match self.inner.prepare_loop() {
                    Some((running, launch)) => {
                        *state = LoopState::Running(running);
                        launch
                    }
                    None => return,
                },
            }
        };
        launch.spawn();
    }

    /// Stop looping once the in-flight execution, if any, has finished
    ///
    /// Resolves immediately when the looper is not running. Dropping the
    /// returned future does not cancel the stop request.
    pub async fn stop(&self) {
        let mut done_rx = {
            let state = self.inner.lock_state();
            match &*state {
                LoopState::Idle => return,
                LoopState::Running(running) => {
                    let _ = running.stop_tx.send(true);
                    running.done_rx.clone()
                }
            }
        };

        // The loop task leaves the running state itself before signalling;
        // a closed channel means it is gone as well
        let _ = done_rx.wait_for(|done| *done).await;
    }

    /// Whether a loop is active, including one that is being stopped
    pub fn is_running(&self) -> bool {
        matches!(*self.inner.lock_state(), LoopState::Running(_))
    }

    /// Register an observer for action failures
    ///
    /// Failures never stop the loop.
    pub fn on_function_error<F>(&self, observer: F)
    where
        F: Fn(&anyhow::Error) + Send + Sync + 'static,
    {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::new(observer));
    }

    /// Whether two handles drive the same loop
    pub fn ptr_eq(&self, other: &FunctionLooper) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for FunctionLooper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionLooper")
            .field("interval", &self.inner.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Owned by the loop task; settles the looper state however the task ends
///
/// Runs on normal exit, when the action panics, and when the runtime drops
/// the task.
struct LoopExit {
    inner: Arc<LooperInner>,
    generation: u64,
    done_tx: watch::Sender<bool>,
}

impl Drop for LoopExit {
    fn drop(&mut self) {
        let launch = {
            let mut state = self.inner.lock_state();
            let restart = match &*state {
                LoopState::Running(running) if running.generation == self.generation => {
                    Some(running.restart_requested)
                }
                _ => None,
            };
            match restart {
                Some(true) => {
                    debug!("Restarting looper after stop");
                    *state = LoopState::Idle;
                    self.inner.prepare_loop().map(|(running, launch)| {
                        *state = LoopState::Running(running);
                        launch
                    })
                }
                Some(false) => {
                    *state = LoopState::Idle;
                    None
                }
                None => None,
            }
        };
        let _ = self.done_tx.send(true);
        if let Some(launch) = launch {
            launch.spawn();
        }
    }
}

/// A prepared loop task, spawned once the state lock is released
struct LoopLaunch {
    runtime: tokio::runtime::Handle,
    stop_rx: watch::Receiver<bool>,
    exit: LoopExit,
}

impl LoopLaunch {
    fn spawn(self) {
        let inner = Arc::clone(&self.exit.inner);
        self.runtime.spawn(inner.run(self.stop_rx, self.exit));
    }
}

impl LooperInner {
    fn lock_state(&self) -> MutexGuard<'_, LoopState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn prepare_loop(self: &Arc<Self>) -> Option<(RunningLoop, LoopLaunch)> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Cannot start looper outside of a tokio runtime: {}", e);
                return None;
            }
        };

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        let running = RunningLoop {
            generation,
            stop_tx,
            done_rx,
            restart_requested: false,
        };
        let launch = LoopLaunch {
            runtime,
            stop_rx,
            exit: LoopExit {
                inner: Arc::clone(self),
                generation,
                done_tx,
            },
        };
        Some((running, launch))
    }

    async fn run(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>, exit: LoopExit) {
        let _exit = exit;
        loop {
            if *stop_rx.borrow() {
                break;
            }

            if let Err(err) = (self.action)().await {
                self.notify_error(&err);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = stop_rx.wait_for(|stopped| *stopped) => break,
            }
        }
    }

    fn notify_error(&self, err: &anyhow::Error) {
        let observers: Vec<ErrorObserver> = self
            .observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if observers.is_empty() {
            debug!("Looped action failed without observers: {:#}", err);
        }
        for observer in observers {
            observer(err);
        }
    }
}
