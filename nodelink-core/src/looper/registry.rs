//! Named loopers owned by the connection store
//!
//! At most one looper exists per action name. Starting an action that is
//! already looping hands back the existing handle.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::FunctionLooper;

/// A running looper together with the action it dispatches
#[derive(Debug, Clone)]
pub struct ActionLooper {
    pub action: String,
    pub looper: FunctionLooper,
}

impl ActionLooper {
    pub fn new(action: impl Into<String>, looper: FunctionLooper) -> Self {
        Self {
            action: action.into(),
            looper,
        }
    }
}

/// Request to loop a named action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLooperConfig {
    pub action: String,
    pub interval: Duration,
}

impl ActionLooperConfig {
    pub fn new(action: impl Into<String>, interval: Duration) -> Self {
        Self {
            action: action.into(),
            interval,
        }
    }
}

/// Keyed set of running loopers
#[derive(Debug, Default)]
pub struct LooperRegistry {
    loopers: Mutex<HashMap<String, FunctionLooper>>,
}

impl LooperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FunctionLooper>> {
        self.loopers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a looper for `config.action` unless one is registered already
    ///
    /// `build` is only invoked when the action has no looper yet; the check
    /// and the insert happen under one lock.
    pub fn start_if_absent<F>(&self, config: &ActionLooperConfig, build: F) -> FunctionLooper
    where
        F: FnOnce() -> FunctionLooper,
    {
        let mut loopers = self.lock();
        if let Some(current) = loopers.get(&config.action) {
            info!(
                action = %config.action,
                "Requested to start looping action which is already looping"
            );
            return current.clone();
        }

        let looper = build();
        looper.start();
        if !looper.is_running() {
            warn!(action = %config.action, "Action looper did not start, leaving it unregistered");
            return looper;
        }
        debug!(action = %config.action, interval_ms = config.interval.as_millis(), "Started action looper");
        loopers.insert(config.action.clone(), looper.clone());
        looper
    }

    /// Register `entry`, replacing any looper stored under the same action
    pub fn insert(&self, entry: ActionLooper) -> Option<FunctionLooper> {
        self.lock().insert(entry.action, entry.looper)
    }

    /// Looper registered for `action`
    pub fn get(&self, action: &str) -> Option<FunctionLooper> {
        self.lock().get(action).cloned()
    }

    /// Stop the looper of `action` and drop its entry
    pub async fn stop(&self, action: &str) {
        let looper = self.get(action);
        if let Some(looper) = &looper {
            looper.stop().await;
        }

        let mut loopers = self.lock();
        // Keep a replacement registered while we were stopping
        let replaced = match (loopers.get(action), &looper) {
            (Some(current), Some(stopped)) => !current.ptr_eq(stopped),
            _ => false,
        };
        if !replaced {
            loopers.remove(action);
        }
    }

    /// Stop every registered looper
    pub async fn stop_all(&self) {
        let actions = self.actions();
        for action in actions {
            self.stop(&action).await;
        }
    }

    /// Names of all registered actions, sorted
    pub fn actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = self.lock().keys().cloned().collect();
        actions.sort();
        actions
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
