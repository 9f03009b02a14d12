//! Once-per-process installers
//!
//! Module installers (schema adjustments and similar one-time setup) run from
//! the `Loaded` hook through [`InstallerTracker::run_once`], which records the
//! attempt in an [`InstallationLedger`] before awaiting the installer.
//!
//! The ledger lives in memory only. Installers must themselves be idempotent
//! ("create if not exists"), so that a process restart, which starts from an
//! empty ledger, retries them safely.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::module::traits::ModuleError;

/// Keys whose installer has been attempted during this process lifetime
#[derive(Debug, Default)]
pub struct InstallationLedger {
    keys: Mutex<BTreeSet<String>>,
}

impl InstallationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `key`; returns `false` if it was claimed before
    pub fn try_claim(&self, key: &str) -> bool {
        self.lock().insert(key.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a [`InstallerTracker::run_once`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// This call ran the installer to completion
    Installed,
    /// An earlier call already claimed the key; the installer was not invoked
    AlreadyAttempted,
}

/// At-most-once execution of installers, keyed by name
#[derive(Debug, Clone, Default)]
pub struct InstallerTracker {
    ledger: Arc<InstallationLedger>,
}

impl InstallerTracker {
    pub fn new(ledger: Arc<InstallationLedger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<InstallationLedger> {
        &self.ledger
    }

    /// Run `installer` unless `key` has been attempted in this process
    ///
    /// The key is claimed before the installer is awaited, so a second call
    /// arriving while the first is still in flight returns
    /// [`InstallOutcome::AlreadyAttempted`] without waiting. A failed install
    /// keeps its claim and is not retried until the process restarts.
    pub async fn run_once<F, Fut>(&self, key: &str, installer: F) -> Result<InstallOutcome, ModuleError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ModuleError>>,
    {
        if !self.ledger.try_claim(key) {
            debug!("Installer {} already attempted, skipping", key);
            return Ok(InstallOutcome::AlreadyAttempted);
        }

        info!("Running installer {}", key);
        match installer().await {
            Ok(()) => {
                info!("Installer {} completed", key);
                Ok(InstallOutcome::Installed)
            }
            Err(e) => {
                warn!("Installer {} failed (not retried until restart): {}", key, e);
                Err(ModuleError::InstallFailed(format!("{}: {}", key, e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn test_runs_once() {
        let tracker = InstallerTracker::default();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..3 {
            let _ = tracker
                .run_once("m", move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(tracker.ledger().contains("m"));
    }

    #[tokio::test]
    async fn test_in_flight_call_is_not_reentered() {
        let tracker = InstallerTracker::default();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let slow = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(50)).await;
            Ok(())
        };

        let (first, second) = tokio::join!(tracker.run_once("m", slow), tracker.run_once("m", slow));

        assert_eq!(first.unwrap(), InstallOutcome::Installed);
        assert_eq!(second.unwrap(), InstallOutcome::AlreadyAttempted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let third = tracker.run_once("m", slow).await.unwrap();
        assert_eq!(third, InstallOutcome::AlreadyAttempted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_claim() {
        let tracker = InstallerTracker::default();

        let result = tracker
            .run_once("m", || async {
                Err(ModuleError::OperationError("disk full".into()))
            })
            .await;
        assert!(matches!(result, Err(ModuleError::InstallFailed(_))));

        let retry = tracker.run_once("m", || async { Ok(()) }).await.unwrap();
        assert_eq!(retry, InstallOutcome::AlreadyAttempted);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let tracker = InstallerTracker::default();
        assert_eq!(
            tracker.run_once("a", || async { Ok(()) }).await.unwrap(),
            InstallOutcome::Installed
        );
        assert_eq!(
            tracker.run_once("b", || async { Ok(()) }).await.unwrap(),
            InstallOutcome::Installed
        );
        assert_eq!(tracker.ledger().keys(), vec!["a", "b"]);
    }
}
