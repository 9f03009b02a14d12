//! Route mount guard
//!
//! Guarantees that a namespace prefix receives its body-parsing middleware at
//! most once for the whole server, however many times (and by however many
//! modules) it is requested.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::http::{BodyParserFactory, HttpServer};

/// Prefixes that already have body-parsing middleware
///
/// Insertion is the only mutation, and it is a test-and-set under the lock.
#[derive(Debug, Default)]
pub struct MountRegistry {
    prefixes: Mutex<BTreeSet<String>>,
}

impl MountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // The set stays consistent even if a holder panicked: every mutation is
    // a single insert.
    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.prefixes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `prefix`; returns `false` if it was already present
    pub fn try_insert(&self, prefix: &str) -> bool {
        self.lock().insert(prefix.to_string())
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.lock().contains(prefix)
    }

    /// Snapshot of recorded prefixes, sorted
    pub fn prefixes(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mount-once policy over a shared [`MountRegistry`]
///
/// Keys strictly on the literal prefix string: two modules that choose the
/// same base path share one parser.
#[derive(Debug, Clone, Default)]
pub struct RouteMountGuard {
    registry: Arc<MountRegistry>,
}

impl RouteMountGuard {
    pub fn new(registry: Arc<MountRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MountRegistry> {
        &self.registry
    }

    /// Install body-parsing middleware at `prefix` unless it already has one
    ///
    /// Returns `true` when this call installed the middleware. Duplicate calls
    /// are a silent no-op, not an error.
    pub fn ensure_body_parser(
        &self,
        server: &mut HttpServer,
        prefix: &str,
        factory: &dyn BodyParserFactory,
    ) -> bool {
        if !self.registry.try_insert(prefix) {
            debug!("Body parser already mounted at {}, skipping", prefix);
            return false;
        }

        server.use_middleware(prefix, factory.create());
        info!("Mounted body parser at {}", prefix);
        true
    }
}
