//! Frontend surface resolver
//!
//! Selects a module's UI entry point from an ordered list of candidate
//! patterns. The first pattern with at least one match in the manifest wins;
//! later patterns are never consulted, even if loading the winner fails.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use super::manifest::{Surface, SurfaceError, SurfaceManifest};
use crate::module::traits::panic_message;

/// Candidate templates tried when a module has no explicit candidates
pub const DEFAULT_CANDIDATE_TEMPLATES: &[&str] = &[
    "modules/{module}/ui/Main",
    "modules/{module}/ui/index",
    "modules/{module}/ui/*",
];

/// Result of resolving a module's UI entry point
#[derive(Clone)]
pub enum SurfaceResolution {
    Resolved {
        entry: String,
        surface: Arc<dyn Surface>,
    },
    /// No candidate matched: the module is not installed
    Absent,
    /// A candidate matched but its entry point is broken
    Failed { entry: String, reason: String },
}

impl SurfaceResolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, SurfaceResolution::Resolved { .. })
    }

    pub fn entry(&self) -> Option<&str> {
        match self {
            SurfaceResolution::Resolved { entry, .. } | SurfaceResolution::Failed { entry, .. } => {
                Some(entry)
            }
            SurfaceResolution::Absent => None,
        }
    }
}

impl fmt::Debug for SurfaceResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceResolution::Resolved { entry, .. } => {
                f.debug_struct("Resolved").field("entry", entry).finish()
            }
            SurfaceResolution::Absent => f.write_str("Absent"),
            SurfaceResolution::Failed { entry, reason } => f
                .debug_struct("Failed")
                .field("entry", entry)
                .field("reason", reason)
                .finish(),
        }
    }
}

/// A module surface that resolves on first use and keeps the result
pub struct LazySurface {
    module: String,
    candidates: Vec<String>,
    manifest: Arc<SurfaceManifest>,
    resolved: OnceLock<SurfaceResolution>,
}

impl LazySurface {
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    pub fn resolution(&self) -> &SurfaceResolution {
        self.resolved.get_or_init(|| self.resolve())
    }

    /// Render the surface, or a placeholder if it is absent or broken
    pub fn render(&self) -> String {
        match self.resolution() {
            SurfaceResolution::Resolved { surface, entry } => {
                let surface = Arc::clone(surface);
                match catch_unwind(AssertUnwindSafe(|| surface.render())) {
                    Ok(html) => html,
                    Err(payload) => {
                        let reason = panic_message(payload.as_ref());
                        warn!("Surface {} for module {} panicked while rendering: {}", entry, self.module, reason);
                        invalid_placeholder(&self.module, &reason)
                    }
                }
            }
            SurfaceResolution::Absent => absent_placeholder(&self.module),
            SurfaceResolution::Failed { reason, .. } => invalid_placeholder(&self.module, reason),
        }
    }

    fn resolve(&self) -> SurfaceResolution {
        let Some((entry, loader)) = self
            .candidates
            .iter()
            .find_map(|pattern| self.manifest.first_match(pattern))
        else {
            debug!("No UI entry point for module {}", self.module);
            return SurfaceResolution::Absent;
        };

        let entry = entry.to_string();
        let loaded = catch_unwind(AssertUnwindSafe(|| loader()))
            .unwrap_or_else(|payload| Err(SurfaceError::Panicked(panic_message(payload.as_ref()))));

        match loaded.and_then(|exports| exports.recognized().ok_or(SurfaceError::NoRecognizedExport)) {
            Ok(surface) => {
                debug!("Resolved UI for module {} at {}", self.module, entry);
                SurfaceResolution::Resolved { entry, surface }
            }
            Err(e) => {
                warn!("UI entry point {} for module {} is invalid: {}", entry, self.module, e);
                SurfaceResolution::Failed {
                    entry,
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl fmt::Debug for LazySurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySurface")
            .field("module", &self.module)
            .field("candidates", &self.candidates)
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

/// Resolves module surfaces against a fixed manifest
#[derive(Debug, Clone)]
pub struct SurfaceResolver {
    manifest: Arc<SurfaceManifest>,
    templates: Vec<String>,
}

impl SurfaceResolver {
    pub fn new(manifest: SurfaceManifest) -> Self {
        Self {
            manifest: Arc::new(manifest),
            templates: DEFAULT_CANDIDATE_TEMPLATES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }

    /// Replace the candidate templates; `{module}` is substituted per module
    pub fn with_templates<I, S>(mut self, templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.templates = templates.into_iter().map(Into::into).collect();
        self
    }

    pub fn manifest(&self) -> &SurfaceManifest {
        &self.manifest
    }

    pub fn candidates_for(&self, module: &str) -> Vec<String> {
        self.templates
            .iter()
            .map(|t| t.replace("{module}", module))
            .collect()
    }

    /// Lazy surface over explicit candidate patterns, tried in order
    pub fn resolve_surface<I, S>(&self, module: &str, candidates: I) -> LazySurface
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LazySurface {
            module: module.to_string(),
            candidates: candidates.into_iter().map(Into::into).collect(),
            manifest: Arc::clone(&self.manifest),
            resolved: OnceLock::new(),
        }
    }

    /// Lazy surface over this resolver's templates
    pub fn surface_for(&self, module: &str) -> LazySurface {
        self.resolve_surface(module, self.candidates_for(module))
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn absent_placeholder(module: &str) -> String {
    format!(
        "<div class=\"module-placeholder\" data-module=\"{0}\" data-state=\"absent\">Module {0} is not installed.</div>",
        escape_html(module)
    )
}

fn invalid_placeholder(module: &str, reason: &str) -> String {
    format!(
        "<div class=\"module-placeholder\" data-module=\"{0}\" data-state=\"invalid\">Module {0} has an invalid UI surface: {1}</div>",
        escape_html(module),
        escape_html(reason)
    )
}
