//! Surface manifest
//!
//! Build-time table of the UI entry points that are present, keyed by entry
//! path. Replaces scanning the filesystem for module UIs at runtime.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::glob::{glob_match, is_literal};

/// A renderable UI surface with no required inputs
pub trait Surface: Send + Sync {
    fn render(&self) -> String;
}

/// Exports of a loaded UI entry point
#[derive(Clone, Default)]
pub struct SurfaceExports {
    /// Named `Main` export
    pub main: Option<Arc<dyn Surface>>,
    /// Primary (default) export
    pub default: Option<Arc<dyn Surface>>,
}

impl SurfaceExports {
    pub fn main(surface: Arc<dyn Surface>) -> Self {
        Self {
            main: Some(surface),
            default: None,
        }
    }

    pub fn primary(surface: Arc<dyn Surface>) -> Self {
        Self {
            main: None,
            default: Some(surface),
        }
    }

    /// The recognized export: `Main` first, then the primary export
    pub fn recognized(&self) -> Option<Arc<dyn Surface>> {
        self.main.clone().or_else(|| self.default.clone())
    }
}

impl fmt::Debug for SurfaceExports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceExports")
            .field("main", &self.main.is_some())
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// Errors loading a UI entry point
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("entry point failed to load: {0}")]
    LoadFailed(String),

    #[error("entry point exposes neither Main nor a primary export")]
    NoRecognizedExport,

    #[error("entry point panicked while loading: {0}")]
    Panicked(String),
}

/// Loads an entry point's exports
pub type SurfaceLoader = Arc<dyn Fn() -> Result<SurfaceExports, SurfaceError> + Send + Sync>;

/// Entry path -> loader, sorted by path
#[derive(Clone, Default)]
pub struct SurfaceManifest {
    entries: BTreeMap<String, SurfaceLoader>,
}

impl SurfaceManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, path: impl Into<String>, loader: F)
    where
        F: Fn() -> Result<SurfaceExports, SurfaceError> + Send + Sync + 'static,
    {
        self.entries.insert(path.into(), Arc::new(loader));
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with<F>(mut self, path: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<SurfaceExports, SurfaceError> + Send + Sync + 'static,
    {
        self.insert(path, loader);
        self
    }

    /// Entry paths matching `pattern`, in sorted order
    pub fn matches(&self, pattern: &str) -> Vec<&str> {
        if is_literal(pattern) {
            return self
                .entries
                .get_key_value(pattern)
                .map(|(k, _)| vec![k.as_str()])
                .unwrap_or_default();
        }
        self.entries
            .keys()
            .filter(|path| glob_match(pattern, path))
            .map(|path| path.as_str())
            .collect()
    }

    /// First entry matching `pattern`
    pub fn first_match(&self, pattern: &str) -> Option<(&str, &SurfaceLoader)> {
        let path = self.matches(pattern).into_iter().next()?;
        self.entries
            .get_key_value(path)
            .map(|(k, loader)| (k.as_str(), loader))
    }

    pub fn paths(&self) -> Vec<&str> {
        self.entries.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SurfaceManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Text(&'static str);

    impl Surface for Text {
        fn render(&self) -> String {
            self.0.to_string()
        }
    }

    fn manifest() -> SurfaceManifest {
        SurfaceManifest::new()
            .with("modules/b/ui/Main", || Ok(SurfaceExports::main(Arc::new(Text("b")))))
            .with("modules/a/ui/pages/Settings", || {
                Ok(SurfaceExports::primary(Arc::new(Text("settings"))))
            })
            .with("modules/a/ui/Main", || Ok(SurfaceExports::main(Arc::new(Text("a")))))
    }

    #[test]
    fn test_matches_sorted() {
        let m = manifest();
        assert_eq!(m.matches("modules/*/ui/Main"), vec!["modules/a/ui/Main", "modules/b/ui/Main"]);
        assert_eq!(m.matches("modules/a/**"), vec!["modules/a/ui/Main", "modules/a/ui/pages/Settings"]);
        assert!(m.matches("modules/c/**").is_empty());
    }

    #[test]
    fn test_first_match() {
        let m = manifest();
        let (path, loader) = m.first_match("modules/*/ui/Main").unwrap();
        assert_eq!(path, "modules/a/ui/Main");
        let exports = loader().unwrap();
        assert_eq!(exports.recognized().unwrap().render(), "a");
    }

    #[test]
    fn test_literal_lookup() {
        let m = manifest();
        assert_eq!(m.matches("modules/b/ui/Main"), vec!["modules/b/ui/Main"]);
        assert!(m.matches("modules/b/ui/index").is_empty());
    }

    #[test]
    fn test_recognized_export_prefers_main() {
        let exports = SurfaceExports {
            main: Some(Arc::new(Text("main"))),
            default: Some(Arc::new(Text("default"))),
        };
        assert_eq!(exports.recognized().unwrap().render(), "main");
        assert!(SurfaceExports::default().recognized().is_none());
    }
}
