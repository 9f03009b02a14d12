//! Frontend surfaces
//!
//! Module UIs are listed in a build-time [`SurfaceManifest`]; the
//! [`SurfaceResolver`] picks the first present entry for a module and falls
//! back to a placeholder that tells "not installed" apart from "broken".

pub mod glob;
pub mod manifest;
pub mod resolver;

pub use manifest::{Surface, SurfaceError, SurfaceExports, SurfaceLoader, SurfaceManifest};
pub use resolver::{LazySurface, SurfaceResolution, SurfaceResolver, DEFAULT_CANDIDATE_TEMPLATES};
