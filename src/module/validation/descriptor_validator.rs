//! Descriptor validation
//!
//! Checks module descriptors for naming and namespacing conventions. Problems
//! are reported, not enforced: prefix collisions between modules are the
//! module authors' responsibility.

use tracing::{debug, warn};

use crate::module::traits::{Capabilities, ModuleDescriptor};

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Descriptor follows the conventions
    Valid,
    /// Descriptor has problems
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Descriptor validator
pub struct DescriptorValidator {
    max_name_len: usize,
}

impl DescriptorValidator {
    pub fn new() -> Self {
        Self { max_name_len: 64 }
    }

    /// Validate a module descriptor
    pub fn validate(&self, descriptor: &ModuleDescriptor) -> ValidationResult {
        let mut errors = Vec::new();

        if descriptor.name.is_empty() {
            errors.push("Module name cannot be empty".to_string());
        } else if !self.is_valid_name(&descriptor.name) {
            errors.push(format!(
                "Invalid module name: {} (must be alphanumeric with dashes/underscores)",
                descriptor.name
            ));
        }

        if !descriptor.base_path.starts_with('/') {
            errors.push(format!(
                "Base path must start with '/': {}",
                descriptor.base_path
            ));
        } else if descriptor.has(Capabilities::BACKEND_ROUTES) {
            let expected = format!("/api/{}", descriptor.name);
            if descriptor.base_path.trim_end_matches('/') != expected {
                errors.push(format!(
                    "Base path {} does not follow the {} convention",
                    descriptor.base_path, expected
                ));
            }
        }

        if errors.is_empty() {
            debug!("Descriptor validation passed for module: {}", descriptor.name);
            ValidationResult::Valid
        } else {
            warn!(
                "Descriptor validation failed for module {}: {:?}",
                descriptor.name, errors
            );
            ValidationResult::Invalid(errors)
        }
    }

    #[inline]
    fn is_valid_name(&self, name: &str) -> bool {
        if name.len() > self.max_name_len {
            return false;
        }

        if !name.chars().next().map_or(false, |c| c.is_ascii_alphanumeric()) {
            return false;
        }

        name.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl Default for DescriptorValidator {
    fn default() -> Self {
        Self::new()
    }
}
