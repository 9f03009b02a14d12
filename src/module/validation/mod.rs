//! Module validation
//!
//! Descriptor checks for naming and HTTP namespacing conventions.

pub mod descriptor_validator;

pub use descriptor_validator::{DescriptorValidator, ValidationResult};
