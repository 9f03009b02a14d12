//! Lifecycle hook dispatch

pub mod dispatcher;

pub use dispatcher::{DispatchOutcome, HookDispatcher};
