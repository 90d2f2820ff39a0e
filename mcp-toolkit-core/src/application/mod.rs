//! # Application Module
//!
//! ## Submodules
//!
//! - [`tooling`] - Subprocess connections, tool adapters and the toolkit that composes them
//! - [`lifecycle`] - Process-wide registry of live toolkits and the signal-driven shutdown sweep

pub mod lifecycle;
pub mod tooling;
