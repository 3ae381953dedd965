//! # termkit-core
//!
//! Core types for termkit.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other termkit crates. It provides:
//!
//! - Color system levels and environment-based detection
//! - Geometry types (Point, Size)
//! - Configuration loaded from YAML
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - the terminal and highlight crates
//! depend on this one, but this crate depends on no other termkit crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod color;
pub mod config;
pub mod error;
pub mod geometry;

// Re-export commonly used types
pub use color::{ColorEnv, ColorSystem};
pub use config::{Config, TerminalSettings};
pub use error::{Error, Result};
pub use geometry::{Point, Size};
