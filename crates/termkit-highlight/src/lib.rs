//! # termkit-highlight
//!
//! Tokenizers that annotate raw text with markup tags for syntax
//! highlighting.
//!
//! This crate provides:
//! - The [`Highlighter`] interface consumed by the markup renderer
//! - [`RegexHighlighter`], built from an ordered list of named patterns
//! - A preset Python source highlighter
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on termkit-core only.
//! Highlighted text is handed to the markup renderer before it reaches the
//! terminal.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod highlighter;
pub mod python;

// Re-export commonly used types
pub use highlighter::{
    CacheStats, Highlighter, RegexHighlighter, DEFAULT_BACKTRACK_LIMIT, STRING_STYLE,
};
pub use python::{highlight_python, python_styles};
