//! # termkit-terminal
//!
//! Terminal control for termkit.
//!
//! This crate provides:
//! - Terminal geometry and color capability state
//! - The write pipeline with local cursor tracking
//! - Resize notification and event subscription
//! - Recording, export and timing-faithful replay of output
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on termkit-core and is
//! independent of the highlighting crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ansi;
pub mod events;
pub mod recording;
pub mod resize;
pub mod terminal;

// Re-export commonly used types
pub use ansi::{display_width, strip_ansi};
pub use events::{EventPayload, Listener, Listeners, TerminalEvent};
pub use recording::{Exporter, RecordEntry, Recorder, DEFAULT_SVG_TITLE};
pub use resize::ResizeWatcher;
pub use terminal::{PrintOptions, RecordingSession, Terminal, WriteOptions};
