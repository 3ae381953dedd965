//! Geometry types for terminal coordinates and sizes.

use serde::{Deserialize, Serialize};

/// Position in terminal character space, `(x, y)`.
///
/// `x` is the column and `y` the row, both in the terminal's 1-based
/// coordinate system when used for cursor addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// Column
    pub x: u16,
    /// Row
    pub y: u16,
}

impl Point {
    /// Create a new point.
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Absolute cursor-position sequence for this point.
    ///
    /// The terminal expects `row;col`, so the logical order is reversed.
    pub fn cursor_position_sequence(&self) -> String {
        format!("\x1b[{};{}H", self.y, self.x)
    }
}

impl From<(u16, u16)> for Point {
    fn from((x, y): (u16, u16)) -> Self {
        Self::new(x, y)
    }
}

/// Width and height, either in character cells or in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub width: u16,
    /// Height
    pub height: u16,
}

impl Size {
    /// A size with no area, used when a dimension cannot be determined.
    pub const ZERO: Size = Size::new(0, 0);

    /// Create a new size.
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Shrink by the given origin offset, saturating at zero.
    pub fn minus_origin(&self, origin: Point) -> Self {
        Self::new(
            self.width.saturating_sub(origin.x),
            self.height.saturating_sub(origin.y),
        )
    }
}

impl From<(u16, u16)> for Size {
    fn from((width, height): (u16, u16)) -> Self {
        Self::new(width, height)
    }
}
