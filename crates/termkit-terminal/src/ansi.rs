//! The small, fixed set of escape sequences the terminal produces and
//! consumes, plus width helpers for text that may contain them.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use termkit_core::Size;
use unicode_width::UnicodeWidthStr;

/// Erases the whole screen.
pub const CLEAR_SCREEN: &str = "\x1b[2J";

/// Asks the terminal to report its text area size in pixels.
pub const PIXEL_SIZE_QUERY: &str = "\x1b[14t";

/// Final byte of the pixel size report.
pub const PIXEL_REPORT_TERMINATOR: u8 = b't';

lazy_static! {
    // CSI sequences, OSC strings (BEL or ST terminated) and two-byte escapes.
    static ref RE_ANSI: Regex = Regex::new(
        r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[0-?@-Z\\-_])"
    )
    .expect("ANSI pattern is valid");
}

/// Remove all ANSI escape sequences from `text`.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    RE_ANSI.replace_all(text, "")
}

/// Rendered column width of `text`, ignoring escape sequences.
pub fn display_width(text: &str) -> usize {
    strip_ansi(text).width()
}

/// Parse a pixel size report of the form `ESC [ 4 ; height ; width t`.
///
/// Returns `None` unless both dimensions are present and numeric.
pub fn parse_pixel_report(report: &str) -> Option<Size> {
    let body = report
        .trim_start_matches('\x1b')
        .trim_start_matches('[')
        .trim_end_matches(PIXEL_REPORT_TERMINATOR as char);
    let body = body.strip_prefix("4;").unwrap_or(body);

    let (height, width) = body.split_once(';')?;
    let height = height.trim().parse().ok()?;
    let width = width.trim().parse().ok()?;
    Some(Size::new(width, height))
}
