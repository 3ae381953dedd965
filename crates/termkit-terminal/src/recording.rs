//! Recording of terminal output.
//!
//! A [`Recorder`] captures every chunk written through a terminal while it
//! is attached, together with the time elapsed since the recorder was
//! created. Once detached it can be exported as plain text, handed to an
//! [`Exporter`] for HTML/SVG, persisted in asciinema v2 format, or replayed
//! with its original pacing by `Terminal::replay`.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use termkit_core::{Error, Result, Size};
use tracing::debug;

use crate::ansi::strip_ansi;

/// Title used for SVG exports when the caller has no better one.
pub const DEFAULT_SVG_TITLE: &str = "termkit";

/// Turns raw terminal content into a styled document.
///
/// Implemented by the markup/export layer; the recorder only hands it the
/// concatenated content and returns its output verbatim.
pub trait Exporter {
    /// Render `content` as HTML.
    fn to_html(&self, content: &str, prefix: Option<&str>, inline_styles: bool) -> String;

    /// Render `content` as SVG.
    fn to_svg(
        &self,
        content: &str,
        prefix: Option<&str>,
        inline_styles: bool,
        title: &str,
    ) -> String;
}

/// A single captured chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    /// Text exactly as it was written, escape sequences included
    pub chunk: String,
    /// Time since the recorder was created
    pub elapsed: Duration,
}

impl RecordEntry {
    /// Create a new entry.
    pub fn new(chunk: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            chunk: chunk.into(),
            elapsed,
        }
    }
}

/// Asciinema v2 format header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsciicastHeader {
    /// Format version (always 2)
    pub version: u8,
    /// Terminal width
    pub width: u16,
    /// Terminal height
    pub height: u16,
    /// Unix timestamp of the export
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Append-only log of terminal output.
///
/// Entries are kept in write order and their `elapsed` never decreases.
#[derive(Debug, Clone)]
pub struct Recorder {
    entries: Vec<RecordEntry>,
    start_time: Instant,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    /// Create an empty recorder whose clock starts now.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Rebuild a detached recording from existing entries.
    ///
    /// Fails if any entry is timestamped before its predecessor.
    pub fn from_entries(entries: Vec<RecordEntry>) -> Result<Self> {
        if let Some(index) = entries
            .windows(2)
            .position(|pair| pair[1].elapsed < pair[0].elapsed)
        {
            return Err(Error::InvalidRecording(format!(
                "entry {} is timestamped before entry {}",
                index + 1,
                index
            )));
        }

        Ok(Self {
            entries,
            start_time: Instant::now(),
        })
    }

    /// Append `chunk`, stamped with the time since creation.
    ///
    /// Only the terminal a recorder is attached to appends to it.
    pub(crate) fn write(&mut self, chunk: &str) {
        let elapsed = self.start_time.elapsed();
        // Entries rebuilt by `from_entries` may sit ahead of the fresh clock.
        let elapsed = self
            .entries
            .last()
            .map_or(elapsed, |last| elapsed.max(last.elapsed));
        self.entries.push(RecordEntry::new(chunk, elapsed));
    }

    /// Recorded entries, oldest first.
    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Elapsed time of the last entry.
    pub fn duration(&self) -> Duration {
        self.entries.last().map_or(Duration::ZERO, |e| e.elapsed)
    }

    /// All chunks concatenated in order, escape sequences included.
    pub fn content(&self) -> String {
        self.entries.iter().map(|e| e.chunk.as_str()).collect()
    }

    /// Recorded content as plain text, with escape sequences removed.
    pub fn export_text(&self) -> String {
        strip_ansi(&self.content()).into_owned()
    }

    /// Recorded content rendered as HTML by `exporter`.
    pub fn export_html(
        &self,
        exporter: &dyn Exporter,
        prefix: Option<&str>,
        inline_styles: bool,
    ) -> String {
        exporter.to_html(&self.content(), prefix, inline_styles)
    }

    /// Recorded content rendered as SVG by `exporter`.
    pub fn export_svg(
        &self,
        exporter: &dyn Exporter,
        prefix: Option<&str>,
        inline_styles: bool,
        title: &str,
    ) -> String {
        exporter.to_svg(&self.content(), prefix, inline_styles, title)
    }

    /// Write the plain text export to `path`.
    pub fn save_plain<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.export_text())?;
        Ok(())
    }

    /// Write the HTML export to `path`, appending `.html` if missing.
    ///
    /// Returns the path actually written.
    pub fn save_html<P: AsRef<Path>>(
        &self,
        path: P,
        exporter: &dyn Exporter,
        prefix: Option<&str>,
        inline_styles: bool,
    ) -> Result<PathBuf> {
        let path = with_extension(path.as_ref(), ".html");
        std::fs::write(&path, self.export_html(exporter, prefix, inline_styles))?;
        debug!("Saved HTML recording to {}", path.display());
        Ok(path)
    }

    /// Write the SVG export to `path`, appending `.svg` if missing.
    ///
    /// Returns the path actually written.
    pub fn save_svg<P: AsRef<Path>>(
        &self,
        path: P,
        exporter: &dyn Exporter,
        prefix: Option<&str>,
        inline_styles: bool,
        title: &str,
    ) -> Result<PathBuf> {
        let path = with_extension(path.as_ref(), ".svg");
        std::fs::write(&path, self.export_svg(exporter, prefix, inline_styles, title))?;
        debug!("Saved SVG recording to {}", path.display());
        Ok(path)
    }

    /// Write the recording to `writer` in asciinema v2 format.
    ///
    /// The format is:
    /// - Line 1: JSON header
    /// - Line 2+: JSON event arrays `[time, "o", data]`
    pub fn write_asciicast<W: Write>(&self, writer: &mut W, size: Size) -> Result<()> {
        let header = AsciicastHeader {
            version: 2,
            width: size.width,
            height: size.height,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .ok()
                .map(|d| d.as_secs() as i64),
        };
        serde_json::to_writer(&mut *writer, &header)?;
        writeln!(writer)?;

        for entry in &self.entries {
            let event = serde_json::json!([entry.elapsed.as_secs_f64(), "o", entry.chunk]);
            serde_json::to_writer(&mut *writer, &event)?;
            writeln!(writer)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// The recording as an asciinema v2 document.
    pub fn to_asciicast(&self, size: Size) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_asciicast(&mut buffer, size)?;
        String::from_utf8(buffer).map_err(|e| Error::InvalidRecording(e.to_string()))
    }

    /// Save the recording to `path` in asciinema v2 format.
    pub fn save_asciicast<P: AsRef<Path>>(&self, path: P, size: Size) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_asciicast(&mut writer, size)
    }

    /// Parse an asciinema v2 document.
    ///
    /// Only output (`"o"`) events are kept; other event types are skipped.
    pub fn from_asciicast(content: &str) -> Result<Self> {
        let mut lines = content.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| Error::InvalidRecording("empty recording".to_string()))?;
        let header: AsciicastHeader = serde_json::from_str(header_line)?;
        if header.version != 2 {
            return Err(Error::InvalidRecording(format!(
                "unsupported asciicast version {}",
                header.version
            )));
        }

        let mut entries = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let (time, kind, data): (f64, String, String) = serde_json::from_str(line)?;
            if kind != "o" {
                continue;
            }
            let elapsed = Duration::try_from_secs_f64(time)
                .map_err(|e| Error::InvalidRecording(format!("bad event time {time}: {e}")))?;
            entries.push(RecordEntry::new(data, elapsed));
        }

        Self::from_entries(entries)
    }

    /// Load a recording saved by [`Recorder::save_asciicast`].
    pub fn load_asciicast<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_asciicast(&content)
    }
}

/// `path` with `extension` appended unless it already ends with it.
fn with_extension(path: &Path, extension: &str) -> PathBuf {
    if path.to_string_lossy().ends_with(extension) {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(extension);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TagExporter;

    impl Exporter for TagExporter {
        fn to_html(&self, content: &str, prefix: Option<&str>, inline_styles: bool) -> String {
            format!("<html {prefix:?} {inline_styles}>{content}</html>")
        }

        fn to_svg(
            &self,
            content: &str,
            prefix: Option<&str>,
            inline_styles: bool,
            title: &str,
        ) -> String {
            format!("<svg {prefix:?} {inline_styles} {title}>{content}</svg>")
        }
    }

    fn entries(chunks: &[(&str, u64)]) -> Vec<RecordEntry> {
        chunks
            .iter()
            .map(|(chunk, ms)| RecordEntry::new(*chunk, Duration::from_millis(*ms)))
            .collect()
    }

    #[test]
    fn test_recorder_creation() {
        let recorder = Recorder::new();
        assert!(recorder.is_empty());
        assert_eq!(recorder.len(), 0);
        assert_eq!(recorder.duration(), Duration::ZERO);
    }

    #[test]
    fn test_write_is_ordered_and_monotonic() {
        let mut recorder = Recorder::new();
        recorder.write("$ ");
        std::thread::sleep(Duration::from_millis(10));
        recorder.write("echo hello\n");
        std::thread::sleep(Duration::from_millis(10));
        recorder.write("hello\n");

        assert_eq!(recorder.len(), 3);
        assert!(recorder.duration() >= Duration::from_millis(20));
        let chunks: Vec<_> = recorder.entries().iter().map(|e| e.chunk.as_str()).collect();
        assert_eq!(chunks, vec!["$ ", "echo hello\n", "hello\n"]);
        assert!(recorder
            .entries()
            .windows(2)
            .all(|pair| pair[0].elapsed <= pair[1].elapsed));
    }

    #[test]
    fn test_export_text_strips_ansi() {
        let mut recorder = Recorder::new();
        recorder.write("\x1b[1;31mred\x1b[0m ");
        recorder.write("\x1b[2;3Hplain");
        assert_eq!(recorder.content(), "\x1b[1;31mred\x1b[0m \x1b[2;3Hplain");
        assert_eq!(recorder.export_text(), "red plain");
    }

    #[test]
    fn test_export_delegates_raw_content() {
        let mut recorder = Recorder::new();
        recorder.write("\x1b[1mhi\x1b[0m");

        assert_eq!(
            recorder.export_html(&TagExporter, Some("ptg"), true),
            "<html Some(\"ptg\") true>\x1b[1mhi\x1b[0m</html>"
        );
        assert_eq!(
            recorder.export_svg(&TagExporter, None, false, DEFAULT_SVG_TITLE),
            "<svg None false termkit>\x1b[1mhi\x1b[0m</svg>"
        );
    }

    #[test]
    fn test_from_entries_rejects_time_travel() {
        let result = Recorder::from_entries(entries(&[("a", 10), ("b", 5)]));
        assert!(matches!(result, Err(Error::InvalidRecording(_))));

        let recorder = Recorder::from_entries(entries(&[("a", 0), ("b", 0), ("c", 7)])).unwrap();
        assert_eq!(recorder.duration(), Duration::from_millis(7));
    }

    #[test]
    fn test_write_after_from_entries_stays_monotonic() {
        let mut recorder = Recorder::from_entries(entries(&[("a", 60_000)])).unwrap();
        recorder.write("b");
        assert_eq!(recorder.entries()[1].elapsed, Duration::from_millis(60_000));
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(
            with_extension(Path::new("out/report"), ".html"),
            PathBuf::from("out/report.html")
        );
        assert_eq!(
            with_extension(Path::new("report.html"), ".html"),
            PathBuf::from("report.html")
        );
        assert_eq!(
            with_extension(Path::new("report.htm"), ".html"),
            PathBuf::from("report.htm.html")
        );
    }

    #[test]
    fn test_asciicast_roundtrip() {
        let recorder =
            Recorder::from_entries(entries(&[("Hello\r\n", 0), ("\x1b[1mWorld\x1b[0m", 250)]))
                .unwrap();

        let serialized = recorder.to_asciicast(Size::new(80, 24)).unwrap();
        assert!(serialized.contains("\"version\":2"));
        assert!(serialized.contains("\"width\":80"));
        assert!(serialized.contains("\"height\":24"));

        let loaded = Recorder::from_asciicast(&serialized).unwrap();
        assert_eq!(loaded.entries(), recorder.entries());
    }

    #[test]
    fn test_asciicast_skips_input_events() {
        let cast = concat!(
            "{\"version\":2,\"width\":80,\"height\":24}\n",
            "[0.0,\"o\",\"$ \"]\n",
            "[0.5,\"i\",\"ls\\r\"]\n",
            "\n",
            "[1.0,\"o\",\"file\\r\\n\"]\n",
        );
        let loaded = Recorder::from_asciicast(cast).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.content(), "$ file\r\n");
        assert_eq!(loaded.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_invalid_asciicast() {
        assert!(matches!(
            Recorder::from_asciicast(""),
            Err(Error::InvalidRecording(_))
        ));
        assert!(matches!(
            Recorder::from_asciicast("invalid json"),
            Err(Error::Serialization(_))
        ));
        assert!(matches!(
            Recorder::from_asciicast("{\"version\":1,\"width\":80,\"height\":24}"),
            Err(Error::InvalidRecording(_))
        ));
        assert!(matches!(
            Recorder::from_asciicast("{\"version\":2,\"width\":1,\"height\":1}\n[-1.0,\"o\",\"x\"]"),
            Err(Error::InvalidRecording(_))
        ));
    }
}
