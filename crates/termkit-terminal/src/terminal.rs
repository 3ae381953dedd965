//! Terminal state and the low-level write path.
//!
//! A [`Terminal`] tracks the geometry and color capability of the output it
//! writes to, keeps a best-effort logical cursor, dispatches resize events
//! to subscribers, and optionally mirrors every write into an attached
//! [`Recorder`].
//!
//! One terminal is meant to exist per process. It is constructed explicitly
//! and passed to whatever needs it; it does no internal locking, so writes
//! from several threads must be serialized by the caller.
//!
//! # Example
//!
//! ```
//! use termkit_core::{Point, TerminalSettings};
//! use termkit_terminal::{Terminal, WriteOptions};
//!
//! let mut terminal = Terminal::with_output(Vec::new(), TerminalSettings::default());
//!
//! let mut session = terminal.record().unwrap();
//! session.write("hello\n").unwrap();
//! session
//!     .write_with("world", WriteOptions::default().at(Point::new(3, 2)))
//!     .unwrap();
//! let recording = session.finish();
//!
//! assert_eq!(recording.export_text(), "hello\nworld");
//! ```

use std::borrow::Cow;
use std::env;
use std::io::{self, IsTerminal, Read, Stdout, Write};
use std::ops::{Deref, DerefMut};
use std::thread;

use termkit_core::{ColorEnv, ColorSystem, Error, Point, Result, Size, TerminalSettings};
use tracing::{debug, info, warn};

use crate::ansi::{
    display_width, parse_pixel_report, CLEAR_SCREEN, PIXEL_REPORT_TERMINATOR, PIXEL_SIZE_QUERY,
};
use crate::events::{EventPayload, Listeners, TerminalEvent};
use crate::recording::Recorder;
use crate::resize::ResizeWatcher;

/// Upper bound on the bytes read while waiting for a pixel size report.
const MAX_PIXEL_REPORT_LEN: usize = 32;

/// Options for [`Terminal::write_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Move the cursor here before writing
    pub pos: Option<Point>,
    /// Flush the output after writing
    pub flush: bool,
}

impl WriteOptions {
    /// Write at the given position.
    pub fn at(mut self, pos: Point) -> Self {
        self.pos = Some(pos);
        self
    }

    /// Flush after writing.
    pub fn flushed(mut self) -> Self {
        self.flush = true;
        self
    }
}

/// Options for [`Terminal::print`], analogous to a `print` builtin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    /// Move the cursor here before printing
    pub pos: Option<Point>,
    /// Separator placed between items
    pub sep: String,
    /// Terminator appended after the last item
    pub end: String,
    /// Flush the output after printing
    pub flush: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            pos: None,
            sep: " ".to_string(),
            end: "\n".to_string(),
            flush: true,
        }
    }
}

/// Geometry, capability and write state of one terminal output.
pub struct Terminal<W: Write = Stdout> {
    output: W,
    /// Written but not yet flushed bytes
    pending: Vec<u8>,
    input: Option<Box<dyn Read + Send>>,
    interactive: bool,
    /// Attached to the process's own stdio (raw mode applies)
    stdio: bool,
    settings: TerminalSettings,
    color_env: ColorEnv,
    size: Size,
    pixel_size: Size,
    forced_colorsystem: Option<ColorSystem>,
    colorsystem: Option<ColorSystem>,
    cursor: Point,
    listeners: Listeners,
    recorder: Option<Recorder>,
    resize_watcher: Option<ResizeWatcher>,
}

impl Terminal<Stdout> {
    /// Terminal on the process's stdout, with default settings.
    pub fn new() -> Self {
        Self::with_settings(TerminalSettings::default())
    }

    /// Terminal on the process's stdout.
    ///
    /// Pixel size queries read their reply from stdin when stdout is a tty.
    pub fn with_settings(settings: TerminalSettings) -> Self {
        let stdout = io::stdout();
        let interactive = stdout.is_terminal();
        Self::build(
            stdout,
            Some(Box::new(io::stdin())),
            interactive,
            true,
            settings,
        )
    }
}

impl Default for Terminal<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Terminal<W> {
    /// Non-interactive terminal writing to `output`.
    pub fn with_output(output: W, settings: TerminalSettings) -> Self {
        Self::build(output, None, false, false, settings)
    }

    /// Interactive terminal writing to `output` and reading replies to its
    /// queries from `input`.
    pub fn with_io<R>(output: W, input: R, settings: TerminalSettings) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::build(output, Some(Box::new(input)), true, false, settings)
    }

    fn build(
        output: W,
        input: Option<Box<dyn Read + Send>>,
        interactive: bool,
        stdio: bool,
        settings: TerminalSettings,
    ) -> Self {
        let color_env = ColorEnv::from_env(&settings);
        let forced_colorsystem = color_env.forced();
        let origin = settings.origin;

        let mut terminal = Self {
            output,
            pending: Vec::new(),
            input,
            interactive,
            stdio,
            settings,
            color_env,
            size: Size::ZERO,
            pixel_size: Size::ZERO,
            forced_colorsystem,
            colorsystem: None,
            cursor: origin,
            listeners: Listeners::new(),
            recorder: None,
            resize_watcher: None,
        };
        terminal.get_size();
        terminal.pixel_size = terminal.get_pixel_size();

        debug!(
            "Terminal ready: size={:?} pixel_size={:?} interactive={}",
            terminal.size, terminal.pixel_size, terminal.interactive
        );
        terminal
    }

    /// Current content size, with the origin subtracted.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Current width.
    pub fn width(&self) -> u16 {
        self.size.width
    }

    /// Current height.
    pub fn height(&self) -> u16 {
        self.size.height
    }

    /// Size in pixels, `(0, 0)` if it could not be determined.
    pub fn pixel_size(&self) -> Size {
        self.pixel_size
    }

    /// Origin of the internal coordinate system.
    pub fn origin(&self) -> Point {
        self.settings.origin
    }

    /// Locally tracked cursor position.
    ///
    /// This is derived from what has been written, not queried from the
    /// terminal, so it drifts after terminal-side scrolling or wrapping.
    pub fn cursor(&self) -> Point {
        self.cursor
    }

    /// Whether the output is an interactive terminal.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Settings this terminal was built with.
    pub fn settings(&self) -> &TerminalSettings {
        &self.settings
    }

    /// The underlying output. Unflushed writes are not visible here.
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Mutable access to the underlying output.
    pub fn output_mut(&mut self) -> &mut W {
        &mut self.output
    }

    /// Query the current size, subtract the origin and store it.
    pub fn get_size(&mut self) -> Size {
        self.size = self.query_size().minus_origin(self.settings.origin);
        self.size
    }

    fn query_size(&self) -> Size {
        if self.stdio && self.interactive {
            match crossterm::terminal::size() {
                Ok((width, height)) => return Size::new(width, height),
                Err(e) => debug!("Terminal size query failed: {}", e),
            }
        }

        let fallback = self.settings.fallback_size;
        Size::new(
            env_dimension("COLUMNS").unwrap_or(fallback.width),
            env_dimension("LINES").unwrap_or(fallback.height),
        )
    }

    /// Ask the terminal for its pixel size.
    ///
    /// Blocks until the terminal replies. Returns `(0, 0)` when the output
    /// is not interactive, querying is disabled, or the reply is malformed.
    pub fn get_pixel_size(&mut self) -> Size {
        if !self.interactive || !self.settings.query_pixel_size || self.input.is_none() {
            return Size::ZERO;
        }

        match self.query_pixel_size() {
            Ok(Some(size)) => size,
            Ok(None) => {
                debug!("Malformed pixel size report, using (0, 0)");
                Size::ZERO
            }
            Err(e) => {
                debug!("Pixel size query failed: {}", e);
                Size::ZERO
            }
        }
    }

    fn query_pixel_size(&mut self) -> io::Result<Option<Size>> {
        self.flush_pending()?;
        self.output.write_all(PIXEL_SIZE_QUERY.as_bytes())?;
        self.output.flush()?;

        let Some(input) = self.input.as_mut() else {
            return Ok(None);
        };

        let toggle_raw = self.stdio && !crossterm::terminal::is_raw_mode_enabled()?;
        if toggle_raw {
            crossterm::terminal::enable_raw_mode()?;
        }
        let report = read_report(&mut **input);
        if toggle_raw {
            crossterm::terminal::disable_raw_mode()?;
        }

        Ok(parse_pixel_report(&report?))
    }

    /// The explicit color system override, if any.
    pub fn forced_colorsystem(&self) -> Option<ColorSystem> {
        self.forced_colorsystem
    }

    /// Set or clear the color system override.
    ///
    /// The memoized [`Terminal::colorsystem`] is invalidated immediately.
    pub fn set_forced_colorsystem(&mut self, forced: Option<ColorSystem>) {
        self.forced_colorsystem = forced;
        self.colorsystem = None;
    }

    /// The color system this terminal supports, resolved once and memoized.
    pub fn colorsystem(&mut self) -> ColorSystem {
        *self
            .colorsystem
            .get_or_insert_with(|| self.color_env.resolve(self.forced_colorsystem))
    }

    /// Re-read the color environment and drop the memoized color system.
    ///
    /// The forced override is kept.
    pub fn refresh_colorsystem(&mut self) {
        self.color_env = ColorEnv::from_env(&self.settings);
        self.colorsystem = None;
    }

    /// Call `callback` whenever `event` fires, after earlier subscribers.
    pub fn subscribe<F>(&mut self, event: TerminalEvent, callback: F)
    where
        F: FnMut(&EventPayload) -> anyhow::Result<()> + Send + 'static,
    {
        self.listeners.subscribe(event, Box::new(callback));
    }

    /// Number of subscribers for `event`.
    pub fn listener_count(&self, event: TerminalEvent) -> usize {
        self.listeners.listener_count(event)
    }

    /// Start listening for OS resize notifications.
    pub fn watch_resize(&mut self) -> Result<()> {
        if self.resize_watcher.is_none() {
            self.resize_watcher = Some(ResizeWatcher::install()?);
        }
        Ok(())
    }

    /// Use `watcher` as the resize source, replacing any previous one.
    pub fn watch_resize_with(&mut self, watcher: ResizeWatcher) {
        self.resize_watcher = Some(watcher);
    }

    /// The installed resize source, if any.
    pub fn resize_watcher(&self) -> Option<&ResizeWatcher> {
        self.resize_watcher.as_ref()
    }

    /// Handle a resize if one has been signalled since the last call.
    ///
    /// Meant to be called from the main loop. Returns whether a resize was
    /// handled.
    pub fn process_pending_resize(&mut self) -> Result<bool> {
        let pending = self
            .resize_watcher
            .as_ref()
            .is_some_and(ResizeWatcher::take_pending);
        if !pending {
            return Ok(false);
        }
        self.handle_resize()?;
        Ok(true)
    }

    /// Recompute geometry, notify resize subscribers and clear the screen.
    ///
    /// A failing subscriber aborts the sequence and its error is returned.
    pub fn handle_resize(&mut self) -> Result<()> {
        let size = self.get_size();
        self.pixel_size = self.get_pixel_size();
        info!("Terminal resized to {}x{}", size.width, size.height);

        self.listeners.dispatch(&EventPayload::Resize(size))?;

        // Wipe the screen in case anything got messed up
        self.write(CLEAR_SCREEN)
    }

    /// Write `data` at the current position without flushing.
    pub fn write(&mut self, data: &str) -> Result<()> {
        self.write_with(data, WriteOptions::default())
    }

    /// Write `data`, optionally positioned and flushed.
    ///
    /// A clear-screen sequence in `data` discards whatever is still
    /// unflushed first. The attached recorder, if any, receives the data
    /// including the positioning sequence.
    pub fn write_with(&mut self, data: &str, options: WriteOptions) -> Result<()> {
        if data.contains(CLEAR_SCREEN) {
            self.clear_stream();
        }

        let data: Cow<'_, str> = match options.pos {
            Some(pos) => Cow::Owned(format!("{}{}", pos.cursor_position_sequence(), data)),
            None => Cow::Borrowed(data),
        };

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.write(&data);
        }

        self.pending.extend_from_slice(data.as_bytes());
        self.advance_cursor(&data);

        if options.flush {
            self.flush()?;
        }
        Ok(())
    }

    /// Join `items` with `options.sep`, append `options.end` and write.
    pub fn print<I, S>(&mut self, items: I, options: &PrintOptions) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = String::new();
        for (index, item) in items.into_iter().enumerate() {
            if index > 0 {
                line.push_str(&options.sep);
            }
            line.push_str(item.as_ref());
        }
        line.push_str(&options.end);

        self.write_with(
            &line,
            WriteOptions {
                pos: options.pos,
                flush: options.flush,
            },
        )
    }

    /// Move unflushed data to the output and flush it.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_pending()?;
        self.output.flush()?;
        Ok(())
    }

    /// Hand pending bytes to the output. Bytes the output accepted are
    /// dropped from the buffer even when a later write fails.
    fn flush_pending(&mut self) -> io::Result<()> {
        let mut written = 0;
        let result = loop {
            if written == self.pending.len() {
                break Ok(());
            }
            match self.output.write(&self.pending[written..]) {
                Ok(0) => break Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };
        self.pending.drain(..written);
        result
    }

    /// Discard data that has been written but not flushed yet.
    pub fn clear_stream(&mut self) {
        self.pending.clear();
    }

    fn advance_cursor(&mut self, data: &str) {
        let visible: String = data.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
        let columns = u16::try_from(display_width(&visible)).unwrap_or(u16::MAX);
        let rows = u16::try_from(data.matches('\n').count()).unwrap_or(u16::MAX);

        self.cursor = Point::new(
            self.cursor.x.saturating_add(columns),
            self.cursor.y.saturating_add(rows),
        );
    }

    /// Whether a recorder is attached.
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Attach a fresh recorder.
    ///
    /// Fails with [`Error::AlreadyRecording`] if one is attached already;
    /// the attached recorder is left untouched.
    pub fn start_recording(&mut self) -> Result<()> {
        if self.recorder.is_some() {
            return Err(Error::AlreadyRecording);
        }
        self.recorder = Some(Recorder::new());
        debug!("Recording started");
        Ok(())
    }

    /// Detach and return the attached recorder.
    pub fn stop_recording(&mut self) -> Option<Recorder> {
        let recorder = self.recorder.take();
        if let Some(recorder) = &recorder {
            debug!("Recording stopped after {} chunks", recorder.len());
        }
        recorder
    }

    /// Record everything written until the returned session ends.
    ///
    /// The session derefs to this terminal. The recorder is detached when
    /// the session is finished or dropped, including on early return and
    /// unwinding.
    pub fn record(&mut self) -> Result<RecordingSession<'_, W>> {
        self.start_recording()?;
        Ok(RecordingSession { terminal: self })
    }

    /// Write the chunks of `recorder` again, with their original pacing.
    ///
    /// Blocks the calling thread for the duration of the recording. Each
    /// chunk is written and flushed through the normal write path, so the
    /// cursor and any attached recorder observe it.
    pub fn replay(&mut self, recorder: &Recorder) -> Result<()> {
        info!(
            "Replaying {} chunks over {:?}",
            recorder.len(),
            recorder.duration()
        );

        let mut previous = None;
        for entry in recorder.entries() {
            if let Some(previous) = previous {
                let delay = entry.elapsed.saturating_sub(previous);
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }
            self.write_with(&entry.chunk, WriteOptions::default().flushed())?;
            previous = Some(entry.elapsed);
        }
        Ok(())
    }
}

impl<W: Write> Drop for Terminal<W> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush terminal output on drop: {}", e);
        }
    }
}

impl<W: Write> std::fmt::Debug for Terminal<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("size", &self.size)
            .field("pixel_size", &self.pixel_size)
            .field("origin", &self.settings.origin)
            .field("cursor", &self.cursor)
            .field("forced_colorsystem", &self.forced_colorsystem)
            .field("interactive", &self.interactive)
            .field("listeners", &self.listeners)
            .field("recording", &self.recorder.is_some())
            .finish()
    }
}

/// A terminal with a recorder attached for the lifetime of this value.
pub struct RecordingSession<'a, W: Write> {
    terminal: &'a mut Terminal<W>,
}

impl<W: Write> RecordingSession<'_, W> {
    /// The recording so far.
    pub fn recorder(&self) -> Option<&Recorder> {
        self.terminal.recorder.as_ref()
    }

    /// End the session and take the recording.
    pub fn finish(mut self) -> Recorder {
        // Empty only if the recorder was stopped through the session already.
        self.terminal.stop_recording().unwrap_or_default()
    }
}

impl<W: Write> Deref for RecordingSession<'_, W> {
    type Target = Terminal<W>;

    fn deref(&self) -> &Self::Target {
        self.terminal
    }
}

impl<W: Write> DerefMut for RecordingSession<'_, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.terminal
    }
}

impl<W: Write> Drop for RecordingSession<'_, W> {
    fn drop(&mut self) {
        self.terminal.recorder = None;
    }
}

fn env_dimension(name: &str) -> Option<u16> {
    env::var(name).ok()?.trim().parse().ok().filter(|&n| n > 0)
}

/// Read a terminal reply up to and including its terminator byte.
fn read_report(input: &mut dyn Read) -> io::Result<String> {
    let mut report = Vec::new();
    let mut byte = [0u8; 1];

    while report.len() < MAX_PIXEL_REPORT_LEN {
        if input.read(&mut byte)? == 0 {
            break;
        }
        report.push(byte[0]);
        if byte[0] == PIXEL_REPORT_TERMINATOR {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&report).into_owned())
}
