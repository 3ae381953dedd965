//! Resize notification.
//!
//! On Unix, `SIGWINCH` is registered through `signal-hook` so that the signal
//! handler does nothing but raise a flag. The terminal polls the flag at a
//! safe point in the main loop (see `Terminal::process_pending_resize`) and
//! does the actual geometry recompute and listener dispatch there.
//!
//! Platforms without a resize signal never raise the flag on their own;
//! callers there may still call [`ResizeWatcher::notify`] from their own
//! resize source.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

/// Pending-resize flag, optionally fed by the OS resize signal.
#[derive(Debug)]
pub struct ResizeWatcher {
    pending: Arc<AtomicBool>,
    #[cfg(unix)]
    signal_id: Option<signal_hook::SigId>,
}

impl ResizeWatcher {
    /// A watcher that is only raised through [`ResizeWatcher::notify`].
    pub fn manual() -> Self {
        Self {
            pending: Arc::new(AtomicBool::new(false)),
            #[cfg(unix)]
            signal_id: None,
        }
    }

    /// A watcher raised by `SIGWINCH`.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        let pending = Arc::new(AtomicBool::new(false));
        let signal_id = signal_hook::flag::register(
            signal_hook::consts::signal::SIGWINCH,
            Arc::clone(&pending),
        )?;
        debug!("Registered SIGWINCH resize handler");
        Ok(Self {
            pending,
            signal_id: Some(signal_id),
        })
    }

    /// A watcher raised by the OS resize signal.
    ///
    /// This platform has no resize signal, so the watcher is manual only.
    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        debug!("No resize signal on this platform; resize must be notified manually");
        Ok(Self::manual())
    }

    /// Mark a resize as pending.
    pub fn notify(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    /// Whether a resize is pending, without clearing it.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Clear the pending flag, returning whether it was set.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

impl Drop for ResizeWatcher {
    #[cfg(unix)]
    fn drop(&mut self) {
        if let Some(id) = self.signal_id.take() {
            signal_hook::low_level::unregister(id);
        }
    }

    #[cfg(not(unix))]
    fn drop(&mut self) {}
}
