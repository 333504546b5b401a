//! Terminal Mode Controller
//!
//! Switches a console between Normal and Raw input and owns the configuration
//! captured when it entered Raw. The snapshot is also handed to the backend's
//! interrupt handler so that Ctrl+C restores the terminal before the process
//! exits.

use tracing::{debug, warn};

use super::console::{Console, Mode, Result, TermError};
use super::NativeConsole;

/// Normal/Raw state machine over a [`Console`] backend
pub struct TerminalController<C: Console = NativeConsole> {
    console: C,
    /// Present exactly while in Raw mode
    saved: Option<C::Snapshot>,
}

impl TerminalController<NativeConsole> {
    /// Controller for the process's standard input
    pub fn stdin() -> Result<Self> {
        Ok(Self::new(NativeConsole::stdin()?))
    }
}

impl<C: Console> TerminalController<C> {
    pub fn new(console: C) -> Self {
        Self {
            console,
            saved: None,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.saved.is_some() {
            Mode::Raw
        } else {
            Mode::Normal
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Capture the current configuration, install the interrupt handler and
    /// switch to raw input.
    ///
    /// Already being in Raw mode is not an error; the configuration captured
    /// on entry is kept so that [`restore`](Self::restore) still returns the
    /// terminal to its original state.
    pub fn setup(&mut self) -> Result<()> {
        if self.saved.is_some() {
            debug!("Terminal already in raw mode");
            return Ok(());
        }

        let saved = self.console.capture()?;
        self.console.arm_interrupt(&saved)?;
        if let Err(e) = self.console.apply_raw(&saved) {
            self.console.disarm_interrupt();
            return Err(e);
        }

        self.saved = Some(saved);
        debug!("Terminal switched to raw mode");
        Ok(())
    }

    /// Whether at least one input event is pending. Returns immediately and
    /// leaves the input for the caller to read.
    pub fn poll(&self) -> Result<bool> {
        if self.saved.is_none() {
            return Err(TermError::NotRaw);
        }
        self.console.poll()
    }

    /// Re-apply the configuration captured by [`setup`](Self::setup).
    ///
    /// No-op in Normal mode. Failures are logged and otherwise ignored; there
    /// is nothing left to fall back to.
    pub fn restore(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };

        // Stay armed until the snapshot is back in place, so an interrupt
        // landing mid-restore still leaves the terminal cooked
        match self.console.apply(&saved) {
            Ok(()) => debug!("Terminal restored"),
            Err(e) => warn!("Failed to restore terminal: {}", e),
        }
        self.console.disarm_interrupt();
    }
}

impl<C: Console> Drop for TerminalController<C> {
    fn drop(&mut self) {
        self.restore();
    }
}
