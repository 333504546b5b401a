//! Process-wide entry points
//!
//! No-argument wrappers around a single [`TerminalController`] on standard
//! input, for hosts that toggle the terminal once at startup and once at exit
//! and poll in between.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::core::{Mode, Result, TerminalController};

static CONTROLLER: Mutex<Option<TerminalController>> = Mutex::new(None);
static ANNOUNCE: AtomicBool = AtomicBool::new(true);

fn controller() -> MutexGuard<'static, Option<TerminalController>> {
    CONTROLLER.lock().unwrap_or_else(PoisonError::into_inner)
}

fn announce(message: &str) {
    if ANNOUNCE.load(Ordering::Relaxed) {
        let mut stdout = io::stdout();
        let _ = writeln!(stdout, "{}", message);
        let _ = stdout.flush();
    }
}

/// Enable or disable the status lines printed by setup and shutdown
pub fn set_announce(enabled: bool) {
    ANNOUNCE.store(enabled, Ordering::Relaxed);
}

/// Switch standard input to raw mode and install the interrupt handler
pub fn setup_term() -> Result<()> {
    announce("Setting up terminal...");

    let mut slot = controller();
    let controller = match slot.as_mut() {
        Some(controller) => controller,
        None => slot.insert(TerminalController::stdin()?),
    };
    controller.setup()?;

    info!("Terminal in raw mode");
    Ok(())
}

/// Whether a keypress is waiting on standard input.
///
/// `false` when the terminal was never set up or the check failed.
pub fn check_key() -> bool {
    match controller().as_ref().map(|c| c.poll()) {
        Some(Ok(ready)) => ready,
        Some(Err(e)) => {
            debug!("Key check failed: {}", e);
            false
        }
        None => false,
    }
}

/// Current mode of the process-wide controller
pub fn mode() -> Mode {
    controller().as_ref().map_or(Mode::Normal, |c| c.mode())
}

/// Restore the terminal configuration captured by [`setup_term`].
///
/// Safe to call without a prior setup and more than once.
pub fn shutdown_term() {
    if let Some(mut controller) = controller().take() {
        controller.restore();
        info!("Terminal restored");
    }
    announce("Shutting down...");
}
