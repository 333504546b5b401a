//! keyterm - raw-mode terminal toggling
//!
//! Switches the controlling terminal into raw input (no echo, no line
//! buffering), reports pending keypresses without blocking, and puts the
//! terminal back on shutdown or Ctrl+C.
//!
//! # Usage
//!
//! ```no_run
//! use keyterm::TerminalController;
//!
//! # fn main() -> keyterm::Result<()> {
//! let mut term = TerminalController::stdin()?;
//! term.setup()?;
//! loop {
//!     if term.poll()? {
//!         // read the pending input
//!         break;
//!     }
//! }
//! term.restore();
//! # Ok(())
//! # }
//! ```
//!
//! Hosts that want process-wide functions instead can use [`setup_term`],
//! [`check_key`] and [`shutdown_term`].
//!
//! # Interrupts
//!
//! Setup installs a handler for the interrupt signal (Ctrl+C). It restores
//! the saved configuration, prints a newline and exits with
//! [`INTERRUPT_EXIT_CODE`].

pub mod config;
pub mod core;
pub mod term;

pub use crate::core::{
    Console, InputFlags, Mode, NativeConsole, Result, TermError, TerminalController,
    INTERRUPT_EXIT_CODE,
};
pub use crate::term::{check_key, setup_term, shutdown_term};
