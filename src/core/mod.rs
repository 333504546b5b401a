//! Terminal mode control.
//!
//! This module contains the raw-mode machinery:
//!
//! - **console**: `Console` trait, error type and input flags
//! - **controller**: `TerminalController`, the Normal/Raw state machine
//! - **unix**: termios backend (`tcgetattr`/`tcsetattr`, `poll`, `sigaction`)
//! - **windows**: console-mode backend (`SetConsoleMode`, wait/peek, ctrl handler)
//!
//! # Architecture
//!
//! ```text
//! TerminalController
//! ├── Snapshot (configuration captured at setup)
//! └── Console backend (one per target)
//!     ├── UnixConsole
//!     └── WindowsConsole
//! ```

pub mod console;
pub mod controller;
#[cfg(unix)]
pub mod unix;
#[cfg(windows)]
pub mod windows;

pub use console::{Console, InputFlags, Mode, Result, TermError};
pub use controller::TerminalController;

/// Exit status used when the process is terminated by a user interrupt
/// (observed as 254 on Unix).
pub const INTERRUPT_EXIT_CODE: i32 = -2;

#[cfg(unix)]
pub type NativeConsole = unix::UnixConsole;

#[cfg(windows)]
pub type NativeConsole = windows::WindowsConsole;
