//! Platform console abstraction
//!
//! A [`Console`] is the capability set a terminal backend has to provide:
//! capture the current input configuration, switch to raw input, re-apply a
//! captured configuration, and report input readiness without blocking.
//! One implementation exists per target and is selected at build time.

use std::io;

use bitflags::bitflags;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TermError {
    #[error("Input is not attached to a terminal")]
    NotATerminal,

    #[error("Failed to read terminal configuration: {0}")]
    Capture(#[source] io::Error),

    #[error("Failed to apply terminal configuration: {0}")]
    Apply(#[source] io::Error),

    #[error("Failed to poll terminal input: {0}")]
    Poll(#[source] io::Error),

    #[error("Failed to install interrupt handler: {0}")]
    SignalHandler(#[source] io::Error),

    #[error("Terminal is not in raw mode")]
    NotRaw,
}

pub type Result<T> = std::result::Result<T, TermError>;

bitflags! {
    /// Input behaviours handled by the terminal driver.
    ///
    /// Normal (cooked) mode has both set; raw mode has neither.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InputFlags: u8 {
        /// Typed characters are echoed back by the driver
        const ECHO = 0b01;
        /// Input is delivered a line at a time
        const LINE_BUFFERED = 0b10;
    }
}

/// Current input mode of a controlled terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Line-buffered, echoing
    Normal,
    /// Character-at-a-time, not echoing
    Raw,
}

/// Terminal backend operations.
///
/// Implementations are thin wrappers over a single system call each and
/// perform no retries.
pub trait Console {
    /// Saved terminal configuration
    type Snapshot: Copy;

    /// Read the current configuration of the input device
    fn capture(&self) -> Result<Self::Snapshot>;

    /// Apply raw input derived from `saved`: echo and line buffering off
    fn apply_raw(&self, saved: &Self::Snapshot) -> Result<()>;

    /// Re-apply a previously captured configuration
    fn apply(&self, snapshot: &Self::Snapshot) -> Result<()>;

    /// Zero-timeout readiness check; never consumes input
    fn poll(&self) -> Result<bool>;

    /// Input behaviours currently enabled on the device
    fn input_flags(&self) -> Result<InputFlags>;

    /// Install the process interrupt handler and arm it with `saved`, so an
    /// interrupt restores that configuration before exiting.
    fn arm_interrupt(&self, saved: &Self::Snapshot) -> Result<()>;

    /// Stop restoring on interrupt. The handler stays installed and still
    /// exits the process.
    fn disarm_interrupt(&self);
}
