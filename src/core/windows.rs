//! Console-mode backend for Windows
//!
//! Raw mode clears `ENABLE_ECHO_INPUT` and `ENABLE_LINE_INPUT` on the console
//! input handle and flushes whatever cooked input was already queued.

use std::ffi::c_void;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicU32, Ordering};

use crossterm::tty::IsTty;
use tracing::debug;
use windows::Win32::Foundation::{BOOL, HANDLE};
use windows::Win32::System::Console::{
    FlushConsoleInputBuffer, GetConsoleMode, GetNumberOfConsoleInputEvents, GetStdHandle,
    PeekConsoleInputW, SetConsoleCtrlHandler, SetConsoleMode, CONSOLE_MODE, CTRL_BREAK_EVENT,
    CTRL_C_EVENT, ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT, INPUT_RECORD, KEY_EVENT,
    STD_INPUT_HANDLE, STD_OUTPUT_HANDLE,
};
use windows::Win32::Storage::FileSystem::WriteFile;
use windows::Win32::System::Threading::{ExitProcess, WaitForSingleObject};

use super::console::{Console, InputFlags, Result, TermError};
use super::INTERRUPT_EXIT_CODE;

static SAVED_HANDLE: AtomicIsize = AtomicIsize::new(0);
static SAVED_MODE: AtomicU32 = AtomicU32::new(0);
static ARMED: AtomicBool = AtomicBool::new(false);
static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);

fn os_error(e: windows::core::Error) -> io::Error {
    io::Error::from_raw_os_error(e.code().0)
}

/// Console control handler; runs on a thread created by the system.
///
/// Touches only raw handles: the main thread may be holding the stdout lock.
unsafe extern "system" fn handle_interrupt(ctrl_type: u32) -> BOOL {
    match ctrl_type {
        CTRL_C_EVENT | CTRL_BREAK_EVENT => {
            if ARMED.swap(false, Ordering::SeqCst) {
                let handle = HANDLE(SAVED_HANDLE.load(Ordering::SeqCst) as *mut c_void);
                let _ = SetConsoleMode(handle, CONSOLE_MODE(SAVED_MODE.load(Ordering::SeqCst)));
            }
            if let Ok(stdout) = GetStdHandle(STD_OUTPUT_HANDLE) {
                let _ = WriteFile(stdout, Some(b"\n"), None, None);
            }
            ExitProcess(INTERRUPT_EXIT_CODE as u32);
        }
        _ => BOOL(0),
    }
}

fn install_handler() -> Result<()> {
    if HANDLER_INSTALLED.load(Ordering::SeqCst) {
        return Ok(());
    }

    unsafe {
        SetConsoleCtrlHandler(Some(handle_interrupt), true)
            .map_err(|e| TermError::SignalHandler(os_error(e)))?;
    }

    HANDLER_INSTALLED.store(true, Ordering::SeqCst);
    debug!("Console control handler installed");
    Ok(())
}

fn raw_mode(cooked: CONSOLE_MODE) -> CONSOLE_MODE {
    CONSOLE_MODE(cooked.0 & !(ENABLE_ECHO_INPUT.0 | ENABLE_LINE_INPUT.0))
}

/// A key press that produces a character. Mouse, focus and key-up events
/// signal the input handle too, as do modifier and arrow keys (no character).
fn is_char_key(record: &INPUT_RECORD) -> bool {
    if record.EventType as u32 != KEY_EVENT {
        return false;
    }
    let key = unsafe { record.Event.KeyEvent };
    key.bKeyDown.as_bool() && unsafe { key.uChar.UnicodeChar } != 0
}

/// Console input handle
#[derive(Debug, Clone, Copy)]
pub struct WindowsConsole {
    handle: HANDLE,
}

// Safety: console handles may be used from any thread
unsafe impl Send for WindowsConsole {}

impl WindowsConsole {
    /// Console on the process's standard input
    pub fn stdin() -> Result<Self> {
        if !io::stdin().is_tty() {
            return Err(TermError::NotATerminal);
        }
        let handle = unsafe { GetStdHandle(STD_INPUT_HANDLE) }
            .map_err(|e| TermError::Capture(os_error(e)))?;
        if handle.is_invalid() {
            return Err(TermError::NotATerminal);
        }
        Ok(Self::from_handle(handle))
    }

    pub fn from_handle(handle: HANDLE) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> HANDLE {
        self.handle
    }

    fn set(&self, mode: CONSOLE_MODE) -> Result<()> {
        unsafe { SetConsoleMode(self.handle, mode) }.map_err(|e| TermError::Apply(os_error(e)))
    }
}

impl Console for WindowsConsole {
    type Snapshot = CONSOLE_MODE;

    fn capture(&self) -> Result<CONSOLE_MODE> {
        let mut mode = CONSOLE_MODE::default();
        unsafe { GetConsoleMode(self.handle, &mut mode) }
            .map_err(|e| TermError::Capture(os_error(e)))?;
        Ok(mode)
    }

    fn apply_raw(&self, saved: &CONSOLE_MODE) -> Result<()> {
        self.set(raw_mode(*saved))?;
        // Drop input typed while the console was still cooked
        let _ = unsafe { FlushConsoleInputBuffer(self.handle) };
        Ok(())
    }

    fn apply(&self, snapshot: &CONSOLE_MODE) -> Result<()> {
        self.set(*snapshot)
    }

    fn poll(&self) -> Result<bool> {
        // WAIT_OBJECT_0: the input buffer holds at least one event
        if unsafe { WaitForSingleObject(self.handle, 0) }.0 != 0 {
            return Ok(false);
        }

        let mut pending: u32 = 0;
        unsafe { GetNumberOfConsoleInputEvents(self.handle, &mut pending) }
            .map_err(|e| TermError::Poll(os_error(e)))?;
        if pending == 0 {
            return Ok(false);
        }

        // Peek the whole queue; a key can sit behind any number of other events
        let mut records = vec![INPUT_RECORD::default(); pending as usize];
        let mut read: u32 = 0;
        unsafe { PeekConsoleInputW(self.handle, &mut records, &mut read) }
            .map_err(|e| TermError::Poll(os_error(e)))?;

        Ok(records[..read as usize].iter().any(is_char_key))
    }

    fn input_flags(&self) -> Result<InputFlags> {
        let mode = self.capture()?;
        let mut flags = InputFlags::empty();
        if mode.0 & ENABLE_ECHO_INPUT.0 != 0 {
            flags |= InputFlags::ECHO;
        }
        if mode.0 & ENABLE_LINE_INPUT.0 != 0 {
            flags |= InputFlags::LINE_BUFFERED;
        }
        Ok(flags)
    }

    fn arm_interrupt(&self, saved: &CONSOLE_MODE) -> Result<()> {
        install_handler()?;

        ARMED.store(false, Ordering::SeqCst);
        SAVED_HANDLE.store(self.handle.0 as isize, Ordering::SeqCst);
        SAVED_MODE.store(saved.0, Ordering::SeqCst);
        ARMED.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disarm_interrupt(&self) {
        if SAVED_HANDLE.load(Ordering::SeqCst) == self.handle.0 as isize {
            ARMED.store(false, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::Win32::System::Console::{
        CTRL_CLOSE_EVENT, ENABLE_PROCESSED_INPUT, ENABLE_WINDOW_INPUT, FOCUS_EVENT,
        FOCUS_EVENT_RECORD, INPUT_RECORD_0, KEY_EVENT_RECORD, KEY_EVENT_RECORD_0,
    };

    const VK_SHIFT: u16 = 0x10;
    const VK_LEFT: u16 = 0x25;

    fn key_record(down: bool, vk: u16, ch: u16) -> INPUT_RECORD {
        INPUT_RECORD {
            EventType: KEY_EVENT as u16,
            Event: INPUT_RECORD_0 {
                KeyEvent: KEY_EVENT_RECORD {
                    bKeyDown: down.into(),
                    wRepeatCount: 1,
                    wVirtualKeyCode: vk,
                    uChar: KEY_EVENT_RECORD_0 { UnicodeChar: ch },
                    ..Default::default()
                },
            },
        }
    }

    fn focus_record() -> INPUT_RECORD {
        INPUT_RECORD {
            EventType: FOCUS_EVENT as u16,
            Event: INPUT_RECORD_0 {
                FocusEvent: FOCUS_EVENT_RECORD {
                    bSetFocus: true.into(),
                },
            },
        }
    }

    #[test]
    fn test_raw_mode_keeps_other_flags() {
        let cooked = CONSOLE_MODE(
            ENABLE_ECHO_INPUT.0 | ENABLE_LINE_INPUT.0 | ENABLE_PROCESSED_INPUT.0 | ENABLE_WINDOW_INPUT.0,
        );
        let raw = raw_mode(cooked);
        assert_eq!(raw.0, ENABLE_PROCESSED_INPUT.0 | ENABLE_WINDOW_INPUT.0);
    }

    #[test]
    fn test_raw_mode_of_raw_is_unchanged() {
        let raw = raw_mode(CONSOLE_MODE(ENABLE_PROCESSED_INPUT.0));
        assert_eq!(raw_mode(raw).0, raw.0);
    }

    #[test]
    fn test_char_key_down_counts() {
        assert!(is_char_key(&key_record(true, 0x41, 'a' as u16)));
    }

    #[test]
    fn test_key_up_is_ignored() {
        assert!(!is_char_key(&key_record(false, 0x41, 'a' as u16)));
    }

    #[test]
    fn test_modifier_and_arrow_keys_are_ignored() {
        assert!(!is_char_key(&key_record(true, VK_SHIFT, 0)));
        assert!(!is_char_key(&key_record(true, VK_LEFT, 0)));
    }

    #[test]
    fn test_non_key_events_are_ignored() {
        assert!(!is_char_key(&focus_record()));
    }

    #[test]
    fn test_key_behind_many_other_events_is_found() {
        let mut records = vec![focus_record(); 40];
        records.push(key_record(true, VK_SHIFT, 0));
        assert!(!records.iter().any(is_char_key));

        records.push(key_record(true, 0x41, 'a' as u16));
        assert!(records.iter().any(is_char_key));
    }

    #[test]
    fn test_handler_passes_on_other_events() {
        let handled = unsafe { handle_interrupt(CTRL_CLOSE_EVENT) };
        assert!(!handled.as_bool());
    }
}
