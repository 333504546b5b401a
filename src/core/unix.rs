//! termios backend for Unix terminals
//!
//! Raw mode clears `ICANON` and `ECHO` in the local flags and leaves the rest
//! of the line discipline (output processing, signals) untouched, so Ctrl+C
//! still raises `SIGINT`.

use std::cell::UnsafeCell;
use std::io;
use std::mem::{self, MaybeUninit};
use std::os::unix::io::{AsRawFd, RawFd};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Mutex, PoisonError};

use crossterm::tty::IsTty;
use tracing::debug;

use super::console::{Console, InputFlags, Result, TermError};
use super::INTERRUPT_EXIT_CODE;

/// Terminal configuration restored by the interrupt handler.
///
/// Only written while `ARMED` is false and `ARM_LOCK` is held; the handler
/// reads it only after observing `ARMED` set.
struct InterruptSlot(UnsafeCell<MaybeUninit<libc::termios>>);

// Safety: access is serialized through ARM_LOCK and ARMED
unsafe impl Sync for InterruptSlot {}

static SAVED: InterruptSlot = InterruptSlot(UnsafeCell::new(MaybeUninit::uninit()));
static SAVED_FD: AtomicI32 = AtomicI32::new(-1);
static ARMED: AtomicBool = AtomicBool::new(false);
static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);
static ARM_LOCK: Mutex<()> = Mutex::new(());

extern "C" fn handle_interrupt(_signal: libc::c_int) {
    // Async-signal-safe calls only: tcsetattr, write, _exit
    if ARMED.swap(false, Ordering::SeqCst) {
        let fd = SAVED_FD.load(Ordering::SeqCst);
        unsafe {
            libc::tcsetattr(fd, libc::TCSANOW, (*SAVED.0.get()).as_ptr());
        }
    }
    unsafe {
        libc::write(libc::STDOUT_FILENO, b"\n".as_ptr().cast(), 1);
        libc::_exit(INTERRUPT_EXIT_CODE);
    }
}

fn install_handler() -> Result<()> {
    if HANDLER_INSTALLED.load(Ordering::SeqCst) {
        return Ok(());
    }

    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = handle_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);

        if libc::sigaction(libc::SIGINT, &action, ptr::null_mut()) != 0 {
            return Err(TermError::SignalHandler(io::Error::last_os_error()));
        }
    }

    HANDLER_INSTALLED.store(true, Ordering::SeqCst);
    debug!("SIGINT handler installed");
    Ok(())
}

/// A terminal device addressed by file descriptor
#[derive(Debug, Clone, Copy)]
pub struct UnixConsole {
    fd: RawFd,
}

impl UnixConsole {
    /// Console on the process's standard input
    pub fn stdin() -> Result<Self> {
        let stdin = io::stdin();
        if !stdin.is_tty() {
            return Err(TermError::NotATerminal);
        }
        Ok(Self::from_fd(stdin.as_raw_fd()))
    }

    /// Console on an arbitrary descriptor. The descriptor is borrowed and
    /// must stay open for as long as the console is used.
    pub fn from_fd(fd: RawFd) -> Self {
        Self { fd }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    fn set(&self, tio: &libc::termios) -> Result<()> {
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, tio) } != 0 {
            return Err(TermError::Apply(io::Error::last_os_error()));
        }
        Ok(())
    }
}

impl Console for UnixConsole {
    type Snapshot = libc::termios;

    fn capture(&self) -> Result<libc::termios> {
        let mut tio = MaybeUninit::<libc::termios>::uninit();
        if unsafe { libc::tcgetattr(self.fd, tio.as_mut_ptr()) } != 0 {
            return Err(TermError::Capture(io::Error::last_os_error()));
        }
        Ok(unsafe { tio.assume_init() })
    }

    fn apply_raw(&self, saved: &libc::termios) -> Result<()> {
        let mut raw = *saved;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);
        self.set(&raw)
    }

    fn apply(&self, snapshot: &libc::termios) -> Result<()> {
        self.set(snapshot)
    }

    fn poll(&self) -> Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let ready = unsafe { libc::poll(&mut pfd, 1, 0) };

        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(TermError::Poll(err));
        }
        if pfd.revents & libc::POLLNVAL != 0 {
            return Err(TermError::Poll(io::Error::from_raw_os_error(libc::EBADF)));
        }
        // Hang-up and error count as ready: the next read returns at once
        Ok(pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
    }

    fn input_flags(&self) -> Result<InputFlags> {
        let tio = self.capture()?;
        let mut flags = InputFlags::empty();
        if tio.c_lflag & libc::ECHO != 0 {
            flags |= InputFlags::ECHO;
        }
        if tio.c_lflag & libc::ICANON != 0 {
            flags |= InputFlags::LINE_BUFFERED;
        }
        Ok(flags)
    }

    fn arm_interrupt(&self, saved: &libc::termios) -> Result<()> {
        let _guard = ARM_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        install_handler()?;

        ARMED.store(false, Ordering::SeqCst);
        unsafe {
            (*SAVED.0.get()).write(*saved);
        }
        SAVED_FD.store(self.fd, Ordering::SeqCst);
        ARMED.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disarm_interrupt(&self) {
        let _guard = ARM_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        if SAVED_FD.load(Ordering::SeqCst) == self.fd {
            ARMED.store(false, Ordering::SeqCst);
        }
    }
}
