//! keyterm - raw-mode key monitor
//!
//! Puts the terminal into raw mode, reports every key as it arrives, and
//! restores the terminal when the quit key is pressed or on Ctrl+C.
//!
//! # Quick Start
//!
//! ```text
//! keyterm                       # quit with q, or Ctrl+C
//! keyterm --quiet               # no status lines
//! keyterm --config ./dev.toml   # alternative configuration
//! ```

use std::env;
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use keyterm::config::Config;
use keyterm::{check_key, setup_term, shutdown_term};

/// Command line options
#[derive(Default)]
struct Args {
    /// Configuration file overriding ~/.keyterm/config.toml
    config: Option<PathBuf>,
    /// Suppress status lines
    quiet: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("keyterm {}", VERSION);
}

fn print_help() {
    eprintln!("keyterm {} - raw-mode key monitor", VERSION);
    eprintln!();
    eprintln!("Usage: keyterm [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>   Configuration file");
    eprintln!("  -q, --quiet           Do not print status lines");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys are printed as they are pressed. Press the quit key");
    eprintln!("(default: q) to exit, or Ctrl+C to interrupt.");
    eprintln!();
    eprintln!("Configuration: ~/.keyterm/config.toml");
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| format!("{} requires a file argument", arg))?;
                args.config = Some(PathBuf::from(path));
            }
            "-q" | "--quiet" => args.quiet = true,
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => return Err(format!("Unknown option: {}", other)),
        }
    }

    Ok(args)
}

/// Send logs to a file; stdout belongs to the raw terminal
fn init_logging(config: &Config) {
    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Printable form of an input byte
fn describe_key(byte: u8) -> String {
    match byte {
        0x20..=0x7e => format!("'{}'", byte as char),
        0x1b => "ESC".to_string(),
        0x7f => "DEL".to_string(),
        b'\n' => "LF".to_string(),
        b'\r' => "CR".to_string(),
        b'\t' => "TAB".to_string(),
        0x00..=0x1f => format!("^{}", (byte + 0x40) as char),
        _ => format!("0x{:02x}", byte),
    }
}

fn run_key_loop(config: &Config) -> anyhow::Result<()> {
    let quit = config.quit_byte();
    let interval = config.poll_interval();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if !check_key() {
            std::thread::sleep(interval);
            continue;
        }

        // Drain everything that arrived; bytes left in the stdin buffer
        // would not show up in the next key check
        let mut input = stdin.lock();
        let bytes = input.fill_buf()?;
        if bytes.is_empty() {
            info!("Input closed");
            return Ok(());
        }

        let len = bytes.len();
        let mut quit_pressed = false;
        for &byte in bytes {
            writeln!(stdout, "Key: {} (0x{:02x})", describe_key(byte), byte)?;
            if Some(byte) == quit {
                quit_pressed = true;
                break;
            }
        }
        input.consume(len);
        stdout.flush()?;

        if quit_pressed {
            return Ok(());
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let config = match args.config {
        Some(ref path) => match Config::load_from(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::load(),
    };

    init_logging(&config);
    info!("keyterm {} starting...", VERSION);

    keyterm::term::set_announce(config.announce && !args.quiet);

    if let Err(e) = setup_term() {
        error!("Terminal setup failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let result = run_key_loop(&config);

    shutdown_term();
    info!("keyterm exiting");

    result
}
