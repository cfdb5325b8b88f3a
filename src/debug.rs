//! Debug logging
//!
//! A process-wide switch set from `--debug` or `EXTPACK_DEBUG`. When it is
//! off, `debug!` only costs an atomic load.

use std::sync::OnceLock;
use std::time::Instant;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();
static STARTED: OnceLock<Instant> = OnceLock::new();

/// Initialize debug mode from the command-line flag or environment
pub fn init_debug(enabled: bool) {
    let _ = STARTED.set(Instant::now());
    let _ = DEBUG_ENABLED.set(enabled || crate::env_vars::debug());
}

/// Check if debug mode is enabled
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.get().copied().unwrap_or(false)
}

/// Milliseconds since [`init_debug`] ran (0 before it)
pub fn elapsed_ms() -> u128 {
    STARTED.get().map_or(0, |start| start.elapsed().as_millis())
}

/// Print formatted debug message if debug mode is enabled
pub fn debug_logf(args: std::fmt::Arguments<'_>) {
    if is_debug_enabled() {
        eprintln!("[DEBUG {:>6}ms] {args}", elapsed_ms());
    }
}

/// Log a debug line with elapsed time
///
/// Usage: `debug!("compiling {} for {}", module, target)`
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            $crate::debug::debug_logf(format_args!($($arg)*));
        }
    };
}
