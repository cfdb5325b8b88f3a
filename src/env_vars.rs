//! Environment variable handling.
//!
//! Environment overrides sit between CLI flags (higher) and config files
//! (lower).

use std::env;

fn parse_bool(value: &str) -> bool {
    let s = value.trim().to_lowercase();
    s == "1" || s == "true" || s == "yes"
}

// Helper for boolean environment variables that accept "1", "true", "yes"
fn is_enabled(var: &str) -> bool {
    env::var(var).ok().is_some_and(|s| parse_bool(&s))
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|s| !s.trim().is_empty())
}

// Toolchain selection

/// Cargo executable (`EXTPACK_CARGO`, then `CARGO` as set by rustup/cargo).
pub fn cargo() -> Option<String> {
    non_empty("EXTPACK_CARGO").or_else(|| non_empty("CARGO"))
}

/// Target triple override (`CARGO_BUILD_TARGET`).
pub fn cargo_build_target() -> Option<String> {
    non_empty("CARGO_BUILD_TARGET")
}

/// Cargo target directory (`CARGO_TARGET_DIR`).
pub fn cargo_target_dir() -> Option<String> {
    non_empty("CARGO_TARGET_DIR")
}

// Host runtime

/// Host interpreter (`EXTPACK_PYTHON`, then `PYO3_PYTHON`).
pub fn python() -> Option<String> {
    non_empty("EXTPACK_PYTHON").or_else(|| non_empty("PYO3_PYTHON"))
}

// Build tool environment forwarded to Cargo for C/C++ dependencies

/// Get C compiler (useful for cross-compilation).
pub fn cc() -> Option<String> {
    non_empty("CC")
}

/// Get C++ compiler (useful for cross-compilation).
pub fn cxx() -> Option<String> {
    non_empty("CXX")
}

/// Get C compiler flags.
pub fn cflags() -> Option<String> {
    non_empty("CFLAGS")
}

/// Get C++ compiler flags.
pub fn cxxflags() -> Option<String> {
    non_empty("CXXFLAGS")
}

/// Get linker flags.
pub fn ldflags() -> Option<String> {
    non_empty("LDFLAGS")
}

/// All forwarded build tool variables that are set, as `(name, value)` pairs.
pub fn build_tool_env() -> Vec<(&'static str, String)> {
    [
        ("CC", cc()),
        ("CXX", cxx()),
        ("CFLAGS", cflags()),
        ("CXXFLAGS", cxxflags()),
        ("LDFLAGS", ldflags()),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| (name, v)))
    .collect()
}

// extpack itself

/// Release ledger location (`EXTPACK_LEDGER`).
pub fn ledger() -> Option<String> {
    non_empty("EXTPACK_LEDGER")
}

/// Output directory for placed artifacts (`EXTPACK_OUT_DIR`).
pub fn out_dir() -> Option<String> {
    non_empty("EXTPACK_OUT_DIR")
}

/// Enable debug logging (`EXTPACK_DEBUG`).
pub fn debug() -> bool {
    is_enabled("EXTPACK_DEBUG")
}

/// Skip config files entirely (`EXTPACK_NO_CONFIG`).
pub fn no_config() -> bool {
    is_enabled("EXTPACK_NO_CONFIG")
}

/// Get `XDG_CONFIG_HOME` directory.
pub fn xdg_config_home() -> Option<String> {
    non_empty("XDG_CONFIG_HOME")
}
