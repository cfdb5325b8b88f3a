//! Shared test helpers and utilities

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Path to the built extpack binary
#[allow(dead_code)]
pub(crate) fn extpack_binary() -> &'static str {
    env!("CARGO_BIN_EXE_extpack")
}

/// Command for extpack in `dir` with config files and inherited settings disabled
#[allow(dead_code)]
pub(crate) fn extpack_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(extpack_binary());
    cmd.args(args)
        .current_dir(dir)
        .env("EXTPACK_NO_CONFIG", "1")
        .env_remove("EXTPACK_LEDGER")
        .env_remove("EXTPACK_CARGO")
        .env_remove("EXTPACK_PYTHON")
        .env_remove("EXTPACK_OUT_DIR")
        .env_remove("CARGO_BUILD_TARGET");
    cmd
}

/// Run extpack to completion, see [`extpack_command`]
#[allow(dead_code)]
pub(crate) fn run_extpack(dir: &Path, args: &[&str]) -> Output {
    extpack_command(dir, args)
        .output()
        .expect("Failed to execute extpack")
}

#[allow(dead_code)]
pub(crate) fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[allow(dead_code)]
pub(crate) fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Write `extpack.toml` and a stub `Cargo.toml` for a one-extension package
#[allow(dead_code)]
pub(crate) fn write_package(dir: &Path, name: &str, version: &str) -> PathBuf {
    fs::write(
        dir.join("Cargo.toml"),
        format!("[package]\nname = \"{name}\"\nversion = \"{version}\"\n"),
    )
    .expect("Failed to write Cargo.toml");
    write_descriptor(dir, name, version)
}

/// (Re)write only the descriptor
#[allow(dead_code)]
pub(crate) fn write_descriptor(dir: &Path, name: &str, version: &str) -> PathBuf {
    let path = dir.join("extpack.toml");
    fs::write(
        &path,
        format!(
            "[package]\nname = \"{name}\"\nversion = \"{version}\"\nzip-safe = false\n\n\
             [[extension]]\nname = \"{name}\"\nmanifest = \"Cargo.toml\"\nbinding = \"pyo3\"\n"
        ),
    )
    .expect("Failed to write extpack.toml");
    path
}

/// Fake Cargo that emits a cdylib exporting `PyInit_<symbol>`
///
/// With `symbol` set to `None` it fails like a compile error instead.
#[cfg(unix)]
#[allow(dead_code)]
pub(crate) fn fake_cargo(dir: &Path, symbol: Option<&str>) -> PathBuf {
    let build = match symbol {
        Some(symbol) => format!(
            r#"mkdir -p "$target_dir/$profile"
lib="$target_dir/$profile/lib{symbol}.so"
printf 'ELF PyInit_{symbol} %s\0' "$$" > "$lib"
echo "{{\"reason\":\"compiler-artifact\",\"target\":{{\"kind\":[\"cdylib\"],\"name\":\"{symbol}\"}},\"filenames\":[\"$lib\"]}}""#
        ),
        None => "echo 'error[E0308]: mismatched types' >&2\nexit 101".to_string(),
    };

    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "-vV" ]; then
  echo "cargo 1.82.0 (fake)"
  echo "release: 1.82.0"
  echo "host: x86_64-unknown-linux-gnu"
  exit 0
fi
target_dir=target
profile=debug
while [ $# -gt 0 ]; do
  case "$1" in
    --target-dir) target_dir="$2"; shift ;;
    --release) profile=release ;;
    --) break ;;
  esac
  shift
done
{build}
"#
    );

    write_executable(&dir.join("cargo"), &script)
}

/// Fake Cargo that answers `-vV` but never finishes a build
#[cfg(unix)]
#[allow(dead_code)]
pub(crate) fn fake_hanging_cargo(dir: &Path) -> PathBuf {
    let script = r#"#!/bin/sh
if [ "$1" = "-vV" ]; then
  echo "release: 1.82.0"
  echo "host: x86_64-unknown-linux-gnu"
  exit 0
fi
exec sleep 30
"#;
    write_executable(&dir.join("cargo"), script)
}

/// Fake interpreter whose imports succeed or fail
#[cfg(unix)]
#[allow(dead_code)]
pub(crate) fn fake_python(dir: &Path, import_ok: bool) -> PathBuf {
    let body = if import_ok {
        "exit 0"
    } else {
        "echo 'ImportError: bad magic' >&2\nexit 1"
    };
    write_executable(&dir.join("python"), &format!("#!/bin/sh\n{body}\n"))
}

#[cfg(unix)]
fn write_executable(path: &Path, content: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, content).expect("Failed to write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod script");
    path.to_path_buf()
}
