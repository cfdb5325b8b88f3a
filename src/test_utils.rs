//! Shared test utilities for extpack tests
//!
//! Builds throwaway packages and stands in for Cargo and the host interpreter
//! with small shell scripts, so the pipeline runs without a real toolchain.

#[cfg(test)]
pub mod fixtures {
    use crate::descriptor::DESCRIPTOR_FILE;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Stderr printed by a failing fake Cargo
    pub const COMPILE_ERROR: &str = "error[E0425]: cannot find value `knife` in this scope\n --> src/lib.rs:4:5";

    /// How the fake Cargo behaves when asked to build
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FakeCargo<'a> {
        /// Produce a cdylib exporting `PyInit_<symbol>`
        Succeed { symbol: &'a str },
        /// Exit 101 with [`COMPILE_ERROR`] on stderr
        FailToCompile,
        /// Succeed but only emit an rlib
        NoCdylib,
        /// Never finish (until killed)
        Hang,
    }

    /// Create a package directory with `extpack.toml` and a stub `Cargo.toml`
    pub fn create_package(name: &str, version: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let descriptor = write_descriptor(temp_dir.path(), name, version);

        fs::write(
            temp_dir.path().join("Cargo.toml"),
            format!(
                "[package]\nname = \"{name}\"\nversion = \"{version}\"\n\n[lib]\ncrate-type = [\"cdylib\"]\n"
            ),
        )
        .expect("Failed to write Cargo.toml");

        (temp_dir, descriptor)
    }

    /// (Re)write the descriptor in `dir`
    pub fn write_descriptor(dir: &Path, name: &str, version: &str) -> PathBuf {
        let path = dir.join(DESCRIPTOR_FILE);
        let content = format!(
            r#"[package]
name = "{name}"
version = "{version}"
zip-safe = false

[[extension]]
name = "{name}"
manifest = "Cargo.toml"
binding = "pyo3"
"#
        );
        fs::write(&path, content).expect("Failed to write descriptor");
        path
    }

    /// Write an executable fake Cargo into `dir`
    #[cfg(unix)]
    pub fn fake_cargo(dir: &Path, behavior: FakeCargo<'_>) -> PathBuf {
        let build = match behavior {
            FakeCargo::Succeed { symbol } => format!(
                r#"mkdir -p "$target_dir/$profile"
lib="$target_dir/$profile/lib{symbol}.so"
printf 'ELF PyInit_{symbol} %s\0' "$$" > "$lib"
echo '{{"reason":"compiler-artifact","target":{{"kind":["lib"],"name":"dep"}},"filenames":["/nowhere/libdep.rlib"]}}'
echo "{{\"reason\":\"compiler-artifact\",\"target\":{{\"kind\":[\"cdylib\"],\"name\":\"{symbol}\"}},\"filenames\":[\"$lib\"]}}"
echo '{{"reason":"build-finished","success":true}}'
echo "   Compiling {symbol} v0.0.0" >&2"#
            ),
            FakeCargo::FailToCompile => format!(
                "printf '%s\\n' '{}' >&2\nexit 101",
                COMPILE_ERROR.replace('\n', "' '")
            ),
            FakeCargo::NoCdylib => r#"echo '{"reason":"compiler-artifact","target":{"kind":["lib"],"name":"knife"},"filenames":["/nowhere/libknife.rlib"]}'"#
                .to_string(),
            FakeCargo::Hang => "exec sleep 30".to_string(),
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

    /// Write an executable fake interpreter; `import_ok` decides the exit code
    #[cfg(unix)]
    pub fn fake_python(dir: &Path, import_ok: bool) -> PathBuf {
        let body = if import_ok {
            "exit 0".to_string()
        } else {
            "echo \"ImportError: dynamic module does not define module export function\" >&2\nexit 1"
                .to_string()
        };
        write_executable(&dir.join("python"), &format!("#!/bin/sh\n{body}\n"))
    }

    #[cfg(unix)]
    fn write_executable(path: &Path, content: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        fs::write(path, content).expect("Failed to write script");
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod script");
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PackageDescriptor;

    #[test]
    fn create_package_is_loadable() {
        let (_temp, descriptor) = fixtures::create_package("rustyknife", "0.1.1");
        let pkg = PackageDescriptor::load(&descriptor).unwrap();

        assert_eq!(pkg.full_name(), "rustyknife-0.1.1");
        let ext = pkg.extensions().first().unwrap();
        assert!(ext.resolve_manifest(pkg.root()).is_ok());
    }
}
