//! extpack internal library code
//!
//! Declares a package, binds each of its Rust crates to the host calling
//! convention, compiles them with Cargo and places loadable modules.

/// Package version reported by `extpack --version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod artifact;
pub mod binding;
pub mod compiler;
pub mod config;
pub mod debug;
pub mod descriptor;
pub mod env_vars;
pub mod error;
pub mod ledger;
pub mod loader;
pub mod pipeline;
pub mod toolchain;

#[cfg(test)]
pub mod test_utils;

// Re-export common types for convenience
pub use artifact::{Artifact, BuildRecord, place_atomically};
pub use binding::{BindingKind, BuildDirective, Profile, bind};
pub use compiler::{BuildState, CompiledLibrary, CompilerInvocation};
pub use config::Config;
pub use debug::{init_debug, is_debug_enabled};
pub use descriptor::{DESCRIPTOR_FILE, ExtensionDeclaration, PackageDescriptor, declare};
pub use error::{Error, Result};
pub use ledger::{Release, ReleaseLedger};
pub use loader::HostRuntime;
pub use pipeline::{BuildOptions, PackageReport, build_package, publish};
pub use toolchain::Toolchain;
