//! Common test utilities and helpers
//!
//! This module provides shared functionality used across integration tests:
//! - Binary path resolution (via `helpers::extpack_binary`)
//! - Package fixtures and fake toolchain scripts (via `helpers`)

pub(crate) mod helpers;
