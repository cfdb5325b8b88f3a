//! Command implementations

pub(crate) mod build;
pub(crate) mod check;
pub(crate) mod common;
pub(crate) mod completion;
pub(crate) mod init;
pub(crate) mod metadata;
pub(crate) mod publish;
pub(crate) mod releases;
pub(crate) mod verify;
