//! Completion command
//!
//! Generate shell completion scripts

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io;

/// Generate shell completion scripts
///
/// ```bash
/// extpack completion bash > /usr/local/share/bash-completion/completions/extpack
/// extpack completion zsh > /usr/local/share/zsh/site-functions/_extpack
/// extpack completion fish > ~/.config/fish/completions/extpack.fish
/// ```
#[allow(
    clippy::unnecessary_wraps,
    reason = "Result type maintained for consistency with command signature pattern"
)]
pub(crate) fn run(shell: Shell) -> Result<()> {
    let mut cmd = crate::Cli::command();
    generate(shell, &mut cmd, "extpack", &mut io::stdout());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_bash() {
        assert!(run(Shell::Bash).is_ok());
    }

    #[test]
    fn completion_zsh() {
        assert!(run(Shell::Zsh).is_ok());
    }

    #[test]
    fn completion_fish() {
        assert!(run(Shell::Fish).is_ok());
    }
}
