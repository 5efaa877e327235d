//! Completions command - generate shell completion scripts.

use clap::Command;
use clap_complete::{generate, Shell};
use std::io;

/// Arguments for the completions command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    anki-study completions bash > ~/.local/share/bash-completion/completions/anki-study\n    \
    anki-study completions zsh > ~/.zfunc/_anki-study\n    \
    anki-study completions fish > ~/.config/fish/completions/anki-study.fish")]
pub struct Args {
    /// Shell to generate completions for
    #[arg(value_name = "SHELL")]
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Writes completions for `cmd` to stdout.
///
/// Called from main.rs, which owns the top-level command definition.
pub fn generate_completions(cmd: &mut Command, shell: Shell) {
    generate(shell, cmd, "anki-study", &mut io::stdout());
}
