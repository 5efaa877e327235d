//! Check command - verify that AnkiConnect is reachable.
//!
//! Calls the `version` and `deckNames` actions and reports the result,
//! so a broken setup is found before an MCP client tries to use it.

use anyhow::Result;
use colored::Colorize;

use anki_study_mcp::anki::{AnkiClient, ANKI_CONNECT_VERSION};
use anki_study_mcp::config::Config;

/// Executes the check command.
///
/// Returns an error if AnkiConnect cannot be reached, so the exit code
/// reflects the outcome.
pub fn run(config: &Config) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(check(config))
}

async fn check(config: &Config) -> Result<()> {
    let client = AnkiClient::from_config(config)?;
    println!("{} {}", "AnkiConnect:".bold(), client.base_url());

    let version = match client.version().await {
        Ok(version) => version,
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            println!();
            println!(
                "{}",
                "Hint: start Anki and make sure the AnkiConnect add-on is installed".yellow()
            );
            anyhow::bail!("AnkiConnect is not reachable at {}", client.base_url());
        }
    };

    if version < ANKI_CONNECT_VERSION {
        println!(
            "  {} API version {} (version {} or later expected)",
            "!".yellow(),
            version,
            ANKI_CONNECT_VERSION
        );
    } else {
        println!("  {} API version {}", "✓".green(), version);
    }

    let decks = client.deck_names().await?;
    println!("  {} {} deck(s)", "✓".green(), decks.len());
    for deck in decks.iter().take(10) {
        println!("    {}", deck.dimmed());
    }
    if decks.len() > 10 {
        println!("    {}", format!("... and {} more", decks.len() - 10).dimmed());
    }

    Ok(())
}
