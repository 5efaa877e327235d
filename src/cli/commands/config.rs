//! Config command - show the resolved configuration

use anyhow::Result;
use colored::Colorize;

use anki_study_mcp::config::Config;

pub fn run(config: &Config) -> Result<()> {
    println!("{}", "Anki Study Configuration".bold());
    println!();

    let path = Config::config_path()?;
    let source = if path.exists() {
        "loaded".green()
    } else {
        "not found, using defaults".dimmed()
    };
    println!("  {}  {} ({})", "Config file:".dimmed(), path.display(), source);
    println!();

    println!("{}", "AnkiConnect:".bold());
    println!("  {}  {}", "URL:".dimmed(), config.anki_connect_url);
    println!(
        "  {}  {}s connect, {}s request",
        "Timeouts:".dimmed(),
        config.connect_timeout_secs,
        config.request_timeout_secs
    );
    println!();

    println!("{}", "Study sessions:".bold());
    println!("  {}  {}", "Default max cards:".dimmed(), config.default_max_cards);
    println!("  {}  {} minutes", "Idle expiry:".dimmed(), config.session_ttl_minutes);
    println!("  {}  {}", "Max live sessions:".dimmed(), config.max_sessions);
    println!();

    let log_target = config
        .log_file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stderr".to_string());
    println!("{}  {}", "Logs:".bold(), log_target);

    Ok(())
}
