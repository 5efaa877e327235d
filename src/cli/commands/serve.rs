//! Serve command.
//!
//! Starts the Model Context Protocol server that exposes the Anki
//! collection and study sessions to AI tools.

use anyhow::Result;

use anki_study_mcp::config::Config;

/// Arguments for the serve command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    anki-study serve                                 Use the configured AnkiConnect URL\n    \
    anki-study serve --anki-url http://host:8765     Talk to Anki on another machine")]
pub struct Args {
    /// AnkiConnect endpoint, overriding the config file and ANKI_CONNECT_URL
    #[arg(long, value_name = "URL")]
    pub anki_url: Option<String>,
}

/// Executes the serve command.
pub fn run(args: Args, mut config: Config) -> Result<()> {
    if let Some(url) = args.anki_url {
        config.anki_connect_url = url;
    }

    // The MCP server needs its own tokio runtime
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(anki_study_mcp::mcp::run_server(config))
}
