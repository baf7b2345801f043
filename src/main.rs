//! Sandboxed DOCX/PDF tool server.
//!
//! Reads one JSON request per line on stdin and answers one JSON response
//! per line on stdout. Logs go to stderr.

use std::io;

use clap::Parser;
use docx_edit_core::PathSandbox;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docx_fs_mcp::{protocol, Config, DocxTools};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::parse();

    info!("Starting docx-fs-mcp v{}", env!("CARGO_PKG_VERSION"));
    let sandbox = PathSandbox::new(config.roots());
    for root in sandbox.roots() {
        info!("  Allowed: {}", root.display());
    }
    if sandbox.roots().is_empty() {
        anyhow::bail!("none of the configured allowed paths could be resolved");
    }

    let tools = DocxTools::new(sandbox);
    let stdin = io::stdin();
    protocol::serve(&tools, stdin.lock(), io::stdout().lock())?;

    info!("Input closed, shutting down");
    Ok(())
}
