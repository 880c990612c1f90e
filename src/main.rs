use anyhow::Context;
use clap::Parser;
use tracing::Level;

use sws::access_log::AccessLog;
use sws::config::{Cli, Config};
use sws::http::mime::ContentTypeTable;
use sws::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let cfg = Config::load(cli)?;

    let mime = match &cfg.content_types {
        Some(path) => ContentTypeTable::load(path)
            .with_context(|| format!("loading content types from {}", path.display()))?,
        None => ContentTypeTable::builtin(),
    };

    // debug mode keeps the access log on the terminal
    let access_log = match &cfg.log_file {
        Some(path) if !cfg.debug => AccessLog::open(path)
            .with_context(|| format!("opening log file {}", path.display()))?,
        _ => AccessLog::disabled(),
    };

    let server = Server::new(cfg, mime, access_log);
    let listener = server.bind().await?;

    tokio::select! {
        res = server.serve(listener) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
