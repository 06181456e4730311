use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use jex::Server;

#[derive(Parser, Debug)]
#[command(name = "jexd")]
#[command(about = "Loopback evaluation bridge for a local modeling host")]
struct Args {
    /// Port to listen on; an ephemeral port is chosen when omitted
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only the port handshake
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let server = Server::bind(args.port).await.with_context(|| match args.port {
        Some(port) => format!("Failed to bind 127.0.0.1:{}", port),
        None => "Failed to bind an ephemeral loopback port".to_string(),
    })?;

    // The spawning host reads this line to discover where to connect
    let port = server.port().context("Failed to read bound port")?;
    println!("{}", port);

    info!("listening on 127.0.0.1:{}", port);
    server.serve().await.context("Listener terminated")?;
    Ok(())
}
