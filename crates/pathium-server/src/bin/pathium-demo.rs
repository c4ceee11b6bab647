//! pathium-demo
//!
//! Serves the demo application over HTTP.

use std::net::SocketAddr;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pathium_server::{demo, Server};

/// Demo server for the pathium routing layer.
#[derive(Parser)]
#[command(name = "pathium-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(short, long, env = "PATHIUM_ADDR", default_value = "127.0.0.1:8000")]
    addr: SocketAddr,

    /// Secret used to sign and verify bearer tokens.
    #[arg(long, env = "PATHIUM_JWT_SECRET", default_value = "dev-secret")]
    jwt_secret: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let app = demo::build(&cli.jwt_secret)?;
    let server = Server::bind(cli.addr).await?;
    info!(docs = %format!("http://{}/docs", server.local_addr()?), "api docs");

    server.serve(app).await?;
    Ok(())
}
