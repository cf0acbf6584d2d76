mod frontend;
mod game;
mod network;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use frontend::{Frontend, NullFrontend, TermFrontend};
use network::{Relay, Session, SessionOutcome};

#[derive(Parser)]
#[command(name = "netpong")]
#[command(about = "Networked two-player Pong synchronized through a relay server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Host a match: relay shared state between the two players
    Relay {
        /// Address to bind the relay to
        #[arg(short, long, default_value = "127.0.0.1:55555")]
        bind: SocketAddr,
    },
    /// Join a match hosted by a relay
    Play {
        /// Relay address to connect to
        #[arg(short, long, default_value = "127.0.0.1:55555")]
        server: SocketAddr,
        /// Run without the terminal renderer
        #[arg(long)]
        headless: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Relay { bind } => run_relay(bind).await,
        Commands::Play { server, headless } => run_player(server, headless).await,
    }
}

async fn run_relay(bind: SocketAddr) -> Result<()> {
    let relay = Relay::bind(bind).await?;
    info!("Players can join with: netpong play --server {}", relay.local_addr()?);

    tokio::select! {
        result = relay.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Relay shutting down...");
            Ok(())
        }
    }
}

async fn run_player(server: SocketAddr, headless: bool) -> Result<()> {
    info!("Connecting to relay at {}", server);
    let session = Session::connect(server).await?;

    let mut frontend: Box<dyn Frontend> = if headless {
        Box::new(NullFrontend)
    } else {
        Box::new(TermFrontend::new())
    };

    match session.run(frontend.as_mut()).await? {
        SessionOutcome::Winner(side) => info!("Match over: {} player wins!", side),
        SessionOutcome::Disconnected => warn!("Disconnected from relay; match abandoned"),
    }
    Ok(())
}
