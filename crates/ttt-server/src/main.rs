//! Tic-tac-toe server entry point.
//!
//! Loads configuration, applies command-line overrides, binds the chosen
//! transport and serves exactly one game.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- file or defaults, then CLI overrides
//!  └─ RandomSelector           -- seeded when [game] seed is set
//!  └─ stream:   bind_stream → accept_one → serve_stream
//!     datagram: bind_datagram → serve_datagram
//!  └─ Ctrl-C                   -- best-effort Q to the client, then exit
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ttt_core::{RandomSelector, TransportKind};
use ttt_server::application::{abort_stream, serve_datagram, serve_stream, GameReport};
use ttt_server::infrastructure::network;
use ttt_server::infrastructure::storage::config::{
    config_file_path, load_config, save_config, ServerConfig,
};

#[derive(Debug, Parser)]
#[command(name = "ttt-server", version, about = "Tic-tac-toe server that plays random moves")]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "TTT_PORT")]
    port: Option<u16>,

    /// Transport to serve: stream (tcp) or datagram (udp).
    #[arg(long, env = "TTT_TRANSPORT")]
    transport: Option<TransportKind>,

    /// Path to the TOML config file.
    #[arg(long, env = "TTT_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for the random move selector.
    #[arg(long, env = "TTT_SEED")]
    seed: Option<u64>,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    init_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(transport) = self.transport {
            config.network.transport = transport;
        }
        if let Some(seed) = self.seed {
            config.game.seed = Some(seed);
        }
    }
}

/// How the serve phase ended.
enum Finish {
    Served(GameReport),
    Interrupted,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref()).context("loading configuration")?;
    cli.apply(&mut config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    if cli.init_config {
        let path = match cli.config.clone() {
            Some(path) => path,
            None => config_file_path().context("resolving config path")?,
        };
        save_config(&config, &path).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote configuration to {}", path.display());
        return Ok(());
    }

    let mut selector = match config.game.seed {
        Some(seed) => {
            info!(seed, "using seeded move selector");
            RandomSelector::seeded(seed)
        }
        None => RandomSelector::from_os(),
    };

    info!(transport = %config.network.transport, port = config.network.port, "tic-tac-toe server starting");

    let finish = match config.network.transport {
        TransportKind::Stream => {
            let listener = network::bind_stream(&config.network).await?;
            let mut link = tokio::select! {
                accepted = network::accept_one(&listener) => accepted?,
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received before a client connected");
                    return Ok(());
                }
            };
            let finish = tokio::select! {
                served = serve_stream(&mut link, &mut selector) => Finish::Served(served?),
                _ = tokio::signal::ctrl_c() => Finish::Interrupted,
            };
            if let Finish::Interrupted = finish {
                abort_stream(&mut link).await;
            }
            finish
        }
        TransportKind::Datagram => {
            let mut channel =
                network::bind_datagram(&config.network, config.reliability).await?;
            let finish = tokio::select! {
                served = serve_datagram(&mut channel, &mut selector) => Finish::Served(served?),
                _ = tokio::signal::ctrl_c() => Finish::Interrupted,
            };
            if let Finish::Interrupted = finish {
                channel.abort().await;
            }
            finish
        }
    };

    match finish {
        Finish::Served(report) => {
            info!(
                session = %report.session_id,
                peer = ?report.peer,
                end = ?report.end,
                moves = report.moves,
                stats = ?report.stats,
                "game finished"
            );
        }
        Finish::Interrupted => warn!("interrupted, game abandoned"),
    }

    info!("tic-tac-toe server stopped");
    Ok(())
}
