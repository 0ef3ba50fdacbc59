//! Tic-tac-toe client entry point.
//!
//! Parses the command line, connects to the server over the chosen
//! transport and plays one game from the terminal.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()             -- file or defaults, then CLI overrides
//!  └─ resolve(server, port)
//!  └─ stream:   connect_stream → play_stream
//!     datagram: open_datagram  → play_datagram
//!  └─ Ctrl-C                    -- best-effort Q to the server, then exit
//! ```
//!
//! Logs go to stderr so they never interleave with the board on stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ttt_client::application::{abort_stream, play_datagram, play_stream, PlayError, PlayReport};
use ttt_client::infrastructure::console::ConsoleMoveSource;
use ttt_client::infrastructure::network;
use ttt_client::infrastructure::storage::config::{load_config, ClientConfig};
use ttt_core::{FirstMover, TransportKind};

#[derive(Debug, Parser)]
#[command(name = "ttt-client", version, about = "Play tic-tac-toe against a ttt-server")]
struct Cli {
    /// Move first (you play X).  Otherwise the server opens.
    #[arg(short = 'c', long = "first")]
    first: bool,

    /// Server host name or address.
    #[arg(short = 's', long, env = "TTT_SERVER")]
    server: Option<String>,

    /// Server port.
    #[arg(long, env = "TTT_PORT")]
    port: Option<u16>,

    /// Transport to use: stream (tcp) or datagram (udp).
    #[arg(long, env = "TTT_TRANSPORT")]
    transport: Option<TransportKind>,

    /// Path to the TOML config file.
    #[arg(long, env = "TTT_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(server) = &self.server {
            config.network.server = Some(server.clone());
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(transport) = self.transport {
            config.network.transport = transport;
        }
    }

    fn first_mover(&self) -> FirstMover {
        if self.first {
            FirstMover::Initiator
        } else {
            FirstMover::Responder
        }
    }
}

/// How the play phase ended.
enum Finish {
    Played(Result<PlayReport, PlayError>),
    Interrupted,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref()).context("loading configuration")?;
    cli.apply(&mut config);

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level)),
        )
        .init();

    let host = config
        .network
        .server
        .clone()
        .context("no server given: pass -s <SERVER> or set [network] server")?;
    let server = network::resolve(&host, config.network.port).await?;
    let first_mover = cli.first_mover();
    let mut source = ConsoleMoveSource::stdio();
    info!(%server, transport = %config.network.transport, ?first_mover, "starting game");

    let finish = match config.network.transport {
        TransportKind::Stream => {
            let mut link = network::connect_stream(server).await?;
            let finish = tokio::select! {
                played = play_stream(&mut link, &mut source, first_mover) => Finish::Played(played),
                _ = tokio::signal::ctrl_c() => Finish::Interrupted,
            };
            if let Finish::Interrupted = finish {
                abort_stream(&mut link).await;
            }
            finish
        }
        TransportKind::Datagram => {
            let mut channel = network::open_datagram(server, config.reliability).await?;
            let finish = tokio::select! {
                played = play_datagram(&mut channel, &mut source, first_mover) => Finish::Played(played),
                _ = tokio::signal::ctrl_c() => Finish::Interrupted,
            };
            if let Finish::Interrupted = finish {
                channel.abort().await;
            }
            finish
        }
    };

    match finish {
        Finish::Played(Ok(report)) => {
            info!(
                session = %report.session.id(),
                end = ?report.end,
                stats = ?report.stats,
                "game finished"
            );
            Ok(ExitCode::SUCCESS)
        }
        Finish::Played(Err(PlayError::HandshakeTimeout { attempts })) => {
            eprintln!("No response from server after {attempts} attempts.");
            Ok(ExitCode::FAILURE)
        }
        Finish::Played(Err(e)) => Err(e).context("game failed"),
        Finish::Interrupted => {
            warn!("interrupted, quit sent to server");
            // A blocked stdin read cannot be cancelled; leave without
            // waiting for the runtime to reap it.
            std::process::exit(130);
        }
    }
}
