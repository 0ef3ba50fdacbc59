//! Use case: serve one game over datagrams.
//!
//! The first address to send a greeting is pinned as the peer for the whole
//! game.  Every fresh symbol is handed to the [`DatagramResponder`]; the
//! [`ReliableChannel`] takes care of timeouts and duplicates.  After the
//! closing `Q` the server lingers a few intervals so a lost echo can still
//! be repaired before it stops listening.

use tracing::{debug, info};
use ttt_core::protocol::DatagramResponder;
use ttt_core::{DatagramLink, GameSession, MoveSelector, ReliableChannel, Step};

use super::game_report::{GameReport, ServeError};

/// Serves a single game on `channel`, which must not have a peer yet.
///
/// # Errors
///
/// Returns [`ServeError::Reliability`] on socket failure and
/// [`ServeError::Game`] if the board rejects a validated move.
pub async fn serve_datagram<L: DatagramLink>(
    channel: &mut ReliableChannel<L>,
    selector: &mut dyn MoveSelector,
) -> Result<GameReport, ServeError> {
    let first_mover = channel.accept().await?;
    let mut session = GameSession::new(first_mover);
    let mut responder = DatagramResponder::open(first_mover);
    info!(session = %session.id(), peer = ?channel.peer(), ?first_mover, "datagram game started");

    loop {
        let symbol = channel.next().await?;
        let step = responder.on_symbol(&mut session, selector, symbol)?;
        match step {
            Step::Send(reply) => channel.send(reply).await?,
            Step::End { reply, end } => {
                if let Some(reply) = reply {
                    channel.send(reply).await?;
                }
                channel.linger(|_| false).await?;
                let stats = channel.stats();
                info!(
                    session = %session.id(),
                    ?end,
                    board = %session.summary(),
                    retransmissions = stats.retransmissions,
                    duplicates = stats.duplicates,
                    "datagram game over"
                );
                return Ok(GameReport::new(&session, end, channel.peer()).with_stats(stats));
            }
            Step::Ignore | Step::Prompt => {}
        }
        debug!(
            session = %session.id(),
            received = %symbol,
            pending = ?channel.pending(),
            state = ?responder.state(),
            board = %session.summary(),
            "exchange"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;
    use ttt_core::transport::mock::ScriptedDatagramLink;
    use ttt_core::{GameEnd, Outcome, Position, ReliabilityConfig, ScriptedSelector, Side, Symbol};

    fn client() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 50000))
    }

    fn config() -> ReliabilityConfig {
        ReliabilityConfig {
            timeout_ms: 1000,
            handshake_retries: 5,
            linger_intervals: 2,
        }
    }

    fn play(i: usize) -> Symbol {
        Symbol::Play(Position::new(i).expect("valid position"))
    }

    #[tokio::test]
    async fn test_serve_datagram_plays_initiator_win() {
        // Arrange: initiator takes the top row, responder plays 3 then 4
        let mut link = ScriptedDatagramLink::new().with_symbol(Symbol::StartInitiatorFirst, client());
        for (mine, theirs) in [(0, 3), (1, 4)] {
            link = link
                .with_symbol(play(mine), client())
                .with_symbol(Symbol::EndTurn, client())
                .with_symbol(play(theirs), client());
        }
        link = link
            .with_symbol(play(2), client())
            .with_symbol(Symbol::EndTurn, client())
            .with_symbol(Symbol::InitiatorWon, client())
            .with_silence()
            .with_silence();
        let mut channel = ReliableChannel::new(link, config());
        let mut selector = ScriptedSelector::new([3, 4]);

        // Act
        let report = serve_datagram(&mut channel, &mut selector).await.expect("serve");

        // Assert
        assert_eq!(report.end, GameEnd::Finished(Outcome::InitiatorWins));
        assert_eq!(report.moves, 5);
        assert_eq!(report.peer, Some(client()));
        assert_eq!(
            channel.link().sent_symbols(),
            vec![
                Symbol::StartInitiatorFirst,
                play(0),
                play(3),
                Symbol::EndTurn,
                play(1),
                play(4),
                Symbol::EndTurn,
                play(2),
                Symbol::InitiatorWon,
                Symbol::Quit,
            ]
        );
    }

    #[tokio::test]
    async fn test_serve_datagram_answers_repeated_echo_with_pending_symbol() {
        // Arrange: responder opens on 4 and the initiator's echo arrives twice
        let link = ScriptedDatagramLink::new()
            .with_symbol(Symbol::StartResponderFirst, client())
            .with_symbol(Symbol::EndTurn, client())
            .with_symbol(play(4), client())
            .with_symbol(play(4), client())
            .with_symbol(Symbol::Quit, client())
            .with_silence()
            .with_silence();
        let mut channel = ReliableChannel::new(link, config());
        let mut selector = ScriptedSelector::new([4]);

        // Act
        let report = serve_datagram(&mut channel, &mut selector).await.expect("serve");

        // Assert
        assert_eq!(
            channel.link().sent_symbols(),
            vec![
                Symbol::StartResponderFirst,
                play(4),
                Symbol::EndTurn,
                Symbol::EndTurn,
                Symbol::Quit
            ]
        );
        assert_eq!(report.end, GameEnd::Quit { by: Side::Initiator });
        assert_eq!(report.board.cell(4), Some(Side::Responder));
        assert_eq!(report.moves, 1);
    }

    #[tokio::test]
    async fn test_serve_datagram_reports_stats() {
        let link = ScriptedDatagramLink::new()
            .with_symbol(Symbol::StartInitiatorFirst, client())
            .with_symbol(Symbol::StartInitiatorFirst, client())
            .with_symbol(Symbol::Quit, client())
            .with_silence()
            .with_silence();
        let mut channel = ReliableChannel::new(link, config());
        let mut selector = ScriptedSelector::default();

        let report = serve_datagram(&mut channel, &mut selector).await.expect("serve");

        let stats = report.stats.expect("datagram stats");
        assert_eq!(stats.duplicates, 1);
        assert_eq!(
            channel.link().sent_symbols(),
            vec![
                Symbol::StartInitiatorFirst,
                Symbol::StartInitiatorFirst,
                Symbol::Quit
            ]
        );
    }

    #[tokio::test]
    async fn test_serve_datagram_surfaces_closed_link() {
        let link = ScriptedDatagramLink::new().with_symbol(Symbol::StartInitiatorFirst, client());
        let mut channel = ReliableChannel::new(link, config());
        let mut selector = ScriptedSelector::default();

        let result = serve_datagram(&mut channel, &mut selector).await;

        assert!(matches!(result, Err(ServeError::Reliability(_))));
    }
}
