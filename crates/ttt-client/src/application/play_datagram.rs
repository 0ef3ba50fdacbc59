//! Use case: play one game over datagrams.
//!
//! The greeting is retried a bounded number of times; after that every
//! symbol is resent until the server answers, however long that takes.
//! Moves are only committed once echoed, so a cell the local board already
//! shows as taken is refused before it is ever sent.

use tracing::{debug, info, warn};
use ttt_core::protocol::{DatagramInitiator, DatagramInitiatorState};
use ttt_core::{
    DatagramLink, FirstMover, GameEnd, GameError, GameSession, ReliableChannel, Step, Symbol,
};

use super::move_source::{board_view, directions, MoveChoice, MoveSource, Notice};
use super::play_report::{PlayError, PlayReport};

/// Plays a single game against the server `channel` is pinned to.
///
/// # Errors
///
/// Returns [`PlayError::HandshakeTimeout`] if the greeting is never echoed,
/// [`PlayError::Transport`] on socket failure, [`PlayError::Input`] if the
/// player's input cannot be read and [`PlayError::Game`] if the server
/// confirms a move the local board cannot hold.
pub async fn play_datagram<L, M>(
    channel: &mut ReliableChannel<L>,
    source: &mut M,
    first_mover: FirstMover,
) -> Result<PlayReport, PlayError>
where
    L: DatagramLink,
    M: MoveSource + ?Sized,
{
    channel.connect(Symbol::greeting(first_mover)).await?;
    let mut session = GameSession::new(first_mover);
    let (mut machine, mut step) = DatagramInitiator::open(first_mover);
    info!(session = %session.id(), ?first_mover, "datagram game started");
    source.notify(directions(&session));

    let mut quitting = false;
    loop {
        step = match step {
            Step::Send(symbol) => {
                channel.send(symbol).await?;
                receive(channel, &mut machine, &mut session, source).await?
            }
            Step::Ignore => receive(channel, &mut machine, &mut session, source).await?,
            Step::Prompt => {
                let step = choose(&mut machine, &session, source).await?;
                quitting = matches!(step, Step::End { .. });
                step
            }
            Step::End { reply, end } => {
                close(channel, reply, quitting).await?;
                let stats = channel.stats();
                info!(
                    session = %session.id(),
                    ?end,
                    board = %session.summary(),
                    retransmissions = stats.retransmissions,
                    "datagram game over"
                );
                source.notify(Notice::Finished(end));
                return Ok(PlayReport {
                    session,
                    end,
                    stats: Some(stats),
                });
            }
        };
    }
}

/// Asks the player until they pick a free cell or quit.
async fn choose<M: MoveSource + ?Sized>(
    machine: &mut DatagramInitiator,
    session: &GameSession,
    source: &mut M,
) -> Result<Step, PlayError> {
    loop {
        match source.next_move(session).await? {
            MoveChoice::Quit => return Ok(machine.quit(session)),
            MoveChoice::Play(position) => match machine.propose(session, position) {
                Ok(step) => return Ok(step),
                Err(GameError::Illegal(_)) => source.notify(Notice::Rejected(position)),
                Err(e) => return Err(e.into()),
            },
        }
    }
}

/// Waits for the next fresh symbol and feeds it to the machine.
async fn receive<L, M>(
    channel: &mut ReliableChannel<L>,
    machine: &mut DatagramInitiator,
    session: &mut GameSession,
    source: &mut M,
) -> Result<Step, PlayError>
where
    L: DatagramLink,
    M: MoveSource + ?Sized,
{
    let symbol = channel.next().await?;
    let proposed = match machine.state() {
        DatagramInitiatorState::AwaitingMoveAck { proposed } => Some(proposed),
        _ => None,
    };
    let moves_before = session.history().len();
    let step = machine.on_symbol(session, symbol)?;
    debug!(
        received = %symbol,
        pending = ?channel.pending(),
        state = ?machine.state(),
        board = %session.summary(),
        "exchange"
    );

    if session.history().len() != moves_before {
        source.notify(Notice::Board(board_view(session)));
    }
    if let (Some(position), Symbol::Illegal) = (proposed, symbol) {
        source.notify(Notice::Rejected(position));
    }
    Ok(step)
}

/// Closing handshake.  A quitting client resends `Q` until it is echoed or
/// the retry bound runs out.  Otherwise the final reply is sent and the
/// client lingers so a lost copy can be repaired: after a terminal outcome
/// it waits for the server's `Q`, after a server quit until silence.
async fn close<L: DatagramLink>(
    channel: &mut ReliableChannel<L>,
    reply: Option<Symbol>,
    quitting: bool,
) -> Result<(), PlayError> {
    if quitting {
        let attempts = channel.config().handshake_retries + 1;
        if !channel.send_until_echo(Symbol::Quit, attempts).await? {
            warn!(attempts, "server did not acknowledge quit");
        }
        return Ok(());
    }
    match reply {
        Some(Symbol::Quit) => {
            channel.send(Symbol::Quit).await?;
            channel.linger(|_| false).await?;
        }
        Some(echo) => {
            channel.send(echo).await?;
            channel.linger(|symbol| symbol == Symbol::Quit).await?;
        }
        None => {}
    }
    Ok(())
}
