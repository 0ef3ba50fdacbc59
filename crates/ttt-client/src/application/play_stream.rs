//! Use case: play one game over a byte stream.
//!
//! Each request byte gets exactly one reply byte.  After every counter-move
//! the client asks `?` so the server can announce a finished game; a `W`
//! after a move means the cell was refused and the player is asked again.
//! The client always closes with `Q`, whether the player quit or the game
//! reached an outcome.

use tracing::{debug, info, warn};
use ttt_core::protocol::{decode_byte, StreamInitiator, StreamInitiatorState};
use ttt_core::{FirstMover, GameEnd, GameSession, Side, Step, StreamLink, Symbol};

use super::move_source::{board_view, directions, MoveChoice, MoveSource, Notice};
use super::play_report::{PlayError, PlayReport};

/// Plays a single game on a connected `link`.
///
/// # Errors
///
/// Returns [`PlayError::Transport`] on socket failure,
/// [`PlayError::Input`] if the player's input cannot be read and
/// [`PlayError::Game`] if the server confirms a move the local board cannot
/// hold.
pub async fn play_stream<L, M>(
    link: &mut L,
    source: &mut M,
    first_mover: FirstMover,
) -> Result<PlayReport, PlayError>
where
    L: StreamLink,
    M: MoveSource + ?Sized,
{
    let mut session = GameSession::new(first_mover);
    let (mut machine, mut step) = StreamInitiator::open(first_mover);
    info!(session = %session.id(), ?first_mover, "stream game started");
    source.notify(directions(&session));

    loop {
        step = match step {
            Step::Send(request) => {
                link.send(request.to_byte()).await?;
                receive(link, &mut machine, &mut session, source).await?
            }
            Step::Ignore => receive(link, &mut machine, &mut session, source).await?,
            Step::Prompt => match source.next_move(&session).await? {
                MoveChoice::Play(position) => machine.propose(position),
                MoveChoice::Quit => machine.quit(&session),
            },
            Step::End { reply, end } => {
                if let Some(reply) = reply {
                    close(link, reply, end).await;
                }
                info!(session = %session.id(), ?end, board = %session.summary(), "stream game over");
                source.notify(Notice::Finished(end));
                return Ok(PlayReport {
                    session,
                    end,
                    stats: None,
                });
            }
        };
    }
}

/// Reads one reply and feeds it to the machine.  End of stream counts as a
/// server quit.
async fn receive<L, M>(
    link: &mut L,
    machine: &mut StreamInitiator,
    session: &mut GameSession,
    source: &mut M,
) -> Result<Step, PlayError>
where
    L: StreamLink,
    M: MoveSource + ?Sized,
{
    let Some(byte) = link.recv().await? else {
        info!(session = %session.id(), "server closed the connection");
        return Ok(Step::End {
            reply: None,
            end: match machine.on_symbol(session, Symbol::Quit)? {
                Step::End { end, .. } => end,
                _ => GameEnd::Quit { by: Side::Responder },
            },
        });
    };
    let symbol = match decode_byte(byte) {
        Ok(symbol) => symbol,
        Err(e) => {
            warn!("undecodable reply: {e}");
            return Ok(Step::Ignore);
        }
    };

    let proposed = match machine.state() {
        StreamInitiatorState::AwaitingMoveReply { proposed } => Some(proposed),
        _ => None,
    };
    let moves_before = session.history().len();
    let step = machine.on_symbol(session, symbol)?;
    debug!(received = %symbol, ?step, board = %session.summary(), "exchange");

    if session.history().len() != moves_before {
        source.notify(Notice::Board(board_view(session)));
    }
    if let (Some(position), Symbol::Wait) = (proposed, symbol) {
        source.notify(Notice::Rejected(position));
    }
    Ok(step)
}

/// Sends the closing `Q`.  Unless it answers the server's own `Q`, the
/// server's single reply is drained before the connection is released.
async fn close<L: StreamLink>(link: &mut L, reply: Symbol, end: GameEnd) {
    if let Err(e) = link.send(reply.to_byte()).await {
        debug!("closing {reply} not delivered: {e}");
        return;
    }
    if end != (GameEnd::Quit { by: Side::Responder }) {
        match link.recv().await {
            Ok(Some(byte)) => debug!(reply = %(byte as char), "server acknowledged quit"),
            Ok(None) => debug!("server closed after quit"),
            Err(e) => debug!("error awaiting quit reply: {e}"),
        }
    }
}

/// Best-effort single `Q` on interactive abort.
pub async fn abort_stream<L: StreamLink>(link: &mut L) {
    if let Err(e) = link.send(Symbol::Quit.to_byte()).await {
        debug!("abort quit not sent: {e}");
    }
}
