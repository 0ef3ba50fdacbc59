//! Use case: serve one game over a byte stream.
//!
//! Reads the greeting, then alternates strictly between reading one request
//! byte and writing one reply byte until the client quits or disconnects.
//! A disconnect is treated exactly like a `Q` from the client.

use std::time::Duration;

use tracing::{debug, info, warn};
use ttt_core::protocol::decode_byte;
use ttt_core::protocol::StreamResponder;
use ttt_core::{FirstMover, GameSession, MoveSelector, Step, StreamLink, Symbol};

use super::game_report::{GameReport, ServeError};

/// How long a server-initiated quit waits for the client's reply.
const ABORT_REPLY_WAIT: Duration = Duration::from_secs(1);

/// Serves a single game on `link`.
///
/// # Errors
///
/// Returns [`ServeError::NotStarted`] if the client leaves before greeting,
/// [`ServeError::Transport`] on socket failure and [`ServeError::Game`] if
/// the board rejects a validated move.
pub async fn serve_stream<L: StreamLink>(
    link: &mut L,
    selector: &mut dyn MoveSelector,
) -> Result<GameReport, ServeError> {
    let first_mover = await_greeting(link).await?;
    let mut session = GameSession::new(first_mover);
    info!(session = %session.id(), ?first_mover, "stream game started");

    let (mut responder, mut step) = StreamResponder::open(&mut session, selector)?;
    loop {
        match step {
            Step::Send(reply) => link.send(reply.to_byte()).await?,
            Step::End { reply, end } => {
                if let Some(reply) = reply {
                    if let Err(e) = link.send(reply.to_byte()).await {
                        debug!("closing reply not delivered: {e}");
                    }
                }
                info!(session = %session.id(), ?end, board = %session.summary(), "stream game over");
                return Ok(GameReport::new(&session, end, None));
            }
            Step::Ignore | Step::Prompt => {}
        }

        let Some(byte) = link.recv().await? else {
            info!(session = %session.id(), "client disconnected");
            step = match responder.on_symbol(&mut session, selector, Symbol::Quit)? {
                Step::End { end, .. } => Step::End { reply: None, end },
                other => other,
            };
            continue;
        };

        step = match decode_byte(byte) {
            Ok(symbol) => {
                let step = responder.on_symbol(&mut session, selector, symbol)?;
                debug!(
                    session = %session.id(),
                    received = %symbol,
                    reply = ?step,
                    board = %session.summary(),
                    "exchange"
                );
                step
            }
            Err(e) => {
                warn!("undecodable request: {e}");
                Step::Send(Symbol::Wait)
            }
        };
    }
}

/// Reads requests until one is a greeting.  Anything else is answered with
/// `W`; a quit before the game starts is echoed and ends the connection.
async fn await_greeting<L: StreamLink>(link: &mut L) -> Result<FirstMover, ServeError> {
    loop {
        let Some(byte) = link.recv().await? else {
            return Err(ServeError::NotStarted);
        };
        match decode_byte(byte) {
            Ok(symbol) => {
                if let Some(first_mover) = symbol.as_greeting() {
                    return Ok(first_mover);
                }
                if symbol == Symbol::Quit {
                    link.send(Symbol::Quit.to_byte()).await?;
                    return Err(ServeError::NotStarted);
                }
                debug!(%symbol, "expected a greeting");
            }
            Err(e) => warn!("undecodable greeting: {e}"),
        }
        link.send(Symbol::Wait.to_byte()).await?;
    }
}

/// Best-effort server-initiated close: sends `Q` and waits briefly for the
/// client's single reply.
pub async fn abort_stream<L: StreamLink>(link: &mut L) {
    if let Err(e) = link.send(Symbol::Quit.to_byte()).await {
        debug!("quit not delivered: {e}");
        return;
    }
    match tokio::time::timeout(ABORT_REPLY_WAIT, link.recv()).await {
        Ok(Ok(Some(byte))) => debug!(reply = %(byte as char), "client acknowledged quit"),
        Ok(Ok(None)) => debug!("client closed after quit"),
        Ok(Err(e)) => debug!("error awaiting quit reply: {e}"),
        Err(_) => debug!("no reply to quit"),
    }
}
