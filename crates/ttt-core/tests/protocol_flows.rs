//! Full games driven through the protocol state machines.
//!
//! The first group wires the two datagram machines directly to each other.
//! The second runs them through [`ReliableChannel`]s over an in-memory
//! network, injecting a single lost or duplicated datagram at every
//! position in the conversation of several game shapes and checking each
//! game ends exactly as it does without faults.

use std::net::SocketAddr;

use ttt_core::protocol::{DatagramInitiator, DatagramResponder, StreamInitiator, StreamResponder};
use ttt_core::transport::mock::{LossyLink, MemoryLink};
use ttt_core::{
    Board, ChannelStats, DatagramLink, FirstMover, GameEnd, GameSession, Outcome, Position,
    ReliabilityConfig, ReliableChannel, ScriptedSelector, Side, Step, Symbol,
};

fn pos(i: usize) -> Position {
    Position::new(i).expect("valid position")
}

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

// ── Direct machine-to-machine games ───────────────────────────────────────────

struct Finished {
    initiator: GameSession,
    responder: GameSession,
    initiator_end: GameEnd,
    responder_end: GameEnd,
}

/// Plays a lossless datagram game by handing each machine's output straight
/// to the other machine.
fn play_datagram_direct(
    first: FirstMover,
    initiator_moves: &[usize],
    responder_moves: &[usize],
) -> Finished {
    let mut initiator_session = GameSession::new(first);
    let mut responder_session = GameSession::new(first);
    let mut selector = ScriptedSelector::new(responder_moves.iter().copied());
    let mut moves = initiator_moves.iter().copied();
    let mut responder = DatagramResponder::open(first);
    let (mut initiator, mut step) = DatagramInitiator::open(first);

    loop {
        step = match step {
            Step::Prompt => {
                let cell = pos(moves.next().expect("scripted move"));
                initiator
                    .propose(&initiator_session, cell)
                    .expect("legal proposal")
            }
            Step::Send(symbol) => {
                match responder
                    .on_symbol(&mut responder_session, &mut selector, symbol)
                    .expect("responder step")
                {
                    Step::Send(reply) => initiator
                        .on_symbol(&mut initiator_session, reply)
                        .expect("initiator step"),
                    other => panic!("responder ended early with {other:?}"),
                }
            }
            Step::End { reply, end } => {
                let reply = reply.expect("initiator echoes the outcome");
                let Step::End {
                    reply: closing,
                    end: responder_end,
                } = responder
                    .on_symbol(&mut responder_session, &mut selector, reply)
                    .expect("responder step")
                else {
                    panic!("responder did not close after outcome echo");
                };
                assert_eq!(closing, Some(Symbol::Quit));
                return Finished {
                    initiator: initiator_session,
                    responder: responder_session,
                    initiator_end: end,
                    responder_end,
                };
            }
            Step::Ignore => panic!("initiator ignored a reply in a lossless game"),
        };
    }
}

fn assert_boards_agree(a: &Board, b: &Board) {
    for i in 0..9 {
        assert_eq!(a.cell(i), b.cell(i), "cell {i} differs");
    }
}

#[test]
fn test_datagram_initiator_first_win() {
    // Act
    let game = play_datagram_direct(FirstMover::Initiator, &[0, 1, 2], &[3, 4]);

    // Assert
    assert_eq!(game.initiator_end, GameEnd::Finished(Outcome::InitiatorWins));
    assert_eq!(game.responder_end, GameEnd::Finished(Outcome::InitiatorWins));
    assert_boards_agree(game.initiator.board(), game.responder.board());
    assert_eq!(game.responder.board().filled(), 5);
}

#[test]
fn test_datagram_responder_first_win() {
    let game = play_datagram_direct(FirstMover::Responder, &[1, 2], &[0, 3, 6]);

    assert_eq!(game.initiator_end, GameEnd::Finished(Outcome::ResponderWins));
    assert_eq!(game.responder_end, GameEnd::Finished(Outcome::ResponderWins));
    assert_boards_agree(game.initiator.board(), game.responder.board());
    assert_eq!(game.initiator.history(), game.responder.history());
}

#[test]
fn test_datagram_draw_on_last_cell() {
    let game = play_datagram_direct(FirstMover::Initiator, &[0, 2, 3, 7, 8], &[1, 4, 5, 6]);

    assert_eq!(game.initiator_end, GameEnd::Finished(Outcome::Draw));
    assert!(game.responder.board().is_full());
    assert_boards_agree(game.initiator.board(), game.responder.board());
}

#[test]
fn test_stream_game_boards_agree_after_each_exchange() {
    // Arrange
    let first = FirstMover::Initiator;
    let mut initiator_session = GameSession::new(first);
    let mut responder_session = GameSession::new(first);
    let mut selector = ScriptedSelector::new([0, 3]);
    let (mut initiator, greeting) = StreamInitiator::open(first);
    let (mut responder, opening) =
        StreamResponder::open(&mut responder_session, &mut selector).expect("open");
    assert_eq!(greeting, Step::Send(Symbol::StartInitiatorFirst));
    let Step::Send(opening) = opening else {
        panic!("responder must reply to the greeting");
    };

    // Act
    let mut step = initiator
        .on_symbol(&mut initiator_session, opening)
        .expect("step");
    let mut moves = [4, 8].into_iter();
    loop {
        step = match step {
            Step::Prompt => match moves.next() {
                Some(cell) => initiator.propose(pos(cell)),
                None => break,
            },
            Step::Send(request) => {
                let Step::Send(reply) = responder
                    .on_symbol(&mut responder_session, &mut selector, request)
                    .expect("step")
                else {
                    panic!("responder closed unexpectedly");
                };
                initiator
                    .on_symbol(&mut initiator_session, reply)
                    .expect("step")
            }
            other => panic!("unexpected step {other:?}"),
        };
    }
    let quit = initiator.quit(&initiator_session);
    let closing = responder
        .on_symbol(&mut responder_session, &mut selector, Symbol::Quit)
        .expect("step");

    // Assert
    let expected = Step::End {
        reply: Some(Symbol::Quit),
        end: GameEnd::Quit { by: Side::Initiator },
    };
    assert_eq!(quit, expected);
    assert_eq!(closing, expected);
    assert_boards_agree(initiator_session.board(), responder_session.board());
    assert_eq!(initiator_session.board().cell(4), Some(Side::Initiator));
    assert_eq!(initiator_session.board().cell(0), Some(Side::Responder));
    assert_eq!(initiator_session.board().cell(8), Some(Side::Initiator));
    assert_eq!(initiator_session.board().cell(3), Some(Side::Responder));
}

// ── Games over the reliability layer ──────────────────────────────────────────

fn fast_config() -> ReliabilityConfig {
    ReliabilityConfig {
        timeout_ms: 25,
        handshake_retries: 5,
        linger_intervals: 3,
    }
}

/// A scripted game and the outcome it must reach.
#[derive(Debug, Clone, Copy)]
struct Script {
    first: FirstMover,
    initiator_moves: &'static [usize],
    responder_moves: &'static [usize],
    outcome: Outcome,
}

const INITIATOR_WIN: Script = Script {
    first: FirstMover::Initiator,
    initiator_moves: &[0, 1, 2],
    responder_moves: &[3, 4],
    outcome: Outcome::InitiatorWins,
};

/// Opens with `B`, so the first exchange after the handshake is `E`.
const RESPONDER_WIN: Script = Script {
    first: FirstMover::Responder,
    initiator_moves: &[1, 2],
    responder_moves: &[0, 3, 6],
    outcome: Outcome::ResponderWins,
};

const INITIATOR_FIRST_DRAW: Script = Script {
    first: FirstMover::Initiator,
    initiator_moves: &[0, 2, 3, 7, 8],
    responder_moves: &[1, 4, 5, 6],
    outcome: Outcome::Draw,
};

/// The Responder fills the last cell.
const RESPONDER_FIRST_DRAW: Script = Script {
    first: FirstMover::Responder,
    initiator_moves: &[1, 4, 5, 6],
    responder_moves: &[0, 2, 3, 7, 8],
    outcome: Outcome::Draw,
};

/// Upper bound on datagrams either side sends in any scripted game.
const MAX_SENDS: usize = 20;

/// What one side ended up with.
struct Peer {
    session: GameSession,
    end: GameEnd,
    stats: ChannelStats,
}

async fn run_responder<L: DatagramLink>(
    mut channel: ReliableChannel<L>,
    mut selector: ScriptedSelector,
) -> Peer {
    let first = channel.accept().await.expect("accept");
    let mut session = GameSession::new(first);
    let mut machine = DatagramResponder::open(first);
    loop {
        let symbol = channel.next().await.expect("next");
        match machine
            .on_symbol(&mut session, &mut selector, symbol)
            .expect("responder step")
        {
            Step::Send(reply) => channel.send(reply).await.expect("send"),
            Step::End { reply, end } => {
                if let Some(reply) = reply {
                    channel.send(reply).await.expect("send");
                }
                channel.linger(|_| false).await.expect("linger");
                return Peer {
                    session,
                    end,
                    stats: channel.stats(),
                };
            }
            Step::Ignore | Step::Prompt => {}
        }
    }
}

async fn run_initiator<L: DatagramLink>(
    mut channel: ReliableChannel<L>,
    first: FirstMover,
    moves: &[usize],
) -> Peer {
    channel
        .connect(Symbol::greeting(first))
        .await
        .expect("handshake");
    let mut session = GameSession::new(first);
    let (mut machine, mut step) = DatagramInitiator::open(first);
    let mut moves = moves.iter().copied();
    loop {
        step = match step {
            Step::Prompt => machine
                .propose(&session, pos(moves.next().expect("scripted move")))
                .expect("legal proposal"),
            Step::Send(symbol) => {
                channel.send(symbol).await.expect("send");
                let reply = channel.next().await.expect("next");
                machine.on_symbol(&mut session, reply).expect("step")
            }
            Step::Ignore => {
                let reply = channel.next().await.expect("next");
                machine.on_symbol(&mut session, reply).expect("step")
            }
            Step::End { reply, end } => {
                if let Some(reply) = reply {
                    channel.send(reply).await.expect("send");
                }
                channel
                    .linger(|s| s == Symbol::Quit)
                    .await
                    .expect("linger");
                return Peer {
                    session,
                    end,
                    stats: channel.stats(),
                };
            }
        };
    }
}

/// Which side's outbound datagram to disturb, and how.
#[derive(Debug, Clone, Copy)]
enum Fault {
    None,
    DropFromResponder(usize),
    DropFromInitiator(usize),
    DuplicateFromResponder(usize),
    DuplicateFromInitiator(usize),
}

/// Plays `script` with `fault` injected.  Returns (initiator, responder).
async fn play_with_fault(
    script: Script,
    fault: Fault,
    initiator_config: ReliabilityConfig,
    responder_config: ReliabilityConfig,
) -> (Peer, Peer) {
    let (client_end, server_end) = MemoryLink::pair(addr(50000), addr(13037));
    let mut client = LossyLink::new(client_end);
    let mut server = LossyLink::new(server_end);
    match fault {
        Fault::None => {}
        Fault::DropFromResponder(n) => server = server.drop_outbound(n),
        Fault::DropFromInitiator(n) => client = client.drop_outbound(n),
        Fault::DuplicateFromResponder(n) => server = server.duplicate_outbound(n),
        Fault::DuplicateFromInitiator(n) => client = client.duplicate_outbound(n),
    }

    let responder = tokio::spawn(run_responder(
        ReliableChannel::new(server, responder_config),
        ScriptedSelector::new(script.responder_moves.iter().copied()),
    ));
    let initiator = run_initiator(
        ReliableChannel::with_peer(client, initiator_config, addr(13037)),
        script.first,
        script.initiator_moves,
    )
    .await;
    let responder = responder.await.expect("responder task");
    (initiator, responder)
}

async fn play(script: Script, fault: Fault) -> (Peer, Peer) {
    play_with_fault(script, fault, fast_config(), fast_config()).await
}

fn assert_same_game(script: Script, fault: Fault, initiator: &Peer, responder: &Peer) {
    assert_eq!(
        initiator.end,
        GameEnd::Finished(script.outcome),
        "{script:?} {fault:?}"
    );
    assert_eq!(responder.end, initiator.end, "{script:?} {fault:?}");
    assert_boards_agree(initiator.session.board(), responder.session.board());
    assert_eq!(
        initiator.session.history(),
        responder.session.history(),
        "{script:?} {fault:?}"
    );
}

async fn assert_every_single_drop_is_recovered(script: Script) {
    for n in 0..MAX_SENDS {
        for fault in [Fault::DropFromResponder(n), Fault::DropFromInitiator(n)] {
            let (initiator, responder) = play(script, fault).await;
            assert_same_game(script, fault, &initiator, &responder);
        }
    }
}

async fn assert_every_single_duplicate_is_harmless(script: Script) {
    for n in 0..MAX_SENDS {
        for fault in [
            Fault::DuplicateFromResponder(n),
            Fault::DuplicateFromInitiator(n),
        ] {
            let (initiator, responder) = play(script, fault).await;
            assert_same_game(script, fault, &initiator, &responder);
        }
    }
}

#[tokio::test]
async fn test_reliable_games_without_faults_complete() {
    for script in [
        INITIATOR_WIN,
        RESPONDER_WIN,
        INITIATOR_FIRST_DRAW,
        RESPONDER_FIRST_DRAW,
    ] {
        // Act
        let (initiator, responder) = play(script, Fault::None).await;

        // Assert
        assert_same_game(script, Fault::None, &initiator, &responder);
        assert_eq!(initiator.stats.retransmissions, 0, "{script:?}");
        assert_eq!(responder.stats.retransmissions, 0, "{script:?}");
    }
}

#[tokio::test]
async fn test_initiator_win_recovers_from_any_single_lost_datagram() {
    assert_every_single_drop_is_recovered(INITIATOR_WIN).await;
}

#[tokio::test]
async fn test_responder_win_recovers_from_any_single_lost_datagram() {
    assert_every_single_drop_is_recovered(RESPONDER_WIN).await;
}

#[tokio::test]
async fn test_initiator_first_draw_recovers_from_any_single_lost_datagram() {
    assert_every_single_drop_is_recovered(INITIATOR_FIRST_DRAW).await;
}

#[tokio::test]
async fn test_responder_first_draw_recovers_from_any_single_lost_datagram() {
    assert_every_single_drop_is_recovered(RESPONDER_FIRST_DRAW).await;
}

#[tokio::test]
async fn test_initiator_win_ignores_any_single_duplicated_datagram() {
    assert_every_single_duplicate_is_harmless(INITIATOR_WIN).await;
}

#[tokio::test]
async fn test_responder_win_ignores_any_single_duplicated_datagram() {
    assert_every_single_duplicate_is_harmless(RESPONDER_WIN).await;
}

#[tokio::test]
async fn test_initiator_first_draw_ignores_any_single_duplicated_datagram() {
    assert_every_single_duplicate_is_harmless(INITIATOR_FIRST_DRAW).await;
}

#[tokio::test]
async fn test_responder_first_draw_ignores_any_single_duplicated_datagram() {
    assert_every_single_duplicate_is_harmless(RESPONDER_FIRST_DRAW).await;
}

// ── Cost of a single loss ─────────────────────────────────────────────────────

/// The Responder waits far longer than the Initiator, so only the
/// Initiator's timer can fire while the game is in progress.
fn patient_config() -> ReliabilityConfig {
    ReliabilityConfig {
        timeout_ms: 250,
        ..fast_config()
    }
}

#[tokio::test]
async fn test_lost_move_costs_exactly_one_resend_after_one_timeout() {
    // Arrange: the initiator's first move (send index 1, after the greeting)
    // is lost
    let fault = Fault::DropFromInitiator(1);

    // Act
    let (initiator, responder) =
        play_with_fault(INITIATOR_WIN, fault, fast_config(), patient_config()).await;

    // Assert
    assert_same_game(INITIATOR_WIN, fault, &initiator, &responder);
    assert_eq!(initiator.stats.timeouts, 1);
    assert_eq!(initiator.stats.retransmissions, 1);
    assert_eq!(responder.stats.retransmissions, 0);
    assert_eq!(responder.stats.duplicates, 0);
}

#[tokio::test]
async fn test_lost_echo_costs_one_resend_on_each_side() {
    // Arrange: the responder's echo of the first move (send index 1, after
    // the greeting echo) is lost
    let fault = Fault::DropFromResponder(1);

    // Act
    let (initiator, responder) =
        play_with_fault(INITIATOR_WIN, fault, fast_config(), patient_config()).await;

    // Assert: the initiator times out and resends once; the responder sees
    // that resend as a duplicate and answers it once
    assert_same_game(INITIATOR_WIN, fault, &initiator, &responder);
    assert_eq!(initiator.stats.timeouts, 1);
    assert_eq!(initiator.stats.retransmissions, 1);
    assert_eq!(initiator.stats.duplicates, 0);
    assert_eq!(responder.stats.duplicates, 1);
    assert_eq!(responder.stats.retransmissions, 1);
}

#[tokio::test]
async fn test_lost_opening_end_of_turn_costs_one_resend_when_responder_first() {
    // Arrange: after `B` is echoed the initiator yields with `E` (send
    // index 1); that `E` is lost
    let fault = Fault::DropFromInitiator(1);

    // Act
    let (initiator, responder) =
        play_with_fault(RESPONDER_WIN, fault, fast_config(), patient_config()).await;

    // Assert
    assert_same_game(RESPONDER_WIN, fault, &initiator, &responder);
    assert_eq!(initiator.stats.timeouts, 1);
    assert_eq!(initiator.stats.retransmissions, 1);
    assert_eq!(responder.stats.retransmissions, 0);
}
