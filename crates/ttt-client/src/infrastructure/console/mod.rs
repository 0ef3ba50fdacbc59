//! Terminal adapter: reads moves from a line-based input and prints the
//! board.
//!
//! [`ConsoleMoveSource`] is generic over its reader and writer so tests can
//! drive it with byte slices; [`ConsoleMoveSource::stdio`] wires it to the
//! process's stdin and stdout.  Anything that is not `0`-`8` or `q` is
//! ignored and the prompt is shown again.  End of input counts as a quit.

pub mod mock;

use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::debug;
use ttt_core::{FirstMover, GameEnd, GameSession, Outcome, Position, Side};

use crate::application::move_source::{BoardView, InputError, MoveChoice, MoveSource, Notice};

const PROMPT: &str = "Your move (0-8, q to quit): ";

/// Interprets one line of player input.
pub fn parse_choice(line: &str) -> Option<MoveChoice> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return Some(MoveChoice::Quit);
    }
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c
            .to_digit(10)
            .and_then(|d| Position::new(d as usize))
            .map(MoveChoice::Play),
        _ => None,
    }
}

/// Three rows separated by rules; free cells show their number.
pub fn render_board(view: &BoardView) -> String {
    let mut out = String::new();
    for row in 0..3 {
        if row > 0 {
            out.push_str("---+---+---\n");
        }
        let cells: Vec<String> = (0..3)
            .map(|col| {
                let cell = row * 3 + col;
                match view[cell] {
                    Some(mark) => mark.as_char().to_string(),
                    None => cell.to_string(),
                }
            })
            .collect();
        out.push_str(&format!(" {} \n", cells.join(" | ")));
    }
    out
}

/// Text shown to the player for `notice`.
pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::Directions { first_mover, mark } => {
            let order = match first_mover {
                FirstMover::Initiator => "you move first",
                FirstMover::Responder => "the server moves first",
            };
            format!(
                "Tic-tac-toe: you play {}, {order}.\n\
                 Enter a cell number to move, or q to quit:\n\n{}\n",
                mark.as_char(),
                render_board(&[None; 9]),
            )
        }
        Notice::Board(view) => format!("\n{}\n", render_board(view)),
        Notice::Rejected(position) => format!("Cell {position} is not available, choose another.\n"),
        Notice::Finished(end) => match end {
            GameEnd::Finished(Outcome::InitiatorWins) => "You win!\n".to_string(),
            GameEnd::Finished(Outcome::ResponderWins) => "The server wins.\n".to_string(),
            GameEnd::Finished(Outcome::Draw) => "It's a draw.\n".to_string(),
            GameEnd::Finished(Outcome::InProgress) => "Game over.\n".to_string(),
            GameEnd::Quit { by: Side::Initiator } => "You left the game.\n".to_string(),
            GameEnd::Quit { by: Side::Responder } => "The server ended the game.\n".to_string(),
        },
    }
}

/// Line-based move source over any async reader and blocking writer.
pub struct ConsoleMoveSource<R, W> {
    input: R,
    output: W,
}

impl ConsoleMoveSource<BufReader<Stdin>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), std::io::stdout())
    }
}

impl<R, W> ConsoleMoveSource<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

#[async_trait]
impl<R, W> MoveSource for ConsoleMoveSource<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    async fn next_move(&mut self, _session: &GameSession) -> Result<MoveChoice, InputError> {
        loop {
            self.output.write_all(PROMPT.as_bytes())?;
            self.output.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line).await? == 0 {
                return Ok(MoveChoice::Quit);
            }
            if let Some(choice) = parse_choice(&line) {
                return Ok(choice);
            }
        }
    }

    fn notify(&mut self, notice: Notice) {
        let text = render_notice(&notice);
        if let Err(e) = self
            .output
            .write_all(text.as_bytes())
            .and_then(|()| self.output.flush())
        {
            debug!("failed to write to console: {e}");
        }
    }
}
