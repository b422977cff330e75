//! Universal Chess Interface front-end: the stdin loop and position
//! command handling.

use std::fmt;
use std::io::{BufRead, Write};
use std::time::Instant;

use crate::board::error::{FenError, MoveParseError};
use crate::board::Board;
use crate::engine::Engine;

pub mod command;
pub mod options;
pub mod report;

use command::UciCommand;

/// Error type for `position` command parsing.
#[derive(Debug, Clone)]
pub enum UciError {
    InvalidFen(FenError),
    InvalidMove {
        move_str: String,
        error: MoveParseError,
    },
    MissingParts,
}

impl fmt::Display for UciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciError::InvalidFen(e) => write!(f, "invalid FEN: {e}"),
            UciError::InvalidMove { move_str, error } => {
                write!(f, "invalid move '{move_str}': {error}")
            }
            UciError::MissingParts => write!(f, "missing parts in position command"),
        }
    }
}

impl std::error::Error for UciError {}

impl From<FenError> for UciError {
    fn from(e: FenError) -> Self {
        UciError::InvalidFen(e)
    }
}

/// Build a board from a `position` command. The caller's position is
/// untouched on error.
pub fn parse_position_command(parts: &[&str], chess960: bool) -> Result<Board, UciError> {
    let mut i = 1;
    if i >= parts.len() {
        return Err(UciError::MissingParts);
    }

    let mut board = if parts[i] == "startpos" {
        i += 1;
        Board::new()
    } else if parts[i] == "fen" {
        if i + 6 >= parts.len() {
            return Err(UciError::MissingParts);
        }
        let fen = parts[i + 1..i + 7].join(" ");
        i += 7;
        Board::try_from_fen(&fen)?
    } else {
        return Err(UciError::MissingParts);
    };
    board.set_chess960(chess960);

    if i < parts.len() && parts[i] == "moves" {
        i += 1;
        while i < parts.len() {
            board
                .make_move_uci(parts[i])
                .map_err(|error| UciError::InvalidMove {
                    move_str: parts[i].to_string(),
                    error,
                })?;
            i += 1;
        }
    }

    Ok(board)
}

/// Run the blocking UCI loop over `input` until `quit` or EOF.
pub fn run_loop<R: BufRead>(input: R) {
    let mut engine = Engine::new();
    let mut stdout = std::io::stdout();

    for line in input.lines() {
        let Ok(line) = line else { break };
        let Some(cmd) = command::parse_uci_command(&line) else {
            continue;
        };

        match cmd {
            UciCommand::Uci => options::print_uci_identity(&engine.options),
            UciCommand::IsReady => println!("readyok"),
            UciCommand::UciNewGame => engine.new_game(),
            UciCommand::Position(parts) => {
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                match parse_position_command(&refs, engine.options.chess960) {
                    Ok(board) => engine.set_position(board),
                    Err(e) => eprintln!("info string error: {e}"),
                }
            }
            UciCommand::Go(parts) => {
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                let params = command::parse_go_params(&refs);
                engine.go(&params);
            }
            UciCommand::Perft(depth) => {
                engine.stop_search();
                let start = Instant::now();
                let nodes = engine.perft(depth);
                report::print_perft(depth, nodes, start.elapsed().as_millis() as u64);
            }
            UciCommand::SetOption(parts) => {
                engine.stop_search();
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                match command::parse_setoption(&refs) {
                    Some((name, value)) => {
                        options::apply_setoption(&mut engine, &name, value.as_deref());
                    }
                    None => eprintln!("info string malformed setoption: {}", parts.join(" ")),
                }
            }
            UciCommand::Stop => engine.signal_stop(),
            // Pondering is not implemented; the search simply continues
            // under its own limits.
            UciCommand::PonderHit => {}
            UciCommand::Quit => {
                engine.stop_search();
                break;
            }
            UciCommand::Unknown(text) => eprintln!("info string unknown command: {text}"),
        }

        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_startpos_with_moves() {
        let parts = ["position", "startpos", "moves", "e2e4", "e7e5"];
        let board = parse_position_command(&parts, false).unwrap();
        assert!(board.white_to_move());
        assert!(board.to_fen().starts_with("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w"));
    }

    #[test]
    fn position_fen() {
        // Too few FEN fields is an error, not a panic.
        let parts = ["position", "fen", "4k3/8/8/8/8/8/4Q3/4K3", "w"];
        assert!(matches!(
            parse_position_command(&parts, false),
            Err(UciError::MissingParts)
        ));

        let parts = [
            "position", "fen", "4k3/8/8/8/8/8/4Q3/4K3", "w", "-", "-", "0", "1",
        ];
        let board = parse_position_command(&parts, false).unwrap();
        assert_eq!(board.to_fen(), "4k3/8/8/8/8/8/4Q3/4K3 w - - 0 1");
    }

    #[test]
    fn position_with_illegal_move_is_rejected() {
        let parts = ["position", "startpos", "moves", "e2e5"];
        assert!(matches!(
            parse_position_command(&parts, false),
            Err(UciError::InvalidMove { .. })
        ));
    }

    #[test]
    fn position_with_bad_fen_is_rejected() {
        let parts = [
            "position", "fen", "bogus/fen/string/here/xx/yy", "w", "-", "-", "0", "1",
        ];
        assert!(matches!(
            parse_position_command(&parts, false),
            Err(UciError::InvalidFen(_))
        ));
    }
}
