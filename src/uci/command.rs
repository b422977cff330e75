//! UCI command tokenizing.

#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    Position(Vec<String>),
    Go(Vec<String>),
    Perft(usize),
    SetOption(Vec<String>),
    Stop,
    PonderHit,
    Quit,
    Unknown(String),
}

#[derive(Default, Debug, Clone)]
pub struct GoParams {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movetime: Option<u64>,
    pub movestogo: Option<u64>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub mate: Option<u32>,
    pub ponder: bool,
    pub infinite: bool,
}

#[inline]
fn parse_next<T: std::str::FromStr>(parts: &[&str], i: usize) -> Option<T> {
    parts.get(i + 1).and_then(|v| v.parse::<T>().ok())
}

#[must_use]
pub fn parse_go_params(parts: &[&str]) -> GoParams {
    let mut params = GoParams::default();
    let mut i = 1;

    while i < parts.len() {
        let consumed = match parts[i] {
            "wtime" => {
                params.wtime = parse_next(parts, i);
                2
            }
            "btime" => {
                params.btime = parse_next(parts, i);
                2
            }
            "winc" => {
                params.winc = parse_next(parts, i);
                2
            }
            "binc" => {
                params.binc = parse_next(parts, i);
                2
            }
            "movetime" => {
                params.movetime = parse_next(parts, i);
                2
            }
            "movestogo" => {
                params.movestogo = parse_next(parts, i);
                2
            }
            "nodes" => {
                params.nodes = parse_next(parts, i);
                2
            }
            "depth" => {
                params.depth = parse_next(parts, i);
                2
            }
            "mate" => {
                params.mate = parse_next(parts, i);
                2
            }
            "ponder" => {
                params.ponder = true;
                1
            }
            "infinite" => {
                params.infinite = true;
                1
            }
            _ => 1,
        };
        i += consumed;
    }
    params
}

#[must_use]
pub fn parse_uci_command(line: &str) -> Option<UciCommand> {
    let trimmed = line.trim();
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    let first = parts.first()?;

    let owned_parts = || parts.iter().map(|p| (*p).to_string()).collect::<Vec<_>>();

    let cmd = match *first {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "ucinewgame" => UciCommand::UciNewGame,
        "position" => UciCommand::Position(owned_parts()),
        "go" => UciCommand::Go(owned_parts()),
        "perft" => {
            let depth = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(1);
            UciCommand::Perft(depth)
        }
        "setoption" => UciCommand::SetOption(owned_parts()),
        "stop" => UciCommand::Stop,
        "ponderhit" => UciCommand::PonderHit,
        "quit" => UciCommand::Quit,
        _ => UciCommand::Unknown(trimmed.to_string()),
    };

    Some(cmd)
}

/// Split a `setoption` line into its name and optional value.
#[must_use]
pub fn parse_setoption(parts: &[&str]) -> Option<(String, Option<String>)> {
    let name_idx = parts.iter().position(|p| *p == "name")?;
    let value_idx = parts.iter().position(|p| *p == "value");
    let name = match value_idx {
        Some(v_idx) if v_idx > name_idx + 1 => parts[name_idx + 1..v_idx].join(" "),
        None if name_idx + 1 < parts.len() => parts[name_idx + 1..].join(" "),
        _ => return None,
    };
    let value = value_idx.and_then(|v_idx| {
        if v_idx + 1 < parts.len() {
            Some(parts[v_idx + 1..].join(" "))
        } else {
            None
        }
    });
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert!(matches!(parse_uci_command("uci"), Some(UciCommand::Uci)));
        assert!(matches!(
            parse_uci_command("isready"),
            Some(UciCommand::IsReady)
        ));
        assert!(matches!(parse_uci_command("stop"), Some(UciCommand::Stop)));
        assert!(matches!(parse_uci_command("quit"), Some(UciCommand::Quit)));
        assert!(matches!(
            parse_uci_command("ponderhit"),
            Some(UciCommand::PonderHit)
        ));
        assert!(matches!(
            parse_uci_command("  uci  "),
            Some(UciCommand::Uci)
        ));
    }

    #[test]
    fn empty_and_unknown_lines() {
        assert!(parse_uci_command("").is_none());
        assert!(parse_uci_command("   \t ").is_none());
        assert!(matches!(
            parse_uci_command("xyzzy"),
            Some(UciCommand::Unknown(_))
        ));
    }

    #[test]
    fn position_keeps_all_tokens() {
        let cmd = parse_uci_command("position startpos moves e2e4 e7e5").unwrap();
        match cmd {
            UciCommand::Position(parts) => {
                assert_eq!(parts, ["position", "startpos", "moves", "e2e4", "e7e5"]);
            }
            other => panic!("expected Position, got {other:?}"),
        }
    }

    #[test]
    fn go_params_times_and_increments() {
        let parts = [
            "go", "wtime", "300000", "btime", "290000", "winc", "3000", "binc", "2000",
            "movestogo", "40",
        ];
        let params = parse_go_params(&parts);
        assert_eq!(params.wtime, Some(300_000));
        assert_eq!(params.btime, Some(290_000));
        assert_eq!(params.winc, Some(3_000));
        assert_eq!(params.binc, Some(2_000));
        assert_eq!(params.movestogo, Some(40));
    }

    #[test]
    fn go_params_limits_and_flags() {
        let params = parse_go_params(&["go", "depth", "12", "nodes", "500000", "mate", "3"]);
        assert_eq!(params.depth, Some(12));
        assert_eq!(params.nodes, Some(500_000));
        assert_eq!(params.mate, Some(3));

        let params = parse_go_params(&["go", "infinite"]);
        assert!(params.infinite);
        let params = parse_go_params(&["go", "ponder"]);
        assert!(params.ponder);
    }

    #[test]
    fn go_params_tolerates_junk() {
        let params = parse_go_params(&["go", "bogus", "depth", "8"]);
        assert_eq!(params.depth, Some(8));
        let params = parse_go_params(&["go", "depth"]);
        assert!(params.depth.is_none());
        let params = parse_go_params(&["go", "depth", "xx"]);
        assert!(params.depth.is_none());
    }

    #[test]
    fn setoption_name_and_value() {
        let parts = ["setoption", "name", "Move", "Overhead", "value", "25"];
        let (name, value) = parse_setoption(&parts).unwrap();
        assert_eq!(name, "Move Overhead");
        assert_eq!(value.as_deref(), Some("25"));
    }

    #[test]
    fn setoption_button_without_value() {
        let parts = ["setoption", "name", "Clear", "Hash"];
        let (name, value) = parse_setoption(&parts).unwrap();
        assert_eq!(name, "Clear Hash");
        assert!(value.is_none());
    }

    #[test]
    fn perft_defaults_to_depth_one() {
        assert!(matches!(
            parse_uci_command("perft"),
            Some(UciCommand::Perft(1))
        ));
        assert!(matches!(
            parse_uci_command("perft 4"),
            Some(UciCommand::Perft(4))
        ));
    }
}
