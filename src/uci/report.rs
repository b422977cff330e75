//! Stdout reporting: `info` and `bestmove` lines.

/// One iteration summary in the wire format GUIs parse.
#[allow(clippy::too_many_arguments)]
pub fn print_info(
    depth: u32,
    seldepth: u32,
    multipv: usize,
    score: &str,
    nodes: u64,
    nps: u64,
    hashfull: u32,
    time_ms: u64,
    pv: &str,
) {
    println!(
        "info depth {depth} seldepth {seldepth} multipv {multipv} score {score} \
         nodes {nodes} nps {nps} hashfull {hashfull} time {time_ms} pv {pv}"
    );
}

/// Final move announcement. `None` means no legal move existed and the
/// null-move sentinel is sent.
pub fn print_bestmove(best: Option<&str>, ponder: Option<&str>) {
    match (best, ponder) {
        (Some(best), Some(ponder)) => println!("bestmove {best} ponder {ponder}"),
        (Some(best), None) => println!("bestmove {best}"),
        (None, _) => println!("bestmove 0000"),
    }
}

pub fn print_perft(depth: usize, nodes: u64, time_ms: u64) {
    println!("info string perft depth {depth} nodes {nodes} time {time_ms}");
}
