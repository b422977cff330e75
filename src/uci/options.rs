//! UCI option registry: the `option` listing for `uci` and the
//! `setoption` dispatch.

use crate::engine::{Engine, EngineOptions};

pub const ENGINE_NAME: &str = "Kestrel";
pub const ENGINE_AUTHOR: &str = "the Kestrel authors";

/// `uci` response: identity, option registry, `uciok`.
pub fn print_uci_identity(options: &EngineOptions) {
    println!("id name {ENGINE_NAME}");
    println!("id author {ENGINE_AUTHOR}");
    println!(
        "option name Threads type spin default {} min 1 max 1024",
        options.threads
    );
    println!(
        "option name Hash type spin default {} min 1 max 1048576",
        options.hash_mb
    );
    println!("option name Clear Hash type button");
    println!(
        "option name MultiPV type spin default {} min 1 max 256",
        options.multipv
    );
    println!(
        "option name UCI_Chess960 type check default {}",
        options.chess960
    );
    println!(
        "option name Move Overhead type spin default {} min 0 max 500",
        options.move_overhead_ms
    );
    println!(
        "option name RFP Margin type spin default {} min 0 max 500",
        options.tunables.rfp_margin
    );
    println!(
        "option name Null Min Depth type spin default {} min 1 max 10",
        options.tunables.nmp_min_depth
    );
    println!(
        "option name LMR Divisor type spin default {} min 100 max 500",
        options.tunables.lmr_divisor
    );
    println!(
        "option name Aspiration Delta type spin default {} min 5 max 100",
        options.tunables.aspiration_delta
    );
    println!("uciok");
}

/// Apply one `setoption`. Unknown names are reported and ignored.
pub fn apply_setoption(engine: &mut Engine, name: &str, value: Option<&str>) {
    let parsed = |bounds: (i64, i64)| {
        value
            .and_then(|v| v.parse::<i64>().ok())
            .map(|v| v.clamp(bounds.0, bounds.1))
    };

    match name {
        "Threads" => {
            if let Some(v) = parsed((1, 1024)) {
                engine.set_threads(v as usize);
            }
        }
        "Hash" => {
            if let Some(v) = parsed((1, 1_048_576)) {
                engine.resize_hash(v as usize);
            }
        }
        "Clear Hash" => engine.clear_hash(),
        "MultiPV" => {
            if let Some(v) = parsed((1, 256)) {
                engine.options.multipv = v as usize;
            }
        }
        "UCI_Chess960" => {
            if let Some(v) = value {
                engine.set_chess960(v.eq_ignore_ascii_case("true"));
            }
        }
        "Move Overhead" => {
            if let Some(v) = parsed((0, 500)) {
                engine.options.move_overhead_ms = v as u64;
            }
        }
        "RFP Margin" => {
            if let Some(v) = parsed((0, 500)) {
                engine.options.tunables.rfp_margin = v as i32;
            }
        }
        "Null Min Depth" => {
            if let Some(v) = parsed((1, 10)) {
                engine.options.tunables.nmp_min_depth = v as i32;
            }
        }
        "LMR Divisor" => {
            if let Some(v) = parsed((100, 500)) {
                engine.options.tunables.lmr_divisor = v as i32;
            }
        }
        "Aspiration Delta" => {
            if let Some(v) = parsed((5, 100)) {
                engine.options.tunables.aspiration_delta = v as i32;
            }
        }
        _ => println!("info string unknown option: {name}"),
    }
}
