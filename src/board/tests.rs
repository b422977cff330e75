//! Board-level property and regression tests.

use proptest::prelude::*;

use super::state::Board;

const TEST_FENS: [&str; 5] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
];

/// Play a pseudo-random walk of legal moves (driven by `picks`), then
/// unwind it, checking the board restores bitwise.
fn walk_and_unwind(fen: &str, picks: &[u8]) {
    let mut board = Board::try_from_fen(fen).unwrap();
    let initial_fen = board.to_fen();
    let initial_hash = board.hash();
    let initial_pawn_key = board.pawn_key();

    let mut undo_stack = Vec::new();
    for &pick in picks {
        let moves = board.generate_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[pick as usize % moves.len()];
        let info = board.make_move(mv);
        undo_stack.push((mv, info));

        // Incremental state always matches a from-scratch recalculation.
        let mut fresh = board.clone();
        fresh.recalculate();
        assert_eq!(board.hash(), fresh.hash());
        assert_eq!(board.pawn_key(), fresh.pawn_key());
        assert_eq!(board.eval_mg, fresh.eval_mg);
        assert_eq!(board.eval_eg, fresh.eval_eg);
        assert_eq!(board.game_phase, fresh.game_phase);
    }

    for (mv, info) in undo_stack.into_iter().rev() {
        board.unmake_move(mv, info);
    }

    assert_eq!(board.to_fen(), initial_fen);
    assert_eq!(board.hash(), initial_hash);
    assert_eq!(board.pawn_key(), initial_pawn_key);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn make_unmake_is_symmetric(
        fen_idx in 0usize..TEST_FENS.len(),
        picks in proptest::collection::vec(any::<u8>(), 1..24),
    ) {
        walk_and_unwind(TEST_FENS[fen_idx], &picks);
    }

    #[test]
    fn generated_moves_are_legal(
        fen_idx in 0usize..TEST_FENS.len(),
        picks in proptest::collection::vec(any::<u8>(), 1..12),
    ) {
        let mut board = Board::try_from_fen(TEST_FENS[fen_idx]).unwrap();
        for &pick in &picks {
            let moves = board.generate_moves();
            if moves.is_empty() {
                break;
            }
            let mover = board.side_to_move();
            let mv = moves[pick as usize % moves.len()];
            board.make_move(mv);
            prop_assert!(!board.in_check(mover), "move {mv} left own king in check");
        }
    }
}

#[test]
fn repetition_requires_three_occurrences() {
    let mut board = Board::new();
    for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
        board.make_move_uci(uci).unwrap();
    }
    // Back to the start position for only the second time.
    assert!(!board.is_repetition());
    assert!(!board.is_draw());
    for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
        board.make_move_uci(uci).unwrap();
    }
    // Third occurrence: threefold.
    assert!(board.is_repetition());
    assert!(board.is_draw());
}

#[test]
fn fifty_move_rule_is_a_draw() {
    let board = Board::try_from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 100 1").unwrap();
    assert!(board.is_draw());
}

#[test]
fn insufficient_material_draws() {
    assert!(Board::try_from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1")
        .unwrap()
        .is_insufficient_material());
    assert!(Board::try_from_fen("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1")
        .unwrap()
        .is_insufficient_material());
    assert!(!Board::try_from_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1")
        .unwrap()
        .is_insufficient_material());
}

#[test]
fn halfmove_clock_bounds_repetition_window() {
    let mut board = Board::new();
    for uci in [
        "g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8",
    ] {
        board.make_move_uci(uci).unwrap();
    }
    assert!(board.is_repetition());
    // A pawn move resets the clock; the old repetitions no longer count.
    board.make_move_uci("e2e4").unwrap();
    assert!(!board.is_repetition());
}
