//! Move-generator correctness against published perft reference counts.

use kestrel::board::Board;

fn perft(fen: &str, depth: usize) -> u64 {
    let mut board = Board::try_from_fen(fen).expect("valid FEN");
    board.perft(depth)
}

const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const ENDGAME: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
const PROMOTIONS: &str = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1";
const TALKCHESS: &str = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";
const STEVEN: &str = "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10";

#[test]
fn perft_startpos_shallow() {
    assert_eq!(perft(STARTPOS, 1), 20);
    assert_eq!(perft(STARTPOS, 2), 400);
    assert_eq!(perft(STARTPOS, 3), 8_902);
}

#[test]
fn perft_startpos_depth_4() {
    assert_eq!(perft(STARTPOS, 4), 197_281);
}

#[test]
#[ignore = "slow; run with --ignored for full validation"]
fn perft_startpos_depth_5() {
    assert_eq!(perft(STARTPOS, 5), 4_865_609);
}

#[test]
fn perft_kiwipete_shallow() {
    assert_eq!(perft(KIWIPETE, 1), 48);
    assert_eq!(perft(KIWIPETE, 2), 2_039);
    assert_eq!(perft(KIWIPETE, 3), 97_862);
}

#[test]
#[ignore = "slow; run with --ignored for full validation"]
fn perft_kiwipete_deep() {
    assert_eq!(perft(KIWIPETE, 4), 4_085_603);
    assert_eq!(perft(KIWIPETE, 5), 193_690_690);
}

#[test]
fn perft_endgame_with_en_passant_pins() {
    assert_eq!(perft(ENDGAME, 1), 14);
    assert_eq!(perft(ENDGAME, 2), 191);
    assert_eq!(perft(ENDGAME, 3), 2_812);
    assert_eq!(perft(ENDGAME, 4), 43_238);
}

#[test]
#[ignore = "slow; run with --ignored for full validation"]
fn perft_endgame_depth_5() {
    assert_eq!(perft(ENDGAME, 5), 674_624);
}

#[test]
fn perft_promotion_heavy() {
    assert_eq!(perft(PROMOTIONS, 1), 6);
    assert_eq!(perft(PROMOTIONS, 2), 264);
    assert_eq!(perft(PROMOTIONS, 3), 9_467);
}

#[test]
#[ignore = "slow; run with --ignored for full validation"]
fn perft_promotion_heavy_depth_4() {
    assert_eq!(perft(PROMOTIONS, 4), 422_333);
}

#[test]
fn perft_talkchess_castling_promotion() {
    assert_eq!(perft(TALKCHESS, 1), 44);
    assert_eq!(perft(TALKCHESS, 2), 1_486);
    assert_eq!(perft(TALKCHESS, 3), 62_379);
}

#[test]
fn perft_symmetric_middlegame() {
    assert_eq!(perft(STEVEN, 1), 46);
    assert_eq!(perft(STEVEN, 2), 2_079);
    assert_eq!(perft(STEVEN, 3), 89_890);
}

#[test]
fn perft_divide_sums_to_perft() {
    let mut board = Board::try_from_fen(KIWIPETE).unwrap();
    let divided: u64 = board.perft_divide(3).into_iter().map(|(_, n)| n).sum();
    assert_eq!(divided, 97_862);
}
