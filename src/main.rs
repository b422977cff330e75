use std::io;

use kestrel::uci;

fn main() {
    let stdin = io::stdin();
    uci::run_loop(stdin.lock());
}
