//! Single-position solver CLI.
//!
//! Solves one state (given explicitly or randomly dealt) and prints a
//! machine-readable line:
//!
//! ```text
//! win best plies Nus | m1:pl1:w1 m2:pl2:w2 ...
//! ```
//!
//! where `win` is 0/1, `best` and `mi` are encoded move bytes (255 = no
//! legal move), `pl*` are exact ply distances, and the tail lists every
//! legal root move in heuristic order.

use std::time::Instant;

use collapsi::deal::random_deal;
use collapsi::solver::Solver;
use collapsi::types::BitState;

fn usage() {
    println!("Usage: solve [--state a,2,3,4,x,o,c,turn | --seed N]");
    println!();
    println!("Options:");
    println!("  --state ARG  Eight comma-separated hex 16-bit values; the eighth");
    println!("               is the turn, masked to one bit");
    println!("  --seed N     Deal a random board from a 64-bit seed");
}

fn parse_args() -> BitState {
    let args: Vec<String> = std::env::args().collect();
    let mut state: Option<BitState> = None;
    let mut seed: Option<u64> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--state" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("--state requires an argument");
                    std::process::exit(2);
                }
                state = match BitState::parse_arg(&args[i]) {
                    Some(s) => Some(s),
                    None => {
                        eprintln!("Bad --state format. Expect a,2,3,4,x,o,c,turn hex values");
                        std::process::exit(2);
                    }
                };
            }
            "--seed" => {
                i += 1;
                let parsed = args.get(i).and_then(|s| s.parse().ok());
                seed = match parsed {
                    Some(v) => Some(v),
                    None => {
                        eprintln!("--seed requires an integer");
                        std::process::exit(2);
                    }
                };
            }
            "--help" | "-h" => {
                usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(2);
            }
        }
        i += 1;
    }
    state.unwrap_or_else(|| random_deal(seed.unwrap_or_else(rand::random)))
}

fn main() {
    let state = parse_args();

    let mut solver = Solver::new();
    solver.set_collect_root_metrics(true);
    let t0 = Instant::now();
    let ans = solver.solve(&state);
    let micros = t0.elapsed().as_micros();

    let mut line = format!(
        "{} {} {} {}us |",
        ans.win as u8, ans.best, ans.plies, micros
    );
    let moves = solver.last_top_moves();
    let plies = solver.last_top_move_plies();
    let wins = solver.last_top_move_wins();
    for i in 0..moves.len() {
        line.push_str(&format!(" {}:{}:{}", moves[i], plies[i], wins[i] as u8));
    }
    println!("{}", line);
}
