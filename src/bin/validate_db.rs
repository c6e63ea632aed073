//! Whole-file integrity and statistics scan of a solved database.
//!
//! Computes the same counters as the builder's flush-time health metrics
//! over the entire file (in parallel), plus duplicate `(key, turn)`
//! detection. Exits non-zero when integrity violations are present.

use std::path::PathBuf;

use rayon::prelude::*;

use collapsi::constants::SOLVED_RECORD_SIZE;
use collapsi::env_config;
use collapsi::records::SolvedRecord;
use collapsi::stats::BatchStats;
use collapsi::storage::{SeenSet, SolvedDb};

fn parse_args() -> PathBuf {
    let argv: Vec<String> = std::env::args().collect();
    let mut db = env_config::default_db_path();
    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--db" => {
                i += 1;
                match argv.get(i) {
                    Some(v) => db = PathBuf::from(v),
                    None => {
                        eprintln!("--db requires an argument");
                        std::process::exit(2);
                    }
                }
            }
            "--help" | "-h" => {
                println!("Usage: validate_db [--db FILE]");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(2);
            }
        }
        i += 1;
    }
    db
}

fn main() {
    env_config::init_base_path();
    let path = parse_args();

    let db = match SolvedDb::open(&path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("validate_db: cannot open {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    let stats = db
        .record_bytes()
        .par_chunks_exact(SOLVED_RECORD_SIZE)
        .fold(BatchStats::new, |mut acc, chunk| {
            let buf: &[u8; SOLVED_RECORD_SIZE] = chunk.try_into().unwrap();
            acc.observe(&SolvedRecord::decode(buf));
            acc
        })
        .reduce(BatchStats::new, |mut a, b| {
            a.merge(&b);
            a
        });

    // duplicate detection is order-sensitive; keep it sequential
    let mut seen = SeenSet::with_capacity(db.len());
    let mut duplicates = 0u64;
    for rec in db.iter() {
        if !seen.insert((rec.key, rec.turn)) {
            duplicates += 1;
        }
    }

    println!("validate {} {}", path.display(), stats.summary());
    println!("duplicates={}", duplicates);
    if stats.integrity_violations() != 0 {
        println!("ANOMALY integrity_violations={}", stats.integrity_violations());
        std::process::exit(1);
    }
    println!("OK");
}
