//! Derivations lister: normalized boards and their raw torus shifts.
//!
//! For the first N solved records, looks up the raw bitboards in the index
//! file and prints the normalized overlay grid plus all 16 torus shifts
//! with their raw keys for both turns.

use std::path::PathBuf;

use collapsi::env_config;
use collapsi::hashkey::hash_fields;
use collapsi::normalize::shift_mask;
use collapsi::pretty::overlay_grid;
use collapsi::storage::{NormIndex, SolvedDb};

struct Args {
    db: PathBuf,
    index: PathBuf,
    count: usize,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args {
        db: env_config::default_db_path(),
        index: env_config::default_index_path(),
        count: 2,
    };
    let mut i = 1;
    while i < argv.len() {
        let need = |i: &mut usize| -> String {
            *i += 1;
            match argv.get(*i) {
                Some(v) => v.clone(),
                None => {
                    eprintln!("{} requires an argument", argv[*i - 1]);
                    std::process::exit(2);
                }
            }
        };
        match argv[i].as_str() {
            "--db" => args.db = PathBuf::from(need(&mut i)),
            "--index" => args.index = PathBuf::from(need(&mut i)),
            "--count" => {
                args.count = need(&mut i).parse().unwrap_or_else(|_| {
                    eprintln!("--count requires an integer");
                    std::process::exit(2);
                });
                args.count = args.count.max(1);
            }
            "--help" | "-h" => {
                println!("Usage: list_derivations [--db FILE] [--index FILE] [--count N]");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(2);
            }
        }
        i += 1;
    }
    args
}

fn key_string(key: u64, turn: u8) -> String {
    format!("{:016x}|{}", key, turn)
}

fn main() {
    env_config::init_base_path();
    let args = parse_args();

    let db = match SolvedDb::open(&args.db) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Cannot open db {}: {}", args.db.display(), e);
            std::process::exit(1);
        }
    };
    let index = match NormIndex::open(&args.index) {
        Ok(idx) => idx,
        Err(e) => {
            eprintln!(
                "Cannot open index {}: {} (rerun the db builder with --index, or gen_index)",
                args.index.display(),
                e
            );
            std::process::exit(1);
        }
    };

    for rec in db.iter().take(args.count) {
        let root = match index.find(rec.key, rec.turn) {
            Some(m) => m,
            None => {
                println!(
                    "normalized_key={} (missing index)",
                    key_string(rec.key, rec.turn)
                );
                continue;
            }
        };
        println!("normalized_key={}", key_string(root.key, root.turn));
        println!("Board (normalized):");
        print!(
            "{}",
            overlay_grid(root.a, root.b2, root.b3, root.b4, root.x, root.o, root.c)
        );
        // every raw position that normalizes to this root: 16 shifts x 2 turns
        for dr in 0..4 {
            for dc in 0..4 {
                let a = shift_mask(root.a, dr, dc);
                let b2 = shift_mask(root.b2, dr, dc);
                let b3 = shift_mask(root.b3, dr, dc);
                let b4 = shift_mask(root.b4, dr, dc);
                let x = shift_mask(root.x, dr, dc);
                let o = shift_mask(root.o, dr, dc);
                let c = shift_mask(root.c, dr, dc);
                let raw0 = hash_fields(a, b2, b3, b4, x, o, c, 0);
                let raw1 = hash_fields(a, b2, b3, b4, x, o, c, 1);
                println!(
                    "\nshift dr={} dc={} raw0={} raw1={}",
                    dr,
                    dc,
                    key_string(raw0, 0),
                    key_string(raw1, 1)
                );
                println!("Board:");
                print!("{}", overlay_grid(a, b2, b3, b4, x, o, c));
            }
        }
    }
}
