//! Index backfill: recover the raw bitboards behind solved keys.
//!
//! Re-walks the canonical position space and appends a 24-byte index record
//! for every `(key, turn)` that is present in the solved database but
//! missing from the index file. Resume-safe (existing index entries are
//! subtracted first) and stops as soon as every wanted key is written.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use collapsi::constants::INDEX_RECORD_SIZE;
use collapsi::enumerate::CanonicalWalk;
use collapsi::env_config;
use collapsi::hashkey::hash_state;
use collapsi::records::IndexRecord;
use collapsi::stats::format_hms;
use collapsi::storage::{NormIndex, SeenSet, SolvedDb};

struct Args {
    db: PathBuf,
    out: PathBuf,
    stride: u64,
    offset: u64,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args {
        db: env_config::default_db_path(),
        out: env_config::default_index_path(),
        stride: 1,
        offset: 0,
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
            "--out" => args.out = PathBuf::from(need(&mut i)),
            "--stride" => {
                args.stride = need(&mut i).parse().unwrap_or_else(|_| {
                    eprintln!("--stride requires an integer");
                    std::process::exit(2);
                });
                args.stride = args.stride.max(1);
            }
            "--offset" => {
                args.offset = need(&mut i).parse().unwrap_or_else(|_| {
                    eprintln!("--offset requires an integer");
                    std::process::exit(2);
                });
            }
            "--help" | "-h" => {
                println!("Usage: gen_index [--db FILE] [--out FILE] [--stride N] [--offset K]");
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

fn main() {
    env_config::init_base_path();
    let args = parse_args();

    let db = match SolvedDb::open(&args.db) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("gen_index: cannot open solved db {}: {}", args.db.display(), e);
            std::process::exit(1);
        }
    };

    // Wanted set: everything solved, minus implausible rows, minus what the
    // index already covers.
    let mut wanted: SeenSet = db
        .iter()
        .filter(|r| r.key != 0 && r.turn <= 1)
        .map(|r| (r.key, r.turn))
        .collect();
    if wanted.is_empty() {
        eprintln!("gen_index: no keys loaded from {}", args.db.display());
        return;
    }
    if let Ok(existing) = NormIndex::open(&args.out) {
        for rec in existing.iter() {
            wanted.remove(&(rec.key, rec.turn));
        }
    }
    if wanted.is_empty() {
        println!("gen_index: nothing to do; index already covers db");
        return;
    }

    if let Some(parent) = args.out.parent() {
        if fs::create_dir_all(parent).is_err() {
            eprintln!("gen_index: cannot create {}", parent.display());
            std::process::exit(1);
        }
    }
    let mut out = match OpenOptions::new().create(true).append(true).open(&args.out) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("gen_index: cannot open index for append {}: {}", args.out.display(), e);
            std::process::exit(1);
        }
    };

    let t0 = Instant::now();
    let mut last = t0;
    let mut written = 0u64;
    let mut pending = Vec::with_capacity(INDEX_RECORD_SIZE * 4096);

    for state in CanonicalWalk::new() {
        let key = hash_state(&state);
        if args.stride > 1 && key % args.stride != args.offset {
            continue;
        }
        if wanted.remove(&(key, state.turn)) {
            let rec = IndexRecord {
                key,
                turn: state.turn,
                a: state.a,
                b2: state.b2,
                b3: state.b3,
                b4: state.b4,
                x: state.x,
                o: state.o,
                c: state.collapsed,
            };
            pending.extend_from_slice(&rec.encode());
            written += 1;
            if pending.len() >= INDEX_RECORD_SIZE * 4096 {
                if let Err(e) = out.write_all(&pending) {
                    eprintln!("gen_index: write failed: {}", e);
                    std::process::exit(1);
                }
                pending.clear();
            }
            if wanted.is_empty() {
                break;
            }
        }

        if last.elapsed().as_millis() >= 5000 {
            println!(
                "gen_index progress written={} remaining={} elapsed={} out={}",
                written,
                wanted.len(),
                format_hms(t0.elapsed().as_millis() as u64),
                args.out.display()
            );
            last = Instant::now();
        }
    }

    if !pending.is_empty() {
        if let Err(e) = out.write_all(&pending) {
            eprintln!("gen_index: write failed: {}", e);
            std::process::exit(1);
        }
    }
    let _ = out.flush();

    if wanted.is_empty() {
        println!(
            "gen_index DONE written={} elapsed={} out={}",
            written,
            format_hms(t0.elapsed().as_millis() as u64),
            args.out.display()
        );
    } else {
        println!(
            "gen_index FINISHED written={} still_missing={} elapsed={} out={}",
            written,
            wanted.len(),
            format_hms(t0.elapsed().as_millis() as u64),
            args.out.display()
        );
    }
}
