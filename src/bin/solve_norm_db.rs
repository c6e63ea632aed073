//! Canonical endgame database builder.
//!
//! Walks the canonical position space (X pinned at cell 0), solves every
//! position not yet in the database, and appends packed 16-byte records in
//! batches. Supports key-based sharding across machines (`--stride` /
//! `--offset`), resume from existing files, optional index-record output,
//! optional proof-DAG dumps, and a `--dedup` rewrite mode.
//!
//! Each flush logs batch health metrics; a batch with integrity violations
//! or excessive win-rate drift is tagged ANOMALY and the run continues.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use collapsi::constants::{INDEX_RECORD_SIZE, SOLVED_RECORD_SIZE};
use collapsi::enumerate::CanonicalWalk;
use collapsi::env_config;
use collapsi::hashkey::hash_state;
use collapsi::records::{encode_tree_blob, encode_tree_frame, IndexRecord, SolvedRecord};
use collapsi::solver::Solver;
use collapsi::stats::{progress_suffix, BatchStats, HealthMonitor};
use collapsi::storage;

struct Args {
    out: PathBuf,
    index: Option<PathBuf>,
    dumpdir: Option<PathBuf>,
    dumpfile: Option<PathBuf>,
    seen_dbs: Vec<PathBuf>,
    seen_index: Option<PathBuf>,
    stride: u64,
    offset: u64,
    limit: u64,
    batch: usize,
    reset_every: u64,
    dedup: bool,
}

fn usage() {
    println!("Usage: solve_norm_db [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --out FILE         Solved database (default data/solved_norm.db)");
    println!("  --index FILE       Also append 24-byte index records for new roots");
    println!("  --dumpdir DIR      Dump each root's proof DAG to DIR/<key>-<turn>.bin");
    println!("  --dumpfile FILE    Append proof DAGs as one aggregated stream");
    println!("  --seen FILE        Preload seen keys from another solved DB (repeatable)");
    println!("  --seen-index FILE  Preload and append 9-byte (key,turn) seen entries");
    println!("  --stride N         Key-based shard count (default 1)");
    println!("  --offset K         Shard index: keep keys with key % stride == K");
    println!("  --limit M          Stop after M new records (default 10000000, 0 = no limit)");
    println!("  --batch B          Records per flush (default 1000000)");
    println!("  --reset-every N    Clear solver caches every N roots (default 1)");
    println!("  --dedup            Rewrite --out keeping first (key,turn) occurrence, then exit");
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args {
        out: env_config::default_db_path(),
        index: None,
        dumpdir: None,
        dumpfile: None,
        seen_dbs: Vec::new(),
        seen_index: None,
        stride: 1,
        offset: 0,
        limit: 10_000_000,
        batch: 1_000_000,
        reset_every: 1,
        dedup: false,
    };
    let mut i = 1;
    let mut path_arg = |i: &mut usize| -> PathBuf {
        *i += 1;
        match argv.get(*i) {
            Some(v) => PathBuf::from(v),
            None => {
                eprintln!("{} requires an argument", argv[*i - 1]);
                std::process::exit(2);
            }
        }
    };
    while i < argv.len() {
        match argv[i].as_str() {
            "--out" => args.out = path_arg(&mut i),
            "--index" => args.index = Some(path_arg(&mut i)),
            "--dumpdir" => args.dumpdir = Some(path_arg(&mut i)),
            "--dumpfile" => args.dumpfile = Some(path_arg(&mut i)),
            "--seen" => args.seen_dbs.push(path_arg(&mut i)),
            "--seen-index" => args.seen_index = Some(path_arg(&mut i)),
            "--stride" => args.stride = num_arg(&argv, &mut i).max(1),
            "--offset" => args.offset = num_arg(&argv, &mut i),
            "--limit" => args.limit = num_arg(&argv, &mut i),
            "--batch" => args.batch = num_arg(&argv, &mut i).max(1) as usize,
            "--reset-every" => args.reset_every = num_arg(&argv, &mut i).max(1),
            "--dedup" => args.dedup = true,
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
    args
}

fn num_arg(argv: &[String], i: &mut usize) -> u64 {
    *i += 1;
    match argv.get(*i).and_then(|s| s.parse().ok()) {
        Some(v) => v,
        None => {
            eprintln!("{} requires an integer", argv[*i - 1]);
            std::process::exit(2);
        }
    }
}

fn main() {
    env_config::init_base_path();
    let args = parse_args();

    if args.dedup {
        match storage::dedup_database(&args.out) {
            Ok(report) => {
                println!(
                    "dedup DONE read={} wrote={} duplicates={} out={}",
                    report.read,
                    report.written,
                    report.duplicates,
                    args.out.display()
                );
                return;
            }
            Err(e) => {
                eprintln!("dedup failed for {}: {}", args.out.display(), e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = run(&args) {
        eprintln!("solve_norm_db failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> std::io::Result<()> {
    if let Some(parent) = args.out.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Some(dir) = &args.dumpdir {
        fs::create_dir_all(dir)?;
    }

    // Resume: drop any torn tail, then count what survives.
    let existing = storage::truncate_to_record_boundary(&args.out, SOLVED_RECORD_SIZE as u64)?;
    println!("resume existing_records={}", existing);
    if let Some(index) = &args.index {
        let existing_index = storage::truncate_to_record_boundary(index, INDEX_RECORD_SIZE as u64)?;
        println!("resume existing_index_records={}", existing_index);
    }

    let mut seen = storage::SeenSet::new();
    let mut preloaded = storage::load_seen_from_db(&args.out, &mut seen)?;
    for path in &args.seen_dbs {
        preloaded += storage::load_seen_from_db(path, &mut seen)?;
    }
    if let Some(path) = &args.seen_index {
        preloaded += storage::load_seen_from_index(path, &mut seen)?;
    }
    println!("loaded_seen={}", preloaded);

    let mut solver = Solver::new();
    let dumping = args.dumpdir.is_some() || args.dumpfile.is_some();
    solver.set_capture_edges(dumping);
    // a dumped blob must cover exactly one root's search
    let reset_every = if dumping { 1 } else { args.reset_every };

    let mut buf: Vec<SolvedRecord> = Vec::with_capacity(args.batch);
    let mut index_buf: Vec<IndexRecord> = Vec::new();
    let mut new_seen: Vec<(u64, u8)> = Vec::new();
    let mut batch_stats = BatchStats::new();
    let mut monitor = HealthMonitor::new();

    let t0 = Instant::now();
    let mut last_progress = t0;
    let mut produced = 0u64;
    let mut flushed = 0u64;
    let mut roots_since_reset = 0u64;

    let mut flush = |buf: &mut Vec<SolvedRecord>,
                     index_buf: &mut Vec<IndexRecord>,
                     new_seen: &mut Vec<(u64, u8)>,
                     batch_stats: &mut BatchStats,
                     monitor: &mut HealthMonitor,
                     flushed: &mut u64,
                     produced: u64|
     -> std::io::Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        storage::append_solved_records(&args.out, buf)?;
        if let Some(index) = &args.index {
            storage::append_index_records(index, index_buf)?;
        }
        if let Some(seen_index) = &args.seen_index {
            storage::append_seen_index(seen_index, new_seen)?;
        }
        buf.clear();
        index_buf.clear();
        new_seen.clear();
        *flushed += 1;
        let report = monitor.check(batch_stats);
        let elapsed_ms = t0.elapsed().as_millis() as u64;
        let mut line = format!(
            "flush flushes={} produced={} {} {}",
            flushed,
            produced,
            batch_stats.summary(),
            progress_suffix(produced, args.limit, elapsed_ms)
        );
        if report.anomaly {
            line.push_str(&format!(" ANOMALY drift={:.4}", report.drift));
        }
        println!("{}", line);
        *batch_stats = BatchStats::new();
        Ok(())
    };

    for state in CanonicalWalk::new() {
        let key = hash_state(&state);
        if args.stride > 1 && key % args.stride != args.offset {
            continue; // key-based sharding avoids cross-shard duplicates
        }
        if seen.contains(&(key, state.turn)) {
            continue;
        }

        let ans = solver.solve(&state);
        let rec = SolvedRecord {
            key,
            turn: state.turn,
            win: ans.win as u8,
            best: ans.best,
            plies: ans.plies,
        };
        batch_stats.observe(&rec);
        buf.push(rec);
        if args.index.is_some() {
            index_buf.push(IndexRecord {
                key,
                turn: state.turn,
                a: state.a,
                b2: state.b2,
                b3: state.b3,
                b4: state.b4,
                x: state.x,
                o: state.o,
                c: state.collapsed,
            });
        }
        seen.insert((key, state.turn));
        if args.seen_index.is_some() {
            new_seen.push((key, state.turn));
        }
        produced += 1;

        if dumping {
            let blob = encode_tree_blob(&solver.tree_nodes());
            if let Some(dir) = &args.dumpdir {
                let name = format!("{:016x}-{}.bin", key, state.turn);
                fs::write(dir.join(name), &blob)?;
            }
            if let Some(dumpfile) = &args.dumpfile {
                storage::append_bytes(dumpfile, &encode_tree_frame(key, state.turn, &blob))?;
            }
        }

        roots_since_reset += 1;
        if roots_since_reset >= reset_every {
            solver.clear_cache();
            roots_since_reset = 0;
        }

        if buf.len() >= args.batch {
            flush(
                &mut buf,
                &mut index_buf,
                &mut new_seen,
                &mut batch_stats,
                &mut monitor,
                &mut flushed,
                produced,
            )?;
        }

        if last_progress.elapsed().as_millis() >= 2000 {
            println!(
                "progress produced={} {} flushes={}",
                produced,
                progress_suffix(produced, args.limit, t0.elapsed().as_millis() as u64),
                flushed
            );
            last_progress = Instant::now();
        }

        if args.limit > 0 && produced >= args.limit {
            break;
        }
    }

    flush(
        &mut buf,
        &mut index_buf,
        &mut new_seen,
        &mut batch_stats,
        &mut monitor,
        &mut flushed,
        produced,
    )?;
    println!(
        "DONE produced={} out={} {}",
        produced,
        args.out.display(),
        progress_suffix(produced, args.limit, t0.elapsed().as_millis() as u64)
    );
    Ok(())
}
