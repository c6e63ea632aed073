//! Append-only database files: resume, seen sets, dedup, and zero-copy
//! readers.
//!
//! All files are streams of fixed-size records (layouts in [`crate::records`]).
//! A crashed run may leave a partial trailing record; at startup the file is
//! truncated to the nearest whole-record boundary and the surviving records
//! are preloaded into a `(key, turn)` seen set, which is the resume
//! mechanism — record order is never used for addressing.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::constants::{INDEX_RECORD_SIZE, SEEN_ENTRY_SIZE, SOLVED_RECORD_SIZE};
use crate::records::{decode_seen, encode_seen, IndexRecord, SolvedRecord};

/// Set of `(key, turn)` pairs already present on disk.
pub type SeenSet = HashSet<(u64, u8)>;

/// Truncate `path` to a whole multiple of `record_size` and return the
/// number of complete records. A missing file counts as zero records;
/// complete records are never touched.
pub fn truncate_to_record_boundary(path: &Path, record_size: u64) -> std::io::Result<u64> {
    let size = match fs::metadata(path) {
        Ok(m) => m.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let remainder = size % record_size;
    if remainder != 0 {
        let f = OpenOptions::new().write(true).open(path)?;
        f.set_len(size - remainder)?;
    }
    Ok((size - remainder) / record_size)
}

/// Preload seen pairs from a solved database. Missing files load zero.
pub fn load_seen_from_db(path: &Path, seen: &mut SeenSet) -> std::io::Result<u64> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut reader = BufReader::new(file);
    let mut buf = [0u8; SOLVED_RECORD_SIZE];
    let mut loaded = 0u64;
    while read_full(&mut reader, &mut buf)? {
        let r = SolvedRecord::decode(&buf);
        seen.insert((r.key, r.turn));
        loaded += 1;
    }
    Ok(loaded)
}

/// Preload seen pairs from an auxiliary 9-byte seen file.
pub fn load_seen_from_index(path: &Path, seen: &mut SeenSet) -> std::io::Result<u64> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut reader = BufReader::new(file);
    let mut buf = [0u8; SEEN_ENTRY_SIZE];
    let mut loaded = 0u64;
    while read_full(&mut reader, &mut buf)? {
        seen.insert(decode_seen(&buf));
        loaded += 1;
    }
    Ok(loaded)
}

/// Append new pairs to an auxiliary seen file.
pub fn append_seen_index(path: &Path, new_seen: &[(u64, u8)]) -> std::io::Result<()> {
    if new_seen.is_empty() {
        return Ok(());
    }
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    for &(key, turn) in new_seen {
        f.write_all(&encode_seen(key, turn))?;
    }
    f.flush()
}

/// Append a batch of solved records and flush.
pub fn append_solved_records(path: &Path, records: &[SolvedRecord]) -> std::io::Result<()> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    let mut buf = Vec::with_capacity(records.len() * SOLVED_RECORD_SIZE);
    for r in records {
        buf.extend_from_slice(&r.encode());
    }
    f.write_all(&buf)?;
    f.flush()
}

/// Append a batch of index records and flush.
pub fn append_index_records(path: &Path, records: &[IndexRecord]) -> std::io::Result<()> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    let mut buf = Vec::with_capacity(records.len() * INDEX_RECORD_SIZE);
    for r in records {
        buf.extend_from_slice(&r.encode());
    }
    f.write_all(&buf)?;
    f.flush()
}

/// Append raw bytes (tree blobs / aggregated frames) and flush.
pub fn append_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    f.write_all(bytes)?;
    f.flush()
}

/// Outcome of a dedup rewrite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DedupReport {
    pub read: u64,
    pub written: u64,
    pub duplicates: u64,
}

/// Rewrite a solved database keeping the first occurrence of each
/// `(key, turn)`. The original file is preserved as `<path>.bak`; the
/// deduplicated records replace it atomically via rename.
pub fn dedup_database(path: &Path) -> std::io::Result<DedupReport> {
    let tmp_path = path.with_extension("db.dedup");
    let bak_path = path.with_extension("db.bak");
    let mut reader = BufReader::new(File::open(path)?);
    let mut out = File::create(&tmp_path)?;

    let mut seen: SeenSet = HashSet::new();
    let mut report = DedupReport {
        read: 0,
        written: 0,
        duplicates: 0,
    };
    let mut buf = [0u8; SOLVED_RECORD_SIZE];
    while read_full(&mut reader, &mut buf)? {
        report.read += 1;
        let r = SolvedRecord::decode(&buf);
        if !seen.insert((r.key, r.turn)) {
            report.duplicates += 1;
            continue;
        }
        out.write_all(&buf)?;
        report.written += 1;
    }
    out.flush()?;
    drop(out);

    fs::rename(path, &bak_path)?;
    fs::rename(&tmp_path, path)?;
    Ok(report)
}

/// Read exactly `buf.len()` bytes; Ok(false) on clean EOF at a record
/// boundary. A partial trailing record also reads as EOF — startup
/// truncation makes the two indistinguishable on the write path, and the
/// readers must not invent half a record from a torn tail.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0usize;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            return Ok(false);
        }
        filled += n;
    }
    Ok(true)
}

/// Zero-copy view of a solved database.
pub struct SolvedDb {
    mmap: Mmap,
    len: usize,
}

impl SolvedDb {
    /// Map the file read-only. Trailing partial records are ignored.
    pub fn open(path: &Path) -> std::io::Result<SolvedDb> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let len = mmap.len() / SOLVED_RECORD_SIZE;
        Ok(SolvedDb { mmap, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, i: usize) -> SolvedRecord {
        let off = i * SOLVED_RECORD_SIZE;
        let buf: &[u8; SOLVED_RECORD_SIZE] =
            self.mmap[off..off + SOLVED_RECORD_SIZE].try_into().unwrap();
        SolvedRecord::decode(buf)
    }

    /// Raw record bytes, one whole number of records.
    pub fn record_bytes(&self) -> &[u8] {
        &self.mmap[..self.len * SOLVED_RECORD_SIZE]
    }

    pub fn iter(&self) -> impl Iterator<Item = SolvedRecord> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }
}

/// Zero-copy view of an index file.
pub struct NormIndex {
    mmap: Mmap,
    len: usize,
}

impl NormIndex {
    pub fn open(path: &Path) -> std::io::Result<NormIndex> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let len = mmap.len() / INDEX_RECORD_SIZE;
        Ok(NormIndex { mmap, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, i: usize) -> IndexRecord {
        let off = i * INDEX_RECORD_SIZE;
        let buf: &[u8; INDEX_RECORD_SIZE] =
            self.mmap[off..off + INDEX_RECORD_SIZE].try_into().unwrap();
        IndexRecord::decode(buf)
    }

    pub fn iter(&self) -> impl Iterator<Item = IndexRecord> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Linear scan for a `(key, turn)` row. The file is append-ordered, not
    /// sorted; consumers scan.
    pub fn find(&self, key: u64, turn: u8) -> Option<IndexRecord> {
        self.iter().find(|r| r.key == key && r.turn == turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tmp(name: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("collapsi_storage_{name}_{}", std::process::id()));
        let _ = fs::remove_file(&p);
        p
    }

    fn sample(key: u64, turn: u8) -> SolvedRecord {
        SolvedRecord {
            key,
            turn,
            win: (key % 2) as u8,
            best: 0x12,
            plies: (key % 30) as u16,
        }
    }

    #[test]
    fn truncation_drops_only_the_partial_tail() {
        let path = tmp("trunc");
        let records: Vec<SolvedRecord> = (1..=3).map(|k| sample(k, 0)).collect();
        append_solved_records(&path, &records).unwrap();
        // simulate a torn write
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(&[0xAB; 5]).unwrap();
        drop(f);

        let count = truncate_to_record_boundary(&path, SOLVED_RECORD_SIZE as u64).unwrap();
        assert_eq!(count, 3);
        let db = SolvedDb::open(&path).unwrap();
        assert_eq!(db.len(), 3);
        assert_eq!(db.get(2), sample(3, 0));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn truncation_of_missing_file_counts_zero() {
        let path = tmp("missing");
        assert_eq!(
            truncate_to_record_boundary(&path, SOLVED_RECORD_SIZE as u64).unwrap(),
            0
        );
    }

    #[test]
    fn seen_preload_covers_db_and_aux_files() {
        let db_path = tmp("seen_db");
        let aux_path = tmp("seen_aux");
        append_solved_records(&db_path, &[sample(10, 0), sample(11, 1)]).unwrap();
        append_seen_index(&aux_path, &[(20, 0), (21, 1)]).unwrap();

        let mut seen = SeenSet::new();
        assert_eq!(load_seen_from_db(&db_path, &mut seen).unwrap(), 2);
        assert_eq!(load_seen_from_index(&aux_path, &mut seen).unwrap(), 2);
        assert_eq!(seen.len(), 4);
        assert!(seen.contains(&(10, 0)));
        assert!(seen.contains(&(21, 1)));
        // missing files are not errors
        let mut empty = SeenSet::new();
        assert_eq!(load_seen_from_db(&tmp("absent"), &mut empty).unwrap(), 0);

        fs::remove_file(&db_path).unwrap();
        fs::remove_file(&aux_path).unwrap();
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let path = tmp("dedup.db");
        let a = sample(1, 0);
        let mut a_dup = a;
        a_dup.plies = 99; // later duplicate with different payload loses
        let b = sample(2, 1);
        append_solved_records(&path, &[a, b, a_dup, b]).unwrap();

        let report = dedup_database(&path).unwrap();
        assert_eq!(
            report,
            DedupReport {
                read: 4,
                written: 2,
                duplicates: 2
            }
        );
        let db = SolvedDb::open(&path).unwrap();
        assert_eq!(db.len(), 2);
        assert_eq!(db.get(0), a);
        assert_eq!(db.get(1), b);
        assert!(path.with_extension("db.bak").exists());

        fs::remove_file(&path).unwrap();
        fs::remove_file(path.with_extension("db.bak")).unwrap();
    }

    #[test]
    fn index_find_scans_append_order() {
        let path = tmp("index");
        let rec = IndexRecord {
            key: 77,
            turn: 1,
            a: 0x000F,
            b2: 0x00F0,
            b3: 0x0F00,
            b4: 0xF000,
            x: 1,
            o: 2,
            c: 0,
        };
        append_index_records(&path, &[rec]).unwrap();
        let idx = NormIndex::open(&path).unwrap();
        assert_eq!(idx.find(77, 1), Some(rec));
        assert_eq!(idx.find(77, 0), None);
        fs::remove_file(&path).unwrap();
    }
}
