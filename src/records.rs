//! On-disk record formats.
//!
//! All formats are packed little-endian with no file headers; files are
//! append-only streams of fixed-size records (or, for tree dumps,
//! length-prefixed blobs). Layouts:
//!
//! - Solved record (16 bytes): `u64 key, u8 turn, u8 win, u8 best,
//!   u16 plies, u8 pad[3]`.
//! - Index record (24 bytes): `u64 key, u8 turn, u16 a, u16 b2, u16 b3,
//!   u16 b4, u16 x, u16 o, u16 c, u8 pad` — recovers the raw bitboards of a
//!   canonical root from its key.
//! - Seen entry (9 bytes): `u64 key, u8 turn`.
//! - Tree blob: `u64 node_count`, then per node `u64 key, u8 win, u8 best,
//!   u16 plies, u32 edge_count, u64 edge_key[edge_count]`.
//! - Aggregated tree stream: repeated `u64 root_key, u8 turn,
//!   u32 blob_size, bytes[blob_size]` frames.

use crate::constants::{INDEX_RECORD_SIZE, SEEN_ENTRY_SIZE, SOLVED_RECORD_SIZE};

/// One solved row of the endgame database.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolvedRecord {
    pub key: u64,
    pub turn: u8,
    pub win: u8,
    pub best: u8,
    pub plies: u16,
}

impl SolvedRecord {
    pub fn encode(&self) -> [u8; SOLVED_RECORD_SIZE] {
        let mut buf = [0u8; SOLVED_RECORD_SIZE];
        buf[0..8].copy_from_slice(&self.key.to_le_bytes());
        buf[8] = self.turn;
        buf[9] = self.win;
        buf[10] = self.best;
        buf[11..13].copy_from_slice(&self.plies.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; SOLVED_RECORD_SIZE]) -> SolvedRecord {
        SolvedRecord {
            key: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            turn: buf[8],
            win: buf[9],
            best: buf[10],
            plies: u16::from_le_bytes(buf[11..13].try_into().unwrap()),
        }
    }
}

/// One index row: the raw bitboards behind a canonical key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexRecord {
    pub key: u64,
    pub turn: u8,
    pub a: u16,
    pub b2: u16,
    pub b3: u16,
    pub b4: u16,
    pub x: u16,
    pub o: u16,
    pub c: u16,
}

impl IndexRecord {
    pub fn encode(&self) -> [u8; INDEX_RECORD_SIZE] {
        let mut buf = [0u8; INDEX_RECORD_SIZE];
        buf[0..8].copy_from_slice(&self.key.to_le_bytes());
        buf[8] = self.turn;
        let fields = [self.a, self.b2, self.b3, self.b4, self.x, self.o, self.c];
        for (i, f) in fields.iter().enumerate() {
            let off = 9 + i * 2;
            buf[off..off + 2].copy_from_slice(&f.to_le_bytes());
        }
        buf
    }

    pub fn decode(buf: &[u8; INDEX_RECORD_SIZE]) -> IndexRecord {
        let f = |i: usize| {
            let off = 9 + i * 2;
            u16::from_le_bytes(buf[off..off + 2].try_into().unwrap())
        };
        IndexRecord {
            key: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            turn: buf[8],
            a: f(0),
            b2: f(1),
            b3: f(2),
            b4: f(3),
            x: f(4),
            o: f(5),
            c: f(6),
        }
    }
}

/// Encode one auxiliary seen entry.
pub fn encode_seen(key: u64, turn: u8) -> [u8; SEEN_ENTRY_SIZE] {
    let mut buf = [0u8; SEEN_ENTRY_SIZE];
    buf[0..8].copy_from_slice(&key.to_le_bytes());
    buf[8] = turn;
    buf
}

/// Decode one auxiliary seen entry.
pub fn decode_seen(buf: &[u8; SEEN_ENTRY_SIZE]) -> (u64, u8) {
    (u64::from_le_bytes(buf[0..8].try_into().unwrap()), buf[8])
}

/// One proof-DAG node as dumped: the solved verdict plus the child keys in
/// exploration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub key: u64,
    pub win: u8,
    pub best: u8,
    pub plies: u16,
    pub edges: Vec<u64>,
}

/// Serialize a proof DAG to the per-root blob layout.
pub fn encode_tree_blob(nodes: &[TreeNode]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + nodes.len() * 16);
    out.extend_from_slice(&(nodes.len() as u64).to_le_bytes());
    for n in nodes {
        out.extend_from_slice(&n.key.to_le_bytes());
        out.push(n.win);
        out.push(n.best);
        out.extend_from_slice(&n.plies.to_le_bytes());
        out.extend_from_slice(&(n.edges.len() as u32).to_le_bytes());
        for e in &n.edges {
            out.extend_from_slice(&e.to_le_bytes());
        }
    }
    out
}

fn take<'a>(buf: &'a [u8], pos: &mut usize, n: usize) -> Option<&'a [u8]> {
    let s = buf.get(*pos..*pos + n)?;
    *pos += n;
    Some(s)
}

/// Parse a per-root blob. Returns None on truncation or trailing garbage.
pub fn decode_tree_blob(buf: &[u8]) -> Option<Vec<TreeNode>> {
    let mut pos = 0usize;
    let count = u64::from_le_bytes(take(buf, &mut pos, 8)?.try_into().unwrap()) as usize;
    let mut nodes = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        let key = u64::from_le_bytes(take(buf, &mut pos, 8)?.try_into().unwrap());
        let win = take(buf, &mut pos, 1)?[0];
        let best = take(buf, &mut pos, 1)?[0];
        let plies = u16::from_le_bytes(take(buf, &mut pos, 2)?.try_into().unwrap());
        let edge_count = u32::from_le_bytes(take(buf, &mut pos, 4)?.try_into().unwrap()) as usize;
        let mut edges = Vec::with_capacity(edge_count.min(1 << 20));
        for _ in 0..edge_count {
            edges.push(u64::from_le_bytes(take(buf, &mut pos, 8)?.try_into().unwrap()));
        }
        nodes.push(TreeNode {
            key,
            win,
            best,
            plies,
            edges,
        });
    }
    if pos == buf.len() {
        Some(nodes)
    } else {
        None
    }
}

/// Frame one root's blob for the aggregated tree stream.
pub fn encode_tree_frame(root_key: u64, turn: u8, blob: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(13 + blob.len());
    out.extend_from_slice(&root_key.to_le_bytes());
    out.push(turn);
    out.extend_from_slice(&(blob.len() as u32).to_le_bytes());
    out.extend_from_slice(blob);
    out
}

/// Split an aggregated tree stream back into `(root_key, turn, blob)`
/// frames. Returns None on a truncated tail.
pub fn decode_tree_frames(buf: &[u8]) -> Option<Vec<(u64, u8, Vec<u8>)>> {
    let mut frames = Vec::new();
    let mut pos = 0usize;
    while pos < buf.len() {
        let head = buf.get(pos..pos + 13)?;
        let root_key = u64::from_le_bytes(head[0..8].try_into().unwrap());
        let turn = head[8];
        let size = u32::from_le_bytes(head[9..13].try_into().unwrap()) as usize;
        pos += 13;
        let blob = buf.get(pos..pos + size)?;
        pos += size;
        frames.push((root_key, turn, blob.to_vec()));
    }
    Some(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MOVE_NONE;

    #[test]
    fn solved_record_round_trip_is_byte_identical() {
        let r = SolvedRecord {
            key: 0x0123_4567_89ab_cdef,
            turn: 1,
            win: 1,
            best: 0x2d,
            plies: 7,
        };
        let bytes = r.encode();
        assert_eq!(SolvedRecord::decode(&bytes), r);
        assert_eq!(SolvedRecord::decode(&bytes).encode(), bytes);
        // pad bytes stay zero
        assert_eq!(&bytes[13..], &[0, 0, 0]);
    }

    #[test]
    fn solved_record_layout_is_little_endian() {
        let r = SolvedRecord {
            key: 0x1122_3344_5566_7788,
            turn: 0,
            win: 0,
            best: MOVE_NONE,
            plies: 0x0201,
        };
        let b = r.encode();
        assert_eq!(&b[0..8], &[0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
        assert_eq!(b[10], 0xFF);
        assert_eq!(&b[11..13], &[0x01, 0x02]);
    }

    #[test]
    fn index_record_round_trip() {
        let r = IndexRecord {
            key: 0xdead_beef_cafe_f00d,
            turn: 1,
            a: 0x000F,
            b2: 0x00F0,
            b3: 0x0F00,
            b4: 0xF000,
            x: 0x0001,
            o: 0x4000,
            c: 0x0210,
        };
        let bytes = r.encode();
        assert_eq!(IndexRecord::decode(&bytes), r);
        assert_eq!(bytes[23], 0);
    }

    #[test]
    fn seen_entry_round_trip() {
        let bytes = encode_seen(42, 1);
        assert_eq!(decode_seen(&bytes), (42, 1));
    }

    #[test]
    fn tree_blob_round_trip() {
        let nodes = vec![
            TreeNode {
                key: 1,
                win: 1,
                best: 0x01,
                plies: 3,
                edges: vec![2, 3],
            },
            TreeNode {
                key: 2,
                win: 0,
                best: MOVE_NONE,
                plies: 0,
                edges: vec![],
            },
            TreeNode {
                key: 3,
                win: 0,
                best: 0x45,
                plies: 2,
                edges: vec![2],
            },
        ];
        let blob = encode_tree_blob(&nodes);
        assert_eq!(decode_tree_blob(&blob).unwrap(), nodes);
    }

    #[test]
    fn tree_blob_rejects_truncation() {
        let blob = encode_tree_blob(&[TreeNode {
            key: 9,
            win: 0,
            best: 0,
            plies: 0,
            edges: vec![1, 2, 3],
        }]);
        assert!(decode_tree_blob(&blob[..blob.len() - 1]).is_none());
    }

    #[test]
    fn aggregated_frames_round_trip() {
        let blob_a = encode_tree_blob(&[]);
        let blob_b = encode_tree_blob(&[TreeNode {
            key: 5,
            win: 1,
            best: 0x10,
            plies: 1,
            edges: vec![],
        }]);
        let mut stream = encode_tree_frame(111, 0, &blob_a);
        stream.extend_from_slice(&encode_tree_frame(222, 1, &blob_b));
        let frames = decode_tree_frames(&stream).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], (111, 0, blob_a));
        assert_eq!(frames[1], (222, 1, blob_b));
    }
}
