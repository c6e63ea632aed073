//! # Collapsi — exact solver and endgame database builder
//!
//! Solves any legal position of the two-player Collapsi variant played on a
//! 4×4 **toroidal** grid: whether the side to move has a forced win, the
//! optimal move, and the exact ply distance to the terminal outcome. On top
//! of the single-position query, the crate enumerates the canonical position
//! space (X pinned to cell 0) and streams packed solved records to an
//! append-only on-disk database with resume semantics.
//!
//! ## Pipeline
//!
//! | Stage | Module | Description |
//! |-------|--------|-------------|
//! | State model | [`types`], [`constants`] | 16-bit cell bitboards, torus neighbor tables |
//! | Move generation | [`moves`] | exact-length self-avoiding path enumeration |
//! | Keying | [`hashkey`] | Szudzik pairing + SplitMix64 over all state fields |
//! | Search | [`solver`] | memoized minimax, reply-count ordering, ply accounting, proof-DAG capture |
//! | Enumeration | [`enumerate`] | deterministic walk of the canonical deal space |
//! | Persistence | [`records`], [`storage`] | 16-byte solved records, 24-byte index records, tree blobs |
//!
//! The solved database is content-addressable: the 64-bit key of
//! [`hashkey::hash_state`] binds in-memory states, database rows, and tree
//! dumps, and is bit-exact across platforms. Files are append-only within a
//! run; a partial trailing record is truncated away at startup and a
//! preloaded seen set provides resume.

pub mod constants;
pub mod deal;
pub mod enumerate;
pub mod env_config;
pub mod hashkey;
pub mod moves;
pub mod normalize;
pub mod pretty;
pub mod records;
pub mod solver;
pub mod stats;
pub mod storage;
pub mod types;
