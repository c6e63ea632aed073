//! Memoized minimax over the bitboard state space.
//!
//! A position is won for the side to move iff some move leaves the opponent
//! with no winning reply (AND-semantics over replies: two plies down it is
//! the current side's turn again). The search memoizes every solved state
//! under its 64-bit key, orders candidate moves by the opponent's reply
//! count (exactly-one-reply moves first), and short-circuits on the first
//! proven win. Within one candidate move every opponent reply is scored so
//! the reported ply distances stay exact.
//!
//! Ply accounting: terminal loss is 0, an immediate win (opponent left with
//! no reply) is 1, and each two-ply round adds 2. A winning side reports the
//! slowest loss its opponent can force against the chosen move; a losing
//! side reports the move that postpones defeat longest.
//!
//! With edge capture enabled the solver also records, per explored parent,
//! the child keys in exploration order — the proof DAG dumped alongside the
//! solved database.

use std::collections::HashMap;

use crate::constants::{encode_move, MOVE_NONE};
use crate::hashkey::{hash_state, Key64};
use crate::moves::{apply_move, enumerate_destinations, mover_destinations, steps_from};
use crate::records::TreeNode;
use crate::types::{Answer, BitState};

pub struct Solver {
    cache: HashMap<Key64, Answer>,
    /// Cache-insertion order, kept only while edge capture is on; fixes the
    /// node order of tree dumps.
    node_order: Vec<Key64>,
    edges: HashMap<Key64, Vec<Key64>>,
    capture_edges: bool,
    collect_root_metrics: bool,
    top_moves: Vec<u8>,
    top_move_plies: Vec<u16>,
    top_move_wins: Vec<bool>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    pub fn new() -> Solver {
        Solver {
            cache: HashMap::new(),
            node_order: Vec::new(),
            edges: HashMap::new(),
            capture_edges: false,
            collect_root_metrics: false,
            top_moves: Vec::new(),
            top_move_plies: Vec::new(),
            top_move_wins: Vec::new(),
        }
    }

    /// Record proof-DAG edges during search (needed for tree dumps).
    pub fn set_capture_edges(&mut self, on: bool) {
        self.capture_edges = on;
    }

    /// Score every legal root move after the main search (see
    /// [`Solver::last_top_moves`]).
    pub fn set_collect_root_metrics(&mut self, on: bool) {
        self.collect_root_metrics = on;
    }

    /// Drop all memoized state. The cache is only valid across roots that
    /// share card masks, and bulk enumeration resets it between roots to
    /// bound memory.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.node_order.clear();
        self.edges.clear();
    }

    /// Number of memoized positions.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Root moves in heuristic order, from the last [`Solver::solve`] call
    /// with root metrics enabled. Parallel to the plies/wins accessors.
    pub fn last_top_moves(&self) -> &[u8] {
        &self.top_moves
    }

    /// Exact ply distance for each root move.
    pub fn last_top_move_plies(&self) -> &[u16] {
        &self.top_move_plies
    }

    /// Win flag for each root move.
    pub fn last_top_move_wins(&self) -> &[bool] {
        &self.top_move_wins
    }

    /// Solve a position: forced-win flag, optimal move, exact ply distance.
    pub fn solve(&mut self, s: &BitState) -> Answer {
        self.top_moves.clear();
        self.top_move_plies.clear();
        self.top_move_wins.clear();
        let ans = self.solve_rec(s);
        if self.collect_root_metrics {
            self.score_root_moves(s);
        }
        ans
    }

    fn solve_rec(&mut self, s: &BitState) -> Answer {
        let key = hash_state(s);
        if let Some(&hit) = self.cache.get(&key) {
            return hit;
        }

        let (me, items) = ordered_candidates(s);
        if items.is_empty() {
            return self.memoize(key, Answer::terminal_loss());
        }

        let edge_parent = if self.capture_edges { Some(key) } else { None };
        let mut best_loss_move = MOVE_NONE;
        let mut best_loss_plies = 0u16;
        for &(to, _) in &items {
            let mv = encode_move(me, to);
            let after = apply_move(s, me, to);
            let (wins, plies) = self.evaluate_move(&after, edge_parent);
            if wins {
                return self.memoize(
                    key,
                    Answer {
                        win: true,
                        best: mv,
                        plies,
                    },
                );
            }
            // losing move: keep the one that postpones defeat longest
            if best_loss_move == MOVE_NONE || plies > best_loss_plies {
                best_loss_move = mv;
                best_loss_plies = plies;
            }
        }
        self.memoize(
            key,
            Answer {
                win: false,
                best: best_loss_move,
                plies: best_loss_plies,
            },
        )
    }

    /// Score one candidate move from the state it produces. Returns
    /// `(wins_for_the_mover, plies_from_the_parent)`. Every opponent reply
    /// is scored: a move wins iff all replies do, and the opponent is
    /// assumed to pick the slowest loss / fastest refutation.
    fn evaluate_move(&mut self, after: &BitState, edge_parent: Option<Key64>) -> (bool, u16) {
        let replies = mover_destinations(after);
        if replies == 0 {
            // opponent has no reply: immediate win
            return (true, 1);
        }
        let opp_from = after.mover_cell();
        let mut all_win = true;
        let mut worst_win = 0u16;
        let mut loss_min = u16::MAX;
        let mut rest = replies;
        while rest != 0 {
            let j = rest.trailing_zeros() as u8;
            rest &= rest - 1;
            let next = apply_move(after, opp_from, j);
            if let Some(parent) = edge_parent {
                let child = hash_state(&next);
                self.edges.entry(parent).or_default().push(child);
            }
            let sub = self.solve_rec(&next);
            if sub.win {
                worst_win = worst_win.max(sub.plies + 2);
            } else {
                all_win = false;
                loss_min = loss_min.min(sub.plies + 2);
            }
        }
        if all_win {
            (true, worst_win)
        } else if loss_min == u16::MAX {
            (false, 2)
        } else {
            (false, loss_min)
        }
    }

    /// Second pass over the root: the main search short-circuits on the
    /// first proven win, so recompute `(plies, win)` for every legal root
    /// move in heuristic order. Runs on a warm cache.
    fn score_root_moves(&mut self, s: &BitState) {
        let (me, items) = ordered_candidates(s);
        for &(to, _) in &items {
            let after = apply_move(s, me, to);
            let (wins, plies) = self.evaluate_move(&after, None);
            self.top_moves.push(encode_move(me, to));
            self.top_move_plies.push(plies);
            self.top_move_wins.push(wins);
        }
    }

    fn memoize(&mut self, key: Key64, ans: Answer) -> Answer {
        if self.capture_edges {
            self.node_order.push(key);
        }
        self.cache.insert(key, ans);
        ans
    }

    /// Proof-DAG snapshot in cache-insertion order. Terminal nodes carry an
    /// empty edge list. Requires edge capture to have been enabled for the
    /// whole solve.
    pub fn tree_nodes(&self) -> Vec<TreeNode> {
        self.node_order
            .iter()
            .map(|&key| {
                let ans = self.cache[&key];
                TreeNode {
                    key,
                    win: ans.win as u8,
                    best: ans.best,
                    plies: ans.plies,
                    edges: self.edges.get(&key).cloned().unwrap_or_default(),
                }
            })
            .collect()
    }
}

/// Legal moves of `s` in heuristic order: simulate each destination one ply
/// and count the opponent's replies; moves leaving exactly one reply come
/// first, the rest follow by ascending reply count. The sort is stable so
/// equal counts keep ascending destination order.
fn ordered_candidates(s: &BitState) -> (u8, Vec<(u8, u32)>) {
    let me = s.mover_cell();
    let opp = s.opponent_cell();
    let dests = enumerate_destinations(s, me, steps_from(s, me), opp);
    let mut items: Vec<(u8, u32)> = Vec::with_capacity(dests.count_ones() as usize);
    let mut rest = dests;
    while rest != 0 {
        let to = rest.trailing_zeros() as u8;
        rest &= rest - 1;
        let after = apply_move(s, me, to);
        items.push((to, mover_destinations(&after).count_ones()));
    }
    items.sort_by_key(|&(_, replies)| (replies != 1, replies));
    (me, items)
}
