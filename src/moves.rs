//! Move generation: exact-length self-avoiding paths on the torus.

use crate::constants::{bit, NEI_DOWN, NEI_LEFT, NEI_RIGHT, NEI_UP};
use crate::types::BitState;

/// Step value of the card at `idx`, read from the four card masks.
/// Degenerate states where no mask claims the cell default to 1.
pub fn steps_from(s: &BitState, idx: u8) -> u8 {
    let m = bit(idx);
    if s.a & m != 0 {
        1
    } else if s.b2 & m != 0 {
        2
    } else if s.b3 & m != 0 {
        3
    } else if s.b4 & m != 0 {
        4
    } else {
        1
    }
}

/// Destinations reachable from `start` by a path of exactly `steps`
/// orthogonal single steps that never revisits a cell (the start included)
/// and never touches a collapsed cell. The final cell may be neither
/// `start` nor the opponent's cell; intermediate traversal through the
/// opponent's cell is allowed.
pub fn enumerate_destinations(s: &BitState, start: u8, steps: u8, opp: u8) -> u16 {
    let mut dests = 0u16;
    dfs_paths(
        start,
        start,
        opp,
        steps,
        s.collapsed,
        bit(start),
        &mut dests,
    );
    dests
}

fn dfs_paths(
    current: u8,
    start: u8,
    opp: u8,
    remaining: u8,
    blocked: u16,
    visited: u16,
    dests: &mut u16,
) {
    if remaining == 0 {
        if current != start && current != opp {
            *dests |= bit(current);
        }
        return;
    }
    let neighbors = [
        NEI_UP[current as usize],
        NEI_DOWN[current as usize],
        NEI_LEFT[current as usize],
        NEI_RIGHT[current as usize],
    ];
    for next in neighbors {
        let m = bit(next);
        if blocked & m != 0 || visited & m != 0 {
            continue;
        }
        dfs_paths(next, start, opp, remaining - 1, blocked, visited | m, dests);
    }
}

/// Apply a move: collapse the departed cell, relocate the mover, flip the
/// turn. Card masks and the other player's position are untouched.
pub fn apply_move(s: &BitState, from: u8, to: u8) -> BitState {
    let mut next = *s;
    next.collapsed |= bit(from);
    if s.turn == 0 {
        next.x &= !bit(from);
        next.x |= bit(to);
        next.turn = 1;
    } else {
        next.o &= !bit(from);
        next.o |= bit(to);
        next.turn = 0;
    }
    next
}

/// Legal destinations for the side to move of `s`.
pub fn mover_destinations(s: &BitState) -> u16 {
    let me = s.mover_cell();
    let opp = s.opponent_cell();
    enumerate_destinations(s, me, steps_from(s, me), opp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BOARD_N;

    fn mask(cells: &[u8]) -> u16 {
        cells.iter().fold(0, |m, &c| m | bit(c))
    }

    #[test]
    fn steps_defaults_to_one_without_card_bit() {
        let mut s = BitState::all_aces(0, 5, 0);
        s.a = 0; // no mask claims any cell
        assert_eq!(steps_from(&s, 7), 1);
    }

    #[test]
    fn one_step_hits_the_four_torus_neighbors() {
        // X at 0, O at 5 (not adjacent), all A cards: neighbors of 0
        let s = BitState::all_aces(0, 5, 0);
        let d = enumerate_destinations(&s, 0, 1, 5);
        assert_eq!(d, mask(&[1, 3, 4, 12]));
    }

    #[test]
    fn opponent_blocks_only_the_landing() {
        // X at 0 with a 2-card, O at 1. The path 0→1→2 passes through O and
        // is legal; the landing on 1 itself is not.
        let mut s = BitState::all_aces(0, 1, 0);
        s.a &= !bit(0);
        s.b2 |= bit(0);
        let d = enumerate_destinations(&s, 0, 2, 1);
        assert_eq!(d & bit(1), 0);
        assert_ne!(d & bit(2), 0);
    }

    #[test]
    fn collapsed_cells_block_traversal() {
        // X at 0 with a 2-card, every neighbor of 0 collapsed except 1,
        // and 2 collapsed as well: the only 2-path 0→1→{2,5,13} loses 2.
        let mut s = BitState::all_aces(0, 10, 0);
        s.a &= !bit(0);
        s.b2 |= bit(0);
        s.collapsed = mask(&[3, 4, 12, 2]);
        let d = enumerate_destinations(&s, 0, 2, 10);
        assert_eq!(d, mask(&[5, 13]));
    }

    #[test]
    fn destinations_exclude_start_even_on_cycles() {
        // A 4-path on the torus can return to its origin only by revisiting;
        // self-avoidance plus the start exclusion keeps bit(start) clear.
        for start in 0..BOARD_N as u8 {
            let mut s = BitState::all_aces(start, (start + 2) % 16, 0);
            s.a = 0;
            s.b4 = 0xFFFF;
            let d = enumerate_destinations(&s, start, 4, s.opponent_cell());
            assert_eq!(d & bit(start), 0);
        }
    }

    #[test]
    fn apply_move_collapses_from_and_flips_turn() {
        let s = BitState::all_aces(0, 5, 0);
        let t = apply_move(&s, 0, 1);
        assert_eq!(t.collapsed, bit(0));
        assert_eq!(t.x, bit(1));
        assert_eq!(t.o, s.o);
        assert_eq!(t.turn, 1);
        let u = apply_move(&t, 5, 6);
        assert_eq!(u.collapsed, mask(&[0, 5]));
        assert_eq!(u.o, bit(6));
        assert_eq!(u.x, t.x);
        assert_eq!(u.turn, 0);
    }
}
