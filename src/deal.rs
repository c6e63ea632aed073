//! Seeded random deals.
//!
//! The physical deck is 2 jokers, 4 aces, 4 twos, 4 threes and 2 fours.
//! Jokers behave as aces (step 1) and the two joker cells are the players'
//! starting squares: the first in row-major order is X, the second is O.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::constants::{bit, BOARD_N};
use crate::types::BitState;

const DECK: [char; BOARD_N] = [
    'J', 'J', 'A', 'A', 'A', 'A', '2', '2', '2', '2', '3', '3', '3', '3', '4', '4',
];

/// Deal a 4×4 board from a 64-bit seed. X is to move.
pub fn random_deal(seed: u64) -> BitState {
    deal_with_rng(&mut StdRng::seed_from_u64(seed))
}

/// Deal from a caller-supplied generator.
pub fn deal_with_rng<R: rand::Rng>(rng: &mut R) -> BitState {
    let mut deck = DECK;
    deck.shuffle(rng);

    let mut s = BitState {
        a: 0,
        b2: 0,
        b3: 0,
        b4: 0,
        x: 0,
        o: 0,
        collapsed: 0,
        turn: 0,
    };
    for (i, card) in deck.iter().enumerate() {
        let m = bit(i as u8);
        match card {
            'J' | 'A' => s.a |= m,
            '2' => s.b2 |= m,
            '3' => s.b3 |= m,
            _ => s.b4 |= m,
        }
        if *card == 'J' {
            if s.x == 0 {
                s.x = m;
            } else {
                s.o = m;
            }
        }
    }
    s
}
