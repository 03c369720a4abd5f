//! Deterministic double-deck engine.
//!
//! The shuffle must be reproducible bit-for-bit from `(seed, cursor)` alone:
//! clients rebuild the deck locally when they reconnect, so the PRNG and the
//! Fisher-Yates sweep are part of the wire contract, not an implementation
//! detail. Do not swap the PRNG or reorder the sweep.

use rand::Rng;

use crate::cards::{Card, Rank, Suit};

/// Two standard 52-card decks.
pub const DECK_SIZE: usize = 104;

/// mulberry32, the 32-bit PRNG the deck contract is defined against.
///
/// Each step advances the state by `0x6D2B79F5` and tempers it with the
/// multiply/xor-shift mix below; the output is a float in `[0, 1)`. All
/// arithmetic is wrapping 32-bit.
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Mulberry32 { state: seed }
    }

    pub fn next(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        f64::from(t ^ (t >> 14)) / 4_294_967_296.0
    }
}

/// The unshuffled double deck: suit-major (S, H, D, C), ace through king,
/// concatenated twice.
fn base_double_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for _ in 0..2 {
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                deck.push(Card::new(rank, suit));
            }
        }
    }
    deck
}

/// Seeded Fisher-Yates shuffle of the double deck.
///
/// Sweeps `i` from `n-1` down to `1`, drawing `j = floor(next() * (i + 1))`.
pub fn shuffle(seed: u32) -> Vec<Card> {
    let mut deck = base_double_deck();
    let mut rng = Mulberry32::new(seed);
    for i in (1..deck.len()).rev() {
        let j = (rng.next() * (i as f64 + 1.0)) as usize;
        deck.swap(i, j);
    }
    deck
}

/// Cards dealt per player: 7 heads-up, 6 otherwise.
pub fn hand_size(player_count: usize) -> usize {
    if player_count == 2 {
        7
    } else {
        6
    }
}

/// A fresh deck seed, uniform in `[0, 2^31)`.
pub fn generate_seed() -> u32 {
    rand::thread_rng().gen_range(0..(1u32 << 31))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_shuffle_is_deterministic_per_seed() {
        for seed in [0, 1, 42, 0x7FFF_FFFF] {
            assert_eq!(shuffle(seed), shuffle(seed));
        }
    }

    #[test]
    fn test_shuffle_is_a_permutation_of_the_double_deck() {
        let deck = shuffle(1);
        assert_eq!(deck.len(), DECK_SIZE);
        let mut counts: HashMap<Card, usize> = HashMap::new();
        for card in deck {
            *counts.entry(card).or_default() += 1;
        }
        assert_eq!(counts.len(), 52);
        assert!(counts.values().all(|&count| count == 2));
    }

    #[test]
    fn test_different_seeds_differ() {
        assert_ne!(shuffle(1), shuffle(2));
    }

    #[test]
    fn test_mulberry32_stream_is_stable() {
        let mut a = Mulberry32::new(1234);
        let mut b = Mulberry32::new(1234);
        for _ in 0..256 {
            let x = a.next();
            assert_eq!(x, b.next());
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_hand_size_targets() {
        assert_eq!(hand_size(2), 7);
        assert_eq!(hand_size(3), 6);
        assert_eq!(hand_size(4), 6);
    }

    #[test]
    fn test_seed_range() {
        for _ in 0..64 {
            assert!(generate_seed() < (1u32 << 31));
        }
    }
}
