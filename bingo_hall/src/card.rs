//! Deterministic bingo card generation and win evaluation.
//!
//! A master card is a 15x5 grid: one row per seat, one column per
//! 15-number band (column `c` draws from `[15c+1, 15c+15]`). The grid is
//! a pure function of its seed, so server and clients can agree on the
//! card without shipping the whole grid ahead of time, and a finished
//! round can be audited from its seed alone.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Rows per master card; one row is assigned to each seat.
pub const CARD_ROWS: usize = 15;

/// Columns per row; each column draws from its own 15-number band.
pub const CARD_COLS: usize = 5;

/// Highest callable number.
pub const MAX_NUMBER: u8 = 75;

const LCG_MULTIPLIER: i64 = 1_103_515_245;
const LCG_INCREMENT: i64 = 12_345;
const LCG_MODULUS: i64 = 2_147_483_648;

/// Linear congruential generator. Not cryptographic: the seed is the
/// round's wall-clock start time, an unpredictable commitment rather
/// than a secret.
struct Lcg {
    state: i64,
}

impl Lcg {
    fn new(seed: i64) -> Self {
        Self {
            state: seed.rem_euclid(LCG_MODULUS),
        }
    }

    /// Next value in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        self.state = (LCG_MULTIPLIER * self.state + LCG_INCREMENT).rem_euclid(LCG_MODULUS);
        self.state as f64 / LCG_MODULUS as f64
    }
}

/// A master card: 15 rows of 5 numbers, one row per seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BingoCard {
    pub rows: Vec<[u8; CARD_COLS]>,
}

impl BingoCard {
    /// Builds the master card for `seed`. Same seed, same card.
    ///
    /// Each column restricts draws to its band of 15 consecutive
    /// integers and redraws until the value is unused in that row, so
    /// every row holds 5 distinct numbers, one per band.
    pub fn generate(seed: i64) -> Self {
        let mut rng = Lcg::new(seed);
        let mut rows = Vec::with_capacity(CARD_ROWS);

        for _ in 0..CARD_ROWS {
            let mut row = [0u8; CARD_COLS];
            for col in 0..CARD_COLS {
                let min = (col as u8) * 15 + 1;
                loop {
                    let num = min + (rng.next_f64() * 15.0) as u8;
                    if !row[..col].contains(&num) {
                        row[col] = num;
                        break;
                    }
                }
            }
            rows.push(row);
        }

        Self { rows }
    }

    /// Row assigned to a seat. Seat numbers are 1-based.
    pub fn row(&self, seat_number: u8) -> &[u8; CARD_COLS] {
        &self.rows[seat_number as usize - 1]
    }
}

/// True iff every number of `row` has been called.
pub fn is_winner(row: &[u8; CARD_COLS], called: &HashSet<u8>) -> bool {
    row.iter().all(|n| called.contains(n))
}
