use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use pick3_db::models::{Draw, Position};

use super::{FrequencyTable, MostCommon};
use crate::movement::Movement;

/// Issue observée au tirage suivant pour un couple (chiffre, mouvement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRow {
    pub next_digits: FrequencyTable<u8>,
    pub next_movements: FrequencyTable<String>,
    pub top_digits: Vec<MostCommon<u8>>,
    pub top_movements: Vec<MostCommon<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeTable {
    /// Clé `chiffre-mouvement`, ex. `3-Up`. Seuls les couples observés figurent.
    pub rows: BTreeMap<String, OutcomeRow>,
}

impl OutcomeTable {
    pub fn row(&self, digit: u8, movement: Movement) -> Option<&OutcomeRow> {
        self.rows.get(&outcome_key(digit, movement))
    }
}

pub fn outcome_key(digit: u8, movement: Movement) -> String {
    format!("{}-{}", digit, movement.label())
}

/// Pour chaque tirage t ayant un prédécesseur et un successeur, associe
/// (chiffre en t, mouvement en t) au chiffre et au mouvement en t+1.
pub fn digit_movement_outcomes(draws: &[Draw], position: Position) -> OutcomeTable {
    let p = position.index();
    let chronological: Vec<u8> = draws.iter().rev().map(|d| d.digits[p]).collect();

    let mut next_digit = Array2::<u32>::zeros((30, 10));
    let mut next_move = Array2::<u32>::zeros((30, 3));

    for w in chronological.windows(3) {
        let (before, current, next) = (w[0], w[1], w[2]);
        let state = current as usize * 3 + Movement::between(current, before).index();
        next_digit[[state, next as usize]] += 1;
        next_move[[state, Movement::between(next, current).index()]] += 1;
    }

    let mut rows = BTreeMap::new();
    for digit in 0..=9u8 {
        for movement in Movement::ALL {
            let state = digit as usize * 3 + movement.index();
            let digit_counts: BTreeMap<u8, u32> = (0..=9u8)
                .map(|d| (d, next_digit[[state, d as usize]]))
                .collect();
            let next_digits = FrequencyTable::from_counts(digit_counts);
            if next_digits.total == 0 {
                continue;
            }
            let move_counts: BTreeMap<String, u32> = Movement::ALL
                .iter()
                .map(|m| (m.label().to_string(), next_move[[state, m.index()]]))
                .collect();
            let next_movements = FrequencyTable::from_counts(move_counts);
            rows.insert(
                outcome_key(digit, movement),
                OutcomeRow {
                    top_digits: next_digits.most_common(3),
                    top_movements: next_movements.most_common(3),
                    next_digits,
                    next_movements,
                },
            );
        }
    }

    OutcomeTable { rows }
}
