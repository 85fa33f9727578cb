use serde::Serialize;

use pick3_db::models::{concat_digits, Draw};

use crate::movement::{candidate_movements, Movement};

/// Combinaison proposée, jamais persistée.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Combination {
    pub digits: [u8; 3],
    /// Mouvements par rapport au dernier tirage réel.
    pub movements: [Option<Movement>; 3],
    pub scheme: Option<String>,
    pub score: Option<f64>,
}

impl Combination {
    pub fn new(digits: [u8; 3]) -> Self {
        Self {
            digits,
            movements: [None; 3],
            scheme: None,
            score: None,
        }
    }

    pub fn against(digits: [u8; 3], latest: Option<&Draw>) -> Self {
        Self {
            movements: candidate_movements(&digits, latest),
            ..Self::new(digits)
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn value(&self) -> String {
        concat_digits(&self.digits)
    }
}

/// Vrai si aucun chiffre ne se répète à la même position entre deux combinaisons.
pub fn is_position_disjoint(combinations: &[Combination]) -> bool {
    let mut used = [[false; 10]; 3];
    for c in combinations {
        for (p, &d) in c.digits.iter().enumerate() {
            let d = d as usize;
            if d > 9 || used[p][d] {
                return false;
            }
            used[p][d] = true;
        }
    }
    true
}
