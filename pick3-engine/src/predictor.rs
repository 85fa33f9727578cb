use pick3_db::models::{Draw, Position};

use crate::combination::Combination;
use crate::error::{EngineError, Result};
use crate::movement::{movement_at, Movement};
use crate::stats::transitions::{pair_label, TransitionTables};

/// Note les combinaisons d'après les tables de transitions et le contexte
/// des deux derniers mouvements de chaque position.
pub struct Predictor<'a> {
    latest: &'a Draw,
    last: [Option<Movement>; 3],
    before_last: [Option<Movement>; 3],
    tables: &'a TransitionTables,
}

impl<'a> Predictor<'a> {
    /// `draws[0]` = tirage le plus récent.
    pub fn new(draws: &'a [Draw], tables: &'a TransitionTables) -> Result<Self> {
        let latest = draws.first().ok_or_else(|| EngineError::no_data("la prédiction"))?;
        let mut last = [None; 3];
        let mut before_last = [None; 3];
        for position in Position::ALL {
            let p = position.index();
            last[p] = movement_at(draws, 0, position);
            before_last[p] = movement_at(draws, 1, position);
        }
        Ok(Self {
            latest,
            last,
            before_last,
            tables,
        })
    }

    /// Part (en %) du mouvement que produirait le candidat, à l'ordre 2 si
    /// l'état a été observé, sinon à l'ordre 1.
    fn movement_share(&self, position: Position, next: Movement) -> f64 {
        let p = position.index();
        let transitions = self.tables.position(position);
        let Some(last) = self.last[p] else {
            return 0.0;
        };
        if let Some(before) = self.before_last[p] {
            if let Some(row) = transitions.second_order.row(&pair_label(before, last)) {
                if row.total() > 0 {
                    return row.share(next);
                }
            }
        }
        transitions
            .first_order
            .row(last.label())
            .map(|row| row.share(next))
            .unwrap_or(0.0)
    }

    /// Part (en %) du chiffre candidat parmi les issues observées après
    /// (dernier chiffre, dernier mouvement).
    fn digit_share(&self, position: Position, digit: u8) -> f64 {
        let p = position.index();
        let Some(last) = self.last[p] else {
            return 0.0;
        };
        self.tables
            .position(position)
            .outcomes
            .row(self.latest.digits[p], last)
            .map(|row| row.next_digits.share(&digit))
            .unwrap_or(0.0)
    }

    pub fn score(&self, candidate: &[u8; 3]) -> f64 {
        Position::ALL
            .iter()
            .map(|&position| {
                let p = position.index();
                let next = Movement::between(candidate[p], self.latest.digits[p]);
                self.movement_share(position, next) + self.digit_share(position, candidate[p])
            })
            .sum()
    }

    /// Attribue un score à chaque combinaison puis trie par score décroissant
    /// (à égalité, par chiffres croissants).
    pub fn rank(&self, candidates: Vec<Combination>) -> Vec<Combination> {
        let mut scored: Vec<Combination> = candidates
            .into_iter()
            .map(|mut c| {
                c.score = Some(self.score(&c.digits));
                c
            })
            .collect();
        scored.sort_by(|a, b| {
            let (sa, sb) = (a.score.unwrap_or(0.0), b.score.unwrap_or(0.0));
            sb.total_cmp(&sa).then_with(|| a.digits.cmp(&b.digits))
        });
        scored
    }
}
