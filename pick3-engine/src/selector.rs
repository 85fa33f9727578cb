use rand::Rng;
use rand::seq::SliceRandom;

use crate::combination::Combination;
use crate::error::{EngineError, Result};

pub const MAX_SLOTS: usize = 4;
pub const MIN_SLOTS: usize = 2;

/// Choisit une combinaison par pool (dans l'ordre des pools) sans répéter de
/// chiffre à une même position. Essaie 4 pools, puis 3, puis 2.
///
/// Les pools sont mélangés avant la recherche : deux appels peuvent renvoyer
/// des sélections différentes, toutes valides.
pub fn select_disjoint(pools: &[Vec<Combination>], rng: &mut impl Rng) -> Result<Vec<Combination>> {
    let mut shuffled: Vec<Vec<Combination>> = pools.iter().take(MAX_SLOTS).cloned().collect();
    for pool in &mut shuffled {
        pool.shuffle(rng);
    }

    for target in (MIN_SLOTS..=shuffled.len()).rev() {
        let mut search = Search::new(target);
        if search.descend(&shuffled, 0) {
            return Ok(search.chosen.into_iter().cloned().collect());
        }
    }

    Err(EngineError::InsufficientCandidates {
        required: MIN_SLOTS,
        pools: pools.len(),
    })
}

struct Search<'a> {
    target: usize,
    used: [[bool; 10]; 3],
    chosen: Vec<&'a Combination>,
}

impl<'a> Search<'a> {
    fn new(target: usize) -> Self {
        Self {
            target,
            used: [[false; 10]; 3],
            chosen: Vec::with_capacity(target),
        }
    }

    fn descend(&mut self, pools: &'a [Vec<Combination>], depth: usize) -> bool {
        if self.chosen.len() == self.target {
            return true;
        }
        for candidate in &pools[depth] {
            if self.collides(&candidate.digits) {
                continue;
            }
            self.set(&candidate.digits, true);
            self.chosen.push(candidate);
            if self.descend(pools, depth + 1) {
                return true;
            }
            self.chosen.pop();
            self.set(&candidate.digits, false);
        }
        false
    }

    /// Un chiffre hors 0..=9 compte comme une collision : le candidat est écarté.
    fn collides(&self, digits: &[u8; 3]) -> bool {
        digits
            .iter()
            .enumerate()
            .any(|(p, &d)| self.used[p].get(d as usize).copied().unwrap_or(true))
    }

    fn set(&mut self, digits: &[u8; 3], value: bool) {
        for (p, &d) in digits.iter().enumerate() {
            if let Some(slot) = self.used[p].get_mut(d as usize) {
                *slot = value;
            }
        }
    }
}
