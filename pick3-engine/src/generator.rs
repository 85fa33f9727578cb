use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::{Rng, RngExt};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Gabarit de plages de chiffres par position, utilisé pour partitionner
/// l'espace de recherche.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSlotScheme")]
pub struct SlotScheme {
    pub name: String,
    ranges: [Vec<u8>; 3],
}

#[derive(Deserialize)]
struct RawSlotScheme {
    name: String,
    ranges: [Vec<u8>; 3],
}

impl TryFrom<RawSlotScheme> for SlotScheme {
    type Error = EngineError;

    fn try_from(raw: RawSlotScheme) -> Result<Self> {
        Self::new(raw.name, raw.ranges)
    }
}

impl SlotScheme {
    pub fn new(name: impl Into<String>, ranges: [Vec<u8>; 3]) -> Result<Self> {
        let name = name.into();
        let mut ranges = ranges;
        for (p, range) in ranges.iter_mut().enumerate() {
            range.sort();
            range.dedup();
            if range.is_empty() {
                return Err(EngineError::invalid_scheme(&name, format!("position {} vide", p + 1)));
            }
            if let Some(&d) = range.iter().find(|&&d| d > 9) {
                return Err(EngineError::invalid_scheme(&name, format!("chiffre {} hors limites", d)));
            }
        }
        Ok(Self { name, ranges })
    }

    /// Plages triées et dédoublonnées, chiffres garantis dans 0..=9.
    pub fn ranges(&self) -> &[Vec<u8>; 3] {
        &self.ranges
    }

    /// Syntaxe : trois plages séparées par `x`, chaque plage étant une liste
    /// de chiffres ou d'intervalles séparés par des virgules (`0-2x2,7x7-9`).
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let parts: Vec<&str> = text.split(['x', 'X', '×']).map(str::trim).collect();
        if parts.len() != 3 {
            return Err(EngineError::invalid_scheme(&name, format!("3 plages attendues dans '{}'", text)));
        }
        let mut ranges: [Vec<u8>; 3] = Default::default();
        for (range, part) in ranges.iter_mut().zip(parts) {
            *range = parse_range(part).ok_or_else(|| {
                EngineError::invalid_scheme(&name, format!("plage illisible '{}'", part))
            })?;
        }
        Self::new(name, ranges)
    }

    pub fn contains(&self, digits: &[u8; 3]) -> bool {
        digits
            .iter()
            .zip(self.ranges.iter())
            .all(|(d, range)| range.contains(d))
    }

    /// Tous les triplets non décroissants (f ≤ s ≤ t) dans les plages.
    pub fn enumerate(&self) -> Vec<[u8; 3]> {
        let mut out = Vec::new();
        for &f in &self.ranges[0] {
            for &s in self.ranges[1].iter().filter(|&&s| s >= f) {
                for &t in self.ranges[2].iter().filter(|&&t| t >= s) {
                    out.push([f, s, t]);
                }
            }
        }
        out
    }
}

fn parse_range(part: &str) -> Option<Vec<u8>> {
    let part = part.trim_matches(|c| c == '[' || c == ']' || c == '{' || c == '}');
    let mut digits = Vec::new();
    for item in part.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            Some((lo, hi)) => {
                let lo: u8 = lo.trim().parse().ok()?;
                let hi: u8 = hi.trim().parse().ok()?;
                if lo > hi {
                    return None;
                }
                digits.extend(lo..=hi);
            }
            None => digits.push(item.parse().ok()?),
        }
    }
    Some(digits)
}

fn builtin(name: &str, ranges: [Vec<u8>; 3]) -> SlotScheme {
    SlotScheme { name: name.into(), ranges }
}

/// Les quatre schémas observés sur l'historique.
pub fn builtin_schemes() -> Vec<SlotScheme> {
    vec![
        builtin("A", [vec![0, 1, 2], vec![3, 4, 5, 6], vec![6]]),
        builtin("B", [vec![0, 1, 2], vec![2, 7], vec![7, 8, 9]]),
        builtin("C", [vec![3], vec![3, 4, 5, 6], vec![7, 8, 9]]),
        builtin("D", [vec![0, 1, 2], vec![3, 4, 5, 6], vec![7, 8, 9]]),
    ]
}

/// Premier schéma intégré contenant les chiffres triés.
pub fn classify_scheme(digits: &[u8; 3]) -> Option<String> {
    builtin_schemes()
        .into_iter()
        .find(|s| s.contains(digits))
        .map(|s| s.name)
}

pub fn full_ranges() -> [Vec<u8>; 3] {
    let all: Vec<u8> = (0..=9).collect();
    [all.clone(), all.clone(), all]
}

pub fn is_strictly_ascending(t: &[u8; 3]) -> bool {
    t[0] < t[1] && t[1] < t[2]
}

pub fn is_strictly_descending(t: &[u8; 3]) -> bool {
    t[0] > t[1] && t[1] > t[2]
}

pub fn has_repeated_digit(t: &[u8; 3]) -> bool {
    t[0] == t[1] || t[1] == t[2] || t[0] == t[2]
}

/// Triplet ordonné « mélangé » : ni strictement monotone, sans doublon.
pub fn is_mixed_order(t: &[u8; 3]) -> bool {
    !is_strictly_ascending(t) && !is_strictly_descending(t) && !has_repeated_digit(t)
}

/// Un chiffre par plage, puis mélange des positions. Plages non vides.
fn sample_triple(ranges: &[Vec<u8>; 3], rng: &mut impl Rng) -> [u8; 3] {
    let mut triple = [0u8; 3];
    for (slot, range) in triple.iter_mut().zip(ranges.iter()) {
        *slot = range[rng.random_range(0..range.len())];
    }
    triple.shuffle(rng);
    triple
}

/// `count` triplets mélangés distincts acceptés par `accept`.
/// Chaque tentative consomme une unité du budget `max_attempts`.
pub fn generate_unique<F>(
    count: usize,
    ranges: &[Vec<u8>; 3],
    rng: &mut impl Rng,
    max_attempts: usize,
    accept: F,
) -> Result<Vec<[u8; 3]>>
where
    F: Fn(&[u8; 3]) -> bool,
{
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(count);
    let mut attempts = 0usize;
    // Plage vide : aucun tirage possible, aucune tentative consommée.
    let budget = if ranges.iter().any(Vec::is_empty) { 0 } else { max_attempts };

    while out.len() < count && attempts < budget {
        attempts += 1;
        let triple = sample_triple(ranges, rng);
        if !is_mixed_order(&triple) || !accept(&triple) {
            continue;
        }
        if seen.insert(triple) {
            out.push(triple);
        }
    }

    if out.len() < count {
        return Err(EngineError::GenerationExhausted {
            attempts,
            produced: out.len(),
            wanted: count,
        });
    }
    Ok(out)
}
