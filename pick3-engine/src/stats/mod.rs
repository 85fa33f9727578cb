pub mod outcomes;
pub mod transitions;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use pick3_db::models::{Draw, Position};

use crate::error::{EngineError, Result};
use crate::movement::{movement_series, Movement};
use crate::permutation::{classify, PermutationKind};
use self::transitions::{build_position_transitions, PositionTransitions};

/// `count/total*100` à 2 décimales ; `"0%"` si le total est nul.
pub fn format_percentage(count: u32, total: u32) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", count as f64 / total as f64 * 100.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub count: u32,
    pub percentage: String,
}

impl FrequencyEntry {
    pub fn new(count: u32, total: u32) -> Self {
        Self {
            count,
            percentage: format_percentage(count, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MostCommon<K> {
    pub value: K,
    pub count: u32,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTable<K: Ord> {
    pub total: u32,
    pub entries: BTreeMap<K, FrequencyEntry>,
}

impl<K: Ord + Clone> FrequencyTable<K> {
    pub fn from_counts(counts: BTreeMap<K, u32>) -> Self {
        let total = counts.values().sum();
        let entries = counts
            .into_iter()
            .map(|(k, count)| (k, FrequencyEntry::new(count, total)))
            .collect();
        Self { total, entries }
    }

    pub fn count(&self, key: &K) -> u32 {
        self.entries.get(key).map(|e| e.count).unwrap_or(0)
    }

    /// Part de `key` en pourcentage (0 si le total est nul).
    pub fn share(&self, key: &K) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(key) as f64 / self.total as f64 * 100.0
    }

    /// Les `n` entrées les plus fréquentes (à égalité, ordre des clés), hors comptes nuls.
    pub fn most_common(&self, n: usize) -> Vec<MostCommon<K>> {
        let mut ranked: Vec<(&K, &FrequencyEntry)> =
            self.entries.iter().filter(|(_, e)| e.count > 0).collect();
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(n)
            .map(|(k, e)| MostCommon {
                value: k.clone(),
                count: e.count,
                percentage: e.percentage.clone(),
            })
            .collect()
    }
}

pub fn position_frequency(draws: &[Draw], position: Position) -> FrequencyTable<u8> {
    let mut counts: BTreeMap<u8, u32> = (0..=9).map(|d| (d, 0)).collect();
    for draw in draws {
        *counts.entry(draw.digits[position.index()]).or_insert(0) += 1;
    }
    FrequencyTable::from_counts(counts)
}

pub fn leading_digit_frequency(draws: &[Draw]) -> FrequencyTable<u8> {
    position_frequency(draws, Position::First)
}

/// Up / Down : `Infinity` si aucun Down mais au moins un Up, 0 si les deux sont nuls.
pub fn up_down_ratio(up: u32, down: u32) -> f64 {
    match (up, down) {
        (0, 0) => 0.0,
        (_, 0) => f64::INFINITY,
        (u, d) => u as f64 / d as f64,
    }
}

fn serialize_ratio<S: Serializer>(ratio: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if ratio.is_infinite() {
        serializer.serialize_str("Infinity")
    } else {
        serializer.serialize_f64((ratio * 100.0).round() / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementBalance {
    pub up: u32,
    pub down: u32,
    pub equal: u32,
    #[serde(serialize_with = "serialize_ratio")]
    pub up_down_ratio: f64,
}

impl MovementBalance {
    pub fn from_series(series: &[Movement]) -> Self {
        let count = |m: Movement| series.iter().filter(|&&x| x == m).count() as u32;
        let (up, down, equal) = (count(Movement::Up), count(Movement::Down), count(Movement::Equal));
        Self {
            up,
            down,
            equal,
            up_down_ratio: up_down_ratio(up, down),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionStatistics {
    pub frequency: FrequencyTable<u8>,
    pub balance: MovementBalance,
    pub transitions: PositionTransitions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub draws: usize,
    pub leading_digit: FrequencyTable<u8>,
    pub first: PositionStatistics,
    pub second: PositionStatistics,
    pub third: PositionStatistics,
    pub permutation_kinds: FrequencyTable<String>,
    pub permutation_patterns: FrequencyTable<String>,
    /// Tirages annotés ayant passé le filtre, sur l'ensemble des tirages annotés.
    pub pass_rate: FrequencyEntry,
}

impl StatisticsReport {
    pub fn position(&self, position: Position) -> &PositionStatistics {
        match position {
            Position::First => &self.first,
            Position::Second => &self.second,
            Position::Third => &self.third,
        }
    }
}

fn position_statistics(draws: &[Draw], position: Position) -> PositionStatistics {
    PositionStatistics {
        frequency: position_frequency(draws, position),
        balance: MovementBalance::from_series(&movement_series(draws, position)),
        transitions: build_position_transitions(draws, position),
    }
}

/// Agrège les statistiques descriptives d'une fenêtre (`draws[0]` = plus récent).
/// Déterministe : deux appels sur la même entrée donnent le même rapport.
pub fn aggregate(draws: &[Draw]) -> StatisticsReport {
    let mut kinds: BTreeMap<String, u32> = [PermutationKind::Single, PermutationKind::Double, PermutationKind::Triple]
        .iter()
        .map(|k| (k.to_string(), 0))
        .collect();
    let mut patterns: BTreeMap<String, u32> = BTreeMap::new();
    for draw in draws {
        let class = classify(&draw.original);
        *kinds.entry(class.kind.to_string()).or_insert(0) += 1;
        *patterns.entry(class.pattern).or_insert(0) += 1;
    }

    let annotated = draws.iter().filter(|d| d.pass_condition.is_some()).count() as u32;
    let passed = draws.iter().filter(|d| d.pass_condition == Some(true)).count() as u32;

    StatisticsReport {
        draws: draws.len(),
        leading_digit: leading_digit_frequency(draws),
        first: position_statistics(draws, Position::First),
        second: position_statistics(draws, Position::Second),
        third: position_statistics(draws, Position::Third),
        permutation_kinds: FrequencyTable::from_counts(kinds),
        permutation_patterns: FrequencyTable::from_counts(patterns),
        pass_rate: FrequencyEntry::new(passed, annotated),
    }
}

/// Comme [`aggregate`], mais une période sans tirage est une erreur.
pub fn aggregate_period(draws: &[Draw], period: &str) -> Result<StatisticsReport> {
    if draws.is_empty() {
        return Err(EngineError::no_data(period));
    }
    Ok(aggregate(draws))
}
