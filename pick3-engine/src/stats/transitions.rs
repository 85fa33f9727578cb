use std::collections::BTreeMap;
use std::path::Path;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use pick3_db::models::{Draw, Position};

use super::outcomes::{digit_movement_outcomes, OutcomeTable};
use super::{FrequencyTable, MostCommon};
use crate::error::{EngineError, Result};
use crate::movement::{movement_series, Movement};

/// Distribution du mouvement suivant pour un état donné.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRow {
    pub distribution: FrequencyTable<String>,
    pub most_common: Vec<MostCommon<String>>,
}

impl TransitionRow {
    fn from_counts(counts: ArrayView1<'_, u32>) -> Self {
        let by_label: BTreeMap<String, u32> = Movement::ALL
            .iter()
            .map(|m| (m.label().to_string(), counts[m.index()]))
            .collect();
        let distribution = FrequencyTable::from_counts(by_label);
        let most_common = distribution.most_common(3);
        Self {
            distribution,
            most_common,
        }
    }

    pub fn total(&self) -> u32 {
        self.distribution.total
    }

    pub fn share(&self, next: Movement) -> f64 {
        self.distribution.share(&next.label().to_string())
    }
}

/// Table de transitions d'ordre 1 (clé `Up`) ou 2 (clé `DownUp` : mouvement
/// en t−2 puis en t−1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTable {
    pub order: usize,
    pub rows: BTreeMap<String, TransitionRow>,
}

impl TransitionTable {
    pub fn row(&self, key: &str) -> Option<&TransitionRow> {
        self.rows.get(key)
    }
}

pub fn pair_label(older: Movement, newer: Movement) -> String {
    format!("{}{}", older.label(), newer.label())
}

/// Transitions d'ordre 1 sur une série chronologique (plus ancien en premier).
pub fn first_order(series: &[Movement]) -> TransitionTable {
    let mut counts = Array2::<u32>::zeros((3, 3));
    for w in series.windows(2) {
        counts[[w[0].index(), w[1].index()]] += 1;
    }
    let rows = Movement::ALL
        .iter()
        .map(|m| (m.label().to_string(), TransitionRow::from_counts(counts.row(m.index()))))
        .collect();
    TransitionTable { order: 1, rows }
}

/// Transitions d'ordre 2 : paire (t−2, t−1) → mouvement en t.
pub fn second_order(series: &[Movement]) -> TransitionTable {
    let mut counts = Array2::<u32>::zeros((9, 3));
    for w in series.windows(3) {
        counts[[w[0].index() * 3 + w[1].index(), w[2].index()]] += 1;
    }
    let mut rows = BTreeMap::new();
    for older in Movement::ALL {
        for newer in Movement::ALL {
            let state = older.index() * 3 + newer.index();
            rows.insert(pair_label(older, newer), TransitionRow::from_counts(counts.row(state)));
        }
    }
    TransitionTable { order: 2, rows }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionTransitions {
    pub first_order: TransitionTable,
    pub second_order: TransitionTable,
    pub outcomes: OutcomeTable,
}

pub fn build_position_transitions(draws: &[Draw], position: Position) -> PositionTransitions {
    let series = movement_series(draws, position);
    PositionTransitions {
        first_order: first_order(&series),
        second_order: second_order(&series),
        outcomes: digit_movement_outcomes(draws, position),
    }
}

/// Tables de référence utilisées par le prédicteur, sauvegardées en JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTables {
    pub window: usize,
    pub first: PositionTransitions,
    pub second: PositionTransitions,
    pub third: PositionTransitions,
}

impl TransitionTables {
    pub fn build(draws: &[Draw]) -> Self {
        Self {
            window: draws.len(),
            first: build_position_transitions(draws, Position::First),
            second: build_position_transitions(draws, Position::Second),
            third: build_position_transitions(draws, Position::Third),
        }
    }

    pub fn position(&self, position: Position) -> &PositionTransitions {
        match position {
            Position::First => &self.first,
            Position::Second => &self.second,
            Position::Third => &self.third,
        }
    }
}

pub fn save_tables(tables: &TransitionTables, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(tables)?;
    std::fs::write(path, json).map_err(|e| EngineError::io(path, e))?;
    Ok(())
}

pub fn load_tables(path: &Path) -> Result<TransitionTables> {
    let json = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    let tables: TransitionTables = serde_json::from_str(&json)?;
    Ok(tables)
}
