use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use pick3_db::models::{Draw, Position};

/// Nombre de mouvements historiques conservés au-delà du mouvement courant.
pub const HISTORY_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Movement {
    Up,
    Down,
    Equal,
}

impl Movement {
    pub const ALL: [Movement; 3] = [Movement::Up, Movement::Down, Movement::Equal];

    pub fn index(&self) -> usize {
        match self {
            Movement::Up => 0,
            Movement::Down => 1,
            Movement::Equal => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Movement::Up => "Up",
            Movement::Down => "Down",
            Movement::Equal => "Equal",
        }
    }

    pub fn between(current: u8, previous: u8) -> Self {
        match current.cmp(&previous) {
            Ordering::Greater => Movement::Up,
            Ordering::Less => Movement::Down,
            Ordering::Equal => Movement::Equal,
        }
    }
}

impl std::fmt::Display for Movement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

pub fn movement(current: Option<u8>, previous: Option<u8>) -> Option<Movement> {
    match (current, previous) {
        (Some(c), Some(p)) => Some(Movement::between(c, p)),
        _ => None,
    }
}

/// Mouvement de `draws[i]` par rapport au tirage qui le précède (`draws[i + 1]`).
/// `draws[0]` = tirage le plus récent.
pub fn movement_at(draws: &[Draw], i: usize, position: Position) -> Option<Movement> {
    let p = position.index();
    movement(
        draws.get(i).map(|d| d.digits[p]),
        draws.get(i + 1).map(|d| d.digits[p]),
    )
}

/// Série chronologique (plus ancien en premier) des mouvements d'une position.
pub fn movement_series(draws: &[Draw], position: Position) -> Vec<Movement> {
    let p = position.index();
    draws
        .windows(2)
        .rev()
        .map(|w| Movement::between(w[0].digits[p], w[1].digits[p]))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementHistory {
    pub current: Option<Movement>,
    /// previous[0] = mouvement du tirage précédent, etc.
    pub previous: Vec<Option<Movement>>,
}

pub fn history_at(draws: &[Draw], i: usize, position: Position) -> MovementHistory {
    let previous = (1..=HISTORY_DEPTH)
        .take_while(|k| i + k < draws.len())
        .map(|k| movement_at(draws, i + k, position))
        .collect();
    MovementHistory {
        current: movement_at(draws, i, position),
        previous,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawMovements {
    pub first: MovementHistory,
    pub second: MovementHistory,
    pub third: MovementHistory,
}

impl DrawMovements {
    pub fn for_position(&self, position: Position) -> &MovementHistory {
        match position {
            Position::First => &self.first,
            Position::Second => &self.second,
            Position::Third => &self.third,
        }
    }
}

pub fn annotate(draws: &[Draw]) -> Vec<DrawMovements> {
    (0..draws.len())
        .map(|i| DrawMovements {
            first: history_at(draws, i, Position::First),
            second: history_at(draws, i, Position::Second),
            third: history_at(draws, i, Position::Third),
        })
        .collect()
}

/// Mouvements qu'une combinaison produirait par rapport au dernier tirage.
pub fn candidate_movements(candidate: &[u8; 3], latest: Option<&Draw>) -> [Option<Movement>; 3] {
    let mut out = [None; 3];
    for (p, slot) in out.iter_mut().enumerate() {
        *slot = movement(Some(candidate[p]), latest.map(|d| d.digits[p]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pick3_db::models::DrawTime;

    fn draws(digits: &[[u8; 3]]) -> Vec<Draw> {
        digits
            .iter()
            .enumerate()
            .map(|(i, d)| Draw::new(format!("2024-01-{:02}", 28 - i), DrawTime::Midday, *d))
            .collect()
    }

    #[test]
    fn test_movement_law() {
        for current in 0..=9u8 {
            for previous in 0..=9u8 {
                let m = movement(Some(current), Some(previous)).unwrap();
                assert_eq!(m == Movement::Up, current > previous);
                assert_eq!(m == Movement::Down, current < previous);
                assert_eq!(m == Movement::Equal, current == previous);
            }
        }
    }

    #[test]
    fn test_movement_missing_side() {
        assert_eq!(movement(None, Some(3)), None);
        assert_eq!(movement(Some(3), None), None);
        assert_eq!(movement(None, None), None);
    }

    #[test]
    fn test_movement_at_is_positional() {
        let d = draws(&[[0, 3, 7], [1, 4, 8]]);
        assert_eq!(movement_at(&d, 0, Position::First), Some(Movement::Down));
        assert_eq!(movement_at(&d, 0, Position::Second), Some(Movement::Down));
        assert_eq!(movement_at(&d, 0, Position::Third), Some(Movement::Down));
        assert_eq!(movement_at(&d, 1, Position::First), None);
    }

    #[test]
    fn test_movement_series_chronological() {
        // Plus récent en premier : 5 <- 2 <- 2 <- 4
        let d = draws(&[[5, 6, 7], [2, 6, 7], [2, 6, 7], [4, 6, 7]]);
        let series = movement_series(&d, Position::First);
        assert_eq!(series, vec![Movement::Down, Movement::Equal, Movement::Up]);
    }

    #[test]
    fn test_history_depth_capped() {
        let d: Vec<Draw> = draws(&vec![[1, 2, 3]; 15]);
        let h = history_at(&d, 0, Position::First);
        assert_eq!(h.current, Some(Movement::Equal));
        assert_eq!(h.previous.len(), HISTORY_DEPTH);
        assert_eq!(*h.previous.last().unwrap(), Some(Movement::Equal));
    }

    #[test]
    fn test_history_short_series() {
        let d = draws(&[[1, 2, 3], [0, 2, 3], [0, 2, 3]]);
        let h = history_at(&d, 0, Position::First);
        assert_eq!(h.current, Some(Movement::Up));
        assert_eq!(h.previous, vec![Some(Movement::Equal), None]);
    }

    #[test]
    fn test_annotate_len() {
        let d = draws(&[[1, 2, 3], [0, 2, 3], [0, 2, 3]]);
        let annotated = annotate(&d);
        assert_eq!(annotated.len(), 3);
        assert_eq!(annotated[2].for_position(Position::Second).current, None);
    }

    #[test]
    fn test_candidate_movements() {
        let d = draws(&[[2, 5, 8]]);
        let moves = candidate_movements(&[1, 5, 9], d.first());
        assert_eq!(moves, [Some(Movement::Down), Some(Movement::Equal), Some(Movement::Up)]);
        assert_eq!(candidate_movements(&[1, 5, 9], None), [None, None, None]);
    }
}
