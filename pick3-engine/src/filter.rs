use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use pick3_db::models::{DigitView, Draw, Position};

use crate::config::FilterPolicy;
use crate::generator::{has_repeated_digit, is_strictly_ascending, is_strictly_descending};

/// Chiffres à exclure, par position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionSet {
    #[serde(default, deserialize_with = "lenient_digits")]
    pub first: Vec<u8>,
    #[serde(default, deserialize_with = "lenient_digits")]
    pub second: Vec<u8>,
    #[serde(default, deserialize_with = "lenient_digits")]
    pub third: Vec<u8>,
}

impl ExclusionSet {
    pub fn new(first: Vec<u8>, second: Vec<u8>, third: Vec<u8>) -> Self {
        Self {
            first: normalize(first),
            second: normalize(second),
            third: normalize(third),
        }
    }

    /// Lecture tolérante : un champ absent ou qui n'est pas un tableau devient
    /// une liste vide ; les chiffres peuvent être des nombres ou des chaînes.
    pub fn from_json(value: &Value) -> Self {
        let field = |name: &str| value.get(name).map(digits_from_value).unwrap_or_default();
        Self {
            first: field("first"),
            second: field("second"),
            third: field("third"),
        }
    }

    pub fn for_position(&self, position: Position) -> &[u8] {
        match position {
            Position::First => &self.first,
            Position::Second => &self.second,
            Position::Third => &self.third,
        }
    }

    pub fn excludes(&self, position: Position, digit: u8) -> bool {
        self.for_position(position).contains(&digit)
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.second.is_empty() && self.third.is_empty()
    }
}

fn normalize(mut digits: Vec<u8>) -> Vec<u8> {
    digits.retain(|&d| d <= 9);
    digits.sort();
    digits.dedup();
    digits
}

fn digits_from_value(value: &Value) -> Vec<u8> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    let digits = items
        .iter()
        .filter_map(|item| match item {
            Value::Number(n) => n.as_u64().and_then(|d| u8::try_from(d).ok()),
            Value::String(s) => s.trim().parse::<u8>().ok(),
            _ => None,
        })
        .collect();
    normalize(digits)
}

fn lenient_digits<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(digits_from_value(&value))
}

/// Raison du rejet d'une combinaison. `draws_ago` : 0 = dernier tirage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Rejection {
    Excluded { position: Position, digit: u8 },
    RecentTriple { draws_ago: usize },
    RecentFirstSecond { draws_ago: usize },
    RecentSecondThird { draws_ago: usize },
    RecentLeadingDigit { draws_ago: usize },
    CrossPair { draws_ago: usize, positions: (usize, usize) },
    Monotonic,
    RepeatedDigit,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Excluded { position, digit } => {
                write!(f, "chiffre {} exclu en position {}", digit, position.label())
            }
            Rejection::RecentTriple { draws_ago } => {
                write!(f, "triplet sorti il y a {} tirage(s)", draws_ago + 1)
            }
            Rejection::RecentFirstSecond { draws_ago } => {
                write!(f, "paire 1-2 sortie il y a {} tirage(s)", draws_ago + 1)
            }
            Rejection::RecentSecondThird { draws_ago } => {
                write!(f, "paire 2-3 sortie il y a {} tirage(s)", draws_ago + 1)
            }
            Rejection::RecentLeadingDigit { draws_ago } => {
                write!(f, "premier chiffre sorti il y a {} tirage(s)", draws_ago + 1)
            }
            Rejection::CrossPair { draws_ago, positions } => write!(
                f,
                "positions {}-{} identiques au tirage d'il y a {} tirage(s)",
                positions.0 + 1,
                positions.1 + 1,
                draws_ago + 1
            ),
            Rejection::Monotonic => write!(f, "ordre strictement monotone"),
            Rejection::RepeatedDigit => write!(f, "chiffre répété"),
        }
    }
}

const POSITION_PAIRS: [(usize, usize); 3] = [(0, 1), (0, 2), (1, 2)];

/// Filtre de validité, pur : ne dépend que de ses entrées.
/// `recent[0]` = tirage le plus récent.
pub struct ValidityFilter<'a> {
    exclusions: &'a ExclusionSet,
    recent: &'a [Draw],
    policy: FilterPolicy,
    view: DigitView,
    mixed_order: bool,
}

impl<'a> ValidityFilter<'a> {
    pub fn new(exclusions: &'a ExclusionSet, recent: &'a [Draw], policy: FilterPolicy) -> Self {
        Self {
            exclusions,
            recent,
            policy,
            view: DigitView::Sorted,
            mixed_order: false,
        }
    }

    /// Mode ordonné : compare aux chiffres dans l'ordre de sortie et exige un
    /// triplet mélangé.
    pub fn ordered(mut self) -> Self {
        self.view = DigitView::Original;
        self.mixed_order = true;
        self
    }

    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    pub fn passes(&self, candidate: &[u8; 3]) -> bool {
        self.first_rejection(candidate).is_none()
    }

    pub fn first_rejection(&self, candidate: &[u8; 3]) -> Option<Rejection> {
        self.rejections(candidate).into_iter().next()
    }

    /// Toutes les règles qui rejettent `candidate`, dans l'ordre d'évaluation.
    pub fn rejections(&self, c: &[u8; 3]) -> Vec<Rejection> {
        let mut out = Vec::new();

        for position in Position::ALL {
            let digit = c[position.index()];
            if self.exclusions.excludes(position, digit) {
                out.push(Rejection::Excluded { position, digit });
            }
        }

        if let Some(draws_ago) = self.find_recent(self.policy.exact_triple_window, |r| r == c) {
            out.push(Rejection::RecentTriple { draws_ago });
        }
        if let Some(draws_ago) =
            self.find_recent(self.policy.first_second_window, |r| r[0] == c[0] && r[1] == c[1])
        {
            out.push(Rejection::RecentFirstSecond { draws_ago });
        }
        if let Some(draws_ago) =
            self.find_recent(self.policy.second_third_window, |r| r[1] == c[1] && r[2] == c[2])
        {
            out.push(Rejection::RecentSecondThird { draws_ago });
        }
        if let Some(draws_ago) = self.find_recent(self.policy.leading_digit_window, |r| r[0] == c[0]) {
            out.push(Rejection::RecentLeadingDigit { draws_ago });
        }

        let depth = self.policy.cross_check_depth.min(self.recent.len());
        for (draws_ago, draw) in self.recent[..depth].iter().enumerate() {
            let r = self.view.digits_from(draw);
            for &(i, j) in &POSITION_PAIRS {
                if c[i] == r[i] && c[j] == r[j] {
                    out.push(Rejection::CrossPair { draws_ago, positions: (i, j) });
                }
            }
        }

        if self.mixed_order {
            if is_strictly_ascending(c) || is_strictly_descending(c) {
                out.push(Rejection::Monotonic);
            }
            if has_repeated_digit(c) {
                out.push(Rejection::RepeatedDigit);
            }
        }

        out
    }

    fn find_recent<F>(&self, window: usize, matches: F) -> Option<usize>
    where
        F: Fn(&[u8; 3]) -> bool,
    {
        let window = window.min(self.recent.len());
        self.recent[..window]
            .iter()
            .position(|d| matches(self.view.digits_from(d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pick3_db::models::DrawTime;
    use serde_json::json;

    fn draws(digits: &[[u8; 3]]) -> Vec<Draw> {
        digits
            .iter()
            .enumerate()
            .map(|(i, d)| Draw::new(format!("2024-02-{:02}", 28 - i), DrawTime::Evening, *d))
            .collect()
    }

    fn no_similarity() -> FilterPolicy {
        FilterPolicy {
            exact_triple_window: 0,
            first_second_window: 0,
            second_third_window: 0,
            leading_digit_window: 0,
            cross_check_depth: 0,
            ..FilterPolicy::play()
        }
    }

    #[test]
    fn test_exclusion_leading_digits_rejected() {
        let exclusions = ExclusionSet::new(vec![0, 1, 2], vec![], vec![]);
        let history = draws(&[[5, 5, 5]]);
        let filter = ValidityFilter::new(&exclusions, &history, FilterPolicy::play());
        for a in 0..=9u8 {
            for b in 0..=9u8 {
                for c in 0..=9u8 {
                    let t = [a, b, c];
                    if a <= 2 {
                        assert!(!filter.passes(&t), "{:?} aurait dû être rejeté", t);
                        assert!(filter.rejections(&t).contains(&Rejection::Excluded {
                            position: Position::First,
                            digit: a,
                        }));
                    }
                }
            }
        }
    }

    #[test]
    fn test_exclusion_from_json_tolerant() {
        let set = ExclusionSet::from_json(&json!({
            "first": [0, "1", 2, 2, 12, null],
            "second": "3",
            "third": {"a": 1}
        }));
        assert_eq!(set.first, vec![0, 1, 2]);
        assert!(set.second.is_empty());
        assert!(set.third.is_empty());

        let missing = ExclusionSet::from_json(&json!({}));
        assert!(missing.is_empty());
    }

    #[test]
    fn test_exclusion_deserialize_tolerant() {
        let set: ExclusionSet =
            serde_json::from_str(r#"{"first": "oops", "second": ["4", 5], "third": [9]}"#).unwrap();
        assert!(set.first.is_empty());
        assert_eq!(set.second, vec![4, 5]);
        assert_eq!(set.third, vec![9]);
    }

    #[test]
    fn test_recent_triple_window() {
        let exclusions = ExclusionSet::default();
        let mut history = draws(&vec![[5, 6, 7]; 3]);
        history.push(Draw::new("2024-01-01", DrawTime::Midday, [1, 4, 8]));
        let policy = FilterPolicy { exact_triple_window: 4, ..no_similarity() };
        let filter = ValidityFilter::new(&exclusions, &history, policy);
        assert_eq!(filter.first_rejection(&[1, 4, 8]), Some(Rejection::RecentTriple { draws_ago: 3 }));

        let narrow = FilterPolicy { exact_triple_window: 3, ..no_similarity() };
        let filter = ValidityFilter::new(&exclusions, &history, narrow);
        assert!(filter.passes(&[1, 4, 8]));
    }

    #[test]
    fn test_pair_windows_are_independent() {
        let exclusions = ExclusionSet::default();
        let history = draws(&[[9, 9, 9], [9, 9, 9], [1, 4, 9]]);
        let policy = FilterPolicy {
            first_second_window: 3,
            second_third_window: 2,
            ..no_similarity()
        };
        let filter = ValidityFilter::new(&exclusions, &history, policy);
        assert_eq!(filter.rejections(&[1, 4, 7]), vec![Rejection::RecentFirstSecond { draws_ago: 2 }]);
        // Paire 2-3 identique, mais hors de sa fenêtre de 2 tirages
        assert!(filter.passes(&[0, 4, 9]));
    }

    #[test]
    fn test_leading_digit_window() {
        let exclusions = ExclusionSet::default();
        let history = draws(&[[3, 5, 8], [2, 5, 8]]);
        let policy = FilterPolicy { leading_digit_window: 1, ..no_similarity() };
        let filter = ValidityFilter::new(&exclusions, &history, policy);
        assert!(!filter.passes(&[3, 6, 9]));
        assert!(filter.passes(&[2, 6, 9]));
    }

    #[test]
    fn test_cross_pairs_against_reference_draws() {
        let exclusions = ExclusionSet::default();
        let history = draws(&[[1, 5, 9], [2, 4, 6], [0, 3, 7], [1, 2, 8], [0, 4, 8]]);
        let policy = FilterPolicy { cross_check_depth: 4, ..no_similarity() };
        let filter = ValidityFilter::new(&exclusions, &history, policy);

        // positions 0 et 2 du tirage d'il y a 3 tirages (index 2)
        assert_eq!(
            filter.rejections(&[0, 5, 7]),
            vec![Rejection::CrossPair { draws_ago: 2, positions: (0, 2) }]
        );
        // le 5e tirage est hors référence
        assert!(filter.passes(&[0, 6, 8]));
        // positions 1 et 2 du dernier tirage
        assert!(!filter.passes(&[3, 5, 9]));
    }

    #[test]
    fn test_ordered_mode_rejects_monotonic_and_repeats() {
        let exclusions = ExclusionSet::default();
        let history: Vec<Draw> = vec![];
        let filter = ValidityFilter::new(&exclusions, &history, no_similarity()).ordered();
        assert_eq!(filter.rejections(&[1, 2, 3]), vec![Rejection::Monotonic]);
        assert_eq!(filter.rejections(&[9, 5, 0]), vec![Rejection::Monotonic]);
        assert_eq!(filter.rejections(&[4, 1, 4]), vec![Rejection::RepeatedDigit]);
        assert!(filter.passes(&[4, 1, 7]));
    }

    #[test]
    fn test_ordered_mode_compares_original_order() {
        let exclusions = ExclusionSet::default();
        let history = vec![Draw::new("2024-02-01", DrawTime::Midday, [7, 1, 4])];
        let policy = FilterPolicy { exact_triple_window: 1, ..no_similarity() };

        let sorted = ValidityFilter::new(&exclusions, &history, policy);
        assert!(!sorted.passes(&[1, 4, 7]));
        assert!(sorted.passes(&[7, 1, 4]));

        let ordered = ValidityFilter::new(&exclusions, &history, policy).ordered();
        assert!(!ordered.passes(&[7, 1, 4]));
    }

    #[test]
    fn test_empty_history_only_structural_rules() {
        let exclusions = ExclusionSet::default();
        let history: Vec<Draw> = vec![];
        let filter = ValidityFilter::new(&exclusions, &history, FilterPolicy::check());
        assert!(filter.passes(&[0, 0, 0]));
    }
}
