use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawTime {
    Midday,
    Evening,
}

impl DrawTime {
    /// Rang de tri dans une même journée (midi avant soir).
    pub fn rank(&self) -> u8 {
        match self {
            DrawTime::Midday => 0,
            DrawTime::Evening => 1,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            0 => Some(DrawTime::Midday),
            1 => Some(DrawTime::Evening),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "midday" | "midi" | "mid" | "m" => Ok(DrawTime::Midday),
            "evening" | "soir" | "eve" | "e" | "s" => Ok(DrawTime::Evening),
            other => bail!("Moment de tirage inconnu : '{}'", other),
        }
    }
}

impl std::fmt::Display for DrawTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawTime::Midday => write!(f, "Midi"),
            DrawTime::Evening => write!(f, "Soir"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    First,
    Second,
    Third,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::First, Position::Second, Position::Third];

    pub fn index(&self) -> usize {
        match self {
            Position::First => 0,
            Position::Second => 1,
            Position::Third => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Position::First => "first",
            Position::Second => "second",
            Position::Third => "third",
        }
    }
}

/// Vue des chiffres d'un tirage : triés (analyses de mouvement, plages)
/// ou dans l'ordre de sortie (permutations, tirages ordonnés).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigitView {
    Sorted,
    Original,
}

impl DigitView {
    pub fn digits_from<'a>(&self, draw: &'a Draw) -> &'a [u8; 3] {
        match self {
            DigitView::Sorted => &draw.digits,
            DigitView::Original => &draw.original,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    pub date: String,
    pub time: DrawTime,
    /// Numéro séquentiel du tirage dans son mois (1 = premier tirage du mois).
    pub index: u32,
    /// Chiffres triés par ordre croissant.
    pub digits: [u8; 3],
    /// Chiffres dans l'ordre de sortie.
    pub original: [u8; 3],
    pub range_analysis: Option<String>,
    pub pass_condition: Option<bool>,
}

impl Draw {
    pub fn new(date: impl Into<String>, time: DrawTime, original: [u8; 3]) -> Self {
        let mut digits = original;
        digits.sort();
        Self {
            date: date.into(),
            time,
            index: 0,
            digits,
            original,
            range_analysis: None,
            pass_condition: None,
        }
    }

    pub fn first(&self) -> u8 {
        self.digits[0]
    }

    pub fn second(&self) -> u8 {
        self.digits[1]
    }

    pub fn third(&self) -> u8 {
        self.digits[2]
    }

    pub fn first_and_second(&self) -> String {
        format!("{}{}", self.digits[0], self.digits[1])
    }

    pub fn second_and_third(&self) -> String {
        format!("{}{}", self.digits[1], self.digits[2])
    }

    pub fn first_and_third(&self) -> String {
        format!("{}{}", self.digits[0], self.digits[2])
    }

    pub fn current_draw(&self) -> String {
        concat_digits(&self.digits)
    }

    pub fn original_draw(&self) -> String {
        concat_digits(&self.original)
    }

    pub fn sum(&self) -> u8 {
        self.digits.iter().sum()
    }

    /// Clé du mois (`YYYY-MM`).
    pub fn month(&self) -> &str {
        self.date.get(..7).unwrap_or(&self.date)
    }
}

pub fn concat_digits(digits: &[u8; 3]) -> String {
    digits.iter().map(|d| d.to_string()).collect()
}

pub fn validate_digits(digits: &[u8; 3]) -> Result<()> {
    for &d in digits {
        if d > 9 {
            bail!("Chiffre {} hors limites (0-9)", d);
        }
    }
    Ok(())
}

/// Accepte `037`, `0 3 7`, `0-3-7` ou `0,3,7`.
pub fn parse_digits(input: &str) -> Result<[u8; 3]> {
    let trimmed = input.trim();
    let parts: Vec<&str> = if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        (0..3).map(|i| &trimmed[i..i + 1]).collect()
    } else {
        trimmed
            .split(|c: char| c.is_whitespace() || c == '-' || c == ',')
            .filter(|s| !s.is_empty())
            .collect()
    };
    if parts.len() != 3 {
        bail!("Attendu 3 chiffres, reçu : '{}'", input);
    }
    let mut digits = [0u8; 3];
    for (slot, part) in digits.iter_mut().zip(parts) {
        *slot = part
            .parse::<u8>()
            .with_context(|| format!("Chiffre invalide : '{}'", part))?;
    }
    validate_digits(&digits)?;
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_digits_and_keeps_original() {
        let draw = Draw::new("2024-03-01", DrawTime::Evening, [7, 0, 3]);
        assert_eq!(draw.digits, [0, 3, 7]);
        assert_eq!(draw.original, [7, 0, 3]);
        assert_eq!(draw.current_draw(), "037");
        assert_eq!(draw.original_draw(), "703");
    }

    #[test]
    fn test_derived_fields() {
        let draw = Draw::new("2024-03-01", DrawTime::Midday, [4, 1, 8]);
        assert_eq!(draw.first_and_second(), "14");
        assert_eq!(draw.second_and_third(), "48");
        assert_eq!(draw.first_and_third(), "18");
        assert_eq!(draw.sum(), 13);
        assert_eq!(draw.month(), "2024-03");
    }

    #[test]
    fn test_validate_digits() {
        assert!(validate_digits(&[0, 5, 9]).is_ok());
        assert!(validate_digits(&[0, 10, 9]).is_err());
    }

    #[test]
    fn test_parse_digits_formats() {
        assert_eq!(parse_digits("037").unwrap(), [0, 3, 7]);
        assert_eq!(parse_digits("0 3 7").unwrap(), [0, 3, 7]);
        assert_eq!(parse_digits("9-1-1").unwrap(), [9, 1, 1]);
        assert_eq!(parse_digits(" 2,2,5 ").unwrap(), [2, 2, 5]);
    }

    #[test]
    fn test_parse_digits_rejects() {
        assert!(parse_digits("12").is_err());
        assert!(parse_digits("1 2 12").is_err());
        assert!(parse_digits("a b c").is_err());
    }

    #[test]
    fn test_draw_time_rank_roundtrip() {
        for time in [DrawTime::Midday, DrawTime::Evening] {
            assert_eq!(DrawTime::from_rank(time.rank()), Some(time));
        }
        assert_eq!(DrawTime::from_rank(2), None);
    }

    #[test]
    fn test_draw_time_parse() {
        assert_eq!(DrawTime::parse("Midday").unwrap(), DrawTime::Midday);
        assert_eq!(DrawTime::parse("soir").unwrap(), DrawTime::Evening);
        assert!(DrawTime::parse("nuit").is_err());
    }

    #[test]
    fn test_digit_view() {
        let draw = Draw::new("2024-03-01", DrawTime::Midday, [5, 2, 9]);
        assert_eq!(DigitView::Sorted.digits_from(&draw), &[2, 5, 9]);
        assert_eq!(DigitView::Original.digits_from(&draw), &[5, 2, 9]);
    }
}
