pub mod combination;
pub mod config;
pub mod error;
pub mod filter;
pub mod generator;
pub mod movement;
pub mod permutation;
pub mod play;
pub mod predictor;
pub mod selector;
pub mod stats;

use chrono::{Days, NaiveDate};

use pick3_db::models::{Draw, DrawTime};

pub use error::{EngineError, Result};

/// Historique synthétique déterministe pour les tests : `draws[0]` = plus
/// récent, deux tirages par jour en remontant depuis le 31/12/2024.
pub fn make_test_draws(n: usize) -> Vec<Draw> {
    let last_day = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default();
    (0..n)
        .map(|i| {
            let day = last_day
                .checked_sub_days(Days::new((i / 2) as u64))
                .unwrap_or(last_day);
            let time = if i % 2 == 0 { DrawTime::Evening } else { DrawTime::Midday };
            let k = (i % 10) as u8;
            let original = [(7 * k + 3) % 10, (3 * k + 1) % 10, (9 * k + 5) % 10];
            Draw::new(day.format("%Y-%m-%d").to_string(), time, original)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_test_draws_recency_order() {
        let draws = make_test_draws(5);
        assert_eq!(draws[0].date, "2024-12-31");
        assert_eq!(draws[0].time, DrawTime::Evening);
        assert_eq!(draws[1].date, "2024-12-31");
        assert_eq!(draws[1].time, DrawTime::Midday);
        assert_eq!(draws[2].date, "2024-12-30");
        assert_eq!(draws[0].original, [3, 1, 5]);
        assert_eq!(draws[0].digits, [1, 3, 5]);
    }
}
