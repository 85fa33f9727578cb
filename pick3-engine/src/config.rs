use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Fenêtres de recul des règles de similarité et plafond de tentatives.
///
/// Chaque fenêtre compte des tirages, le plus récent en premier ; 0 désactive
/// la règle. Les valeurs diffèrent selon le point d'appel (voir les préréglages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPolicy {
    pub exact_triple_window: usize,
    pub first_second_window: usize,
    pub second_third_window: usize,
    pub leading_digit_window: usize,
    /// Tirages de référence pour les paires croisées (dernier + précédents).
    pub cross_check_depth: usize,
    pub max_attempts: usize,
}

impl FilterPolicy {
    /// Génération des grilles jouables.
    pub fn play() -> Self {
        Self {
            exact_triple_window: 20,
            first_second_window: 15,
            second_third_window: 10,
            leading_digit_window: 1,
            cross_check_depth: 4,
            max_attempts: 1_000,
        }
    }

    /// Vérification d'une grille proposée par l'utilisateur.
    pub fn check() -> Self {
        Self {
            exact_triple_window: 60,
            first_second_window: 60,
            second_third_window: 12,
            leading_digit_window: 2,
            cross_check_depth: 4,
            max_attempts: 1_000,
        }
    }

    /// Analyse rétrospective (condition de passage des tirages historiques).
    pub fn analyze() -> Self {
        Self {
            exact_triple_window: 20,
            first_second_window: 15,
            second_third_window: 12,
            leading_digit_window: 2,
            cross_check_depth: 4,
            max_attempts: 1_000,
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "play" => Some(Self::play()),
            "check" => Some(Self::check()),
            "analyze" => Some(Self::analyze()),
            _ => None,
        }
    }

    /// Profondeur d'historique nécessaire pour évaluer toutes les règles.
    pub fn lookback(&self) -> usize {
        [
            self.exact_triple_window,
            self.first_second_window,
            self.second_third_window,
            self.leading_digit_window,
            self.cross_check_depth,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::play()
    }
}

pub fn save_policy(policy: &FilterPolicy, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(policy)?;
    std::fs::write(path, json).map_err(|e| EngineError::io(path, e))?;
    Ok(())
}

pub fn load_policy(path: &Path) -> Result<FilterPolicy> {
    let json = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    let policy: FilterPolicy = serde_json::from_str(&json)?;
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_play() {
        assert_eq!(FilterPolicy::default(), FilterPolicy::play());
    }

    #[test]
    fn test_presets_keep_call_site_windows() {
        let play = FilterPolicy::play();
        let check = FilterPolicy::check();
        assert_eq!(play.exact_triple_window, 20);
        assert_eq!(check.exact_triple_window, 60);
        assert_eq!(play.second_third_window, 10);
        assert_eq!(FilterPolicy::analyze().second_third_window, 12);
        assert!(FilterPolicy::preset("unknown").is_none());
    }

    #[test]
    fn test_lookback() {
        assert_eq!(FilterPolicy::play().lookback(), 20);
        assert_eq!(FilterPolicy::check().lookback(), 60);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let policy: FilterPolicy = serde_json::from_str(r#"{"exact_triple_window": 5}"#).unwrap();
        assert_eq!(policy.exact_triple_window, 5);
        assert_eq!(policy.first_second_window, FilterPolicy::play().first_second_window);
    }

    #[test]
    fn test_policy_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        save_policy(&FilterPolicy::check(), &path).unwrap();
        assert_eq!(load_policy(&path).unwrap(), FilterPolicy::check());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load_policy(Path::new("/nonexistent/policy.json")).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
