//! Erreurs du moteur de génération et d'analyse.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Aucun tirage disponible pour {period}")]
    InsufficientData { period: String },

    #[error("Impossible de sélectionner {required} combinaisons disjointes parmi {pools} pools")]
    InsufficientCandidates { required: usize, pools: usize },

    #[error("Génération épuisée après {attempts} tentatives ({produced}/{wanted} tirages valides)")]
    GenerationExhausted {
        attempts: usize,
        produced: usize,
        wanted: usize,
    },

    #[error("Schéma de plages invalide '{name}' : {message}")]
    InvalidScheme { name: String, message: String },

    #[error("Erreur d'E/S sur {path} : {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON invalide : {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn no_data(period: impl Into<String>) -> Self {
        Self::InsufficientData {
            period: period.into(),
        }
    }

    pub fn invalid_scheme(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidScheme {
            name: name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
