use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermutationKind {
    /// Trois chiffres distincts.
    Single,
    /// Un chiffre répété deux fois.
    Double,
    /// Trois chiffres identiques.
    Triple,
}

impl std::fmt::Display for PermutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PermutationKind::Single => "Single",
            PermutationKind::Double => "Double",
            PermutationKind::Triple => "Triple",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationClass {
    pub kind: PermutationKind,
    /// Rang de chaque chiffre dans l'ordre de sortie : `L`/`M`/`H`, `E` si tous égaux.
    pub pattern: String,
}

pub fn permutation_kind(digits: &[u8; 3]) -> PermutationKind {
    let mut distinct = digits.to_vec();
    distinct.sort();
    distinct.dedup();
    match distinct.len() {
        3 => PermutationKind::Single,
        2 => PermutationKind::Double,
        _ => PermutationKind::Triple,
    }
}

/// Classe un tirage à partir de ses chiffres dans l'ordre de sortie.
pub fn classify(original: &[u8; 3]) -> PermutationClass {
    let kind = permutation_kind(original);
    let (lo, hi) = (
        original.iter().min().copied().unwrap_or(0),
        original.iter().max().copied().unwrap_or(0),
    );
    let pattern = original
        .iter()
        .map(|&d| match kind {
            PermutationKind::Triple => 'E',
            _ if d == lo => 'L',
            _ if d == hi => 'H',
            _ => 'M',
        })
        .collect();
    PermutationClass { kind, pattern }
}
