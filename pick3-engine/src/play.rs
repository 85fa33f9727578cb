use std::collections::HashSet;

use chrono::Datelike;
use rand::Rng;

use pick3_db::models::Draw;

use crate::combination::Combination;
use crate::config::FilterPolicy;
use crate::error::{EngineError, Result};
use crate::filter::{ExclusionSet, ValidityFilter};
use crate::generator::{builtin_schemes, classify_scheme, generate_unique, SlotScheme};
use crate::predictor::Predictor;
use crate::selector::select_disjoint;
use crate::stats::transitions::TransitionTables;

/// Seed déterministe basé sur la date du jour (YYYYMMDD).
pub fn date_seed() -> u64 {
    let today = chrono::Local::now().date_naive();
    today.year() as u64 * 10_000 + today.month() as u64 * 100 + today.day() as u64
}

/// Un pool par schéma : triplets énumérés qui passent le filtre (vue triée).
pub fn candidate_pools(
    draws: &[Draw],
    exclusions: &ExclusionSet,
    policy: FilterPolicy,
    schemes: &[SlotScheme],
) -> Vec<Vec<Combination>> {
    let filter = ValidityFilter::new(exclusions, draws, policy);
    let latest = draws.first();
    schemes
        .iter()
        .map(|scheme| {
            scheme
                .enumerate()
                .into_iter()
                .filter(|t| filter.passes(t))
                .map(|t| Combination::against(t, latest).with_scheme(&scheme.name))
                .collect()
        })
        .collect()
}

/// Grilles jouables : une combinaison par schéma, sans chiffre répété à une
/// même position. `draws[0]` = tirage le plus récent.
pub fn play_numbers(
    draws: &[Draw],
    exclusions: &ExclusionSet,
    policy: FilterPolicy,
    schemes: &[SlotScheme],
    rng: &mut impl Rng,
) -> Result<Vec<Combination>> {
    if draws.is_empty() {
        return Err(EngineError::no_data("l'historique"));
    }
    let pools = candidate_pools(draws, exclusions, policy, schemes);
    select_disjoint(&pools, rng)
}

/// `count` triplets mélangés distincts, comparés aux tirages dans leur ordre
/// de sortie.
pub fn play_numbers_unordered(
    count: usize,
    draws: &[Draw],
    exclusions: &ExclusionSet,
    policy: FilterPolicy,
    ranges: &[Vec<u8>; 3],
    rng: &mut impl Rng,
) -> Result<Vec<Combination>> {
    if draws.is_empty() {
        return Err(EngineError::no_data("l'historique"));
    }
    let filter = ValidityFilter::new(exclusions, draws, policy).ordered();
    let triples = generate_unique(count, ranges, rng, policy.max_attempts, |t| filter.passes(t))?;
    let latest = draws.first();
    Ok(triples
        .into_iter()
        .map(|t| {
            let mut c = Combination::against(t, latest);
            c.scheme = classify_scheme(&sorted(t));
            c
        })
        .collect())
}

/// Classement des candidats des schémas intégrés qui passent le filtre.
pub fn predict(
    draws: &[Draw],
    exclusions: &ExclusionSet,
    policy: FilterPolicy,
    tables: &TransitionTables,
    top: usize,
) -> Result<Vec<Combination>> {
    let predictor = Predictor::new(draws, tables)?;
    let mut seen = HashSet::new();
    let candidates: Vec<Combination> = candidate_pools(draws, exclusions, policy, &builtin_schemes())
        .into_iter()
        .flatten()
        .filter(|c| seen.insert(c.digits))
        .collect();
    let mut ranked = predictor.rank(candidates);
    ranked.truncate(top);
    Ok(ranked)
}

fn sorted(mut digits: [u8; 3]) -> [u8; 3] {
    digits.sort();
    digits
}

/// Annotations calculées pour un tirage historique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub range_analysis: Option<String>,
    pub pass_condition: bool,
}

/// Vrai si `draws[i]` aurait passé le filtre face aux tirages qui le précèdent.
pub fn pass_condition(draws: &[Draw], i: usize, policy: FilterPolicy) -> bool {
    let Some(draw) = draws.get(i) else {
        return false;
    };
    let exclusions = ExclusionSet::default();
    ValidityFilter::new(&exclusions, &draws[i + 1..], policy).passes(&draw.digits)
}

pub fn annotate_draw(draws: &[Draw], i: usize, policy: FilterPolicy) -> Option<Annotation> {
    let draw = draws.get(i)?;
    Some(Annotation {
        range_analysis: classify_scheme(&draw.digits),
        pass_condition: pass_condition(draws, i, policy),
    })
}
