mod display;
mod import;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use pick3_db::db::{
    count_draws, db_path, fetch_last_draws, fetch_month_draws, migrate, open_db, update_annotations,
};
use pick3_db::models::{parse_digits, Draw, DrawTime};
use pick3_db::rusqlite::Connection;
use pick3_engine::config::{load_policy, save_policy, FilterPolicy};
use pick3_engine::filter::{ExclusionSet, ValidityFilter};
use pick3_engine::generator::{builtin_schemes, classify_scheme, full_ranges, SlotScheme};
use pick3_engine::permutation::classify;
use pick3_engine::play::{annotate_draw, date_seed, play_numbers, play_numbers_unordered, predict};
use pick3_engine::selector::MAX_SLOTS;
use pick3_engine::stats::transitions::{load_tables, save_tables, TransitionTables};
use pick3_engine::stats::{aggregate_period, StatisticsReport};

use crate::display::{
    display_combinations, display_draws, display_import_summary, display_rejections, display_stats,
    display_sum_chart, display_transitions,
};

#[derive(Parser)]
#[command(name = "pick3", about = "Statistiques et combinaisons pour le Pick-3")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Exclusions par position, en options ou depuis un fichier JSON
/// (`{"first": [0, 1], "second": [], "third": ["9"]}`).
#[derive(clap::Args, Debug, Default)]
struct ExclusionArgs {
    /// Chiffres exclus en 1re position (ex: 0,1,2)
    #[arg(long, value_delimiter = ',')]
    exclude_first: Vec<u8>,

    /// Chiffres exclus en 2e position
    #[arg(long, value_delimiter = ',')]
    exclude_second: Vec<u8>,

    /// Chiffres exclus en 3e position
    #[arg(long, value_delimiter = ',')]
    exclude_third: Vec<u8>,

    /// Fichier JSON d'exclusions
    #[arg(long)]
    exclusions: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Importer les tirages depuis un fichier CSV (date;moment;d1;d2;d3)
    Import {
        /// Chemin vers le fichier CSV
        #[arg(short, long, default_value = "data/pick3.csv")]
        file: PathBuf,
    },

    /// Ajouter un tirage (les champs absents sont demandés)
    Add {
        /// Date (JJ/MM/AAAA ou AAAA-MM-JJ)
        #[arg(long)]
        date: Option<String>,

        /// Moment du tirage (midi/soir)
        #[arg(long)]
        time: Option<String>,

        /// Chiffres dans l'ordre de sortie (ex: 703)
        #[arg(long)]
        digits: Option<String>,

        /// Insérer sans confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Lister les derniers tirages
    List {
        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Statistiques descriptives sur une fenêtre ou un mois
    Stats {
        /// Fenêtre d'analyse (nombre de tirages)
        #[arg(short, long, default_value = "100")]
        window: u32,

        /// Mois à analyser (AAAA-MM), prioritaire sur la fenêtre
        #[arg(short, long)]
        month: Option<String>,

        /// Graphique de la somme des chiffres
        #[arg(long)]
        chart: bool,

        /// Sortie JSON
        #[arg(long)]
        json: bool,
    },

    /// Calculer et sauvegarder les tables de transitions
    Transitions {
        /// Fenêtre d'analyse (nombre de tirages)
        #[arg(short, long, default_value = "200")]
        window: u32,

        /// Fichier de sortie
        #[arg(short, long, default_value = "transitions.json")]
        output: PathBuf,

        /// Sortie JSON
        #[arg(long)]
        json: bool,
    },

    /// Générer des combinaisons jouables
    Play {
        #[command(flatten)]
        exclusions: ExclusionArgs,

        /// Schéma supplémentaire NOM=PLAGES (ex: E=0-2x2,7x7-9), remplace les schémas intégrés
        #[arg(long)]
        scheme: Vec<String>,

        /// Mode ordonné : N triplets mélangés tirés au hasard
        #[arg(long)]
        unordered: Option<usize>,

        /// Politique de filtrage (JSON), défaut : préréglage `play`
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Seed pour la reproductibilité (défaut: date du jour YYYYMMDD)
        #[arg(long)]
        seed: Option<u64>,

        /// Sortie JSON
        #[arg(long)]
        json: bool,
    },

    /// Expliquer pourquoi une combinaison passe ou non le filtre
    Check {
        /// Combinaison (ex: 037, 0-3-7)
        digits: String,

        #[command(flatten)]
        exclusions: ExclusionArgs,

        /// Comparer dans l'ordre de sortie et exiger un triplet mélangé
        #[arg(long)]
        ordered: bool,

        /// Politique de filtrage (JSON), défaut : préréglage `check`
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Classer les candidats des schémas intégrés par score de transitions
    Predict {
        #[command(flatten)]
        exclusions: ExclusionArgs,

        /// Fichier de transitions (recalculé s'il est absent)
        #[arg(short, long, default_value = "transitions.json")]
        transitions: PathBuf,

        /// Fenêtre utilisée si les transitions doivent être recalculées
        #[arg(short, long, default_value = "200")]
        window: u32,

        /// Nombre de candidats affichés
        #[arg(long, default_value = "10")]
        top: usize,

        /// Politique de filtrage (JSON), défaut : préréglage `play`
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Sortie JSON
        #[arg(long)]
        json: bool,
    },

    /// Renseigner la plage et la condition de passage de chaque tirage
    Annotate {
        /// Politique de filtrage (JSON), défaut : préréglage `analyze`
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Exporter un préréglage de politique en JSON, à modifier puis passer via --policy
    Policy {
        /// Préréglage : play, check ou analyze
        #[arg(short, long, default_value = "play")]
        preset: String,

        /// Fichier de sortie
        #[arg(short, long, default_value = "policy.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { file } => cmd_import(&conn, &file),
        Command::Add { date, time, digits, yes } => cmd_add(&conn, date, time, digits, yes),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { last } => cmd_list(&conn, last),
        Command::Stats { window, month, chart, json } => cmd_stats(&conn, window, month, chart, json),
        Command::Transitions { window, output, json } => cmd_transitions(&conn, window, &output, json),
        Command::Play { exclusions, scheme, unordered, policy, seed, json } => {
            cmd_play(&conn, &exclusions, &scheme, unordered, policy.as_deref(), seed, json)
        }
        Command::Check { digits, exclusions, ordered, policy } => {
            cmd_check(&conn, &digits, &exclusions, ordered, policy.as_deref())
        }
        Command::Predict { exclusions, transitions, window, top, policy, json } => {
            cmd_predict(&conn, &exclusions, &transitions, window, top, policy.as_deref(), json)
        }
        Command::Annotate { policy } => cmd_annotate(&conn, policy.as_deref()),
        Command::Policy { preset, output } => cmd_policy(&preset, &output),
    }
}

fn resolve_policy(preset: FilterPolicy, path: Option<&Path>) -> Result<FilterPolicy> {
    match path {
        Some(p) => load_policy(p)
            .with_context(|| format!("Impossible de charger la politique {}", p.display())),
        None => Ok(preset),
    }
}

fn resolve_exclusions(args: &ExclusionArgs) -> Result<ExclusionSet> {
    let from_file = match &args.exclusions {
        Some(p) => {
            let raw = std::fs::read_to_string(p)
                .with_context(|| format!("Impossible de lire {}", p.display()))?;
            let value: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("JSON invalide dans {}", p.display()))?;
            ExclusionSet::from_json(&value)
        }
        None => ExclusionSet::default(),
    };
    let merge = |a: &[u8], b: &[u8]| a.iter().chain(b).copied().collect::<Vec<u8>>();
    Ok(ExclusionSet::new(
        merge(&from_file.first, &args.exclude_first),
        merge(&from_file.second, &args.exclude_second),
        merge(&from_file.third, &args.exclude_third),
    ))
}

fn resolve_schemes(raw_schemes: &[String]) -> Result<Vec<SlotScheme>> {
    if raw_schemes.is_empty() {
        return Ok(builtin_schemes());
    }
    raw_schemes
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let (name, ranges) = match raw.split_once('=') {
                Some((name, ranges)) => (name.trim().to_string(), ranges),
                None => (format!("S{}", i + 1), raw.as_str()),
            };
            SlotScheme::parse(name, ranges).map_err(anyhow::Error::from)
        })
        .collect()
}

fn preset_policy(name: &str) -> Result<FilterPolicy> {
    match FilterPolicy::preset(name) {
        Some(policy) => Ok(policy),
        None => bail!("Préréglage inconnu '{}' (play, check, analyze)", name),
    }
}

/// Nombre de tirages couvrant `window` et toutes les fenêtres de la politique.
fn history_limit(window: u32, policy: &FilterPolicy) -> u32 {
    let lookback = u32::try_from(policy.lookback()).unwrap_or(u32::MAX);
    window.max(lookback.saturating_add(1))
}

fn fetch_for_policy(conn: &Connection, policy: &FilterPolicy, window: u32) -> Result<Vec<Draw>> {
    fetch_last_draws(conn, history_limit(window, policy))
}

fn require_draws(conn: &Connection) -> Result<u32> {
    let n = count_draws(conn)?;
    if n == 0 {
        bail!("Base vide. Lancez d'abord : pick3 import");
    }
    Ok(n)
}

fn cmd_import(conn: &Connection, file: &Path) -> Result<()> {
    let result = import::import_csv(conn, file)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, last: u32) -> Result<()> {
    let n = count_draws(conn)?;
    if n == 0 {
        println!("Base vide. Lancez d'abord : pick3 import");
        return Ok(());
    }
    // Un tirage de plus pour le mouvement du plus ancien affiché.
    let draws = fetch_last_draws(conn, last.saturating_add(1))?;
    display_draws(&draws, last as usize);
    Ok(())
}

fn cmd_stats(conn: &Connection, window: u32, month: Option<String>, chart: bool, json: bool) -> Result<()> {
    let (draws, label) = match month {
        Some(m) => (fetch_month_draws(conn, &m)?, m),
        None => {
            let n = count_draws(conn)?;
            let effective = window.min(n);
            (fetch_last_draws(conn, effective)?, format!("{} derniers tirages", effective))
        }
    };
    let report: StatisticsReport = aggregate_period(&draws, &label)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    display_stats(&report, &label);
    if chart {
        display_sum_chart(&draws);
    }
    Ok(())
}

fn cmd_transitions(conn: &Connection, window: u32, output: &Path, json: bool) -> Result<()> {
    let n = require_draws(conn)?;
    let draws = fetch_last_draws(conn, window.min(n))?;
    let tables = TransitionTables::build(&draws);
    save_tables(&tables, output)?;
    tracing::info!(path = %output.display(), window = tables.window, "transitions sauvegardées");

    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
    } else {
        display_transitions(&tables);
        println!("\nTables sauvegardées dans : {}", output.display());
    }
    Ok(())
}

fn cmd_play(
    conn: &Connection,
    exclusion_args: &ExclusionArgs,
    scheme_specs: &[String],
    unordered: Option<usize>,
    policy_path: Option<&Path>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    require_draws(conn)?;
    let policy = resolve_policy(FilterPolicy::play(), policy_path)?;
    let exclusions = resolve_exclusions(exclusion_args)?;
    let draws = fetch_for_policy(conn, &policy, 100)?;

    let seed = seed.unwrap_or_else(date_seed);
    let mut rng = StdRng::seed_from_u64(seed);
    tracing::debug!(seed, draws = draws.len(), "génération");

    let (combinations, title) = match unordered {
        Some(count) => {
            let combos = play_numbers_unordered(count, &draws, &exclusions, policy, &full_ranges(), &mut rng)?;
            (combos, format!("{} combinaisons ordonnées (seed {})", count, seed))
        }
        None => {
            let schemes = resolve_schemes(scheme_specs)?;
            let combos = play_numbers(&draws, &exclusions, policy, &schemes, &mut rng)?;
            let wanted = schemes.len().min(MAX_SLOTS);
            if combos.len() < wanted {
                tracing::warn!(
                    selected = combos.len(),
                    wanted,
                    "sélection réduite faute de combinaisons disjointes"
                );
            }
            (combos, format!("Combinaisons jouables (seed {})", seed))
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&combinations)?);
    } else {
        display_combinations(&combinations, &title);
    }
    Ok(())
}

fn cmd_check(
    conn: &Connection,
    raw_digits: &str,
    exclusion_args: &ExclusionArgs,
    ordered: bool,
    policy_path: Option<&Path>,
) -> Result<()> {
    let digits = parse_digits(raw_digits)?;
    let policy = resolve_policy(FilterPolicy::check(), policy_path)?;
    let exclusions = resolve_exclusions(exclusion_args)?;
    let draws = fetch_for_policy(conn, &policy, 0)?;

    let filter = ValidityFilter::new(&exclusions, &draws, policy);

    let class = classify(&digits);
    let mut sorted = digits;
    sorted.sort();
    println!(
        "Combinaison {} : {} ({}), plage {}",
        raw_digits.trim(),
        class.kind,
        class.pattern,
        classify_scheme(&sorted).unwrap_or_else(|| "—".to_string())
    );
    let (filter, candidate) = if ordered { (filter.ordered(), digits) } else { (filter, sorted) };
    display_rejections(&candidate, &filter.rejections(&candidate));
    Ok(())
}

fn cmd_predict(
    conn: &Connection,
    exclusion_args: &ExclusionArgs,
    transitions_path: &Path,
    window: u32,
    top: usize,
    policy_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let n = require_draws(conn)?;
    let policy = resolve_policy(FilterPolicy::play(), policy_path)?;
    let exclusions = resolve_exclusions(exclusion_args)?;
    let draws = fetch_for_policy(conn, &policy, window.min(n))?;

    let tables = if transitions_path.exists() {
        load_tables(transitions_path)
            .with_context(|| format!("Impossible de charger {}", transitions_path.display()))?
    } else {
        tracing::info!(
            path = %transitions_path.display(),
            "fichier de transitions absent, recalcul sur la fenêtre"
        );
        TransitionTables::build(&draws)
    };

    let ranked = predict(&draws, &exclusions, policy, &tables, top)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else {
        display_combinations(&ranked, &format!("Meilleurs candidats (transitions sur {} tirages)", tables.window));
    }
    Ok(())
}

fn cmd_annotate(conn: &Connection, policy_path: Option<&Path>) -> Result<()> {
    let n = require_draws(conn)?;
    let policy = resolve_policy(FilterPolicy::analyze(), policy_path)?;
    let draws = fetch_last_draws(conn, n)?;

    let pb = ProgressBar::new(draws.len() as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("=> "));

    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;
    let mut passed = 0u32;
    for i in 0..draws.len() {
        if let Some(annotation) = annotate_draw(&draws, i, policy) {
            if annotation.pass_condition {
                passed += 1;
            }
            update_annotations(
                &tx,
                &draws[i],
                annotation.range_analysis.as_deref(),
                Some(annotation.pass_condition),
            )?;
        }
        pb.inc(1);
    }
    tx.commit().context("Échec du commit")?;
    pb.finish_with_message("Annotation terminée");

    tracing::info!(draws = draws.len(), passed, "annotation terminée");
    println!("{} tirages annotés, {} passent le filtre.", draws.len(), passed);
    Ok(())
}

fn cmd_policy(preset: &str, output: &Path) -> Result<()> {
    let policy = preset_policy(preset)?;
    save_policy(&policy, output)
        .with_context(|| format!("Impossible d'écrire {}", output.display()))?;
    tracing::info!(preset, path = %output.display(), "politique exportée");
    println!("Préréglage '{}' écrit dans : {}", preset, output.display());
    Ok(())
}

fn cmd_add(
    conn: &Connection,
    date: Option<String>,
    time: Option<String>,
    digits: Option<String>,
    yes: bool,
) -> Result<()> {
    println!("Ajout d'un tirage\n");

    let raw_date = match date {
        Some(d) => d,
        None => prompt("Date (JJ/MM/AAAA) : ")?,
    };
    let date = import::parse_date(&raw_date)?;

    let time = match time {
        Some(t) => DrawTime::parse(&t)?,
        None => prompt_time()?,
    };

    let original = match digits {
        Some(d) => parse_digits(&d)?,
        None => prompt_digits()?,
    };

    let draw = Draw::new(date, time, original);

    println!("\nTirage à insérer :");
    display_draws(std::slice::from_ref(&draw), 1);

    if !yes {
        let confirm = prompt("\nConfirmer l'insertion ? (o/n) : ")?;
        if confirm.trim().to_lowercase() != "o" {
            println!("Insertion annulée.");
            return Ok(());
        }
    }

    if import::insert_manual(conn, &draw)? {
        println!("Tirage inséré avec succès.");
    } else {
        println!("Ce tirage existe déjà (doublon ignoré).");
    }
    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Erreur de lecture")?;
    Ok(input.trim().to_string())
}

fn prompt_time() -> Result<DrawTime> {
    loop {
        let input = prompt("Moment (midi/soir) : ")?;
        match DrawTime::parse(&input) {
            Ok(t) => return Ok(t),
            Err(e) => println!("{e}. Réessayez."),
        }
    }
}

fn prompt_digits() -> Result<[u8; 3]> {
    loop {
        let input = prompt("3 chiffres dans l'ordre de sortie (ex: 7 0 3) : ")?;
        match parse_digits(&input) {
            Ok(d) => return Ok(d),
            Err(e) => println!("{e}. Réessayez."),
        }
    }
}
