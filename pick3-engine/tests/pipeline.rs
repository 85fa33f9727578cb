use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;

use pick3_db::db::{fetch_last_draws, insert_draw, migrate};
use pick3_db::rusqlite::Connection;
use pick3_engine::combination::is_position_disjoint;
use pick3_engine::config::FilterPolicy;
use pick3_engine::filter::ExclusionSet;
use pick3_engine::generator::builtin_schemes;
use pick3_engine::make_test_draws;
use pick3_engine::play::{play_numbers, predict};
use pick3_engine::stats::aggregate;
use pick3_engine::stats::transitions::{load_tables, save_tables, TransitionTables};

fn seeded_store(n: usize) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    migrate(&conn).unwrap();
    for draw in make_test_draws(n) {
        insert_draw(&conn, &draw).unwrap();
    }
    conn
}

#[test]
fn store_to_selection() {
    let conn = seeded_store(60);
    let draws = fetch_last_draws(&conn, 60).unwrap();
    assert_eq!(draws.len(), 60);
    assert_eq!(draws[0].date, "2024-12-31");

    let exclusions = ExclusionSet::from_json(&json!({"first": ["0"], "third": "bad"}));
    let mut rng = StdRng::seed_from_u64(20240601);
    let chosen = play_numbers(&draws, &exclusions, FilterPolicy::play(), &builtin_schemes(), &mut rng).unwrap();
    assert!((2..=4).contains(&chosen.len()));
    assert!(is_position_disjoint(&chosen));
    assert!(chosen.iter().all(|c| c.digits[0] != 0));
}

#[test]
fn tables_file_drive_prediction() {
    let conn = seeded_store(90);
    let draws = fetch_last_draws(&conn, 90).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transitions.json");

    save_tables(&TransitionTables::build(&draws), &path).unwrap();
    let tables = load_tables(&path).unwrap();
    assert_eq!(tables.window, 90);

    let ranked = predict(&draws, &ExclusionSet::default(), FilterPolicy::play(), &tables, 5).unwrap();
    assert!(!ranked.is_empty());
    assert!(ranked.iter().all(|c| c.score.is_some()));
}

#[test]
fn statistics_from_store_are_stable() {
    let conn = seeded_store(40);
    let draws = fetch_last_draws(&conn, 40).unwrap();
    let report = aggregate(&draws);
    assert_eq!(report.draws, 40);
    assert_eq!(report.leading_digit.total, 40);
    let again = aggregate(&fetch_last_draws(&conn, 40).unwrap());
    assert_eq!(
        serde_json::to_string(&report).unwrap(),
        serde_json::to_string(&again).unwrap()
    );
}
