use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use std::path::Path;

use crate::models::{Draw, DrawTime};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    date             TEXT NOT NULL,
    time_rank        INTEGER NOT NULL,
    draw_index       INTEGER NOT NULL DEFAULT 0,
    first            INTEGER NOT NULL,
    second           INTEGER NOT NULL,
    third            INTEGER NOT NULL,
    original_first   INTEGER NOT NULL,
    original_second  INTEGER NOT NULL,
    original_third   INTEGER NOT NULL,
    range_analysis   TEXT,
    pass_condition   INTEGER,
    PRIMARY KEY (date, time_rank)
);
";

const DRAW_COLUMNS: &str = "date, time_rank, draw_index, first, second, third, \
     original_first, original_second, original_third, range_analysis, pass_condition";

pub fn db_path() -> std::path::PathBuf {
    if let Ok(custom) = std::env::var("PICK3_DB") {
        return std::path::PathBuf::from(custom);
    }
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("pick3.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    tracing::debug!(path = %path.display(), "base ouverte");
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (date, time_rank, draw_index, first, second, third, original_first, original_second, original_third, range_analysis, pass_condition)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            draw.date,
            draw.time.rank(),
            draw.index,
            draw.digits[0],
            draw.digits[1],
            draw.digits[2],
            draw.original[0],
            draw.original[1],
            draw.original[2],
            draw.range_analysis,
            draw.pass_condition,
        ],
    ).context("Échec de l'insertion")?;
    Ok(changed > 0)
}

/// Renumérote les tirages de chaque mois dans l'ordre (date, moment).
pub fn reindex_months(conn: &Connection) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE draws SET draw_index = (
            SELECT COUNT(*) FROM draws AS d
            WHERE substr(d.date, 1, 7) = substr(draws.date, 1, 7)
              AND (d.date < draws.date OR (d.date = draws.date AND d.time_rank <= draws.time_rank))
        )",
        [],
    ).context("Échec de la renumérotation")?;
    Ok(changed)
}

pub fn update_annotations(
    conn: &Connection,
    draw: &Draw,
    range_analysis: Option<&str>,
    pass_condition: Option<bool>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE draws SET range_analysis = ?1, pass_condition = ?2 WHERE date = ?3 AND time_rank = ?4",
        rusqlite::params![range_analysis, pass_condition, draw.date, draw.time.rank()],
    ).with_context(|| format!("Échec de la mise à jour du tirage {} {}", draw.date, draw.time))?;
    Ok(changed > 0)
}

fn row_to_draw(row: &Row<'_>) -> rusqlite::Result<Draw> {
    let rank: u8 = row.get(1)?;
    let time = DrawTime::from_rank(rank).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Integer,
            format!("rang de moment inconnu : {}", rank).into(),
        )
    })?;
    Ok(Draw {
        date: row.get(0)?,
        time,
        index: row.get(2)?,
        digits: [
            row.get::<_, u8>(3)?,
            row.get::<_, u8>(4)?,
            row.get::<_, u8>(5)?,
        ],
        original: [
            row.get::<_, u8>(6)?,
            row.get::<_, u8>(7)?,
            row.get::<_, u8>(8)?,
        ],
        range_analysis: row.get(9)?,
        pass_condition: row.get(10)?,
    })
}

/// Derniers tirages, le plus récent en premier.
pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRAW_COLUMNS} FROM draws ORDER BY date DESC, time_rank DESC LIMIT ?1"
    ))?;
    let draws = stmt
        .query_map([limit], row_to_draw)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

/// Tirages d'un mois (`YYYY-MM`), le plus récent en premier.
pub fn fetch_month_draws(conn: &Connection, month: &str) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRAW_COLUMNS} FROM draws WHERE substr(date, 1, 7) = ?1 ORDER BY date DESC, time_rank DESC"
    ))?;
    let draws = stmt
        .query_map([month], row_to_draw)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_draw(date: &str, time: DrawTime, digits: [u8; 3]) -> Draw {
        Draw::new(date, time, digits)
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_count() {
        let conn = setup();
        assert_eq!(count_draws(&conn).unwrap(), 0);

        insert_draw(&conn, &test_draw("2024-01-01", DrawTime::Midday, [1, 2, 3])).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = setup();

        let inserted = insert_draw(&conn, &test_draw("2024-01-01", DrawTime::Midday, [1, 2, 3])).unwrap();
        assert!(inserted);
        let inserted = insert_draw(&conn, &test_draw("2024-01-01", DrawTime::Midday, [4, 5, 6])).unwrap();
        assert!(!inserted);
        let inserted = insert_draw(&conn, &test_draw("2024-01-01", DrawTime::Evening, [4, 5, 6])).unwrap();
        assert!(inserted);
        assert_eq!(count_draws(&conn).unwrap(), 2);
    }

    #[test]
    fn test_fetch_order() {
        let conn = setup();

        insert_draw(&conn, &test_draw("2024-01-01", DrawTime::Evening, [1, 1, 1])).unwrap();
        insert_draw(&conn, &test_draw("2024-01-05", DrawTime::Midday, [2, 2, 2])).unwrap();
        insert_draw(&conn, &test_draw("2024-01-01", DrawTime::Midday, [3, 3, 3])).unwrap();
        insert_draw(&conn, &test_draw("2024-01-05", DrawTime::Evening, [4, 4, 4])).unwrap();

        let draws = fetch_last_draws(&conn, 10).unwrap();
        let keys: Vec<(&str, DrawTime)> = draws.iter().map(|d| (d.date.as_str(), d.time)).collect();
        assert_eq!(keys, vec![
            ("2024-01-05", DrawTime::Evening),
            ("2024-01-05", DrawTime::Midday),
            ("2024-01-01", DrawTime::Evening),
            ("2024-01-01", DrawTime::Midday),
        ]);
    }

    #[test]
    fn test_original_order_preserved() {
        let conn = setup();
        insert_draw(&conn, &test_draw("2024-01-01", DrawTime::Midday, [9, 0, 4])).unwrap();
        let draws = fetch_last_draws(&conn, 1).unwrap();
        assert_eq!(draws[0].digits, [0, 4, 9]);
        assert_eq!(draws[0].original, [9, 0, 4]);
    }

    #[test]
    fn test_reindex_months() {
        let conn = setup();
        insert_draw(&conn, &test_draw("2024-02-03", DrawTime::Midday, [1, 2, 3])).unwrap();
        insert_draw(&conn, &test_draw("2024-01-31", DrawTime::Evening, [1, 2, 3])).unwrap();
        insert_draw(&conn, &test_draw("2024-02-01", DrawTime::Evening, [1, 2, 3])).unwrap();
        insert_draw(&conn, &test_draw("2024-02-01", DrawTime::Midday, [1, 2, 3])).unwrap();
        reindex_months(&conn).unwrap();

        let february = fetch_month_draws(&conn, "2024-02").unwrap();
        let indexes: Vec<u32> = february.iter().map(|d| d.index).collect();
        assert_eq!(indexes, vec![3, 2, 1]);

        let january = fetch_month_draws(&conn, "2024-01").unwrap();
        assert_eq!(january.len(), 1);
        assert_eq!(january[0].index, 1);
    }

    #[test]
    fn test_update_annotations() {
        let conn = setup();
        let draw = test_draw("2024-01-01", DrawTime::Midday, [1, 4, 8]);
        insert_draw(&conn, &draw).unwrap();

        assert!(update_annotations(&conn, &draw, Some("D"), Some(true)).unwrap());
        let stored = fetch_last_draws(&conn, 1).unwrap();
        assert_eq!(stored[0].range_analysis.as_deref(), Some("D"));
        assert_eq!(stored[0].pass_condition, Some(true));

        let missing = test_draw("2030-01-01", DrawTime::Midday, [1, 4, 8]);
        assert!(!update_annotations(&conn, &missing, None, None).unwrap());
    }

    #[test]
    fn test_open_db_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pick3.db");
        let conn = open_db(&path).unwrap();
        migrate(&conn).unwrap();
        assert!(path.exists());
    }
}
