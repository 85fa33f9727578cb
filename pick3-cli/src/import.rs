use anyhow::{Context, Result};
use pick3_db::rusqlite::Connection;
use std::path::Path;

use pick3_db::db::{insert_draw, reindex_months};
use pick3_db::models::{Draw, DrawTime, validate_digits};

/// Ligne attendue : `date;moment;d1;d2;d3`, chiffres dans l'ordre de sortie.
fn parse_record(record: &csv::StringRecord) -> Result<Draw> {
    let get = |idx: usize| -> Result<String> {
        record
            .get(idx)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };

    let get_u8 = |idx: usize| -> Result<u8> {
        let s = get(idx)?;
        s.parse::<u8>()
            .with_context(|| format!("Impossible de parser '{}' (index {})", s, idx))
    };

    let date = parse_date(&get(0)?)?;
    let time = DrawTime::parse(&get(1)?)?;
    let original = [get_u8(2)?, get_u8(3)?, get_u8(4)?];
    validate_digits(&original)?;

    Ok(Draw::new(date, time, original))
}

/// `JJ/MM/AAAA` ou ISO `AAAA-MM-JJ`, normalisée en ISO.
pub fn parse_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let parsed = chrono::NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .with_context(|| format!("Format de date invalide: '{}'", raw))?;
    Ok(parsed.format("%Y-%m-%d").to_string())
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;

    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    let mut result = ImportResult {
        total_records: 0,
        inserted: 0,
        skipped: 0,
        errors: 0,
    };

    for record_result in reader.records() {
        result.total_records += 1;
        let line = result.total_records;
        let record = match record_result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(line, error = %e, "ligne illisible");
                result.errors += 1;
                continue;
            }
        };
        let draw = match parse_record(&record) {
            Ok(draw) => draw,
            Err(e) => {
                tracing::warn!(line, error = %e, "ligne ignorée");
                result.errors += 1;
                continue;
            }
        };
        match insert_draw(&tx, &draw) {
            Ok(true) => result.inserted += 1,
            Ok(false) => result.skipped += 1,
            Err(e) => {
                tracing::warn!(line, error = %e, "échec d'insertion");
                result.errors += 1;
            }
        }
    }

    if result.inserted > 0 {
        let renumbered = reindex_months(&tx)?;
        tracing::debug!(renumbered, "index mensuels recalculés");
    }
    tx.commit().context("Échec du commit")?;
    tracing::info!(
        total = result.total_records,
        inserted = result.inserted,
        skipped = result.skipped,
        errors = result.errors,
        "import terminé"
    );
    Ok(result)
}

/// Ajoute un tirage saisi à la main et recalcule les index du mois.
pub fn insert_manual(conn: &Connection, draw: &Draw) -> Result<bool> {
    validate_digits(&draw.original)?;
    let inserted = insert_draw(conn, draw)?;
    if inserted {
        reindex_months(conn)?;
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pick3_db::db::{fetch_last_draws, migrate};
    use std::io::Write;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("17/02/2026").unwrap(), "2026-02-17");
        assert_eq!(parse_date("01/01/2020").unwrap(), "2020-01-01");
        assert_eq!(parse_date("2024-03-05").unwrap(), "2024-03-05");
        assert!(parse_date("32/01/2024").is_err());
        assert!(parse_date("2024/01").is_err());
    }

    #[test]
    fn test_import_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draws.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "date;time;d1;d2;d3").unwrap();
        writeln!(file, "01/03/2024;midday;7;0;3").unwrap();
        writeln!(file, "01/03/2024;evening;1;4;8").unwrap();
        writeln!(file, "01/03/2024;evening;1;4;8").unwrap();
        writeln!(file, "02/03/2024;soir;9;12;3").unwrap();
        writeln!(file, "02/03/2024;midi;5;5").unwrap();
        writeln!(file, "02/03/2024;midi;2;2;6").unwrap();
        drop(file);

        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let result = import_csv(&conn, &path).unwrap();
        assert_eq!(result.total_records, 6);
        assert_eq!(result.inserted, 3);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.errors, 2);

        let draws = fetch_last_draws(&conn, 10).unwrap();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].date, "2024-03-02");
        assert_eq!(draws[0].index, 3);
        assert_eq!(draws[2].original, [7, 0, 3]);
        assert_eq!(draws[2].digits, [0, 3, 7]);
        assert_eq!(draws[2].index, 1);
    }
}
