use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};
use textplots::Plot;

use crate::import::ImportResult;
use pick3_db::models::{concat_digits, Draw, Position};
use pick3_engine::combination::Combination;
use pick3_engine::filter::Rejection;
use pick3_engine::movement::{annotate, Movement, MovementHistory};
use pick3_engine::stats::transitions::{TransitionTable, TransitionTables};
use pick3_engine::stats::{FrequencyTable, StatisticsReport};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn movement_cell(movement: Option<Movement>) -> Cell {
    match movement {
        Some(Movement::Up) => Cell::new("↑ Up").fg(Color::Green),
        Some(Movement::Down) => Cell::new("↓ Down").fg(Color::Red),
        Some(Movement::Equal) => Cell::new("= Equal").fg(Color::White),
        None => Cell::new("—"),
    }
}

fn glyph(movement: Option<Movement>) -> char {
    match movement {
        Some(Movement::Up) => '↑',
        Some(Movement::Down) => '↓',
        Some(Movement::Equal) => '=',
        None => '·',
    }
}

/// Mouvements antérieurs, du plus récent au plus ancien.
fn history_glyphs(history: &MovementHistory) -> String {
    history.previous.iter().map(|&m| glyph(m)).collect()
}

/// Affiche les `limit` premiers tirages ; les suivants ne servent qu'au calcul
/// des mouvements.
pub fn display_draws(draws: &[Draw], limit: usize) {
    if draws.is_empty() || limit == 0 {
        println!("Aucun tirage à afficher.");
        return;
    }

    let movements = annotate(draws);
    let mut table = new_table(vec![
        "Date", "Moment", "N°", "Sortie", "Trié", "Somme", "1er", "2e", "3e", "Historique", "Plage", "Filtre",
    ]);

    for (draw, moves) in draws.iter().zip(movements.iter()).take(limit) {
        let pass = match draw.pass_condition {
            Some(true) => Cell::new("ok").fg(Color::Green),
            Some(false) => Cell::new("rejeté").fg(Color::Red),
            None => Cell::new("—"),
        };
        table.add_row(vec![
            Cell::new(&draw.date),
            Cell::new(draw.time.to_string()),
            Cell::new(draw.index),
            Cell::new(draw.original_draw()),
            Cell::new(draw.current_draw()),
            Cell::new(draw.sum()),
            movement_cell(moves.first.current),
            movement_cell(moves.second.current),
            movement_cell(moves.third.current),
            Cell::new(format!(
                "{} / {} / {}",
                history_glyphs(&moves.first),
                history_glyphs(&moves.second),
                history_glyphs(&moves.third)
            )),
            Cell::new(draw.range_analysis.as_deref().unwrap_or("—")),
            pass,
        ]);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

fn frequency_rows<K: Ord + ToString>(table: &mut Table, frequency: &FrequencyTable<K>) {
    for (key, entry) in &frequency.entries {
        table.add_row(vec![key.to_string(), entry.count.to_string(), entry.percentage.clone()]);
    }
}

pub fn display_stats(report: &StatisticsReport, label: &str) {
    println!("\n📊 Statistiques : {} ({} tirages)\n", label, report.draws);

    println!("── Fréquences par position ──");
    let mut table = new_table(vec!["Chiffre", "1er", "2e", "3e"]);
    for digit in 0..=9u8 {
        let mut row = vec![digit.to_string()];
        for position in Position::ALL {
            let entry = &report.position(position).frequency.entries[&digit];
            row.push(format!("{} ({})", entry.count, entry.percentage));
        }
        table.add_row(row);
    }
    println!("{table}");

    println!("\n── Mouvements ──");
    let mut table = new_table(vec!["Position", "Up", "Down", "Equal", "Up/Down"]);
    for position in Position::ALL {
        let balance = &report.position(position).balance;
        let ratio = if balance.up_down_ratio.is_infinite() {
            "Infinity".to_string()
        } else {
            format!("{:.2}", balance.up_down_ratio)
        };
        table.add_row(vec![
            position.label().to_string(),
            balance.up.to_string(),
            balance.down.to_string(),
            balance.equal.to_string(),
            ratio,
        ]);
    }
    println!("{table}");

    println!("\n── Permutations ──");
    let mut table = new_table(vec!["Type", "Tirages", "%"]);
    frequency_rows(&mut table, &report.permutation_kinds);
    println!("{table}");

    let mut table = new_table(vec!["Motif", "Tirages", "%"]);
    frequency_rows(&mut table, &report.permutation_patterns);
    println!("{table}");

    println!(
        "\nCondition de passage : {} tirage(s) ({})",
        report.pass_rate.count, report.pass_rate.percentage
    );
}

fn display_transition_table(title: &str, table: &TransitionTable) {
    println!("\n{title}");
    let mut out = new_table(vec!["État", "→ Up", "→ Down", "→ Equal", "Total", "Plus fréquent"]);
    for (state, row) in &table.rows {
        let mut cells = vec![Cell::new(state)];
        for movement in Movement::ALL {
            let entry = &row.distribution.entries[movement.label()];
            cells.push(Cell::new(format!("{} ({})", entry.count, entry.percentage)));
        }
        cells.push(Cell::new(row.total()));
        let top = row
            .most_common
            .first()
            .map(|m| format!("{} {}", m.value, m.percentage))
            .unwrap_or_else(|| "—".to_string());
        cells.push(Cell::new(top));
        out.add_row(cells);
    }
    println!("{out}");
}

pub fn display_transitions(tables: &TransitionTables) {
    println!("\n🔀 Transitions sur {} tirages", tables.window);
    for position in Position::ALL {
        let transitions = tables.position(position);
        println!("\n══ Position {} ══", position.label());
        display_transition_table("Ordre 1", &transitions.first_order);
        display_transition_table("Ordre 2", &transitions.second_order);

        if transitions.outcomes.rows.is_empty() {
            continue;
        }
        let mut out = new_table(vec!["Chiffre-Mouvement", "Chiffres suivants", "Mouvements suivants"]);
        for (key, row) in &transitions.outcomes.rows {
            let digits = row
                .top_digits
                .iter()
                .map(|m| format!("{} ({})", m.value, m.percentage))
                .collect::<Vec<_>>()
                .join(", ");
            let moves = row
                .top_movements
                .iter()
                .map(|m| format!("{} ({})", m.value, m.percentage))
                .collect::<Vec<_>>()
                .join(", ");
            out.add_row(vec![key.clone(), digits, moves]);
        }
        println!("\nIssues chiffre × mouvement");
        println!("{out}");
    }
}

pub fn display_combinations(combinations: &[Combination], title: &str) {
    println!("\n🎲 {title}\n");

    let mut table = new_table(vec!["#", "Combinaison", "Schéma", "1er", "2e", "3e", "Score"]);
    for (i, c) in combinations.iter().enumerate() {
        let score = c.score.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "—".to_string());
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(c.value()),
            Cell::new(c.scheme.as_deref().unwrap_or("—")),
            movement_cell(c.movements[0]),
            movement_cell(c.movements[1]),
            movement_cell(c.movements[2]),
            Cell::new(score),
        ]);
    }
    println!("{table}");
}

pub fn display_rejections(digits: &[u8; 3], rejections: &[Rejection]) {
    if rejections.is_empty() {
        println!("✅ {} passe toutes les règles.", concat_digits(digits));
        return;
    }
    println!("❌ {} rejeté :", concat_digits(digits));
    let mut table = new_table(vec!["#", "Règle"]);
    for (i, r) in rejections.iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), Cell::new(r.to_string()).fg(Color::Red)]);
    }
    println!("{table}");
}

/// Somme des chiffres, du plus ancien au plus récent.
pub fn display_sum_chart(draws: &[Draw]) {
    if draws.len() < 2 {
        return;
    }
    let points: Vec<(f32, f32)> = draws
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| (i as f32, d.sum() as f32))
        .collect();
    let x_max = (points.len() - 1) as f32;

    println!("\n── Somme des chiffres ──");
    let shape = textplots::Shape::Lines(&points);
    let mut chart = textplots::Chart::new_with_y_range(120, 40, 0.0, x_max, 0.0, 27.0);
    println!("{}", chart.lineplot(&shape));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_glyphs() {
        let history = MovementHistory {
            current: Some(Movement::Up),
            previous: vec![Some(Movement::Down), Some(Movement::Equal), None],
        };
        assert_eq!(history_glyphs(&history), "↓=·");
    }
}
