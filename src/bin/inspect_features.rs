use std::path::PathBuf;

use anyhow::{Context, Result};
use parquet::record::{Field, Row};

use bout_features::config::{PipelineConfig, arg_value, load_dotenv};
use bout_features::export;

const DEFAULT_LIMIT: usize = 10;
const SHOWN: &[&str] = &[
    "event_date",
    "contest_id",
    "A_name",
    "B_name",
    "winner_color",
    "weight_class",
    "delta_slpm",
    "net_str_eff",
    "delta_age",
    "A_win_streak",
    "B_win_streak",
];

fn main() -> Result<()> {
    load_dotenv();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let path = match arg_value(&args, "--in") {
        Some(path) => PathBuf::from(path),
        None => PipelineConfig::from_env().context("resolve pipeline config")?.out_path,
    };
    let limit = arg_value(&args, "--limit")
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(DEFAULT_LIMIT);

    let mut rows = export::read_rows(&path)?;
    println!("{}: {} rows", path.display(), rows.len());
    rows.sort_by_key(|row| std::cmp::Reverse(event_day(row)));

    println!("{}", SHOWN.join("\t"));
    for row in rows.iter().take(limit) {
        let cells = SHOWN
            .iter()
            .map(|name| cell(row, name))
            .collect::<Vec<_>>();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}

fn event_day(row: &Row) -> i32 {
    row.get_column_iter()
        .find_map(|(name, field)| match (name.as_str(), field) {
            ("event_date", Field::Date(day)) => Some(*day),
            _ => None,
        })
        .unwrap_or(i32::MIN)
}

fn cell(row: &Row, wanted: &str) -> String {
    let Some((_, field)) = row.get_column_iter().find(|(name, _)| name.as_str() == wanted) else {
        return "n/a".to_string();
    };
    match field {
        Field::Null => "-".to_string(),
        Field::Str(s) => s.clone(),
        Field::Double(v) => format!("{v:.3}"),
        other => other.to_string(),
    }
}
