use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use bout_features::config::{ENV_DB_PATH, arg_value, default_db_path, load_dotenv};
use bout_features::logging::init_tracing;
use bout_features::store;

fn main() -> Result<()> {
    load_dotenv();
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let snapshot = arg_value(&args, "--snapshot")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: store_import --snapshot <file.json> [--db <path>]"))?;
    let db_path = arg_value(&args, "--db")
        .or_else(|| std::env::var(ENV_DB_PATH).ok().filter(|v| !v.trim().is_empty()))
        .map(PathBuf::from)
        .or_else(default_db_path)
        .context("unable to resolve sqlite path")?;

    let tables = store::read_snapshot(&snapshot)?;
    let mut conn = store::open_db(&db_path)?;
    let summary = store::import_snapshot(&mut conn, &tables)?;

    println!("Snapshot import complete");
    println!("DB: {}", db_path.display());
    println!("Contests upserted: {}", summary.contests_upserted);
    println!("Stat rows upserted: {}", summary.records_upserted);
    println!("Profiles upserted: {}", summary.profiles_upserted);
    Ok(())
}
