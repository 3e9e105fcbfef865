use anyhow::{Context, Result};

use bout_features::config::{PipelineConfig, load_dotenv};
use bout_features::logging::init_tracing;
use bout_features::pipeline;

fn main() -> Result<()> {
    load_dotenv();
    init_tracing();

    let config = PipelineConfig::from_env().context("resolve pipeline config")?;
    let summary = pipeline::run(&config)?;
    let report = &summary.report;

    println!("Feature build complete");
    println!("DB: {}", summary.db_path.display());
    println!("Out: {}", summary.out_path.display());
    println!(
        "Contests: {} in, {} out ({} excluded)",
        report.contests_in,
        report.contests_out,
        report.excluded_contests()
    );
    println!(
        "Participant rows: {}  debut sides: {}  columns: {}",
        report.participant_rows, report.debut_sides, summary.columns
    );
    if !report.exclusions.is_empty() {
        println!("Exclusions: {}", report.exclusions.len());
        for exclusion in report.exclusions.iter().take(10) {
            println!(
                "   - {} {}: {}",
                exclusion.contest_id,
                exclusion.participant_id.as_deref().unwrap_or("-"),
                exclusion.reason.label()
            );
        }
    }

    Ok(())
}
