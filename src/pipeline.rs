//! Stage orchestration: raw tables in, wide feature rows out.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::attributes::{Exclusion, join_attributes};
use crate::config::{FeatureSettings, PipelineConfig};
use crate::derived::derive_forms;
use crate::error::PipelineResult;
use crate::export::write_features;
use crate::mirror::mirror_opponents;
use crate::normalize::normalize;
use crate::store::{self, RawTables};
use crate::wide::{MatchFeatureRow, assemble_wide};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub contests_in: usize,
    pub participant_rows: usize,
    pub contests_out: usize,
    pub debut_sides: usize,
    pub exclusions: Vec<Exclusion>,
}

impl PipelineReport {
    pub fn excluded_contests(&self) -> usize {
        let mut ids = self
            .exclusions
            .iter()
            .map(|e| e.contest_id.as_str())
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub rows: Vec<MatchFeatureRow>,
    pub report: PipelineReport,
}

/// Runs every feature stage over in-memory tables. No I/O.
pub fn build_feature_table(
    tables: &RawTables,
    settings: &FeatureSettings,
) -> PipelineResult<PipelineOutput> {
    let normalized = normalize(&tables.contests, &tables.records)?;
    let participant_rows = normalized.len();
    let mirrored = mirror_opponents(normalized)?;
    let derived = derive_forms(mirrored, settings.ewma_span, settings.parallel)?;
    let joined = join_attributes(
        derived,
        &tables.profiles,
        settings.exclusions,
        &settings.default_stance,
    )?;
    let rows = assemble_wide(&joined.rows)?;

    let debut_sides = rows
        .iter()
        .map(|r| usize::from(r.a.is_debut) + usize::from(r.b.is_debut))
        .sum();
    let report = PipelineReport {
        contests_in: tables.contests.len(),
        participant_rows,
        contests_out: rows.len(),
        debut_sides,
        exclusions: joined.exclusions,
    };
    info!(
        contests_in = report.contests_in,
        contests_out = report.contests_out,
        excluded = report.excluded_contests(),
        "built feature table"
    );
    Ok(PipelineOutput { rows, report })
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub db_path: PathBuf,
    pub out_path: PathBuf,
    pub columns: usize,
    pub report: PipelineReport,
}

/// Reads the store, builds the table and publishes the Parquet file.
///
/// Nothing is written when any stage fails.
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    let conn = store::open_existing(&config.db_path)?;
    let tables = store::load_tables(&conn)?;
    let output = build_feature_table(&tables, &config.features)
        .with_context(|| format!("build features from {}", config.db_path.display()))?;
    let export = write_features(&output.rows, &config.out_path, config.row_group_size)?;
    Ok(RunSummary {
        db_path: config.db_path.clone(),
        out_path: export.path,
        columns: export.columns,
        report: output.report,
    })
}
