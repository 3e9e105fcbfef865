//! Parquet output for the wide feature table.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDate};
use parquet::basic::Compression;
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int32Type, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::{SerializedColumnWriter, SerializedFileWriter};
use parquet::record::Row;
use parquet::schema::parser::parse_message_type;
use tracing::info;

use crate::form::{FORM_NAMES, FormCounters};
use crate::rates::{RATE_NAMES, RateBlock};
use crate::rolling::{METRIC_NAMES, MetricSet};
use crate::wide::{MatchFeatureRow, SideBlock};

pub const DEFAULT_ROW_GROUP_SIZE: usize = 65_536;

// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub row_groups: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum ColumnData {
    Text(Vec<Option<String>>),
    RequiredText(Vec<String>),
    Date(Vec<NaiveDate>),
    Flag(Vec<bool>),
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    fn schema_line(&self) -> String {
        let name = &self.name;
        match self.data {
            ColumnData::Text(_) => format!("OPTIONAL BYTE_ARRAY {name} (UTF8);"),
            ColumnData::RequiredText(_) => format!("REQUIRED BYTE_ARRAY {name} (UTF8);"),
            ColumnData::Date(_) => format!("REQUIRED INT32 {name} (DATE);"),
            ColumnData::Flag(_) => format!("REQUIRED BOOLEAN {name};"),
            ColumnData::Int(_) => format!("OPTIONAL INT64 {name};"),
            ColumnData::Float(_) => format!("OPTIONAL DOUBLE {name};"),
        }
    }

    fn write(&self, writer: &mut SerializedColumnWriter<'_>) -> Result<()> {
        let context = || format!("write column {}", self.name);
        match &self.data {
            ColumnData::Text(values) => {
                let (present, defs) =
                    split_nulls(values.iter().map(|v| v.as_deref().map(ByteArray::from)));
                writer
                    .typed::<ByteArrayType>()
                    .write_batch(&present, Some(&defs), None)
                    .with_context(context)?;
            }
            ColumnData::RequiredText(values) => {
                let present = values
                    .iter()
                    .map(|v| ByteArray::from(v.as_str()))
                    .collect::<Vec<_>>();
                writer
                    .typed::<ByteArrayType>()
                    .write_batch(&present, None, None)
                    .with_context(context)?;
            }
            ColumnData::Date(values) => {
                let days = values.iter().map(|d| days_since_epoch(*d)).collect::<Vec<_>>();
                writer
                    .typed::<Int32Type>()
                    .write_batch(&days, None, None)
                    .with_context(context)?;
            }
            ColumnData::Flag(values) => {
                writer
                    .typed::<BoolType>()
                    .write_batch(values, None, None)
                    .with_context(context)?;
            }
            ColumnData::Int(values) => {
                let (present, defs) = split_nulls(values.iter().copied());
                writer
                    .typed::<Int64Type>()
                    .write_batch(&present, Some(&defs), None)
                    .with_context(context)?;
            }
            ColumnData::Float(values) => {
                let (present, defs) = split_nulls(values.iter().copied());
                writer
                    .typed::<DoubleType>()
                    .write_batch(&present, Some(&defs), None)
                    .with_context(context)?;
            }
        }
        Ok(())
    }
}

/// Non-null values plus one definition level per row.
fn split_nulls<T>(values: impl Iterator<Item = Option<T>>) -> (Vec<T>, Vec<i16>) {
    let mut present = Vec::new();
    let mut defs = Vec::new();
    for value in values {
        match value {
            Some(v) => {
                present.push(v);
                defs.push(1);
            }
            None => defs.push(0),
        }
    }
    (present, defs)
}

pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Output column names, in file order.
pub fn column_names() -> Vec<String> {
    build_columns(&[]).into_iter().map(|c| c.name).collect()
}

fn build_columns(rows: &[MatchFeatureRow]) -> Vec<Column> {
    let mut cols = Vec::new();
    let text = |name: &str, f: &dyn Fn(&MatchFeatureRow) -> Option<String>| Column {
        name: name.to_string(),
        data: ColumnData::Text(rows.iter().map(f).collect()),
    };
    let int = |name: &str, f: &dyn Fn(&MatchFeatureRow) -> Option<i64>| Column {
        name: name.to_string(),
        data: ColumnData::Int(rows.iter().map(f).collect()),
    };
    let float = |name: String, f: &dyn Fn(&MatchFeatureRow) -> Option<f64>| Column {
        name,
        data: ColumnData::Float(rows.iter().map(f).collect()),
    };

    cols.push(Column {
        name: "contest_id".to_string(),
        data: ColumnData::RequiredText(rows.iter().map(|r| r.contest_id.clone()).collect()),
    });
    cols.push(Column {
        name: "event_date".to_string(),
        data: ColumnData::Date(rows.iter().map(|r| r.event_date).collect()),
    });
    cols.push(text("weight_class", &|r| r.weight_class.clone()));
    cols.push(Column {
        name: "is_title_fight".to_string(),
        data: ColumnData::Flag(rows.iter().map(|r| r.is_title_fight).collect()),
    });
    cols.push(text("winner_color", &|r| r.winner_color.clone()));
    cols.push(int("rounds_scheduled", &|r| r.rounds_scheduled));
    cols.push(text("referee", &|r| r.referee.clone()));

    for (i, name) in RATE_NAMES.iter().enumerate() {
        cols.push(float(format!("delta_{name}"), &|r| r.deltas.to_array()[i]));
    }
    cols.push(float("net_str_eff".to_string(), &|r| r.net_str_eff));
    cols.push(float("delta_age".to_string(), &|r| r.delta_age));
    cols.push(float("delta_height".to_string(), &|r| r.delta_height));
    cols.push(float("delta_reach".to_string(), &|r| r.delta_reach));

    for (prefix, pick) in [("A", side_a as fn(&MatchFeatureRow) -> &SideBlock), ("B", side_b)] {
        push_side_columns(&mut cols, rows, prefix, pick);
    }
    cols
}

fn side_a(row: &MatchFeatureRow) -> &SideBlock {
    &row.a
}

fn side_b(row: &MatchFeatureRow) -> &SideBlock {
    &row.b
}

fn push_side_columns(
    cols: &mut Vec<Column>,
    rows: &[MatchFeatureRow],
    prefix: &str,
    pick: fn(&MatchFeatureRow) -> &SideBlock,
) {
    let sides = rows.iter().map(pick).collect::<Vec<_>>();
    cols.push(Column {
        name: format!("{prefix}_participant_id"),
        data: ColumnData::RequiredText(sides.iter().map(|s| s.participant_id.clone()).collect()),
    });
    cols.push(Column {
        name: format!("{prefix}_name"),
        data: ColumnData::Text(sides.iter().map(|s| Some(s.name.clone())).collect()),
    });
    for i in 0..MetricSet::DIM {
        cols.push(Column {
            name: format!("{prefix}_avg_{}", METRIC_NAMES[i]),
            data: ColumnData::Float(sides.iter().map(|s| s.averages.to_array()[i]).collect()),
        });
    }
    for i in 0..RateBlock::DIM {
        cols.push(Column {
            name: format!("{prefix}_{}", RATE_NAMES[i]),
            data: ColumnData::Float(sides.iter().map(|s| s.rates.to_array()[i]).collect()),
        });
    }
    for i in 0..FormCounters::DIM {
        cols.push(Column {
            name: format!("{prefix}_{}", FORM_NAMES[i]),
            data: ColumnData::Int(
                sides
                    .iter()
                    .map(|s| Some(i64::from(s.form.to_array()[i])))
                    .collect(),
            ),
        });
    }
    cols.push(Column {
        name: format!("{prefix}_age"),
        data: ColumnData::Int(sides.iter().map(|s| Some(i64::from(s.age))).collect()),
    });
    cols.push(Column {
        name: format!("{prefix}_height"),
        data: ColumnData::Float(sides.iter().map(|s| s.height).collect()),
    });
    cols.push(Column {
        name: format!("{prefix}_reach"),
        data: ColumnData::Float(sides.iter().map(|s| s.reach).collect()),
    });
    cols.push(Column {
        name: format!("{prefix}_stance"),
        data: ColumnData::Text(sides.iter().map(|s| Some(s.stance.clone())).collect()),
    });
    cols.push(Column {
        name: format!("{prefix}_is_debut"),
        data: ColumnData::Flag(sides.iter().map(|s| s.is_debut).collect()),
    });
}

fn message_type(columns: &[Column]) -> String {
    let mut schema = String::from("message match_features {\n");
    for column in columns {
        schema.push_str("  ");
        schema.push_str(&column.schema_line());
        schema.push('\n');
    }
    schema.push('}');
    schema
}

/// Writes the feature table to `path` via a sibling temp file, so readers
/// never see a partial file.
pub fn write_features(
    rows: &[MatchFeatureRow],
    path: &Path,
    row_group_size: usize,
) -> Result<ExportSummary> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    let tmp = path.with_extension("parquet.tmp");
    let summary = write_file(rows, &tmp, row_group_size);
    let summary = match summary {
        Ok(summary) => summary,
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
    };
    fs::rename(&tmp, path).with_context(|| format!("swap feature file {}", path.display()))?;
    info!(
        path = %path.display(),
        rows = summary.rows,
        columns = summary.columns,
        "wrote feature table"
    );
    Ok(ExportSummary {
        path: path.to_path_buf(),
        ..summary
    })
}

fn write_file(
    rows: &[MatchFeatureRow],
    path: &Path,
    row_group_size: usize,
) -> Result<ExportSummary> {
    let schema_text = message_type(&build_columns(&[]));
    let schema = Arc::new(parse_message_type(&schema_text).context("parse feature schema")?);
    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build(),
    );
    let file = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer =
        SerializedFileWriter::new(file, schema, props).context("open parquet writer")?;

    let mut columns = 0;
    let mut row_groups = 0;
    for chunk in rows.chunks(row_group_size.max(1)) {
        let chunk_columns = build_columns(chunk);
        columns = chunk_columns.len();
        let mut group = writer.next_row_group().context("start row group")?;
        for column in &chunk_columns {
            let mut col = group
                .next_column()
                .context("next column writer")?
                .ok_or_else(|| anyhow!("schema has fewer columns than {}", column.name))?;
            column.write(&mut col)?;
            col.close().with_context(|| format!("close column {}", column.name))?;
        }
        group.close().context("close row group")?;
        row_groups += 1;
    }
    writer.close().context("close parquet writer")?;

    Ok(ExportSummary {
        path: path.to_path_buf(),
        rows: rows.len(),
        columns: if columns == 0 { column_names().len() } else { columns },
        row_groups,
    })
}

/// Every row of a written feature file, in file order.
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file).context("open parquet reader features")?;
    let iter = reader.get_row_iter(None).context("iterate feature rows")?;
    let mut out = Vec::new();
    for row in iter {
        out.push(row.context("decode feature row")?);
    }
    Ok(out)
}
