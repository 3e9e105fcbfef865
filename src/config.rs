use std::path::PathBuf;

use crate::attributes::ExclusionPolicy;
use crate::error::{PipelineError, PipelineResult};
use crate::export::DEFAULT_ROW_GROUP_SIZE;
use crate::model::Stance;
use crate::rolling::DEFAULT_EWMA_SPAN;

const CACHE_DIR: &str = "bout_features";
const DB_FILE: &str = "bouts.sqlite";
const OUT_FILE: &str = "match_features.parquet";

pub const ENV_DB_PATH: &str = "BOUT_DB_PATH";
pub const ENV_OUT_PATH: &str = "BOUT_OUT_PATH";
pub const ENV_EWMA_SPAN: &str = "BOUT_EWMA_SPAN";

/// Knobs of the pure feature stages.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSettings {
    pub ewma_span: usize,
    pub default_stance: Stance,
    pub parallel: bool,
    pub exclusions: ExclusionPolicy,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            ewma_span: DEFAULT_EWMA_SPAN,
            default_stance: Stance::Orthodox,
            parallel: true,
            exclusions: ExclusionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub db_path: PathBuf,
    pub out_path: PathBuf,
    pub row_group_size: usize,
    pub features: FeatureSettings,
}

impl PipelineConfig {
    /// Reads the process arguments and environment.
    pub fn from_env() -> PipelineResult<Self> {
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Arguments win over environment variables, which win over defaults.
    pub fn from_sources(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> PipelineResult<Self> {
        let env_path = |key: &str| {
            env(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };

        let db_path = arg_value(args, "--db")
            .map(PathBuf::from)
            .or_else(|| env_path(ENV_DB_PATH))
            .or_else(default_db_path)
            .ok_or_else(|| PipelineError::Config("unable to resolve sqlite path".to_string()))?;
        let out_path = arg_value(args, "--out")
            .map(PathBuf::from)
            .or_else(|| env_path(ENV_OUT_PATH))
            .unwrap_or_else(|| PathBuf::from(OUT_FILE));

        let ewma_span = match arg_value(args, "--span").or_else(|| env(ENV_EWMA_SPAN)) {
            Some(raw) => parse_span(&raw)?,
            None => DEFAULT_EWMA_SPAN,
        };
        let parallel = !args.iter().any(|a| a == "--serial");

        Ok(Self {
            db_path,
            out_path,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            features: FeatureSettings {
                ewma_span,
                parallel,
                ..FeatureSettings::default()
            },
        })
    }
}

fn parse_span(raw: &str) -> PipelineResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(span) if span >= 1 => Ok(span),
        _ => Err(PipelineError::Config(format!(
            "ewma span must be a positive integer, got {raw:?}"
        ))),
    }
}

/// Value of `--name=value` or `--name value`.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

/// Loads `.env.local` then `.env`; values already set are kept.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn arguments_take_both_forms() {
        let a = args(&["--db=/tmp/a.sqlite", "--out", "feat.parquet", "--span", "3", "--serial"]);
        let cfg = PipelineConfig::from_sources(&a, no_env).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/a.sqlite"));
        assert_eq!(cfg.out_path, PathBuf::from("feat.parquet"));
        assert_eq!(cfg.features.ewma_span, 3);
        assert!(!cfg.features.parallel);
    }

    #[test]
    fn environment_fills_gaps() {
        let env = |key: &str| match key {
            ENV_DB_PATH => Some("/data/bouts.sqlite".to_string()),
            ENV_EWMA_SPAN => Some("7".to_string()),
            ENV_OUT_PATH => Some("  ".to_string()),
            _ => None,
        };
        let cfg = PipelineConfig::from_sources(&args(&["--out=x.parquet"]), env).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/data/bouts.sqlite"));
        assert_eq!(cfg.out_path, PathBuf::from("x.parquet"));
        assert_eq!(cfg.features.ewma_span, 7);
        assert!(cfg.features.parallel);
        assert_eq!(cfg.features.default_stance, Stance::Orthodox);
    }

    #[test]
    fn zero_span_is_rejected() {
        let a = args(&["--db", "x.sqlite", "--span=0"]);
        assert!(matches!(
            PipelineConfig::from_sources(&a, no_env),
            Err(PipelineError::Config(_))
        ));
        assert!(parse_span("five").is_err());
    }

    #[test]
    fn dangling_flag_is_ignored() {
        assert_eq!(arg_value(&args(&["--db"]), "--db"), None);
        assert_eq!(arg_value(&args(&["--dbx=1"]), "--db"), None);
    }
}
