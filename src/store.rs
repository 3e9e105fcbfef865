//! SQLite store holding the raw contest, stat and profile tables.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OpenFlags, Row, Transaction, params};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PipelineError;
use crate::model::{
    BoutStats, Contest, Corner, DecisionType, FinishType, ParticipantContestRecord,
    ParticipantProfile, Stance,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Full contents of the three raw tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTables {
    pub contests: Vec<Contest>,
    #[serde(default)]
    pub records: Vec<ParticipantContestRecord>,
    #[serde(default)]
    pub profiles: Vec<ParticipantProfile>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub contests_upserted: usize,
    pub records_upserted: usize,
    pub profiles_upserted: usize,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Opens a store that must already exist, without creating or migrating it.
pub fn open_existing(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        bail!("sqlite db {} does not exist", path.display());
    }
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("open sqlite db {} read-only", path.display()))
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS contests (
            contest_id TEXT PRIMARY KEY,
            event_date TEXT NOT NULL,
            weight_class TEXT NULL,
            is_title_fight INTEGER NOT NULL,
            red_fighter_id TEXT NOT NULL,
            blue_fighter_id TEXT NOT NULL,
            winner_color TEXT NULL,
            end_round INTEGER NULL,
            total_duration INTEGER NULL,
            rounds_scheduled INTEGER NULL,
            finish_type TEXT NULL,
            decision_type TEXT NULL,
            referee TEXT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_contests_event_date ON contests(event_date);

        CREATE TABLE IF NOT EXISTS participant_contests (
            contest_id TEXT NOT NULL,
            participant_id TEXT NOT NULL,
            opponent_id TEXT NULL,
            knockdowns INTEGER NOT NULL DEFAULT 0,
            sub_attempts INTEGER NOT NULL DEFAULT 0,
            reversals INTEGER NOT NULL DEFAULT 0,
            ctrl_time INTEGER NULL,
            tot_str_landed INTEGER NOT NULL DEFAULT 0,
            tot_str_attempted INTEGER NOT NULL DEFAULT 0,
            td_landed INTEGER NOT NULL DEFAULT 0,
            td_attempted INTEGER NOT NULL DEFAULT 0,
            sig_str_landed INTEGER NOT NULL DEFAULT 0,
            sig_str_attempted INTEGER NOT NULL DEFAULT 0,
            head_str_landed INTEGER NOT NULL DEFAULT 0,
            head_str_attempted INTEGER NOT NULL DEFAULT 0,
            body_str_landed INTEGER NOT NULL DEFAULT 0,
            body_str_attempted INTEGER NOT NULL DEFAULT 0,
            leg_str_landed INTEGER NOT NULL DEFAULT 0,
            leg_str_attempted INTEGER NOT NULL DEFAULT 0,
            distance_str_landed INTEGER NOT NULL DEFAULT 0,
            distance_str_attempted INTEGER NOT NULL DEFAULT 0,
            clinch_str_landed INTEGER NOT NULL DEFAULT 0,
            clinch_str_attempted INTEGER NOT NULL DEFAULT 0,
            ground_str_landed INTEGER NOT NULL DEFAULT 0,
            ground_str_attempted INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (contest_id, participant_id)
        );
        CREATE INDEX IF NOT EXISTS idx_participant_contests_participant
            ON participant_contests(participant_id);

        CREATE TABLE IF NOT EXISTS participants (
            participant_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            height REAL NULL,
            weight REAL NULL,
            reach REAL NULL,
            stance TEXT NULL,
            dob TEXT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

struct ContestRow {
    contest_id: String,
    event_date: String,
    weight_class: Option<String>,
    is_title_fight: bool,
    red_fighter_id: String,
    blue_fighter_id: String,
    winner_color: Option<String>,
    end_round: Option<i64>,
    total_duration: Option<i64>,
    rounds_scheduled: Option<i64>,
    finish_type: Option<String>,
    decision_type: Option<String>,
    referee: Option<String>,
}

impl ContestRow {
    fn into_contest(self) -> Result<Contest> {
        let event_date = parse_date("contests", &self.contest_id, "event_date", &self.event_date)?;
        let winner_color = match non_empty(self.winner_color) {
            Some(raw) => Some(Corner::parse(&raw).ok_or_else(|| PipelineError::InvalidField {
                table: "contests",
                key: self.contest_id.clone(),
                field: "winner_color",
                value: raw.clone(),
            })?),
            None => None,
        };
        Ok(Contest {
            contest_id: self.contest_id,
            event_date,
            weight_class: non_empty(self.weight_class),
            is_title_fight: self.is_title_fight,
            red_fighter_id: self.red_fighter_id,
            blue_fighter_id: self.blue_fighter_id,
            winner_color,
            end_round: self.end_round,
            total_duration: self.total_duration,
            rounds_scheduled: self.rounds_scheduled,
            finish_type: non_empty(self.finish_type).map(|raw| FinishType::parse(&raw)),
            decision_type: non_empty(self.decision_type).map(|raw| DecisionType::parse(&raw)),
            referee: non_empty(self.referee),
        })
    }
}

/// Contests ordered by date, then id.
pub fn load_contests(conn: &Connection) -> Result<Vec<Contest>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                contest_id, event_date, weight_class, is_title_fight,
                red_fighter_id, blue_fighter_id, winner_color,
                end_round, total_duration, rounds_scheduled,
                finish_type, decision_type, referee
            FROM contests
            ORDER BY event_date ASC, contest_id ASC
            "#,
        )
        .context("prepare load contests query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ContestRow {
                contest_id: row.get(0)?,
                event_date: row.get(1)?,
                weight_class: row.get(2)?,
                is_title_fight: row.get::<_, i64>(3)? != 0,
                red_fighter_id: row.get(4)?,
                blue_fighter_id: row.get(5)?,
                winner_color: row.get(6)?,
                end_round: row.get(7)?,
                total_duration: row.get(8)?,
                rounds_scheduled: row.get(9)?,
                finish_type: row.get(10)?,
                decision_type: row.get(11)?,
                referee: row.get(12)?,
            })
        })
        .context("query load contests")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode contest row")?.into_contest()?);
    }
    Ok(out)
}

pub fn load_participant_records(conn: &Connection) -> Result<Vec<ParticipantContestRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                contest_id, participant_id, opponent_id,
                knockdowns, sub_attempts, reversals, ctrl_time,
                tot_str_landed, tot_str_attempted, td_landed, td_attempted,
                sig_str_landed, sig_str_attempted,
                head_str_landed, head_str_attempted,
                body_str_landed, body_str_attempted,
                leg_str_landed, leg_str_attempted,
                distance_str_landed, distance_str_attempted,
                clinch_str_landed, clinch_str_attempted,
                ground_str_landed, ground_str_attempted
            FROM participant_contests
            ORDER BY contest_id ASC, participant_id ASC
            "#,
        )
        .context("prepare load participant contests query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ParticipantContestRecord {
                contest_id: row.get(0)?,
                participant_id: row.get(1)?,
                opponent_id: row
                    .get::<_, Option<String>>(2)?
                    .filter(|id| !id.trim().is_empty()),
                stats: stats_from_row(row, 3)?,
            })
        })
        .context("query load participant contests")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode participant contest row")?);
    }
    Ok(out)
}

fn stats_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<BoutStats> {
    let at = |offset: usize| row.get::<_, i64>(start + offset);
    Ok(BoutStats {
        knockdowns: at(0)?,
        sub_attempts: at(1)?,
        reversals: at(2)?,
        ctrl_time: row.get(start + 3)?,
        tot_str_landed: at(4)?,
        tot_str_attempted: at(5)?,
        td_landed: at(6)?,
        td_attempted: at(7)?,
        sig_str_landed: at(8)?,
        sig_str_attempted: at(9)?,
        head_str_landed: at(10)?,
        head_str_attempted: at(11)?,
        body_str_landed: at(12)?,
        body_str_attempted: at(13)?,
        leg_str_landed: at(14)?,
        leg_str_attempted: at(15)?,
        distance_str_landed: at(16)?,
        distance_str_attempted: at(17)?,
        clinch_str_landed: at(18)?,
        clinch_str_attempted: at(19)?,
        ground_str_landed: at(20)?,
        ground_str_attempted: at(21)?,
    })
}

pub fn load_profiles(conn: &Connection) -> Result<Vec<ParticipantProfile>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT participant_id, name, height, weight, reach, stance, dob
            FROM participants
            ORDER BY participant_id ASC
            "#,
        )
        .context("prepare load participants query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<f64>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })
        .context("query load participants")?;

    let mut out = Vec::new();
    for row in rows {
        let (participant_id, name, height, weight, reach, stance, dob) =
            row.context("decode participant row")?;
        let dob = match non_empty(dob) {
            Some(raw) => Some(parse_date("participants", &participant_id, "dob", &raw)?),
            None => None,
        };
        out.push(ParticipantProfile {
            participant_id,
            name,
            height,
            weight,
            reach,
            stance: non_empty(stance).map(|raw| Stance::parse(&raw)),
            dob,
        });
    }
    Ok(out)
}

pub fn load_tables(conn: &Connection) -> Result<RawTables> {
    let tables = RawTables {
        contests: load_contests(conn)?,
        records: load_participant_records(conn)?,
        profiles: load_profiles(conn)?,
    };
    info!(
        contests = tables.contests.len(),
        records = tables.records.len(),
        profiles = tables.profiles.len(),
        "loaded raw tables"
    );
    Ok(tables)
}

pub fn upsert_contest(tx: &Transaction<'_>, c: &Contest) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO contests (
            contest_id, event_date, weight_class, is_title_fight,
            red_fighter_id, blue_fighter_id, winner_color,
            end_round, total_duration, rounds_scheduled,
            finish_type, decision_type, referee, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ON CONFLICT(contest_id) DO UPDATE SET
            event_date = excluded.event_date,
            weight_class = excluded.weight_class,
            is_title_fight = excluded.is_title_fight,
            red_fighter_id = excluded.red_fighter_id,
            blue_fighter_id = excluded.blue_fighter_id,
            winner_color = excluded.winner_color,
            end_round = excluded.end_round,
            total_duration = excluded.total_duration,
            rounds_scheduled = excluded.rounds_scheduled,
            finish_type = excluded.finish_type,
            decision_type = excluded.decision_type,
            referee = excluded.referee,
            updated_at = excluded.updated_at
        "#,
        params![
            c.contest_id,
            c.event_date.format(DATE_FORMAT).to_string(),
            c.weight_class,
            bool_to_i64(c.is_title_fight),
            c.red_fighter_id,
            c.blue_fighter_id,
            c.winner_color.map(|w| w.label()),
            c.end_round,
            c.total_duration,
            c.rounds_scheduled,
            c.finish_type.as_ref().map(|f| f.label()),
            c.decision_type.as_ref().map(|d| d.label()),
            c.referee,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("upsert contest {}", c.contest_id))?;
    Ok(())
}

pub fn upsert_participant_record(
    tx: &Transaction<'_>,
    r: &ParticipantContestRecord,
) -> Result<()> {
    let s = &r.stats;
    tx.execute(
        r#"
        INSERT INTO participant_contests (
            contest_id, participant_id, opponent_id,
            knockdowns, sub_attempts, reversals, ctrl_time,
            tot_str_landed, tot_str_attempted, td_landed, td_attempted,
            sig_str_landed, sig_str_attempted,
            head_str_landed, head_str_attempted,
            body_str_landed, body_str_attempted,
            leg_str_landed, leg_str_attempted,
            distance_str_landed, distance_str_attempted,
            clinch_str_landed, clinch_str_attempted,
            ground_str_landed, ground_str_attempted,
            updated_at
        ) VALUES (
            ?1, ?2, ?3,
            ?4, ?5, ?6, ?7,
            ?8, ?9, ?10, ?11,
            ?12, ?13,
            ?14, ?15,
            ?16, ?17,
            ?18, ?19,
            ?20, ?21,
            ?22, ?23,
            ?24, ?25,
            ?26
        )
        ON CONFLICT(contest_id, participant_id) DO UPDATE SET
            opponent_id = excluded.opponent_id,
            knockdowns = excluded.knockdowns,
            sub_attempts = excluded.sub_attempts,
            reversals = excluded.reversals,
            ctrl_time = excluded.ctrl_time,
            tot_str_landed = excluded.tot_str_landed,
            tot_str_attempted = excluded.tot_str_attempted,
            td_landed = excluded.td_landed,
            td_attempted = excluded.td_attempted,
            sig_str_landed = excluded.sig_str_landed,
            sig_str_attempted = excluded.sig_str_attempted,
            head_str_landed = excluded.head_str_landed,
            head_str_attempted = excluded.head_str_attempted,
            body_str_landed = excluded.body_str_landed,
            body_str_attempted = excluded.body_str_attempted,
            leg_str_landed = excluded.leg_str_landed,
            leg_str_attempted = excluded.leg_str_attempted,
            distance_str_landed = excluded.distance_str_landed,
            distance_str_attempted = excluded.distance_str_attempted,
            clinch_str_landed = excluded.clinch_str_landed,
            clinch_str_attempted = excluded.clinch_str_attempted,
            ground_str_landed = excluded.ground_str_landed,
            ground_str_attempted = excluded.ground_str_attempted,
            updated_at = excluded.updated_at
        "#,
        params![
            r.contest_id,
            r.participant_id,
            r.opponent_id,
            s.knockdowns,
            s.sub_attempts,
            s.reversals,
            s.ctrl_time,
            s.tot_str_landed,
            s.tot_str_attempted,
            s.td_landed,
            s.td_attempted,
            s.sig_str_landed,
            s.sig_str_attempted,
            s.head_str_landed,
            s.head_str_attempted,
            s.body_str_landed,
            s.body_str_attempted,
            s.leg_str_landed,
            s.leg_str_attempted,
            s.distance_str_landed,
            s.distance_str_attempted,
            s.clinch_str_landed,
            s.clinch_str_attempted,
            s.ground_str_landed,
            s.ground_str_attempted,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| {
        format!(
            "upsert participant contest {}/{}",
            r.contest_id, r.participant_id
        )
    })?;
    Ok(())
}

pub fn upsert_profile(tx: &Transaction<'_>, p: &ParticipantProfile) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO participants (
            participant_id, name, height, weight, reach, stance, dob, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(participant_id) DO UPDATE SET
            name = excluded.name,
            height = excluded.height,
            weight = excluded.weight,
            reach = excluded.reach,
            stance = excluded.stance,
            dob = excluded.dob,
            updated_at = excluded.updated_at
        "#,
        params![
            p.participant_id,
            p.name,
            p.height,
            p.weight,
            p.reach,
            p.stance.as_ref().map(|s| s.label()),
            p.dob.map(|d| d.format(DATE_FORMAT).to_string()),
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("upsert participant {}", p.participant_id))?;
    Ok(())
}

/// Upserts a whole snapshot in one transaction.
pub fn import_snapshot(conn: &mut Connection, tables: &RawTables) -> Result<ImportSummary> {
    let tx = conn.transaction().context("begin import transaction")?;
    let mut summary = ImportSummary::default();
    for contest in &tables.contests {
        upsert_contest(&tx, contest)?;
        summary.contests_upserted += 1;
    }
    for record in &tables.records {
        upsert_participant_record(&tx, record)?;
        summary.records_upserted += 1;
    }
    for profile in &tables.profiles {
        upsert_profile(&tx, profile)?;
        summary.profiles_upserted += 1;
    }
    tx.commit().context("commit import transaction")?;
    info!(
        contests = summary.contests_upserted,
        records = summary.records_upserted,
        profiles = summary.profiles_upserted,
        "imported snapshot"
    );
    Ok(summary)
}

pub fn read_snapshot(path: &Path) -> Result<RawTables> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read snapshot {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse snapshot {}", path.display()))
}

fn parse_date(
    table: &'static str,
    key: &str,
    field: &'static str,
    raw: &str,
) -> Result<NaiveDate, PipelineError> {
    let trimmed = raw.trim();
    // Some exports carry a time component.
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|_| PipelineError::InvalidField {
        table,
        key: key.to_string(),
        field,
        value: raw.to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn bool_to_i64(value: bool) -> i64 {
    if value { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contest(id: &str) -> Contest {
        Contest {
            contest_id: id.to_string(),
            event_date: NaiveDate::from_ymd_opt(2018, 9, 8).unwrap(),
            weight_class: Some("Flyweight".to_string()),
            is_title_fight: true,
            red_fighter_id: "r".to_string(),
            blue_fighter_id: "b".to_string(),
            winner_color: Some(Corner::Red),
            end_round: Some(5),
            total_duration: Some(1500),
            rounds_scheduled: Some(5),
            finish_type: Some(FinishType::Decision),
            decision_type: Some(DecisionType::Split),
            referee: None,
        }
    }

    #[test]
    fn contest_survives_the_store() {
        let mut conn = open_in_memory().unwrap();
        let tables = RawTables {
            contests: vec![contest("c1")],
            records: vec![ParticipantContestRecord {
                contest_id: "c1".to_string(),
                participant_id: "r".to_string(),
                opponent_id: None,
                stats: BoutStats {
                    sig_str_landed: 44,
                    ctrl_time: None,
                    ..BoutStats::default()
                },
            }],
            profiles: vec![ParticipantProfile {
                participant_id: "r".to_string(),
                name: "Red Fighter".to_string(),
                height: Some(67.0),
                weight: None,
                reach: None,
                stance: Some(Stance::Switch),
                dob: NaiveDate::from_ymd_opt(1991, 2, 3),
            }],
        };
        let summary = import_snapshot(&mut conn, &tables).unwrap();
        assert_eq!(summary.records_upserted, 1);
        // Upserts are idempotent.
        import_snapshot(&mut conn, &tables).unwrap();

        let loaded = load_tables(&conn).unwrap();
        assert_eq!(loaded, tables);
    }

    #[test]
    fn bad_date_is_an_invalid_field() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO contests (contest_id, event_date, is_title_fight, red_fighter_id, blue_fighter_id, updated_at)
             VALUES ('c9', 'not-a-date', 0, 'a', 'b', 'now')",
            [],
        )
        .unwrap();
        let err = load_contests(&conn).unwrap_err();
        let err = err.downcast_ref::<PipelineError>().unwrap();
        assert!(matches!(
            err,
            PipelineError::InvalidField { field: "event_date", .. }
        ));
    }

    #[test]
    fn open_existing_never_creates_a_store() {
        let dir = std::env::temp_dir().join("bout_features_store_missing");
        let path = dir.join("typo.sqlite");
        let _ = std::fs::remove_dir_all(&dir);
        assert!(open_existing(&path).is_err());
        assert!(!path.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn dates_with_time_are_accepted() {
        assert_eq!(
            parse_date("contests", "c1", "event_date", "2020-03-07 00:00:00").unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 7).unwrap()
        );
    }
}
