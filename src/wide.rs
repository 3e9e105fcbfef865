use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::attributes::ProfiledForm;
use crate::error::{PipelineError, PipelineResult};
use crate::form::FormCounters;
use crate::model::{Contest, Corner};
use crate::rates::{RateBlock, RateDelta};
use crate::rolling::MetricSet;

/// One participant's pre-contest features inside a wide row.
#[derive(Debug, Clone, PartialEq)]
pub struct SideBlock {
    pub participant_id: String,
    pub name: String,
    pub averages: MetricSet,
    pub rates: RateBlock,
    pub form: FormCounters,
    pub age: i32,
    pub height: Option<f64>,
    pub reach: Option<f64>,
    pub stance: String,
    pub is_debut: bool,
}

impl SideBlock {
    fn from_profiled(row: &ProfiledForm) -> Self {
        let derived = &row.derived;
        let attrs = &row.attributes;
        Self {
            participant_id: derived.participant_id().to_string(),
            name: attrs.name.clone(),
            averages: derived.averages,
            rates: derived.rates,
            form: derived.form,
            age: attrs.age,
            height: attrs.height,
            reach: attrs.reach,
            stance: attrs.stance.label().to_string(),
            is_debut: derived.is_debut(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchFeatureRow {
    pub contest_id: String,
    pub event_date: NaiveDate,
    pub weight_class: Option<String>,
    pub is_title_fight: bool,
    /// Training target. The only column describing how the contest ended.
    pub winner_color: Option<String>,
    pub rounds_scheduled: Option<i64>,
    pub referee: Option<String>,
    /// Side A rates minus side B rates.
    pub deltas: RateBlock,
    pub net_str_eff: Option<f64>,
    pub delta_age: Option<f64>,
    pub delta_height: Option<f64>,
    pub delta_reach: Option<f64>,
    pub a: SideBlock,
    pub b: SideBlock,
}

impl MatchFeatureRow {
    fn assemble(contest: &Contest, red: &ProfiledForm, blue: &ProfiledForm) -> Self {
        let a = SideBlock::from_profiled(red);
        let b = SideBlock::from_profiled(blue);
        let RateDelta {
            deltas,
            net_str_eff,
        } = red.derived.delta;
        Self {
            contest_id: contest.contest_id.clone(),
            event_date: contest.event_date,
            weight_class: contest.weight_class.clone(),
            is_title_fight: contest.is_title_fight,
            winner_color: contest.winner_color.map(|c| c.label().to_string()),
            rounds_scheduled: contest.rounds_scheduled,
            referee: contest.referee.clone(),
            deltas,
            net_str_eff,
            delta_age: Some(f64::from(a.age - b.age)),
            delta_height: difference(a.height, b.height),
            delta_reach: difference(a.reach, b.reach),
            a,
            b,
        }
    }
}

fn difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

#[derive(Default)]
struct Sides<'a> {
    red: Vec<&'a ProfiledForm>,
    blue: Vec<&'a ProfiledForm>,
}

/// Pivots per-participant rows into one row per contest, ordered by
/// `(event_date, contest_id)`.
///
/// Every contest present must have exactly one row per corner.
pub fn assemble_wide(rows: &[ProfiledForm]) -> PipelineResult<Vec<MatchFeatureRow>> {
    let mut grouped: BTreeMap<(NaiveDate, &str), Sides> = BTreeMap::new();
    for row in rows {
        let contest = &row.derived.source.row.contest;
        let sides = grouped
            .entry((contest.event_date, contest.contest_id.as_str()))
            .or_default();
        // Corners come from the contest's canonical fighter ids.
        match contest.corner_of(row.derived.participant_id()) {
            Some(Corner::Red) => sides.red.push(row),
            Some(Corner::Blue) => sides.blue.push(row),
            None => {
                return Err(PipelineError::ParticipantNotInContest {
                    contest_id: contest.contest_id.clone(),
                    participant_id: row.derived.participant_id().to_string(),
                });
            }
        }
    }

    let mut out = Vec::with_capacity(grouped.len());
    for ((_, contest_id), sides) in grouped {
        let red = single_side(contest_id, "A", &sides.red)?;
        let blue = single_side(contest_id, "B", &sides.blue)?;
        let contest = &red.derived.source.row.contest;
        out.push(MatchFeatureRow::assemble(contest, red, blue));
    }
    info!(contests = out.len(), "assembled wide feature rows");
    Ok(out)
}

fn single_side<'a>(
    contest_id: &str,
    side: &'static str,
    rows: &[&'a ProfiledForm],
) -> PipelineResult<&'a ProfiledForm> {
    match rows {
        [only] => Ok(*only),
        _ => Err(PipelineError::SideCardinality {
            contest_id: contest_id.to_string(),
            side,
            found: rows.len(),
        }),
    }
}
