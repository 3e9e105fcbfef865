use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use crate::derived::DerivedForm;
use crate::error::{PipelineError, PipelineResult};
use crate::model::{DecisionType, FinishType, ParticipantProfile, Stance};

/// Profile attributes resolved for one participant at one contest.
#[derive(Debug, Clone, PartialEq)]
pub struct SideAttributes {
    pub name: String,
    pub height: Option<f64>,
    pub reach: Option<f64>,
    pub stance: Stance,
    pub age: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfiledForm {
    pub derived: DerivedForm,
    pub attributes: SideAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    MissingBirthDate,
    UnsupportedOutcome(String),
    UnsupportedStance(String),
}

impl ExclusionReason {
    pub fn label(&self) -> String {
        match self {
            ExclusionReason::MissingBirthDate => "missing birth date".to_string(),
            ExclusionReason::UnsupportedOutcome(what) => format!("unsupported outcome {what}"),
            ExclusionReason::UnsupportedStance(what) => format!("unsupported stance {what}"),
        }
    }
}

/// A contest left out of the output and why. `participant_id` is set when
/// one side's data caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub contest_id: String,
    pub participant_id: Option<String>,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionPolicy {
    /// DQ, draw, no contest and unknown decision subtypes.
    pub unsupported_outcomes: bool,
    /// Sideways and open stance.
    pub unsupported_stances: bool,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            unsupported_outcomes: true,
            unsupported_stances: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeJoin {
    pub rows: Vec<ProfiledForm>,
    pub exclusions: Vec<Exclusion>,
}

/// Joins profiles onto derived rows, imputes missing measurements and drops
/// whole contests that fail the data-quality policy.
pub fn join_attributes(
    rows: Vec<DerivedForm>,
    profiles: &[ParticipantProfile],
    policy: ExclusionPolicy,
    default_stance: &Stance,
) -> PipelineResult<AttributeJoin> {
    let mut by_id: HashMap<&str, &ParticipantProfile> = HashMap::with_capacity(profiles.len());
    for profile in profiles {
        if by_id.insert(&profile.participant_id, profile).is_some() {
            return Err(PipelineError::DuplicateProfile {
                participant_id: profile.participant_id.clone(),
            });
        }
    }

    let mut matched = Vec::with_capacity(rows.len());
    for row in &rows {
        let Some(profile) = by_id.get(row.participant_id()) else {
            return Err(PipelineError::UnknownParticipant {
                contest_id: row.contest_id().to_string(),
                participant_id: row.participant_id().to_string(),
            });
        };
        matched.push(*profile);
    }

    let heights = weight_class_medians(&rows, &matched, |p| p.height);
    let reaches = weight_class_medians(&rows, &matched, |p| p.reach);

    let mut exclusions = Vec::new();
    let mut excluded: BTreeSet<String> = BTreeSet::new();
    for (row, profile) in rows.iter().zip(&matched) {
        let contest = &row.source.row.contest;
        let mut reasons = Vec::new();
        if profile.dob.is_none() {
            reasons.push(ExclusionReason::MissingBirthDate);
        }
        if policy.unsupported_stances
            && let Some(stance @ (Stance::Sideways | Stance::OpenStance)) = &profile.stance
        {
            reasons.push(ExclusionReason::UnsupportedStance(stance.label().to_string()));
        }
        for reason in reasons {
            exclusions.push(Exclusion {
                contest_id: contest.contest_id.clone(),
                participant_id: Some(row.participant_id().to_string()),
                reason,
            });
            excluded.insert(contest.contest_id.clone());
        }
        if policy.unsupported_outcomes
            && !excluded.contains(&contest.contest_id)
            && let Some(what) =
                unsupported_outcome(contest.finish_type.as_ref(), contest.decision_type.as_ref())
        {
            exclusions.push(Exclusion {
                contest_id: contest.contest_id.clone(),
                participant_id: None,
                reason: ExclusionReason::UnsupportedOutcome(what),
            });
            excluded.insert(contest.contest_id.clone());
        }
    }

    for exclusion in &exclusions {
        warn!(
            contest_id = %exclusion.contest_id,
            participant_id = exclusion.participant_id.as_deref().unwrap_or("-"),
            reason = %exclusion.reason.label(),
            "excluding contest"
        );
    }

    let mut out = Vec::with_capacity(rows.len());
    for (row, profile) in rows.into_iter().zip(matched) {
        let contest = &row.source.row.contest;
        if excluded.contains(&contest.contest_id) {
            continue;
        }
        let Some(dob) = profile.dob else {
            continue;
        };
        let group = &contest.weight_class;
        let attributes = SideAttributes {
            name: profile.name.clone(),
            height: profile.height.or_else(|| heights.get(group).copied().flatten()),
            reach: profile.reach.or_else(|| reaches.get(group).copied().flatten()),
            stance: profile
                .stance
                .clone()
                .unwrap_or_else(|| default_stance.clone()),
            age: age_at(dob, contest.event_date),
        };
        out.push(ProfiledForm {
            derived: row,
            attributes,
        });
    }

    info!(
        rows = out.len(),
        excluded_contests = excluded.len(),
        "joined participant attributes"
    );
    Ok(AttributeJoin {
        rows: out,
        exclusions,
    })
}

/// Whole years between `dob` and `on`.
pub fn age_at(dob: NaiveDate, on: NaiveDate) -> i32 {
    let before_birthday = (on.month(), on.day()) < (dob.month(), dob.day());
    on.year() - dob.year() - i32::from(before_birthday)
}

/// Median of the values, averaging the middle pair for even counts.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

fn weight_class_medians(
    rows: &[DerivedForm],
    profiles: &[&ParticipantProfile],
    field: impl Fn(&ParticipantProfile) -> Option<f64>,
) -> HashMap<Option<String>, Option<f64>> {
    let mut groups: HashMap<Option<String>, Vec<f64>> = HashMap::new();
    for (row, profile) in rows.iter().zip(profiles) {
        let values = groups
            .entry(row.source.row.contest.weight_class.clone())
            .or_default();
        if let Some(v) = field(profile) {
            values.push(v);
        }
    }
    groups
        .into_iter()
        .map(|(group, mut values)| (group, median(&mut values)))
        .collect()
}

fn unsupported_outcome(
    finish: Option<&FinishType>,
    decision: Option<&DecisionType>,
) -> Option<String> {
    match finish {
        Some(
            f @ (FinishType::Disqualification
            | FinishType::Draw
            | FinishType::NoContest
            | FinishType::Other(_)),
        ) => Some(f.label().to_string()),
        Some(FinishType::Decision) => match decision {
            Some(DecisionType::Other(raw)) => Some(raw.clone()),
            None => Some("decision without subtype".to_string()),
            _ => None,
        },
        _ => None,
    }
}
