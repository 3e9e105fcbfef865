use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::model::{BoutStats, Contest, Corner, Outcome, ParticipantContestRecord};
use crate::timeline::ContestSide;

/// One participant's view of one contest: the contest's fields, the
/// participant's raw stats and the resolved opponent.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantRow {
    pub contest: Contest,
    pub participant_id: String,
    pub opponent_id: String,
    pub corner: Corner,
    pub stats: BoutStats,
}

impl ParticipantRow {
    pub fn outcome(&self) -> Outcome {
        self.contest.outcome_for(self.corner)
    }
}

impl ContestSide for ParticipantRow {
    fn contest_id(&self) -> &str {
        &self.contest.contest_id
    }

    fn participant_id(&self) -> &str {
        &self.participant_id
    }

    fn opponent_id(&self) -> &str {
        &self.opponent_id
    }

    fn event_date(&self) -> NaiveDate {
        self.contest.event_date
    }
}

/// Joins contests with their stat rows.
///
/// Output is ordered by `(event_date, contest_id)` with the red corner first.
/// Every contest must have exactly two stat rows, one per corner.
pub fn normalize(
    contests: &[Contest],
    records: &[ParticipantContestRecord],
) -> PipelineResult<Vec<ParticipantRow>> {
    let mut by_id: HashMap<&str, &Contest> = HashMap::with_capacity(contests.len());
    for contest in contests {
        if by_id.insert(&contest.contest_id, contest).is_some() {
            return Err(PipelineError::DuplicateContest {
                contest_id: contest.contest_id.clone(),
            });
        }
    }

    let mut grouped: HashMap<&str, Vec<&ParticipantContestRecord>> = HashMap::new();
    for record in records {
        if !by_id.contains_key(record.contest_id.as_str()) {
            return Err(PipelineError::UnknownContest {
                contest_id: record.contest_id.clone(),
                participant_id: record.participant_id.clone(),
            });
        }
        grouped.entry(&record.contest_id).or_default().push(record);
    }

    let mut ordered: Vec<&Contest> = contests.iter().collect();
    ordered.sort_by(|a, b| {
        a.event_date
            .cmp(&b.event_date)
            .then_with(|| a.contest_id.cmp(&b.contest_id))
    });

    let mut out = Vec::with_capacity(ordered.len() * 2);
    for contest in ordered {
        let rows = grouped
            .get(contest.contest_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let [first, second] = rows else {
            return Err(PipelineError::ContestCardinality {
                contest_id: contest.contest_id.clone(),
                found: rows.len(),
            });
        };
        let (red, blue) = assign_corners(contest, first, second)?;
        out.push(pair_row(contest, red, blue)?);
        out.push(pair_row(contest, blue, red)?);
    }

    let participants = out
        .iter()
        .map(|row| row.participant_id.as_str())
        .collect::<HashSet<_>>();
    info!(
        contests = contests.len(),
        rows = out.len(),
        participants = participants.len(),
        "normalized participant rows"
    );
    Ok(out)
}

fn assign_corners<'a>(
    contest: &Contest,
    first: &'a ParticipantContestRecord,
    second: &'a ParticipantContestRecord,
) -> PipelineResult<(&'a ParticipantContestRecord, &'a ParticipantContestRecord)> {
    let corner = |record: &ParticipantContestRecord| {
        contest
            .corner_of(&record.participant_id)
            .ok_or_else(|| PipelineError::ParticipantNotInContest {
                contest_id: contest.contest_id.clone(),
                participant_id: record.participant_id.clone(),
            })
    };
    match (corner(first)?, corner(second)?) {
        (Corner::Red, Corner::Blue) => Ok((first, second)),
        (Corner::Blue, Corner::Red) => Ok((second, first)),
        (same, _) => Err(PipelineError::DuplicateCorner {
            contest_id: contest.contest_id.clone(),
            corner: same.label().to_string(),
        }),
    }
}

fn pair_row(
    contest: &Contest,
    own: &ParticipantContestRecord,
    other: &ParticipantContestRecord,
) -> PipelineResult<ParticipantRow> {
    if let Some(stored) = own.opponent_id.as_deref()
        && stored != other.participant_id
    {
        return Err(PipelineError::OpponentMismatch {
            contest_id: contest.contest_id.clone(),
            participant_id: own.participant_id.clone(),
            stored: stored.to_string(),
            actual: other.participant_id.clone(),
        });
    }
    let Some(corner) = contest.corner_of(&own.participant_id) else {
        return Err(PipelineError::ParticipantNotInContest {
            contest_id: contest.contest_id.clone(),
            participant_id: own.participant_id.clone(),
        });
    };
    Ok(ParticipantRow {
        contest: contest.clone(),
        participant_id: own.participant_id.clone(),
        opponent_id: other.participant_id.clone(),
        corner,
        stats: own.stats,
    })
}
