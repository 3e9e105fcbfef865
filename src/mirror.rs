use chrono::NaiveDate;

use crate::error::PipelineResult;
use crate::normalize::ParticipantRow;
use crate::timeline::{ContestSide, opponent_positions};

/// What the opponent landed on this participant in the same contest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceivedStats {
    // Opponent's significant strikes landed.
    pub sig_str_absorbed: i64,
    // Opponent's significant strikes attempted.
    pub sig_str_received: i64,
    pub td_absorbed: i64,
    pub td_received: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MirroredRow {
    pub row: ParticipantRow,
    pub received: ReceivedStats,
}

impl ContestSide for MirroredRow {
    fn contest_id(&self) -> &str {
        self.row.contest_id()
    }

    fn participant_id(&self) -> &str {
        self.row.participant_id()
    }

    fn opponent_id(&self) -> &str {
        self.row.opponent_id()
    }

    fn event_date(&self) -> NaiveDate {
        self.row.event_date()
    }
}

/// Attaches each participant's received stats, taken from the opponent's row.
///
/// Rows keep their input order.
pub fn mirror_opponents(rows: Vec<ParticipantRow>) -> PipelineResult<Vec<MirroredRow>> {
    let opponents = opponent_positions(&rows)?;
    let received = opponents
        .iter()
        .map(|&opp| {
            let theirs = &rows[opp].stats;
            ReceivedStats {
                sig_str_absorbed: theirs.sig_str_landed,
                sig_str_received: theirs.sig_str_attempted,
                td_absorbed: theirs.td_landed,
                td_received: theirs.td_attempted,
            }
        })
        .collect::<Vec<_>>();

    Ok(rows
        .into_iter()
        .zip(received)
        .map(|(row, received)| MirroredRow { row, received })
        .collect())
}
