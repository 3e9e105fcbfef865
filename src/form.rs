//! Win/loss streaks and method counts, shifted so each contest only sees the
//! participant's earlier contests.

use rayon::prelude::*;
use tracing::info;

use crate::mirror::MirroredRow;
use crate::model::{Outcome, WinMethod};
use crate::timeline::{participant_timelines, scatter};

/// Column names of [`FormCounters`], in [`FormCounters::to_array`] order.
pub const FORM_NAMES: [&str; FormCounters::DIM] = [
    "win_streak",
    "lose_streak",
    "longest_win_streak",
    "wins_by_ko_tko",
    "wins_by_sub",
    "wins_by_u_dec",
    "wins_by_s_dec",
    "wins_by_m_dec",
    "prior_contests",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormCounters {
    pub win_streak: u32,
    pub lose_streak: u32,
    pub longest_win_streak: u32,
    pub wins_by_ko_tko: u32,
    pub wins_by_sub: u32,
    pub wins_by_u_dec: u32,
    pub wins_by_s_dec: u32,
    pub wins_by_m_dec: u32,
    pub prior_contests: u32,
}

impl FormCounters {
    pub const DIM: usize = 9;

    pub fn is_debut(&self) -> bool {
        self.prior_contests == 0
    }

    /// Counters after one more contest.
    pub fn after(mut self, outcome: Outcome, method: Option<WinMethod>) -> Self {
        self.prior_contests += 1;
        match outcome {
            Outcome::Win => {
                self.win_streak += 1;
                self.lose_streak = 0;
                self.longest_win_streak = self.longest_win_streak.max(self.win_streak);
                match method {
                    Some(WinMethod::KoTko) => self.wins_by_ko_tko += 1,
                    Some(WinMethod::Submission) => self.wins_by_sub += 1,
                    Some(WinMethod::UnanimousDecision) => self.wins_by_u_dec += 1,
                    Some(WinMethod::SplitDecision) => self.wins_by_s_dec += 1,
                    Some(WinMethod::MajorityDecision) => self.wins_by_m_dec += 1,
                    None => {}
                }
            }
            Outcome::Loss => {
                self.win_streak = 0;
                self.lose_streak += 1;
            }
            Outcome::NoDecision => {
                self.win_streak = 0;
                self.lose_streak = 0;
            }
        }
        self
    }

    pub fn to_array(&self) -> [u32; Self::DIM] {
        [
            self.win_streak,
            self.lose_streak,
            self.longest_win_streak,
            self.wins_by_ko_tko,
            self.wins_by_sub,
            self.wins_by_u_dec,
            self.wins_by_s_dec,
            self.wins_by_m_dec,
            self.prior_contests,
        ]
    }
}

/// Counters visible before each result of one participant, oldest first.
pub fn shifted_form(results: &[(Outcome, Option<WinMethod>)]) -> Vec<FormCounters> {
    let mut current = FormCounters::default();
    results
        .iter()
        .map(|&(outcome, method)| {
            let before = current;
            current = current.after(outcome, method);
            before
        })
        .collect()
}

/// Pre-contest form counters for every row, aligned with `rows`.
pub fn track_form(rows: &[MirroredRow], parallel: bool) -> Vec<FormCounters> {
    let timelines = participant_timelines(rows);
    let run = |timeline: &Vec<usize>| {
        let results = timeline
            .iter()
            .map(|&pos| {
                let row = &rows[pos].row;
                (row.outcome(), row.contest.win_method())
            })
            .collect::<Vec<_>>();
        timeline
            .iter()
            .copied()
            .zip(shifted_form(&results))
            .collect::<Vec<_>>()
    };
    let parts = if parallel {
        timelines.par_iter().map(run).collect::<Vec<_>>()
    } else {
        timelines.iter().map(run).collect::<Vec<_>>()
    };
    info!(
        participants = timelines.len(),
        rows = rows.len(),
        "tracked historical form"
    );
    scatter(rows.len(), parts)
}
