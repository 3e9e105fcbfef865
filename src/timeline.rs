use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::error::{PipelineError, PipelineResult};

pub trait ContestSide {
    fn contest_id(&self) -> &str;
    fn participant_id(&self) -> &str;
    fn opponent_id(&self) -> &str;
    fn event_date(&self) -> NaiveDate;
}

/// For every row, the position of the opponent's row in the same contest.
///
/// Fails when the opponent row is absent or does not point back.
pub fn opponent_positions<T: ContestSide>(rows: &[T]) -> PipelineResult<Vec<usize>> {
    let mut index: HashMap<(&str, &str), usize> = HashMap::with_capacity(rows.len());
    for (pos, row) in rows.iter().enumerate() {
        index.insert((row.contest_id(), row.participant_id()), pos);
    }

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(&opp) = index.get(&(row.contest_id(), row.opponent_id())) else {
            return Err(PipelineError::MissingOpponent {
                contest_id: row.contest_id().to_string(),
                participant_id: row.participant_id().to_string(),
                opponent_id: row.opponent_id().to_string(),
            });
        };
        let back = rows[opp].opponent_id();
        if back != row.participant_id() {
            return Err(PipelineError::OpponentMismatch {
                contest_id: row.contest_id().to_string(),
                participant_id: rows[opp].participant_id().to_string(),
                stored: back.to_string(),
                actual: row.participant_id().to_string(),
            });
        }
        out.push(opp);
    }
    Ok(out)
}

/// Row positions of each participant's contests, oldest first.
pub fn participant_timelines<T: ContestSide>(rows: &[T]) -> Vec<Vec<usize>> {
    let mut grouped: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (pos, row) in rows.iter().enumerate() {
        grouped.entry(row.participant_id()).or_default().push(pos);
    }
    grouped
        .into_values()
        .map(|mut positions| {
            positions.sort_by(|&a, &b| {
                rows[a]
                    .event_date()
                    .cmp(&rows[b].event_date())
                    .then_with(|| rows[a].contest_id().cmp(rows[b].contest_id()))
            });
            positions
        })
        .collect()
}

pub fn scatter<V: Clone + Default>(len: usize, parts: Vec<Vec<(usize, V)>>) -> Vec<V> {
    let mut out = vec![V::default(); len];
    for part in parts {
        for (pos, value) in part {
            out[pos] = value;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        contest: &'static str,
        me: &'static str,
        opp: &'static str,
        day: u32,
    }

    impl ContestSide for Row {
        fn contest_id(&self) -> &str {
            self.contest
        }
        fn participant_id(&self) -> &str {
            self.me
        }
        fn opponent_id(&self) -> &str {
            self.opp
        }
        fn event_date(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2021, 3, self.day).unwrap()
        }
    }

    fn row(contest: &'static str, me: &'static str, opp: &'static str, day: u32) -> Row {
        Row {
            contest,
            me,
            opp,
            day,
        }
    }

    #[test]
    fn pairs_non_adjacent_rows_by_id() {
        let rows = vec![
            row("c1", "a", "b", 1),
            row("c2", "c", "d", 2),
            row("c2", "d", "c", 2),
            row("c1", "b", "a", 1),
        ];
        assert_eq!(opponent_positions(&rows).unwrap(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn one_sided_pointer_is_rejected() {
        let rows = vec![row("c1", "a", "b", 1), row("c1", "b", "z", 1)];
        let err = opponent_positions(&rows).unwrap_err();
        assert_eq!(err.contest_id(), Some("c1"));
    }

    #[test]
    fn timelines_sort_by_date_then_contest() {
        let rows = vec![
            row("c9", "a", "x", 5),
            row("c3", "a", "y", 5),
            row("c1", "a", "z", 1),
            row("c2", "b", "w", 2),
        ];
        assert_eq!(participant_timelines(&rows), vec![vec![2, 1, 0], vec![3]]);
    }
}
