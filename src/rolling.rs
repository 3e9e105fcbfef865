use rayon::prelude::*;
use tracing::info;

use crate::mirror::MirroredRow;
use crate::timeline::{participant_timelines, scatter};

pub const DEFAULT_EWMA_SPAN: usize = 5;

pub const METRIC_NAMES: [&str; MetricSet::DIM] = [
    "knockdowns",
    "sub_attempts",
    "reversals",
    "ctrl_time",
    "tot_str_landed",
    "tot_str_attempted",
    "td_landed",
    "td_attempted",
    "sig_str_landed",
    "sig_str_attempted",
    "head_str_landed",
    "head_str_attempted",
    "body_str_landed",
    "body_str_attempted",
    "leg_str_landed",
    "leg_str_attempted",
    "distance_str_landed",
    "distance_str_attempted",
    "clinch_str_landed",
    "clinch_str_attempted",
    "ground_str_landed",
    "ground_str_attempted",
    "sig_str_absorbed",
    "sig_str_received",
    "td_absorbed",
    "td_received",
    "total_duration",
];

/// Every tracked metric of one row. Used both for a contest's observed
/// values and for the shifted averages attached to it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSet {
    pub knockdowns: Option<f64>,
    pub sub_attempts: Option<f64>,
    pub reversals: Option<f64>,
    pub ctrl_time: Option<f64>,
    pub tot_str_landed: Option<f64>,
    pub tot_str_attempted: Option<f64>,
    pub td_landed: Option<f64>,
    pub td_attempted: Option<f64>,
    pub sig_str_landed: Option<f64>,
    pub sig_str_attempted: Option<f64>,
    pub head_str_landed: Option<f64>,
    pub head_str_attempted: Option<f64>,
    pub body_str_landed: Option<f64>,
    pub body_str_attempted: Option<f64>,
    pub leg_str_landed: Option<f64>,
    pub leg_str_attempted: Option<f64>,
    pub distance_str_landed: Option<f64>,
    pub distance_str_attempted: Option<f64>,
    pub clinch_str_landed: Option<f64>,
    pub clinch_str_attempted: Option<f64>,
    pub ground_str_landed: Option<f64>,
    pub ground_str_attempted: Option<f64>,
    pub sig_str_absorbed: Option<f64>,
    pub sig_str_received: Option<f64>,
    pub td_absorbed: Option<f64>,
    pub td_received: Option<f64>,
    // Seconds.
    pub total_duration: Option<f64>,
}

impl MetricSet {
    pub const DIM: usize = 27;

    pub fn observed(row: &MirroredRow) -> Self {
        let s = &row.row.stats;
        let r = &row.received;
        let n = |v: i64| Some(v as f64);
        Self {
            knockdowns: n(s.knockdowns),
            sub_attempts: n(s.sub_attempts),
            reversals: n(s.reversals),
            ctrl_time: s.ctrl_time.map(|v| v as f64),
            tot_str_landed: n(s.tot_str_landed),
            tot_str_attempted: n(s.tot_str_attempted),
            td_landed: n(s.td_landed),
            td_attempted: n(s.td_attempted),
            sig_str_landed: n(s.sig_str_landed),
            sig_str_attempted: n(s.sig_str_attempted),
            head_str_landed: n(s.head_str_landed),
            head_str_attempted: n(s.head_str_attempted),
            body_str_landed: n(s.body_str_landed),
            body_str_attempted: n(s.body_str_attempted),
            leg_str_landed: n(s.leg_str_landed),
            leg_str_attempted: n(s.leg_str_attempted),
            distance_str_landed: n(s.distance_str_landed),
            distance_str_attempted: n(s.distance_str_attempted),
            clinch_str_landed: n(s.clinch_str_landed),
            clinch_str_attempted: n(s.clinch_str_attempted),
            ground_str_landed: n(s.ground_str_landed),
            ground_str_attempted: n(s.ground_str_attempted),
            sig_str_absorbed: n(r.sig_str_absorbed),
            sig_str_received: n(r.sig_str_received),
            td_absorbed: n(r.td_absorbed),
            td_received: n(r.td_received),
            total_duration: row.row.contest.total_duration.map(|v| v as f64),
        }
    }

    pub fn to_array(&self) -> [Option<f64>; Self::DIM] {
        [
            self.knockdowns,
            self.sub_attempts,
            self.reversals,
            self.ctrl_time,
            self.tot_str_landed,
            self.tot_str_attempted,
            self.td_landed,
            self.td_attempted,
            self.sig_str_landed,
            self.sig_str_attempted,
            self.head_str_landed,
            self.head_str_attempted,
            self.body_str_landed,
            self.body_str_attempted,
            self.leg_str_landed,
            self.leg_str_attempted,
            self.distance_str_landed,
            self.distance_str_attempted,
            self.clinch_str_landed,
            self.clinch_str_attempted,
            self.ground_str_landed,
            self.ground_str_attempted,
            self.sig_str_absorbed,
            self.sig_str_received,
            self.td_absorbed,
            self.td_received,
            self.total_duration,
        ]
    }

    pub fn from_array(v: [Option<f64>; Self::DIM]) -> Self {
        Self {
            knockdowns: v[0],
            sub_attempts: v[1],
            reversals: v[2],
            ctrl_time: v[3],
            tot_str_landed: v[4],
            tot_str_attempted: v[5],
            td_landed: v[6],
            td_attempted: v[7],
            sig_str_landed: v[8],
            sig_str_attempted: v[9],
            head_str_landed: v[10],
            head_str_attempted: v[11],
            body_str_landed: v[12],
            body_str_attempted: v[13],
            leg_str_landed: v[14],
            leg_str_attempted: v[15],
            distance_str_landed: v[16],
            distance_str_attempted: v[17],
            clinch_str_landed: v[18],
            clinch_str_attempted: v[19],
            ground_str_landed: v[20],
            ground_str_attempted: v[21],
            sig_str_absorbed: v[22],
            sig_str_received: v[23],
            td_absorbed: v[24],
            td_received: v[25],
            total_duration: v[26],
        }
    }
}

/// `avg[0] = v[0]`, `avg[i] = alpha * v[i] + (1 - alpha) * avg[i-1]`.
///
/// Missing observations leave the average where it was.
#[derive(Debug, Clone, Copy)]
pub struct Ewma {
    alpha: f64,
    value: Option<f64>,
}

impl Ewma {
    pub fn with_span(span: usize) -> Self {
        Self {
            alpha: alpha_for_span(span),
            value: None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn update(&mut self, observation: Option<f64>) {
        let Some(x) = observation else {
            return;
        };
        self.value = Some(match self.value {
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
            None => x,
        });
    }
}

pub fn alpha_for_span(span: usize) -> f64 {
    2.0 / (span.max(1) as f64 + 1.0)
}

/// Averages visible before each observation: entry i covers values 0..i.
pub fn shifted_ewma(values: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    let mut ewma = Ewma::with_span(span);
    values
        .iter()
        .map(|&x| {
            let before = ewma.value();
            ewma.update(x);
            before
        })
        .collect()
}

pub fn rolling_averages(rows: &[MirroredRow], span: usize, parallel: bool) -> Vec<MetricSet> {
    let timelines = participant_timelines(rows);
    let run = |timeline: &Vec<usize>| timeline_averages(rows, timeline, span);
    let parts = if parallel {
        timelines.par_iter().map(run).collect::<Vec<_>>()
    } else {
        timelines.iter().map(run).collect::<Vec<_>>()
    };
    info!(
        participants = timelines.len(),
        rows = rows.len(),
        span,
        "computed causal rolling averages"
    );
    scatter(rows.len(), parts)
}

fn timeline_averages(
    rows: &[MirroredRow],
    timeline: &[usize],
    span: usize,
) -> Vec<(usize, MetricSet)> {
    let mut trackers = [Ewma::with_span(span); MetricSet::DIM];
    timeline
        .iter()
        .map(|&pos| {
            let before = trackers.map(|t| t.value());
            let observed = MetricSet::observed(&rows[pos]).to_array();
            for (tracker, x) in trackers.iter_mut().zip(observed) {
                tracker.update(x);
            }
            (pos, MetricSet::from_array(before))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn shift_excludes_the_current_contest() {
        let out = shifted_ewma(&[Some(10.0), Some(20.0), Some(30.0)], 5);
        assert_eq!(out[0], None);
        assert!(close(out[1], 10.0));
        assert!(close(out[2], 40.0 / 3.0));
    }

    #[test]
    fn missing_values_carry_the_average() {
        let out = shifted_ewma(&[None, Some(6.0), None, Some(12.0), Some(0.0)], 2);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!(close(out[2], 6.0));
        assert!(close(out[3], 6.0));
        // alpha = 2/3
        assert!(close(out[4], 10.0));
    }

    #[test]
    fn span_one_tracks_the_previous_value() {
        let out = shifted_ewma(&[Some(3.0), Some(8.0), Some(1.0)], 1);
        assert!(close(out[1], 3.0));
        assert!(close(out[2], 8.0));
    }

    #[test]
    fn metric_set_array_round_trips_every_slot() {
        let mut values = [None; MetricSet::DIM];
        for (i, v) in values.iter_mut().enumerate() {
            *v = Some(i as f64);
        }
        let set = MetricSet::from_array(values);
        assert_eq!(set.to_array(), values);
        assert_eq!(set.total_duration, Some(26.0));
        assert_eq!(METRIC_NAMES[26], "total_duration");
    }
}
