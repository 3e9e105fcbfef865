use tracing::info;

use crate::error::PipelineResult;
use crate::mirror::MirroredRow;
use crate::rolling::MetricSet;
use crate::timeline::opponent_positions;

pub const RATE_NAMES: [&str; RateBlock::DIM] = [
    "slpm",
    "sapm",
    "str_acc",
    "str_def",
    "td_avg",
    "td_acc",
    "td_def",
    "sub_avg",
    "head_ratio",
    "head_acc",
    "body_ratio",
    "body_acc",
    "leg_ratio",
    "leg_acc",
    "distance_ratio",
    "distance_acc",
    "clinch_ratio",
    "clinch_acc",
    "ground_ratio",
    "ground_acc",
    "knockdown_avg",
    "reversal_avg",
    "ctrl_time_pct",
    "str_eff",
];

const SECONDS_PER_MINUTE: f64 = 60.0;
// Per-15-minutes rates match the conventional three-round contest length.
const SECONDS_PER_FIFTEEN: f64 = 900.0;

/// Normalised rates derived from one row's shifted averages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateBlock {
    pub slpm: Option<f64>,
    pub sapm: Option<f64>,
    pub str_acc: Option<f64>,
    pub str_def: Option<f64>,
    pub td_avg: Option<f64>,
    pub td_acc: Option<f64>,
    pub td_def: Option<f64>,
    pub sub_avg: Option<f64>,
    pub head_ratio: Option<f64>,
    pub head_acc: Option<f64>,
    pub body_ratio: Option<f64>,
    pub body_acc: Option<f64>,
    pub leg_ratio: Option<f64>,
    pub leg_acc: Option<f64>,
    pub distance_ratio: Option<f64>,
    pub distance_acc: Option<f64>,
    pub clinch_ratio: Option<f64>,
    pub clinch_acc: Option<f64>,
    pub ground_ratio: Option<f64>,
    pub ground_acc: Option<f64>,
    pub knockdown_avg: Option<f64>,
    pub reversal_avg: Option<f64>,
    pub ctrl_time_pct: Option<f64>,
    pub str_eff: Option<f64>,
}

impl RateBlock {
    pub const DIM: usize = 24;

    pub fn from_averages(avg: &MetricSet) -> Self {
        let duration = avg.total_duration;
        let per_minute = |count| ratio(count, duration.map(|d| d / SECONDS_PER_MINUTE));
        let per_fifteen = |count| ratio(count, duration.map(|d| d / SECONDS_PER_FIFTEEN));
        let share = |part| ratio(part, avg.sig_str_landed);

        Self {
            slpm: per_minute(avg.sig_str_landed),
            sapm: per_minute(avg.sig_str_absorbed),
            str_acc: ratio(avg.sig_str_landed, avg.sig_str_attempted),
            str_def: defense(avg.sig_str_received, avg.sig_str_absorbed),
            td_avg: per_fifteen(avg.td_landed),
            td_acc: ratio(avg.td_landed, avg.td_attempted),
            td_def: defense(avg.td_received, avg.td_absorbed),
            sub_avg: per_fifteen(avg.sub_attempts),
            head_ratio: share(avg.head_str_landed),
            head_acc: ratio(avg.head_str_landed, avg.head_str_attempted),
            body_ratio: share(avg.body_str_landed),
            body_acc: ratio(avg.body_str_landed, avg.body_str_attempted),
            leg_ratio: share(avg.leg_str_landed),
            leg_acc: ratio(avg.leg_str_landed, avg.leg_str_attempted),
            distance_ratio: share(avg.distance_str_landed),
            distance_acc: ratio(avg.distance_str_landed, avg.distance_str_attempted),
            clinch_ratio: share(avg.clinch_str_landed),
            clinch_acc: ratio(avg.clinch_str_landed, avg.clinch_str_attempted),
            ground_ratio: share(avg.ground_str_landed),
            ground_acc: ratio(avg.ground_str_landed, avg.ground_str_attempted),
            knockdown_avg: per_fifteen(avg.knockdowns),
            reversal_avg: per_fifteen(avg.reversals),
            ctrl_time_pct: ratio(avg.ctrl_time, duration),
            str_eff: ratio(avg.sig_str_landed, avg.tot_str_landed),
        }
    }

    /// `self - other`, slot by slot; null when either side is null.
    pub fn minus(&self, other: &Self) -> Self {
        let mine = self.to_array();
        let theirs = other.to_array();
        let mut out = [None; Self::DIM];
        for (slot, (a, b)) in out.iter_mut().zip(mine.into_iter().zip(theirs)) {
            *slot = match (a, b) {
                (Some(a), Some(b)) => Some(a - b),
                _ => None,
            };
        }
        Self::from_array(out)
    }

    /// Striking output minus striking absorbed.
    pub fn strike_margin(&self) -> Option<f64> {
        Some(self.slpm? - self.sapm?)
    }

    pub fn to_array(&self) -> [Option<f64>; Self::DIM] {
        [
            self.slpm,
            self.sapm,
            self.str_acc,
            self.str_def,
            self.td_avg,
            self.td_acc,
            self.td_def,
            self.sub_avg,
            self.head_ratio,
            self.head_acc,
            self.body_ratio,
            self.body_acc,
            self.leg_ratio,
            self.leg_acc,
            self.distance_ratio,
            self.distance_acc,
            self.clinch_ratio,
            self.clinch_acc,
            self.ground_ratio,
            self.ground_acc,
            self.knockdown_avg,
            self.reversal_avg,
            self.ctrl_time_pct,
            self.str_eff,
        ]
    }

    pub fn from_array(v: [Option<f64>; Self::DIM]) -> Self {
        Self {
            slpm: v[0],
            sapm: v[1],
            str_acc: v[2],
            str_def: v[3],
            td_avg: v[4],
            td_acc: v[5],
            td_def: v[6],
            sub_avg: v[7],
            head_ratio: v[8],
            head_acc: v[9],
            body_ratio: v[10],
            body_acc: v[11],
            leg_ratio: v[12],
            leg_acc: v[13],
            distance_ratio: v[14],
            distance_acc: v[15],
            clinch_ratio: v[16],
            clinch_acc: v[17],
            ground_ratio: v[18],
            ground_acc: v[19],
            knockdown_avg: v[20],
            reversal_avg: v[21],
            ctrl_time_pct: v[22],
            str_eff: v[23],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateDelta {
    pub deltas: RateBlock,
    pub net_str_eff: Option<f64>,
}

pub fn rate_blocks(averages: &[MetricSet]) -> Vec<RateBlock> {
    averages.iter().map(RateBlock::from_averages).collect()
}

/// Signed differences of each row's rates against its opponent's rates.
pub fn opponent_deltas(
    rows: &[MirroredRow],
    rates: &[RateBlock],
) -> PipelineResult<Vec<RateDelta>> {
    let opponents = opponent_positions(rows)?;
    let out = opponents
        .iter()
        .enumerate()
        .map(|(pos, &opp)| {
            let own = &rates[pos];
            let theirs = &rates[opp];
            RateDelta {
                deltas: own.minus(theirs),
                net_str_eff: match (own.strike_margin(), theirs.strike_margin()) {
                    (Some(a), Some(b)) => Some(a - b),
                    _ => None,
                },
            }
        })
        .collect::<Vec<_>>();
    info!(rows = out.len(), "computed opponent rate deltas");
    Ok(out)
}

/// `num / den`, or null when either is missing or the denominator is not
/// strictly positive.
pub fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    let (num, den) = (num?, den?);
    if den > 0.0 && den.is_finite() && num.is_finite() {
        Some(num / den)
    } else {
        None
    }
}

fn defense(received: Option<f64>, absorbed: Option<f64>) -> Option<f64> {
    ratio(Some(received? - absorbed?), received)
}
