use crate::error::PipelineResult;
use crate::form::{FormCounters, track_form};
use crate::mirror::MirroredRow;
use crate::rates::{RateBlock, RateDelta, opponent_deltas, rate_blocks};
use crate::rolling::{MetricSet, rolling_averages};

/// Everything known about a participant before one contest, in long format.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedForm {
    pub source: MirroredRow,
    pub averages: MetricSet,
    pub rates: RateBlock,
    pub delta: RateDelta,
    pub form: FormCounters,
}

impl DerivedForm {
    pub fn contest_id(&self) -> &str {
        &self.source.row.contest.contest_id
    }

    pub fn participant_id(&self) -> &str {
        &self.source.row.participant_id
    }

    pub fn is_debut(&self) -> bool {
        self.form.is_debut()
    }
}

/// Runs the history-based stages over mirrored rows and zips their outputs.
pub fn derive_forms(
    rows: Vec<MirroredRow>,
    ewma_span: usize,
    parallel: bool,
) -> PipelineResult<Vec<DerivedForm>> {
    let averages = rolling_averages(&rows, ewma_span, parallel);
    let rates = rate_blocks(&averages);
    let deltas = opponent_deltas(&rows, &rates)?;
    let form = track_form(&rows, parallel);

    Ok(rows
        .into_iter()
        .zip(averages)
        .zip(rates)
        .zip(deltas)
        .zip(form)
        .map(|((((source, averages), rates), delta), form)| DerivedForm {
            source,
            averages,
            rates,
            delta,
            form,
        })
        .collect())
}
