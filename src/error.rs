use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal input problems. Every variant names the contest (and participant,
/// where one is involved) so the offending rows can be found in the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("contest {contest_id} appears more than once in the contests table")]
    DuplicateContest { contest_id: String },

    #[error("stat row for participant {participant_id} references unknown contest {contest_id}")]
    UnknownContest {
        contest_id: String,
        participant_id: String,
    },

    #[error("contest {contest_id} has {found} participant rows, expected exactly 2")]
    ContestCardinality { contest_id: String, found: usize },

    #[error("participant {participant_id} is neither corner of contest {contest_id}")]
    ParticipantNotInContest {
        contest_id: String,
        participant_id: String,
    },

    #[error("contest {contest_id} has two rows claiming the {corner} corner")]
    DuplicateCorner { contest_id: String, corner: String },

    #[error(
        "participant {participant_id} in contest {contest_id} lists opponent {stored}, but the other row is {actual}"
    )]
    OpponentMismatch {
        contest_id: String,
        participant_id: String,
        stored: String,
        actual: String,
    },

    #[error(
        "no row for opponent {opponent_id} of participant {participant_id} in contest {contest_id}"
    )]
    MissingOpponent {
        contest_id: String,
        participant_id: String,
        opponent_id: String,
    },

    #[error("participant {participant_id} (contest {contest_id}) has no profile row")]
    UnknownParticipant {
        contest_id: String,
        participant_id: String,
    },

    #[error("participant {participant_id} appears more than once in the profiles table")]
    DuplicateProfile { participant_id: String },

    #[error("contest {contest_id} has {found} rows for side {side} after the attribute join")]
    SideCardinality {
        contest_id: String,
        side: &'static str,
        found: usize,
    },

    #[error("invalid {field} in {table} row {key}: {value:?}")]
    InvalidField {
        table: &'static str,
        key: String,
        field: &'static str,
        value: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// The contest a failure belongs to, when there is one.
    pub fn contest_id(&self) -> Option<&str> {
        match self {
            Self::DuplicateContest { contest_id }
            | Self::UnknownContest { contest_id, .. }
            | Self::ContestCardinality { contest_id, .. }
            | Self::ParticipantNotInContest { contest_id, .. }
            | Self::DuplicateCorner { contest_id, .. }
            | Self::OpponentMismatch { contest_id, .. }
            | Self::MissingOpponent { contest_id, .. }
            | Self::UnknownParticipant { contest_id, .. }
            | Self::SideCardinality { contest_id, .. } => Some(contest_id),
            Self::DuplicateProfile { .. } | Self::InvalidField { .. } | Self::Config(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineError;

    #[test]
    fn messages_name_the_offending_rows() {
        let err = PipelineError::ContestCardinality {
            contest_id: "f-17".to_string(),
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "contest f-17 has 3 participant rows, expected exactly 2"
        );
        assert_eq!(err.contest_id(), Some("f-17"));

        let err = PipelineError::DuplicateProfile {
            participant_id: "p-1".to_string(),
        };
        assert!(err.to_string().contains("p-1"));
        assert_eq!(err.contest_id(), None);
    }
}
