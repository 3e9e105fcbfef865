use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Corner {
    Red,
    Blue,
}

impl Corner {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "red" | "r" => Some(Corner::Red),
            "blue" | "b" => Some(Corner::Blue),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Corner::Red => "Red",
            Corner::Blue => "Blue",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Corner::Red => Corner::Blue,
            Corner::Blue => Corner::Red,
        }
    }
}

impl TryFrom<String> for Corner {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Corner::parse(&value).ok_or_else(|| format!("unknown corner {value:?}"))
    }
}

impl From<Corner> for String {
    fn from(value: Corner) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinishType {
    KoTko,
    Submission,
    Decision,
    Disqualification,
    Draw,
    NoContest,
    Other(String),
}

impl FinishType {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "KO/TKO" | "KO_TKO" | "KO" | "TKO" => FinishType::KoTko,
            "SUB" | "SUBMISSION" => FinishType::Submission,
            "DEC" | "DECISION" => FinishType::Decision,
            "DQ" => FinishType::Disqualification,
            "DRAW" => FinishType::Draw,
            "NC" | "NO CONTEST" => FinishType::NoContest,
            _ => FinishType::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FinishType::KoTko => "KO/TKO",
            FinishType::Submission => "SUB",
            FinishType::Decision => "DEC",
            FinishType::Disqualification => "DQ",
            FinishType::Draw => "Draw",
            FinishType::NoContest => "NC",
            FinishType::Other(raw) => raw,
        }
    }
}

impl From<String> for FinishType {
    fn from(value: String) -> Self {
        FinishType::parse(&value)
    }
}

impl From<FinishType> for String {
    fn from(value: FinishType) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DecisionType {
    Unanimous,
    Majority,
    Split,
    Other(String),
}

impl DecisionType {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().replace('_', "-").as_str() {
            "U-DEC" => DecisionType::Unanimous,
            "M-DEC" => DecisionType::Majority,
            "S-DEC" => DecisionType::Split,
            _ => DecisionType::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DecisionType::Unanimous => "U-DEC",
            DecisionType::Majority => "M-DEC",
            DecisionType::Split => "S-DEC",
            DecisionType::Other(raw) => raw,
        }
    }
}

impl From<String> for DecisionType {
    fn from(value: String) -> Self {
        DecisionType::parse(&value)
    }
}

impl From<DecisionType> for String {
    fn from(value: DecisionType) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stance {
    Orthodox,
    Southpaw,
    Switch,
    OpenStance,
    Sideways,
    Other(String),
}

impl Stance {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().replace('_', " ").as_str() {
            "orthodox" => Stance::Orthodox,
            "southpaw" => Stance::Southpaw,
            "switch" => Stance::Switch,
            "open stance" => Stance::OpenStance,
            "sideways" => Stance::Sideways,
            _ => Stance::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Stance::Orthodox => "Orthodox",
            Stance::Southpaw => "Southpaw",
            Stance::Switch => "Switch",
            Stance::OpenStance => "Open Stance",
            Stance::Sideways => "Sideways",
            Stance::Other(raw) => raw,
        }
    }
}

impl From<String> for Stance {
    fn from(value: String) -> Self {
        Stance::parse(&value)
    }
}

impl From<Stance> for String {
    fn from(value: Stance) -> Self {
        value.label().to_string()
    }
}

/// Result of a contest from one participant's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    // Draw or no contest.
    NoDecision,
}

/// Finish method categories counted by the form tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinMethod {
    KoTko,
    Submission,
    UnanimousDecision,
    SplitDecision,
    MajorityDecision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    pub contest_id: String,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub weight_class: Option<String>,
    #[serde(default)]
    pub is_title_fight: bool,
    pub red_fighter_id: String,
    pub blue_fighter_id: String,
    #[serde(default)]
    pub winner_color: Option<Corner>,
    #[serde(default)]
    pub end_round: Option<i64>,
    #[serde(default)]
    pub total_duration: Option<i64>,
    #[serde(default)]
    pub rounds_scheduled: Option<i64>,
    #[serde(default)]
    pub finish_type: Option<FinishType>,
    #[serde(default)]
    pub decision_type: Option<DecisionType>,
    #[serde(default)]
    pub referee: Option<String>,
}

impl Contest {
    pub fn corner_of(&self, participant_id: &str) -> Option<Corner> {
        if participant_id == self.red_fighter_id {
            Some(Corner::Red)
        } else if participant_id == self.blue_fighter_id {
            Some(Corner::Blue)
        } else {
            None
        }
    }

    pub fn fighter_id(&self, corner: Corner) -> &str {
        match corner {
            Corner::Red => &self.red_fighter_id,
            Corner::Blue => &self.blue_fighter_id,
        }
    }

    pub fn outcome_for(&self, corner: Corner) -> Outcome {
        match self.winner_color {
            Some(winner) if winner == corner => Outcome::Win,
            Some(_) => Outcome::Loss,
            None => Outcome::NoDecision,
        }
    }

    pub fn win_method(&self) -> Option<WinMethod> {
        match self.finish_type.as_ref()? {
            FinishType::KoTko => Some(WinMethod::KoTko),
            FinishType::Submission => Some(WinMethod::Submission),
            FinishType::Decision => match self.decision_type.as_ref()? {
                DecisionType::Unanimous => Some(WinMethod::UnanimousDecision),
                DecisionType::Split => Some(WinMethod::SplitDecision),
                DecisionType::Majority => Some(WinMethod::MajorityDecision),
                DecisionType::Other(_) => None,
            },
            _ => None,
        }
    }
}

/// Raw counted events for one participant in one contest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoutStats {
    pub knockdowns: i64,
    pub sub_attempts: i64,
    pub reversals: i64,
    // Seconds; unknown for older contests.
    pub ctrl_time: Option<i64>,
    pub tot_str_landed: i64,
    pub tot_str_attempted: i64,
    pub td_landed: i64,
    pub td_attempted: i64,
    pub sig_str_landed: i64,
    pub sig_str_attempted: i64,
    pub head_str_landed: i64,
    pub head_str_attempted: i64,
    pub body_str_landed: i64,
    pub body_str_attempted: i64,
    pub leg_str_landed: i64,
    pub leg_str_attempted: i64,
    pub distance_str_landed: i64,
    pub distance_str_attempted: i64,
    pub clinch_str_landed: i64,
    pub clinch_str_attempted: i64,
    pub ground_str_landed: i64,
    pub ground_str_attempted: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantContestRecord {
    pub contest_id: String,
    pub participant_id: String,
    #[serde(default)]
    pub opponent_id: Option<String>,
    #[serde(flatten)]
    pub stats: BoutStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantProfile {
    pub participant_id: String,
    pub name: String,
    // Inches.
    #[serde(default)]
    pub height: Option<f64>,
    // Pounds.
    #[serde(default)]
    pub weight: Option<f64>,
    // Inches.
    #[serde(default)]
    pub reach: Option<f64>,
    #[serde(default)]
    pub stance: Option<Stance>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
}
