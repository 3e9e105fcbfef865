#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{Days, NaiveDate};

use bout_features::config::FeatureSettings;
use bout_features::model::{
    BoutStats, Contest, Corner, DecisionType, FinishType, ParticipantContestRecord,
    ParticipantProfile, Stance,
};
use bout_features::store::RawTables;

pub fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() + Days::new(n)
}

pub fn serial() -> FeatureSettings {
    FeatureSettings {
        parallel: false,
        ..FeatureSettings::default()
    }
}

/// Striking stats with everything else zero.
pub fn striking(landed: i64, attempted: i64) -> BoutStats {
    BoutStats {
        sig_str_landed: landed,
        sig_str_attempted: attempted,
        tot_str_landed: landed + 5,
        tot_str_attempted: attempted + 8,
        head_str_landed: landed / 2,
        head_str_attempted: attempted / 2,
        td_landed: 1,
        td_attempted: 3,
        ctrl_time: Some(60),
        ..BoutStats::default()
    }
}

/// Builds raw tables bout by bout.
#[derive(Default)]
pub struct Fixture {
    pub tables: RawTables,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fighter(mut self, id: &str) -> Self {
        self.tables.profiles.push(ParticipantProfile {
            participant_id: id.to_string(),
            name: format!("Fighter {id}"),
            height: Some(70.0),
            weight: Some(155.0),
            reach: Some(72.0),
            stance: Some(Stance::Orthodox),
            dob: NaiveDate::from_ymd_opt(1990, 6, 1),
        });
        self
    }

    pub fn profile(mut self, profile: ParticipantProfile) -> Self {
        self.tables.profiles.push(profile);
        self
    }

    /// A three-round decision bout lasting the full 15 minutes.
    pub fn bout(
        self,
        id: &str,
        on: u64,
        red: (&str, BoutStats),
        blue: (&str, BoutStats),
        winner: Option<Corner>,
    ) -> Self {
        self.bout_with(id, on, red, blue, winner, Some(FinishType::Decision))
    }

    pub fn bout_with(
        mut self,
        id: &str,
        on: u64,
        red: (&str, BoutStats),
        blue: (&str, BoutStats),
        winner: Option<Corner>,
        finish: Option<FinishType>,
    ) -> Self {
        let decision = match finish {
            Some(FinishType::Decision) => Some(DecisionType::Unanimous),
            _ => None,
        };
        self.tables.contests.push(Contest {
            contest_id: id.to_string(),
            event_date: day(on),
            weight_class: Some("Lightweight".to_string()),
            is_title_fight: false,
            red_fighter_id: red.0.to_string(),
            blue_fighter_id: blue.0.to_string(),
            winner_color: winner,
            end_round: Some(3),
            total_duration: Some(900),
            rounds_scheduled: Some(3),
            finish_type: finish,
            decision_type: decision,
            referee: Some("Marc Goddard".to_string()),
        });
        for (me, opp, stats) in [(red.0, blue.0, red.1), (blue.0, red.0, blue.1)] {
            self.tables.records.push(ParticipantContestRecord {
                contest_id: id.to_string(),
                participant_id: me.to_string(),
                opponent_id: Some(opp.to_string()),
                stats,
            });
        }
        self
    }

    pub fn build(self) -> RawTables {
        self.tables
    }
}

/// A small card where "p" fights four different opponents and loses only
/// the first bout.
pub fn four_bout_career() -> RawTables {
    Fixture::new()
        .fighter("p")
        .fighter("o1")
        .fighter("o2")
        .fighter("o3")
        .fighter("o4")
        .bout("k1", 0, ("p", striking(10, 20)), ("o1", striking(30, 50)), Some(Corner::Blue))
        .bout("k2", 40, ("p", striking(20, 30)), ("o2", striking(12, 40)), Some(Corner::Red))
        .bout("k3", 90, ("p", striking(30, 45)), ("o3", striking(8, 30)), Some(Corner::Red))
        .bout("k4", 150, ("p", striking(25, 35)), ("o4", striking(14, 28)), Some(Corner::Red))
        .build()
}

pub fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("bout_features_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}
