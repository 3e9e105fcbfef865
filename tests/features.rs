mod common;

use bout_features::PipelineError;
use bout_features::attributes::ExclusionReason;
use bout_features::config::FeatureSettings;
use bout_features::derived::derive_forms;
use bout_features::mirror::mirror_opponents;
use bout_features::model::{Corner, FinishType, ParticipantProfile, Stance};
use bout_features::normalize::normalize;
use bout_features::pipeline::build_feature_table;
use bout_features::wide::MatchFeatureRow;

use common::{Fixture, four_bout_career, serial, striking};

fn close(a: Option<f64>, b: f64) -> bool {
    a.is_some_and(|a| (a - b).abs() < 1e-9)
}

fn row<'a>(rows: &'a [MatchFeatureRow], contest_id: &str) -> &'a MatchFeatureRow {
    rows.iter().find(|r| r.contest_id == contest_id).unwrap()
}

#[test]
fn ewma_of_prior_contests_only() {
    let out = build_feature_table(&four_bout_career(), &serial()).unwrap();
    let k3 = row(&out.rows, "k3");
    assert_eq!(k3.a.participant_id, "p");
    assert!(close(k3.a.averages.sig_str_landed, 40.0 / 3.0));
    assert!(close(row(&out.rows, "k2").a.averages.sig_str_landed, 10.0));
    // Absorbed strikes come from the opponents: 30 then 12.
    assert!(close(k3.a.averages.sig_str_absorbed, 24.0));
    // 40/3 strikes over 15 minutes.
    assert!(close(k3.a.rates.slpm, 40.0 / 45.0));
}

#[test]
fn debut_sides_have_null_history() {
    let out = build_feature_table(&four_bout_career(), &serial()).unwrap();
    let k1 = row(&out.rows, "k1");
    for side in [&k1.a, &k1.b] {
        assert!(side.is_debut);
        assert!(side.averages.to_array().iter().all(Option::is_none));
        assert!(side.rates.to_array().iter().all(Option::is_none));
        assert_eq!(side.form.to_array(), [0; 9]);
    }
    assert!(k1.deltas.to_array().iter().all(Option::is_none));
    assert_eq!(k1.net_str_eff, None);
    // Every opponent of "p" is debuting.
    assert_eq!(out.report.debut_sides, 5);
}

#[test]
fn streaks_follow_the_lwww_career() {
    let out = build_feature_table(&four_bout_career(), &serial()).unwrap();
    let streaks = ["k1", "k2", "k3", "k4"]
        .iter()
        .map(|id| row(&out.rows, id).a.form)
        .map(|f| (f.win_streak, f.lose_streak, f.prior_contests))
        .collect::<Vec<_>>();
    assert_eq!(streaks, vec![(0, 0, 0), (0, 1, 1), (1, 0, 2), (2, 0, 3)]);
    assert_eq!(row(&out.rows, "k4").a.form.wins_by_u_dec, 2);
}

#[test]
fn later_contests_never_change_earlier_rows() {
    let base = build_feature_table(&four_bout_career(), &serial()).unwrap();

    let mut altered = four_bout_career();
    for record in altered.records.iter_mut().filter(|r| r.contest_id == "k3") {
        record.stats = striking(99, 100);
    }
    altered.contests[2].winner_color = Some(Corner::Blue);
    let changed = build_feature_table(&altered, &serial()).unwrap();

    for id in ["k1", "k2", "k3"] {
        assert_eq!(row(&base.rows, id).a, row(&changed.rows, id).a);
        assert_eq!(row(&base.rows, id).deltas, row(&changed.rows, id).deltas);
    }
    assert_ne!(row(&base.rows, "k4").a, row(&changed.rows, "k4").a);
}

#[test]
fn a_contests_own_ending_stays_out_of_its_row() {
    let base = build_feature_table(&four_bout_career(), &serial()).unwrap();

    let mut altered = four_bout_career();
    let k3 = &mut altered.contests[2];
    k3.total_duration = Some(17);
    k3.end_round = Some(1);
    k3.finish_type = Some(FinishType::KoTko);
    k3.decision_type = None;
    let changed = build_feature_table(&altered, &serial()).unwrap();

    assert_eq!(row(&base.rows, "k3"), row(&changed.rows, "k3"));
    // The short bout only reaches p's averages from k4 on.
    assert_ne!(
        row(&base.rows, "k4").a.averages.total_duration,
        row(&changed.rows, "k4").a.averages.total_duration
    );
}

#[test]
fn deltas_are_sign_flipped_between_opponents() {
    let tables = four_bout_career();
    let rows = normalize(&tables.contests, &tables.records).unwrap();
    let mirrored = mirror_opponents(rows).unwrap();
    let derived = derive_forms(mirrored, 5, false).unwrap();

    for form in &derived {
        let opp = derived
            .iter()
            .find(|o| {
                o.contest_id() == form.contest_id()
                    && o.participant_id() == form.source.row.opponent_id
            })
            .unwrap();
        assert_eq!(
            form.source.received.sig_str_absorbed,
            opp.source.row.stats.sig_str_landed
        );
        assert_eq!(
            form.source.received.td_received,
            opp.source.row.stats.td_attempted
        );
        for (mine, theirs) in form
            .delta
            .deltas
            .to_array()
            .into_iter()
            .zip(opp.delta.deltas.to_array())
        {
            assert_eq!(mine, theirs.map(|v| -v));
        }
        assert_eq!(form.delta.net_str_eff, opp.delta.net_str_eff.map(|v| -v));
    }
}

#[test]
fn input_order_does_not_matter() {
    let tables = four_bout_career();
    let base = build_feature_table(&tables, &serial()).unwrap();

    let mut shuffled = tables.clone();
    shuffled.records.reverse();
    shuffled.contests.swap(0, 3);
    shuffled.profiles.reverse();
    let parallel = FeatureSettings::default();
    let again = build_feature_table(&shuffled, &parallel).unwrap();

    assert_eq!(base, again);
}

#[test]
fn one_row_per_contest_sorted_by_date() {
    let tables = Fixture::new()
        .fighter("a")
        .fighter("b")
        .fighter("c")
        .bout("z-late", 30, ("a", striking(5, 9)), ("b", striking(6, 9)), Some(Corner::Red))
        .bout("y-same-day", 10, ("c", striking(5, 9)), ("a", striking(6, 9)), None)
        .bout("x-same-day", 10, ("b", striking(5, 9)), ("c", striking(6, 9)), Some(Corner::Blue))
        .build();
    let mut settings = serial();
    settings.exclusions.unsupported_outcomes = false;
    let out = build_feature_table(&tables, &settings).unwrap();
    let ids = out.rows.iter().map(|r| r.contest_id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["x-same-day", "y-same-day", "z-late"]);
    assert_eq!(row(&out.rows, "y-same-day").a.participant_id, "c");
    assert_eq!(row(&out.rows, "y-same-day").b.participant_id, "a");
    // Same-day bouts are ordered by contest id within each history.
    assert_eq!(row(&out.rows, "y-same-day").a.form.prior_contests, 1);
}

#[test]
fn missing_birth_date_drops_the_whole_contest() {
    let tables = Fixture::new()
        .fighter("a")
        .fighter("b")
        .profile(ParticipantProfile {
            participant_id: "nodob".to_string(),
            name: "No Dob".to_string(),
            height: None,
            weight: None,
            reach: None,
            stance: None,
            dob: None,
        })
        .bout("c1", 0, ("a", striking(5, 9)), ("nodob", striking(6, 9)), Some(Corner::Red))
        .bout("c2", 20, ("a", striking(5, 9)), ("b", striking(6, 9)), Some(Corner::Red))
        .build();
    let out = build_feature_table(&tables, &serial()).unwrap();
    assert_eq!(out.rows.len(), 1);
    assert_eq!(out.report.excluded_contests(), 1);
    assert_eq!(
        out.report.exclusions[0].reason,
        ExclusionReason::MissingBirthDate
    );
    assert_eq!(
        out.report.exclusions[0].participant_id.as_deref(),
        Some("nodob")
    );
    // The excluded bout still counts as history.
    assert_eq!(out.rows[0].a.form.win_streak, 1);
}

#[test]
fn unsupported_outcomes_and_stances_are_excluded_by_policy() {
    let tables = Fixture::new()
        .fighter("a")
        .fighter("b")
        .profile(ParticipantProfile {
            participant_id: "side".to_string(),
            name: "Side On".to_string(),
            height: Some(69.0),
            weight: None,
            reach: None,
            stance: Some(Stance::Sideways),
            dob: chrono::NaiveDate::from_ymd_opt(1988, 1, 1),
        })
        .bout_with(
            "nc",
            0,
            ("a", striking(5, 9)),
            ("b", striking(6, 9)),
            None,
            Some(FinishType::NoContest),
        )
        .bout("odd", 10, ("side", striking(5, 9)), ("b", striking(6, 9)), Some(Corner::Red))
        .bout("ok", 20, ("a", striking(5, 9)), ("b", striking(6, 9)), Some(Corner::Blue))
        .build();

    let out = build_feature_table(&tables, &serial()).unwrap();
    let ids = out.rows.iter().map(|r| r.contest_id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["ok"]);
    assert!(out.report.exclusions.iter().any(|e| matches!(
        &e.reason,
        ExclusionReason::UnsupportedOutcome(what) if what == "NC"
    )));
    assert_eq!(row(&out.rows, "ok").a.form.prior_contests, 1);

    let mut lenient = serial();
    lenient.exclusions.unsupported_outcomes = false;
    lenient.exclusions.unsupported_stances = false;
    let out = build_feature_table(&tables, &lenient).unwrap();
    assert_eq!(out.rows.len(), 3);
    assert_eq!(row(&out.rows, "odd").a.stance, "Sideways");
}

#[test]
fn missing_measurements_use_the_weight_class_median() {
    let tables = Fixture::new()
        .fighter("a")
        .profile(ParticipantProfile {
            participant_id: "tall".to_string(),
            name: "Tall".to_string(),
            height: Some(76.0),
            weight: None,
            reach: Some(80.0),
            stance: None,
            dob: chrono::NaiveDate::from_ymd_opt(1995, 3, 1),
        })
        .profile(ParticipantProfile {
            participant_id: "blank".to_string(),
            name: "Blank".to_string(),
            height: None,
            weight: None,
            reach: None,
            stance: None,
            dob: chrono::NaiveDate::from_ymd_opt(1993, 3, 1),
        })
        .bout("c1", 0, ("a", striking(5, 9)), ("tall", striking(6, 9)), Some(Corner::Red))
        .bout("c2", 5, ("blank", striking(5, 9)), ("a", striking(6, 9)), Some(Corner::Red))
        .build();
    let out = build_feature_table(&tables, &serial()).unwrap();
    let c2 = row(&out.rows, "c2");
    // Known heights in the class: 70, 76, 70 -> 70; reaches 72, 80, 72 -> 72.
    assert_eq!(c2.a.height, Some(70.0));
    assert_eq!(c2.a.reach, Some(72.0));
    assert_eq!(c2.a.stance, "Orthodox");
    assert_eq!(c2.delta_height, Some(0.0));
    let c1 = row(&out.rows, "c1");
    assert_eq!(c1.delta_reach, Some(-8.0));
    assert_eq!(c1.delta_age, Some(5.0));
}

#[test]
fn missing_profile_is_fatal() {
    let mut tables = four_bout_career();
    tables.profiles.retain(|p| p.participant_id != "o3");
    assert_eq!(
        build_feature_table(&tables, &serial()).unwrap_err(),
        PipelineError::UnknownParticipant {
            contest_id: "k3".to_string(),
            participant_id: "o3".to_string()
        }
    );
}

#[test]
fn lone_stat_row_is_fatal() {
    let mut tables = four_bout_career();
    tables
        .records
        .retain(|r| !(r.contest_id == "k2" && r.participant_id == "o2"));
    let err = build_feature_table(&tables, &serial()).unwrap_err();
    assert_eq!(err.contest_id(), Some("k2"));
    assert!(matches!(
        err,
        PipelineError::ContestCardinality { found: 1, .. }
    ));
}
