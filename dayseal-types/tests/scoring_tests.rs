use dayseal_types::{
    AlcoholLevel, DailyRecord, RecordDate, ScoringPolicy, TempGoalDef, TriState, WeightedScoring,
};

fn date(s: &str) -> RecordDate {
    RecordDate::parse(s).unwrap()
}

fn record(d: &str) -> DailyRecord {
    DailyRecord::new(date(d))
}

fn goal(id: &str, start: &str) -> TempGoalDef {
    TempGoalDef::new(id, id, date(start)).unwrap()
}

fn approx(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}

// ── Base questions ──────────────────────────────────────────────

#[test]
fn blank_record_scores_alcohol_and_sugar_only() {
    // Defaults: no alcohol (1.0), no sugar (1.0), three falses.
    let policy = WeightedScoring::default();
    approx(policy.day_score(&record("2024-03-05"), &[]), 2.0 / 5.0);
}

#[test]
fn perfect_day_scores_one() {
    let policy = WeightedScoring::default();
    let mut r = record("2024-03-05");
    r.follow_meal_plan = true;
    r.ten_thousand_steps = true;
    r.exercise = true;
    approx(policy.day_score(&r, &[]), 1.0);
}

#[test]
fn worst_day_scores_zero() {
    let policy = WeightedScoring::default();
    let mut r = record("2024-03-05");
    r.alcohol = AlcoholLevel::High;
    r.eat_sugar = true;
    approx(policy.day_score(&r, &[]), 0.0);
}

// ── Temporary goals ─────────────────────────────────────────────

#[test]
fn answered_goal_takes_five_percent() {
    let policy = WeightedScoring::default();
    let goals = [goal("no-coffee", "2024-03-01")];

    // Base all perfect, goal failed: 0.95 * 1.0 + 0.05 * 0.0
    let mut r = record("2024-03-05");
    r.follow_meal_plan = true;
    r.ten_thousand_steps = true;
    r.exercise = true;
    r.set_temp_goal("no-coffee", TriState::No);
    approx(policy.day_score(&r, &goals), 0.95);

    r.set_temp_goal("no-coffee", TriState::Yes);
    approx(policy.day_score(&r, &goals), 1.0);
}

#[test]
fn not_applicable_goal_is_excluded() {
    let policy = WeightedScoring::default();
    let goals = [goal("no-coffee", "2024-03-01"), goal("read", "2024-03-01")];

    let mut r = record("2024-03-05");
    r.set_temp_goal("no-coffee", TriState::Yes);
    r.set_temp_goal("read", TriState::NotApplicable);

    // Base 0.9 weight at 2/5, one goal at 0.05 scoring 1.
    let expected = (0.9 * 0.4 + 0.05) / 0.95;
    approx(policy.day_score(&r, &goals), expected);

    let without_read = [goal("no-coffee", "2024-03-01")];
    // Dropping a goal entirely changes the base share, so the scores differ.
    approx(policy.day_score(&r, &without_read), 0.95 * 0.4 + 0.05);
}

#[test]
fn unanswered_goal_counts_as_not_applicable() {
    let policy = WeightedScoring::default();
    let goals = [goal("read", "2024-03-01")];
    let mut r = record("2024-03-05");
    r.follow_meal_plan = true;
    r.ten_thousand_steps = true;
    r.exercise = true;
    approx(policy.day_score(&r, &goals), 1.0);
}

#[test]
fn inactive_goals_are_ignored() {
    let policy = WeightedScoring::default();
    let mut ended = goal("old", "2024-01-01");
    ended.end_date = Some(date("2024-01-31"));
    let future = goal("later", "2024-04-01");

    let mut r = record("2024-03-05");
    r.set_temp_goal("old", TriState::No);
    r.set_temp_goal("later", TriState::No);
    approx(policy.day_score(&r, &[ended, future]), 2.0 / 5.0);
}

#[test]
fn custom_goal_weight() {
    let policy = WeightedScoring {
        temp_goal_weight: 0.5,
    };
    let goals = [goal("g", "2024-03-01")];
    let mut r = record("2024-03-05");
    r.set_temp_goal("g", TriState::Yes);
    approx(policy.day_score(&r, &goals), 0.5 * 0.4 + 0.5);
}

// ── Properties ──────────────────────────────────────────────────

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn alcohol() -> impl Strategy<Value = AlcoholLevel> {
        prop_oneof![
            Just(AlcoholLevel::None),
            Just(AlcoholLevel::Low),
            Just(AlcoholLevel::Medium),
            Just(AlcoholLevel::High),
        ]
    }

    fn answer() -> impl Strategy<Value = TriState> {
        prop_oneof![
            Just(TriState::Yes),
            Just(TriState::No),
            Just(TriState::NotApplicable),
        ]
    }

    fn ymd() -> impl Strategy<Value = (i32, u32, u32)> {
        (0i32..=9999, 1u32..=12, 1u32..=28)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn day_score_stays_in_unit_range(
            level in alcohol(),
            flags in any::<[bool; 4]>(),
            answers in proptest::collection::vec(answer(), 0..8),
            weight in 0.0f64..0.5,
        ) {
            let policy = WeightedScoring { temp_goal_weight: weight };
            let mut r = record("2024-03-05");
            r.alcohol = level;
            r.follow_meal_plan = flags[0];
            r.eat_sugar = flags[1];
            r.ten_thousand_steps = flags[2];
            r.exercise = flags[3];

            let mut goals = Vec::new();
            for (i, a) in answers.iter().enumerate() {
                let id = format!("goal-{i}");
                goals.push(goal(&id, "2024-03-01"));
                r.set_temp_goal(id, *a);
            }

            let score = policy.day_score(&r, &goals);
            prop_assert!((0.0..=1.0 + 1e-9).contains(&score), "score {score}");
        }

        #[test]
        fn date_string_order_matches_calendar_order(a in ymd(), b in ymd()) {
            let x = RecordDate::from_ymd(a.0, a.1, a.2).unwrap();
            let y = RecordDate::from_ymd(b.0, b.1, b.2).unwrap();
            prop_assert_eq!(x.to_string().cmp(&y.to_string()), x.cmp(&y));
            prop_assert_eq!(RecordDate::parse(&x.to_string()).unwrap(), x);
        }
    }
}
