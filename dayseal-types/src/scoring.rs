//! Pluggable day scoring.
//!
//! The five fixed questions are always scored. Temporary goals active on a
//! record's date take a fixed share each; goals answered
//! [`TriState::NotApplicable`] (or not answered) drop out and the remaining
//! weights are renormalized, so the day score is the weighted mean over the
//! items that actually apply.

use crate::goal::TempGoalDef;
use crate::record::{AlcoholLevel, DailyRecord, TriState};

/// The fixed question set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Question {
    Alcohol,
    FollowMealPlan,
    EatSugar,
    TenThousandSteps,
    Exercise,
}

impl Question {
    pub const ALL: [Question; 5] = [
        Question::Alcohol,
        Question::FollowMealPlan,
        Question::EatSugar,
        Question::TenThousandSteps,
        Question::Exercise,
    ];

    /// Field name used in the serialized record.
    pub fn id(self) -> &'static str {
        match self {
            Question::Alcohol => "alcohol",
            Question::FollowMealPlan => "followMealPlan",
            Question::EatSugar => "eatSugar",
            Question::TenThousandSteps => "tenThousandSteps",
            Question::Exercise => "exercise",
        }
    }
}

/// Scores decoded records. Scores are in `0.0..=1.0`, higher is better.
pub trait ScoringPolicy: Send + Sync {
    fn question_score(&self, question: Question, record: &DailyRecord) -> f64;

    /// `None` when the goal does not count for this record.
    fn temp_goal_score(&self, goal: &TempGoalDef, record: &DailyRecord) -> Option<f64> {
        if !goal.is_active_on(record.date) {
            return None;
        }
        match record.temp_goal(&goal.id) {
            TriState::Yes => Some(1.0),
            TriState::No => Some(0.0),
            TriState::NotApplicable => None,
        }
    }

    /// Overall score for the day given the user's goal definitions.
    fn day_score(&self, record: &DailyRecord, temp_goals: &[TempGoalDef]) -> f64;

    /// A perfect answer, which is what streaks count.
    fn is_good_answer(&self, question: Question, record: &DailyRecord) -> bool {
        self.question_score(question, record) == 1.0
    }
}

/// Default policy: alcohol graded, booleans all-or-nothing, temporary goals
/// at `temp_goal_weight` each.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScoring {
    pub temp_goal_weight: f64,
}

impl Default for WeightedScoring {
    fn default() -> Self {
        Self {
            temp_goal_weight: 0.05,
        }
    }
}

fn alcohol_score(level: AlcoholLevel) -> f64 {
    match level {
        AlcoholLevel::None => 1.0,
        AlcoholLevel::Low => 0.66,
        AlcoholLevel::Medium => 0.33,
        AlcoholLevel::High => 0.0,
    }
}

fn flag(good: bool) -> f64 {
    if good { 1.0 } else { 0.0 }
}

impl ScoringPolicy for WeightedScoring {
    fn question_score(&self, question: Question, record: &DailyRecord) -> f64 {
        match question {
            Question::Alcohol => alcohol_score(record.alcohol),
            Question::FollowMealPlan => flag(record.follow_meal_plan),
            Question::EatSugar => flag(!record.eat_sugar),
            Question::TenThousandSteps => flag(record.ten_thousand_steps),
            Question::Exercise => flag(record.exercise),
        }
    }

    fn day_score(&self, record: &DailyRecord, temp_goals: &[TempGoalDef]) -> f64 {
        let active = temp_goals
            .iter()
            .filter(|g| g.is_active_on(record.date))
            .count();
        let base_total = (1.0 - self.temp_goal_weight * active as f64).max(0.0);
        let base_weight = base_total / Question::ALL.len() as f64;

        let base_sum: f64 = Question::ALL
            .iter()
            .map(|q| self.question_score(*q, record))
            .sum();

        let mut weighted = base_sum * base_weight;
        let mut weight = base_total;
        for goal in temp_goals {
            if let Some(score) = self.temp_goal_score(goal, record) {
                weighted += score * self.temp_goal_weight;
                weight += self.temp_goal_weight;
            }
        }

        if weight > 0.0 {
            weighted / weight
        } else {
            base_sum / Question::ALL.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::RecordDate;

    fn perfect_day(date: &str) -> DailyRecord {
        let mut r = DailyRecord::new(RecordDate::parse(date).unwrap());
        r.follow_meal_plan = true;
        r.ten_thousand_steps = true;
        r.exercise = true;
        r
    }

    #[test]
    fn alcohol_levels_are_graded() {
        let policy = WeightedScoring::default();
        let mut r = perfect_day("2024-01-01");
        for (level, expected) in [
            (AlcoholLevel::None, 1.0),
            (AlcoholLevel::Low, 0.66),
            (AlcoholLevel::Medium, 0.33),
            (AlcoholLevel::High, 0.0),
        ] {
            r.alcohol = level;
            assert_eq!(policy.question_score(Question::Alcohol, &r), expected);
        }
    }

    #[test]
    fn sugar_is_good_when_absent() {
        let policy = WeightedScoring::default();
        let mut r = perfect_day("2024-01-01");
        assert!(policy.is_good_answer(Question::EatSugar, &r));
        r.eat_sugar = true;
        assert!(!policy.is_good_answer(Question::EatSugar, &r));
    }

    #[test]
    fn partial_alcohol_is_not_a_good_answer() {
        let policy = WeightedScoring::default();
        let mut r = perfect_day("2024-01-01");
        r.alcohol = AlcoholLevel::Low;
        assert!(!policy.is_good_answer(Question::Alcohol, &r));
    }
}
