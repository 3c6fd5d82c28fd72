//! Decision engine
//!
//! Pure classification of a learner's measured state into one pedagogical
//! action per tick. No I/O and no failure modes; given the same state and
//! memory the same decision comes out.

use serde::{Deserialize, Serialize};

use crate::store::{LearnerMemory, LearnerState};

const MASTERY_LOW: f64 = 40.0;
const MASTERY_MEDIUM: f64 = 70.0;
const MASTERY_HIGH: f64 = 90.0;
const QUIZ_PASS_SCORE: f64 = 70.0;
const INACTIVITY_HOURS: f64 = 24.0;

/// One pedagogical action. Closed set: new kinds extend this enum and the
/// orchestrator's dispatch together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    GenerateLesson {
        topic: String,
        difficulty: u8,
    },
    GenerateQuiz {
        topic: String,
        difficulty: u8,
        question_count: u32,
    },
    UpdateMastery {
        learner_id: String,
        topic: String,
        adjustment: f64,
    },
    Wait {
        reason: String,
    },
}

impl Decision {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GenerateLesson { .. } => "generate_lesson",
            Self::GenerateQuiz { .. } => "generate_quiz",
            Self::UpdateMastery { .. } => "update_mastery",
            Self::Wait { .. } => "wait",
        }
    }

    /// Whether this decision produces content (drives the Learn step's
    /// first-observation time-of-day tracking).
    pub fn is_generation(&self) -> bool {
        matches!(
            self,
            Self::GenerateLesson { .. } | Self::GenerateQuiz { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedAction {
    Review,
    Advance,
    Practice,
}

/// Read-model derived from a scored quiz; not stored independently
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAnalysis {
    pub score: u32,
    pub total_questions: u32,
    pub weak_topics: Vec<String>,
    pub strengths: Vec<String>,
    pub recommended_action: RecommendedAction,
}

impl QuizAnalysis {
    /// Build an analysis from raw results, deriving the recommendation
    /// from the percentage: advance above 90, practice above the pass
    /// mark, review below it.
    pub fn new(
        score: u32,
        total_questions: u32,
        weak_topics: Vec<String>,
        strengths: Vec<String>,
    ) -> Self {
        let percentage = if total_questions == 0 {
            0.0
        } else {
            (score as f64 / total_questions as f64) * 100.0
        };
        let recommended_action = if percentage >= 90.0 {
            RecommendedAction::Advance
        } else if percentage >= QUIZ_PASS_SCORE {
            RecommendedAction::Practice
        } else {
            RecommendedAction::Review
        };
        Self {
            score,
            total_questions,
            weak_topics,
            strengths,
            recommended_action,
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            (self.score as f64 / self.total_questions as f64) * 100.0
        }
    }
}

/// Decide the next action for a learner. Rules are ordered; first match wins.
pub fn decide(state: &LearnerState, memory: &LearnerMemory) -> Decision {
    let _ = memory; // reserved for pattern-driven rules
    let hours_inactive = hours_since(state);

    // Inactive learners get a reminder lesson before anything else
    if hours_inactive > INACTIVITY_HOURS {
        return Decision::GenerateLesson {
            topic: state.current_topic.clone(),
            difficulty: difficulty_for_mastery(state.mastery_level),
        };
    }

    if state.mastery_level < MASTERY_LOW {
        return Decision::GenerateLesson {
            topic: state.current_topic.clone(),
            difficulty: 1,
        };
    }

    let avg_recent = average(&state.recent_scores);
    if state.mastery_level >= MASTERY_LOW
        && state.mastery_level < MASTERY_HIGH
        && avg_recent >= QUIZ_PASS_SCORE
    {
        return Decision::GenerateQuiz {
            topic: state.current_topic.clone(),
            difficulty: difficulty_for_mastery(state.mastery_level),
            question_count: 5,
        };
    }

    if state.mastery_level >= MASTERY_HIGH {
        return Decision::Wait {
            reason: "learner has high mastery, waiting for their initiative".to_string(),
        };
    }

    Decision::GenerateLesson {
        topic: state.current_topic.clone(),
        difficulty: difficulty_for_mastery(state.mastery_level),
    }
}

/// Map a scored quiz to the follow-up action.
pub fn analyze_quiz_results(analysis: &QuizAnalysis, state: &LearnerState) -> Decision {
    let percentage = analysis.percentage();

    if percentage >= QUIZ_PASS_SCORE {
        let adjustment = if percentage >= 90.0 { 10.0 } else { 5.0 };
        return Decision::UpdateMastery {
            learner_id: state.id.clone(),
            topic: state.current_topic.clone(),
            adjustment,
        };
    }

    // Failed: review the single weakest topic from the basics
    if let Some(weakest) = analysis.weak_topics.first() {
        return Decision::GenerateLesson {
            topic: weakest.clone(),
            difficulty: 1,
        };
    }

    // No specific weakness identified: lighter practice quiz one bucket down
    Decision::GenerateQuiz {
        topic: state.current_topic.clone(),
        difficulty: difficulty_for_mastery(state.mastery_level).saturating_sub(1).max(1),
        question_count: 3,
    }
}

/// Piecewise-constant difficulty bucket with breakpoints at 40, 70, 90.
pub fn difficulty_for_mastery(mastery: f64) -> u8 {
    if mastery < MASTERY_LOW {
        1
    } else if mastery < MASTERY_MEDIUM {
        2
    } else if mastery < MASTERY_HIGH {
        3
    } else {
        4
    }
}

fn average(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

fn hours_since(state: &LearnerState) -> f64 {
    let elapsed = chrono::Utc::now() - state.last_activity;
    elapsed.num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn state(mastery: f64) -> LearnerState {
        LearnerState {
            id: "learner-1".to_string(),
            current_topic: "rust".to_string(),
            mastery_level: mastery,
            last_activity: Utc::now(),
            recent_scores: vec![],
            needs_attention: true,
        }
    }

    fn memory() -> LearnerMemory {
        LearnerMemory {
            learner_id: "learner-1".to_string(),
            best_time_of_day: None,
            avg_session_minutes: None,
            preferred_difficulty: None,
            historical_performance: vec![],
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn low_mastery_gets_remedial_lesson() {
        for mastery in [0.0, 15.0, 39.9] {
            let decision = decide(&state(mastery), &memory());
            assert_eq!(
                decision,
                Decision::GenerateLesson {
                    topic: "rust".to_string(),
                    difficulty: 1
                },
                "mastery {mastery}"
            );
        }
    }

    #[test]
    fn inactivity_wins_over_remedial_branch() {
        let mut s = state(20.0);
        s.last_activity = Utc::now() - Duration::hours(25);
        // Inactivity branch fires first, with mastery-derived difficulty
        let decision = decide(&s, &memory());
        assert_eq!(
            decision,
            Decision::GenerateLesson {
                topic: "rust".to_string(),
                difficulty: 1
            }
        );

        let mut s = state(80.0);
        s.last_activity = Utc::now() - Duration::hours(48);
        let decision = decide(&s, &memory());
        assert_eq!(
            decision,
            Decision::GenerateLesson {
                topic: "rust".to_string(),
                difficulty: 3
            }
        );
    }

    #[test]
    fn high_mastery_waits() {
        for mastery in [90.0, 95.0, 100.0] {
            let decision = decide(&state(mastery), &memory());
            assert!(
                matches!(decision, Decision::Wait { .. }),
                "mastery {mastery} gave {decision:?}"
            );
        }
    }

    #[test]
    fn mid_mastery_with_good_scores_gets_quiz() {
        let mut s = state(60.0);
        s.recent_scores = vec![75.0, 80.0, 70.0];
        let decision = decide(&s, &memory());
        assert_eq!(
            decision,
            Decision::GenerateQuiz {
                topic: "rust".to_string(),
                difficulty: 2,
                question_count: 5
            }
        );
    }

    #[test]
    fn empty_scores_average_to_zero_and_fall_through() {
        // No scores means the quiz-readiness check fails and the default
        // lesson branch is taken.
        let decision = decide(&state(60.0), &memory());
        assert_eq!(
            decision,
            Decision::GenerateLesson {
                topic: "rust".to_string(),
                difficulty: 2
            }
        );
    }

    #[test]
    fn difficulty_buckets_at_exact_breakpoints() {
        assert_eq!(difficulty_for_mastery(0.0), 1);
        assert_eq!(difficulty_for_mastery(39.9), 1);
        assert_eq!(difficulty_for_mastery(40.0), 2);
        assert_eq!(difficulty_for_mastery(69.9), 2);
        assert_eq!(difficulty_for_mastery(70.0), 3);
        assert_eq!(difficulty_for_mastery(89.9), 3);
        assert_eq!(difficulty_for_mastery(90.0), 4);
        assert_eq!(difficulty_for_mastery(100.0), 4);
    }

    #[test]
    fn difficulty_is_monotonic() {
        let mut last = 0;
        for tenth in 0..=1000 {
            let d = difficulty_for_mastery(tenth as f64 / 10.0);
            assert!(d >= last);
            last = d;
        }
    }

    fn analysis(score: u32, total: u32, weak: Vec<&str>) -> QuizAnalysis {
        QuizAnalysis {
            score,
            total_questions: total,
            weak_topics: weak.into_iter().map(String::from).collect(),
            strengths: vec![],
            recommended_action: RecommendedAction::Review,
        }
    }

    #[test]
    fn pass_adjusts_mastery() {
        let decision = analyze_quiz_results(&analysis(17, 20, vec![]), &state(60.0));
        assert_eq!(
            decision,
            Decision::UpdateMastery {
                learner_id: "learner-1".to_string(),
                topic: "rust".to_string(),
                adjustment: 5.0
            }
        );

        let decision = analyze_quiz_results(&analysis(19, 20, vec![]), &state(60.0));
        assert_eq!(
            decision,
            Decision::UpdateMastery {
                learner_id: "learner-1".to_string(),
                topic: "rust".to_string(),
                adjustment: 10.0
            }
        );
    }

    #[test]
    fn fail_with_weak_topics_reviews_weakest() {
        let decision =
            analyze_quiz_results(&analysis(8, 20, vec!["borrowing", "traits"]), &state(60.0));
        assert_eq!(
            decision,
            Decision::GenerateLesson {
                topic: "borrowing".to_string(),
                difficulty: 1
            }
        );
    }

    #[test]
    fn analysis_recommendation_follows_percentage() {
        assert_eq!(
            QuizAnalysis::new(19, 20, vec![], vec![]).recommended_action,
            RecommendedAction::Advance
        );
        assert_eq!(
            QuizAnalysis::new(15, 20, vec![], vec![]).recommended_action,
            RecommendedAction::Practice
        );
        assert_eq!(
            QuizAnalysis::new(10, 20, vec![], vec![]).recommended_action,
            RecommendedAction::Review
        );
        // Zero questions never divides by zero
        assert_eq!(
            QuizAnalysis::new(0, 0, vec![], vec![]).recommended_action,
            RecommendedAction::Review
        );
    }

    #[test]
    fn fail_without_weak_topics_gets_lighter_practice_quiz() {
        let decision = analyze_quiz_results(&analysis(8, 20, vec![]), &state(60.0));
        assert_eq!(
            decision,
            Decision::GenerateQuiz {
                topic: "rust".to_string(),
                difficulty: 1,
                question_count: 3
            }
        );
    }
}
