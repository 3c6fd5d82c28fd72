//! Schema validation of untrusted generator output
//!
//! The backend is treated as an untrusted-output producer: every response
//! is checked here before the rest of the core sees it.

use crate::error::ValidationError;

use super::{GeneratedFlashcards, GeneratedLesson, GeneratedQuiz, RoadmapOutline};

pub fn lesson(lesson: &GeneratedLesson) -> Result<(), ValidationError> {
    if lesson.title.trim().is_empty() {
        return Err(ValidationError::LessonField("title"));
    }
    if lesson.content.trim().is_empty() {
        return Err(ValidationError::LessonField("content"));
    }
    if lesson.key_points.is_empty() {
        return Err(ValidationError::LessonField("keyPoints"));
    }
    if lesson.estimated_minutes == 0 {
        return Err(ValidationError::LessonField("estimatedMinutes"));
    }
    Ok(())
}

pub fn quiz(quiz: &GeneratedQuiz) -> Result<(), ValidationError> {
    if quiz.questions.is_empty() {
        return Err(ValidationError::QuizEmpty);
    }
    for (index, question) in quiz.questions.iter().enumerate() {
        if question.options.len() != 4 {
            return Err(ValidationError::QuizOptionCount {
                index,
                count: question.options.len(),
            });
        }
        if !(0..=3).contains(&question.correct_answer) {
            return Err(ValidationError::QuizAnswerRange {
                index,
                answer: question.correct_answer,
            });
        }
    }
    Ok(())
}

pub fn flashcards(set: &GeneratedFlashcards) -> Result<(), ValidationError> {
    if set.cards.is_empty() {
        return Err(ValidationError::FlashcardsInvalid);
    }
    for card in &set.cards {
        if card.front.trim().is_empty() || card.back.trim().is_empty() {
            return Err(ValidationError::FlashcardsInvalid);
        }
    }
    Ok(())
}

/// An outline must cover exactly the requested days, numbered 1..=N.
pub fn roadmap(outline: &RoadmapOutline, expected_days: u32) -> Result<(), ValidationError> {
    if outline.days.len() != expected_days as usize {
        return Err(ValidationError::OutlineDayCount {
            expected: expected_days,
            got: outline.days.len(),
        });
    }
    for (i, day) in outline.days.iter().enumerate() {
        let expected_number = i as u32 + 1;
        if day.day_number != expected_number
            || day.topic.trim().is_empty()
            || day.description.trim().is_empty()
        {
            return Err(ValidationError::OutlineDayField(expected_number));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{fallback, OutlineDay, QuizQuestion};

    #[test]
    fn quiz_wrong_option_count_rejected() {
        let mut q = fallback::quiz("rust");
        q.questions[0].options.pop();
        assert_eq!(
            quiz(&q),
            Err(ValidationError::QuizOptionCount { index: 0, count: 3 })
        );
    }

    #[test]
    fn quiz_answer_out_of_range_rejected() {
        let mut q = fallback::quiz("rust");
        q.questions[0].correct_answer = 4;
        assert_eq!(
            quiz(&q),
            Err(ValidationError::QuizAnswerRange { index: 0, answer: 4 })
        );
        q.questions[0].correct_answer = -1;
        assert!(quiz(&q).is_err());
    }

    #[test]
    fn quiz_second_question_indexed_correctly() {
        let mut q = fallback::quiz("rust");
        let mut bad = QuizQuestion {
            id: "q2".to_string(),
            question: "second".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: 1,
            explanation: "ok".to_string(),
        };
        bad.options.push("e".into());
        q.questions.push(bad);
        assert_eq!(
            quiz(&q),
            Err(ValidationError::QuizOptionCount { index: 1, count: 5 })
        );
    }

    #[test]
    fn lesson_missing_fields_rejected() {
        let mut l = fallback::lesson("rust");
        l.key_points.clear();
        assert_eq!(lesson(&l), Err(ValidationError::LessonField("keyPoints")));

        let mut l = fallback::lesson("rust");
        l.estimated_minutes = 0;
        assert!(lesson(&l).is_err());
    }

    #[test]
    fn outline_day_count_and_numbering_checked() {
        let outline = RoadmapOutline {
            topic: "rust".to_string(),
            total_days: 3,
            days: (1..=2)
                .map(|n| OutlineDay {
                    day_number: n,
                    topic: format!("day {n}"),
                    description: "desc".to_string(),
                    objectives: vec![],
                })
                .collect(),
        };
        assert_eq!(
            roadmap(&outline, 3),
            Err(ValidationError::OutlineDayCount {
                expected: 3,
                got: 2
            })
        );

        let mut misnumbered = outline.clone();
        misnumbered.days.push(OutlineDay {
            day_number: 5,
            topic: "day 5".to_string(),
            description: "desc".to_string(),
            objectives: vec![],
        });
        assert_eq!(
            roadmap(&misnumbered, 3),
            Err(ValidationError::OutlineDayField(3))
        );
    }
}
