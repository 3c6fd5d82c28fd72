//! Deterministic fallback content
//!
//! Substituted when the generator fails or returns invalid structure.
//! The learner sees ordinary content, not an error banner, so every
//! fallback must satisfy the same validation rules as real output.

use super::{Flashcard, GeneratedFlashcards, GeneratedLesson, GeneratedQuiz, QuizQuestion};

pub fn lesson(topic: &str) -> GeneratedLesson {
    GeneratedLesson {
        title: format!("Introduction to {topic}"),
        content: format!(
            "# {topic}\n\n\
             This lesson was prepared offline because content generation \
             was unavailable.\n\n\
             ## Overview\n\n\
             This topic covers important concepts in {topic}. Work through \
             the key points below and revisit later for a full lesson.\n\n\
             ## Key Concepts\n\n\
             - Fundamental principles\n\
             - Practical applications\n\
             - Common pitfalls\n"
        ),
        key_points: vec![
            "Understand the basics".to_string(),
            "Apply concepts practically".to_string(),
            "Review common pitfalls".to_string(),
        ],
        estimated_minutes: 10,
    }
}

pub fn quiz(topic: &str) -> GeneratedQuiz {
    GeneratedQuiz {
        title: format!("{topic} Quiz"),
        questions: vec![QuizQuestion {
            id: "q1".to_string(),
            question: format!("Which of these is a key concept in {topic}?"),
            options: vec![
                "Its fundamental principles".to_string(),
                "An unrelated subject".to_string(),
                "Nothing at all".to_string(),
                "None of the above".to_string(),
            ],
            correct_answer: 0,
            explanation: "Placeholder question generated while the content service was unavailable.".to_string(),
        }],
    }
}

pub fn flashcards(topic: &str, count: u32) -> GeneratedFlashcards {
    let count = count.max(1);
    let cards = (1..=count)
        .map(|n| Flashcard {
            front: format!("{topic}: concept {n}"),
            back: format!("Review concept {n} of {topic} in your own words."),
            tags: vec!["review".to_string()],
        })
        .collect();
    GeneratedFlashcards {
        topic: topic.to_string(),
        cards,
    }
}
