//! Content generator boundary
//!
//! Provides a unified interface to the external content-generation backend
//! and isolates parsing/validation so the rest of the core only ever sees
//! validated structured values or a typed error.
//!
//! Recovery policy: single-item generation (lesson, quiz, flashcards)
//! degrades to deterministic fallback content via the `*_or_fallback`
//! helpers; roadmap outlines are never substituted, since a malformed
//! outline cannot be safely patched.

pub mod fallback;
mod llm;
pub mod validate;

pub use llm::LlmGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GeneratorError;

/// Extra context passed along with a lesson request
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationContext {
    pub previous_errors: Vec<String>,
    pub mastery_level: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedLesson {
    pub title: String,
    pub content: String,
    pub key_points: Vec<String>,
    pub estimated_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`; validated to 0..=3
    pub correct_answer: i64,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuiz {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFlashcards {
    pub topic: String,
    pub cards: Vec<Flashcard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineDay {
    pub day_number: u32,
    pub topic: String,
    pub description: String,
    #[serde(default)]
    pub objectives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapOutline {
    pub topic: String,
    pub total_days: u32,
    pub days: Vec<OutlineDay>,
}

/// Request/response boundary to the external content generator.
///
/// Implementations must return validated content only; untrusted backend
/// output is parsed and schema-checked inside the adapter.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_lesson(
        &self,
        topic: &str,
        difficulty: u8,
        context: Option<&GenerationContext>,
    ) -> Result<GeneratedLesson, GeneratorError>;

    async fn generate_quiz(
        &self,
        topic: &str,
        difficulty: u8,
        question_count: u32,
    ) -> Result<GeneratedQuiz, GeneratorError>;

    async fn generate_flashcards(
        &self,
        topic: &str,
        difficulty: u8,
        count: u32,
    ) -> Result<GeneratedFlashcards, GeneratorError>;

    async fn generate_roadmap(
        &self,
        topic: &str,
        total_days: u32,
        daily_minutes: u32,
    ) -> Result<RoadmapOutline, GeneratorError>;
}

/// Lesson generation that never fails: backend errors degrade to the
/// deterministic fallback lesson.
pub async fn lesson_or_fallback(
    generator: &dyn ContentGenerator,
    topic: &str,
    difficulty: u8,
    context: Option<&GenerationContext>,
) -> GeneratedLesson {
    match generator.generate_lesson(topic, difficulty, context).await {
        Ok(lesson) => lesson,
        Err(e) => {
            warn!(topic, %e, "lesson generation failed, using fallback");
            fallback::lesson(topic)
        }
    }
}

/// Quiz generation that never fails; see [`lesson_or_fallback`].
pub async fn quiz_or_fallback(
    generator: &dyn ContentGenerator,
    topic: &str,
    difficulty: u8,
    question_count: u32,
) -> GeneratedQuiz {
    match generator
        .generate_quiz(topic, difficulty, question_count)
        .await
    {
        Ok(quiz) => quiz,
        Err(e) => {
            warn!(topic, %e, "quiz generation failed, using fallback");
            fallback::quiz(topic)
        }
    }
}

/// Flashcard generation that never fails; see [`lesson_or_fallback`].
pub async fn flashcards_or_fallback(
    generator: &dyn ContentGenerator,
    topic: &str,
    difficulty: u8,
    count: u32,
) -> GeneratedFlashcards {
    match generator.generate_flashcards(topic, difficulty, count).await {
        Ok(cards) => cards,
        Err(e) => {
            warn!(topic, %e, "flashcard generation failed, using fallback");
            fallback::flashcards(topic, count)
        }
    }
}
