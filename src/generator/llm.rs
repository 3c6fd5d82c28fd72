//! Chat-completions adapter for the content generator
//!
//! Talks to an OpenAI-compatible endpoint. Model replies are best-effort
//! JSON: markdown fences and stray prose around the object are stripped
//! before parsing, and everything is schema-validated before it leaves
//! this module.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::error::GeneratorError;

use super::{
    validate, ContentGenerator, GeneratedFlashcards, GeneratedLesson, GeneratedQuiz,
    GenerationContext, RoadmapOutline,
};

pub struct LlmGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl LlmGenerator {
    pub fn new(config: &GeneratorConfig, api_key: String) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    async fn complete<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<T, GeneratorError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            temperature: 0.7,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout(self.timeout_secs)
                } else {
                    GeneratorError::Http(e)
                }
            })?
            .error_for_status()?;

        let body: ChatResponse = response.json().await?;
        let raw = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GeneratorError::Malformed {
                kind,
                detail: "empty completion".to_string(),
            })?;

        debug!(kind, len = raw.len(), "parsing completion");
        let cleaned = extract_json(&raw);
        serde_json::from_str(cleaned).map_err(|e| GeneratorError::Malformed {
            kind,
            detail: e.to_string(),
        })
    }
}

#[async_trait]
impl ContentGenerator for LlmGenerator {
    async fn generate_lesson(
        &self,
        topic: &str,
        difficulty: u8,
        context: Option<&GenerationContext>,
    ) -> Result<GeneratedLesson, GeneratorError> {
        let system = format!(
            "You are an expert tutor writing a lesson at difficulty {difficulty} \
             on a 1-4 scale. Respond with ONLY a JSON object: \
             {{\"title\": string, \"content\": markdown string, \
             \"keyPoints\": [string], \"estimatedMinutes\": number}}."
        );
        let mut user = format!("Write a lesson on: {topic}");
        if let Some(ctx) = context {
            if let Some(mastery) = ctx.mastery_level {
                user.push_str(&format!("\nLearner mastery level: {mastery:.0}/100"));
            }
            if !ctx.previous_errors.is_empty() {
                user.push_str("\nAddress these previous mistakes:\n");
                for err in &ctx.previous_errors {
                    user.push_str(&format!("- {err}\n"));
                }
            }
        }

        let lesson: GeneratedLesson = self.complete("lesson", &system, &user, 2000).await?;
        validate::lesson(&lesson)?;
        Ok(lesson)
    }

    async fn generate_quiz(
        &self,
        topic: &str,
        difficulty: u8,
        question_count: u32,
    ) -> Result<GeneratedQuiz, GeneratorError> {
        let system = format!(
            "You are an expert tutor writing a {question_count}-question \
             multiple-choice quiz at difficulty {difficulty} on a 1-4 scale. \
             Respond with ONLY a JSON object: {{\"title\": string, \
             \"questions\": [{{\"id\": string, \"question\": string, \
             \"options\": [4 strings], \"correctAnswer\": 0-3, \
             \"explanation\": string}}]}}."
        );
        let user = format!("Write a quiz on: {topic}");

        let quiz: GeneratedQuiz = self.complete("quiz", &system, &user, 1500).await?;
        validate::quiz(&quiz)?;
        Ok(quiz)
    }

    async fn generate_flashcards(
        &self,
        topic: &str,
        difficulty: u8,
        count: u32,
    ) -> Result<GeneratedFlashcards, GeneratorError> {
        let system = format!(
            "You are an expert tutor writing {count} flashcards at difficulty \
             {difficulty} on a 1-4 scale. Respond with ONLY a JSON object: \
             {{\"topic\": string, \"cards\": [{{\"front\": string, \
             \"back\": string, \"tags\": [string]}}]}}."
        );
        let user = format!("Write flashcards on: {topic}");

        let cards: GeneratedFlashcards = self.complete("flashcards", &system, &user, 1500).await?;
        validate::flashcards(&cards)?;
        Ok(cards)
    }

    async fn generate_roadmap(
        &self,
        topic: &str,
        total_days: u32,
        daily_minutes: u32,
    ) -> Result<RoadmapOutline, GeneratorError> {
        let system = format!(
            "You are an expert curriculum designer. Produce a {total_days}-day \
             study plan assuming {daily_minutes} minutes per day. Respond with \
             ONLY a JSON object: {{\"topic\": string, \"totalDays\": number, \
             \"days\": [{{\"dayNumber\": 1-based number, \"topic\": string, \
             \"description\": string, \"objectives\": [string]}}]}}. \
             The days array must contain exactly {total_days} entries."
        );
        let user = format!("Create a study roadmap for: {topic}");

        let outline: RoadmapOutline = self.complete("roadmap", &system, &user, 4000).await?;
        validate::roadmap(&outline, total_days)?;
        Ok(outline)
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Cut a JSON object out of a model reply, tolerating markdown fences and
/// prose before or after the object.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if s < e => &trimmed[s..=e],
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_fences() {
        let raw = "```json\n{\"title\": \"x\"}\n```";
        assert_eq!(extract_json(raw), "{\"title\": \"x\"}");
    }

    #[test]
    fn extract_json_strips_surrounding_prose() {
        let raw = "Here is your lesson:\n{\"title\": \"x\", \"a\": {\"b\": 1}}\nEnjoy!";
        assert_eq!(extract_json(raw), "{\"title\": \"x\", \"a\": {\"b\": 1}}");
    }

    #[test]
    fn extract_json_passes_through_plain_object() {
        let raw = "{\"title\": \"x\"}";
        assert_eq!(extract_json(raw), raw);
    }

    #[test]
    fn parsed_quiz_uses_camel_case_fields() {
        let raw = r#"{
            "title": "Rust Quiz",
            "questions": [{
                "id": "q1",
                "question": "What is ownership?",
                "options": ["a", "b", "c", "d"],
                "correctAnswer": 2,
                "explanation": "because"
            }]
        }"#;
        let quiz: GeneratedQuiz = serde_json::from_str(extract_json(raw)).unwrap();
        assert_eq!(quiz.questions[0].correct_answer, 2);
        validate::quiz(&quiz).unwrap();
    }
}
