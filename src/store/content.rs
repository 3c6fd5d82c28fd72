//! Lesson, quiz, and flashcard repositories
//!
//! Generated content is persisted tagged to (learner, topic) and optionally
//! to a roadmap day. Content is immutable after creation except for lesson
//! completion marking.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::generator::{Flashcard, GeneratedLesson, GeneratedQuiz, QuizQuestion};

use super::Store;

/// A persisted lesson row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredLesson {
    pub id: String,
    pub learner_id: String,
    pub day_id: Option<String>,
    pub topic: String,
    pub title: String,
    pub content: String,
    pub key_points: Vec<String>,
    pub difficulty: u8,
    pub estimated_minutes: u32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A persisted quiz row; questions are stored as one JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredQuiz {
    pub id: String,
    pub learner_id: String,
    pub day_id: Option<String>,
    pub topic: String,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    pub difficulty: u8,
}

/// A persisted flashcard; one row per card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFlashcard {
    pub id: String,
    pub learner_id: String,
    pub day_id: Option<String>,
    pub topic: String,
    pub front: String,
    pub back: String,
    pub tags: Vec<String>,
}

impl Store {
    /// Persist a generated lesson; returns the new row id.
    pub fn save_lesson(
        &self,
        lesson: &GeneratedLesson,
        learner_id: &str,
        topic: &str,
        difficulty: u8,
        day_id: Option<&str>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.lock().execute(
            r#"
            INSERT INTO lessons (id, learner_id, day_id, topic, title, content, key_points, difficulty, estimated_minutes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                id,
                learner_id,
                day_id,
                topic,
                lesson.title,
                lesson.content,
                serde_json::to_string(&lesson.key_points)?,
                difficulty,
                lesson.estimated_minutes,
            ],
        )?;
        Ok(id)
    }

    pub fn get_lesson(&self, id: &str) -> Result<Option<StoredLesson>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                &format!("{LESSON_SELECT} WHERE id = ?1"),
                params![id],
                map_lesson,
            )
            .optional()?;
        Ok(row)
    }

    /// The lesson tagged to (day, learner), if one was already generated.
    pub fn lesson_for_day(&self, day_id: &str, learner_id: &str) -> Result<Option<StoredLesson>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                &format!("{LESSON_SELECT} WHERE day_id = ?1 AND learner_id = ?2"),
                params![day_id, learner_id],
                map_lesson,
            )
            .optional()?;
        Ok(row)
    }

    /// Any lesson tagged to the day, regardless of learner.
    pub fn any_lesson_for_day(&self, day_id: &str) -> Result<Option<StoredLesson>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                &format!("{LESSON_SELECT} WHERE day_id = ?1"),
                params![day_id],
                map_lesson,
            )
            .optional()?;
        Ok(row)
    }

    /// Timestamp the day's lesson as completed. Affecting zero rows is
    /// fine; fallback-less days simply have nothing to mark.
    pub fn mark_day_lesson_completed(&self, day_id: &str) -> Result<usize> {
        let changed = self.lock().execute(
            "UPDATE lessons SET completed = 1, completed_at = ?1 WHERE day_id = ?2",
            params![Utc::now(), day_id],
        )?;
        Ok(changed)
    }

    /// Persist a generated quiz; returns the new row id.
    pub fn save_quiz(
        &self,
        quiz: &GeneratedQuiz,
        learner_id: &str,
        topic: &str,
        difficulty: u8,
        day_id: Option<&str>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.lock().execute(
            r#"
            INSERT INTO quizzes (id, learner_id, day_id, topic, title, questions, difficulty)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                id,
                learner_id,
                day_id,
                topic,
                quiz.title,
                serde_json::to_string(&quiz.questions)?,
                difficulty,
            ],
        )?;
        Ok(id)
    }

    pub fn quiz_for_day(&self, day_id: &str) -> Result<Option<StoredQuiz>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, learner_id, day_id, topic, title, questions, difficulty
                 FROM quizzes WHERE day_id = ?1",
                params![day_id],
                map_quiz,
            )
            .optional()?;
        Ok(row)
    }

    /// Persist a flashcard set as one row per card.
    pub fn save_flashcards(
        &self,
        cards: &[Flashcard],
        learner_id: &str,
        topic: &str,
        day_id: Option<&str>,
    ) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut ids = Vec::with_capacity(cards.len());
        for card in cards {
            let id = Uuid::new_v4().to_string();
            conn.execute(
                r#"
                INSERT INTO flashcards (id, learner_id, day_id, topic, front, back, tags)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    id,
                    learner_id,
                    day_id,
                    topic,
                    card.front,
                    card.back,
                    serde_json::to_string(&card.tags)?,
                ],
            )?;
            ids.push(id);
        }
        Ok(ids)
    }

    pub fn flashcards_for_day(&self, day_id: &str) -> Result<Vec<StoredFlashcard>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, learner_id, day_id, topic, front, back, tags
             FROM flashcards WHERE day_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![day_id], map_flashcard)?;
        let mut cards = Vec::new();
        for row in rows {
            cards.push(row?);
        }
        Ok(cards)
    }

    /// Remove all content rows tagged to any of the given days.
    pub fn delete_content_for_days(&self, day_ids: &[String]) -> Result<()> {
        let conn = self.lock();
        for day_id in day_ids {
            conn.execute("DELETE FROM lessons WHERE day_id = ?1", params![day_id])?;
            conn.execute("DELETE FROM quizzes WHERE day_id = ?1", params![day_id])?;
            conn.execute("DELETE FROM flashcards WHERE day_id = ?1", params![day_id])?;
        }
        Ok(())
    }

    /// Row counts for the status command: (learners, lessons, quizzes, flashcards).
    pub fn content_counts(&self) -> Result<(i64, i64, i64, i64)> {
        let conn = self.lock();
        let count = |table: &str| -> rusqlite::Result<i64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        };
        Ok((
            count("learners")?,
            count("lessons")?,
            count("quizzes")?,
            count("flashcards")?,
        ))
    }
}

const LESSON_SELECT: &str = "SELECT id, learner_id, day_id, topic, title, content, key_points, difficulty, estimated_minutes, completed, completed_at FROM lessons";

fn map_lesson(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredLesson> {
    let key_points_json: String = row.get(6)?;
    Ok(StoredLesson {
        id: row.get(0)?,
        learner_id: row.get(1)?,
        day_id: row.get(2)?,
        topic: row.get(3)?,
        title: row.get(4)?,
        content: row.get(5)?,
        key_points: serde_json::from_str(&key_points_json).unwrap_or_default(),
        difficulty: row.get(7)?,
        estimated_minutes: row.get(8)?,
        completed: row.get(9)?,
        completed_at: row.get(10)?,
    })
}

fn map_quiz(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredQuiz> {
    let questions_json: String = row.get(5)?;
    Ok(StoredQuiz {
        id: row.get(0)?,
        learner_id: row.get(1)?,
        day_id: row.get(2)?,
        topic: row.get(3)?,
        title: row.get(4)?,
        questions: serde_json::from_str(&questions_json).unwrap_or_default(),
        difficulty: row.get(6)?,
    })
}

fn map_flashcard(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredFlashcard> {
    let tags_json: String = row.get(6)?;
    Ok(StoredFlashcard {
        id: row.get(0)?,
        learner_id: row.get(1)?,
        day_id: row.get(2)?,
        topic: row.get(3)?,
        front: row.get(4)?,
        back: row.get(5)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
    })
}
