//! Roadmap progression service
//!
//! Manages the day-by-day curriculum state machine: creation, just-in-time
//! content generation for the current day, completion, and unlock of the
//! next day. All writes for one roadmap are serialized through a
//! roadmap-scoped lock; complete-then-unlock spans several statements and
//! concurrent completions would otherwise double-advance the pointer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::generator::{
    flashcards_or_fallback, lesson_or_fallback, quiz_or_fallback, ContentGenerator,
};
use crate::store::{
    Day, DayStatus, Roadmap, RoadmapStatus, Store, StoredFlashcard, StoredLesson, StoredQuiz,
};

type Result<T> = std::result::Result<T, ServiceError>;

/// A day together with its owning roadmap and whatever content exists
#[derive(Debug)]
pub struct DayBundle {
    pub day: Day,
    pub roadmap: Roadmap,
    pub lesson: Option<StoredLesson>,
    pub quiz: Option<StoredQuiz>,
    pub flashcards: Vec<StoredFlashcard>,
}

/// A roadmap with derived progress numbers for list views
#[derive(Debug)]
pub struct RoadmapProgress {
    pub roadmap: Roadmap,
    pub completed_days: u32,
    pub progress_percent: u32,
}

/// Outcome of completing a day
#[derive(Debug, PartialEq, Eq)]
pub struct CompletionResult {
    pub completed_day: u32,
    /// `None` when the completed day was the last one
    pub unlocked_day: Option<u32>,
    pub roadmap_completed: bool,
}

pub struct RoadmapService {
    store: Arc<Store>,
    generator: Arc<dyn ContentGenerator>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RoadmapService {
    pub fn new(store: Arc<Store>, generator: Arc<dyn ContentGenerator>) -> Self {
        Self {
            store,
            generator,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The per-roadmap write lock. Entries are created on demand and kept
    /// for the lifetime of the service.
    async fn roadmap_lock(&self, roadmap_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(roadmap_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Generate a full curriculum outline and persist the roadmap with one
    /// day row per outline entry; day 1 starts available, the rest locked.
    ///
    /// A generator or validation failure aborts the whole operation with
    /// no partial roadmap; a malformed outline cannot be safely patched.
    pub async fn create_roadmap(
        &self,
        learner_id: &str,
        topic: &str,
        total_days: u32,
        daily_minutes: u32,
    ) -> Result<String> {
        let outline = self
            .generator
            .generate_roadmap(topic, total_days, daily_minutes)
            .await?;

        let roadmap = Roadmap {
            id: uuid::Uuid::new_v4().to_string(),
            learner_id: learner_id.to_string(),
            topic: topic.to_string(),
            status: RoadmapStatus::Active,
            total_days,
            daily_minutes,
            current_day: 1,
            created_at: chrono::Utc::now(),
        };
        self.store.insert_roadmap(&roadmap).map_err(anyhow_err)?;

        for entry in &outline.days {
            let day = Day {
                id: uuid::Uuid::new_v4().to_string(),
                roadmap_id: roadmap.id.clone(),
                day_number: entry.day_number,
                topic: entry.topic.clone(),
                description: Some(entry.description.clone()),
                status: if entry.day_number == 1 {
                    DayStatus::Available
                } else {
                    DayStatus::Locked
                },
            };
            self.store.insert_day(&day).map_err(anyhow_err)?;
        }

        info!(roadmap = %roadmap.id, topic, total_days, "roadmap created");
        Ok(roadmap.id)
    }

    /// The roadmap plus its days ordered by day number.
    pub fn get_roadmap_details(&self, roadmap_id: &str) -> Result<Option<(Roadmap, Vec<Day>)>> {
        let Some(roadmap) = self.store.get_roadmap(roadmap_id).map_err(anyhow_err)? else {
            return Ok(None);
        };
        let days = self.store.days_for_roadmap(roadmap_id).map_err(anyhow_err)?;
        Ok(Some((roadmap, days)))
    }

    /// All of a learner's roadmaps with completed-day counts.
    pub fn get_user_roadmaps(&self, learner_id: &str) -> Result<Vec<RoadmapProgress>> {
        let roadmaps = self.store.list_roadmaps(learner_id).map_err(anyhow_err)?;
        let mut result = Vec::with_capacity(roadmaps.len());
        for roadmap in roadmaps {
            let days = self
                .store
                .days_for_roadmap(&roadmap.id)
                .map_err(anyhow_err)?;
            let completed_days = days
                .iter()
                .filter(|d| d.status == DayStatus::Completed)
                .count() as u32;
            let progress_percent = if roadmap.total_days == 0 {
                0
            } else {
                (completed_days * 100 + roadmap.total_days / 2) / roadmap.total_days
            };
            result.push(RoadmapProgress {
                roadmap,
                completed_days,
                progress_percent,
            });
        }
        Ok(result)
    }

    /// Read-only fetch of a day with its content; `None` if the day does
    /// not exist.
    pub fn get_day_with_lesson(&self, day_id: &str) -> Result<Option<DayBundle>> {
        let Some(day) = self.store.get_day(day_id).map_err(anyhow_err)? else {
            return Ok(None);
        };
        let roadmap = self
            .store
            .get_roadmap(&day.roadmap_id)
            .map_err(anyhow_err)?
            .ok_or_else(|| ServiceError::not_found("roadmap", &day.roadmap_id))?;

        Ok(Some(DayBundle {
            lesson: self.store.any_lesson_for_day(day_id).map_err(anyhow_err)?,
            quiz: self.store.quiz_for_day(day_id).map_err(anyhow_err)?,
            flashcards: self.store.flashcards_for_day(day_id).map_err(anyhow_err)?,
            day,
            roadmap,
        }))
    }

    /// Just-in-time materialization of a day's content bundle. Idempotent:
    /// the first call generates and persists lesson, quiz, and flashcards;
    /// later calls return the stored lesson unchanged.
    pub async fn generate_day_lesson(
        &self,
        day_id: &str,
        learner_id: &str,
    ) -> Result<StoredLesson> {
        let day = self
            .store
            .get_day(day_id)
            .map_err(anyhow_err)?
            .ok_or_else(|| ServiceError::not_found("day", day_id))?;

        let lock = self.roadmap_lock(&day.roadmap_id).await;
        let _guard = lock.lock().await;

        // Memoized: never regenerate an existing bundle
        if let Some(existing) = self
            .store
            .lesson_for_day(day_id, learner_id)
            .map_err(anyhow_err)?
        {
            return Ok(existing);
        }

        let difficulty = difficulty_for_day(day.day_number);
        let question_count = quiz_questions_for_day(day.day_number);
        let card_count = flashcards_for_day_number(day.day_number);

        info!(
            day = day_id,
            number = day.day_number,
            difficulty,
            "generating day bundle"
        );

        // Fan out the three generation calls and join them; each degrades
        // independently to fallback content on failure
        let (lesson, quiz, cards) = tokio::join!(
            lesson_or_fallback(self.generator.as_ref(), &day.topic, difficulty, None),
            quiz_or_fallback(
                self.generator.as_ref(),
                &day.topic,
                difficulty,
                question_count
            ),
            flashcards_or_fallback(self.generator.as_ref(), &day.topic, difficulty, card_count),
        );

        let lesson_id = self
            .store
            .save_lesson(&lesson, learner_id, &day.topic, difficulty, Some(day_id))
            .map_err(anyhow_err)?;
        self.store
            .save_quiz(&quiz, learner_id, &day.topic, difficulty, Some(day_id))
            .map_err(anyhow_err)?;
        self.store
            .save_flashcards(&cards.cards, learner_id, &day.topic, Some(day_id))
            .map_err(anyhow_err)?;

        self.store
            .get_lesson(&lesson_id)
            .map_err(anyhow_err)?
            .ok_or_else(|| ServiceError::not_found("lesson", lesson_id))
    }

    /// Mark a day completed and unlock the next one.
    ///
    /// Serialized per roadmap. Completing the final day is the terminal
    /// transition: the unlock is a no-op and the roadmap itself is marked
    /// completed. Completing a locked or already-completed day is rejected
    /// so a repeated request cannot advance the pointer twice.
    pub async fn complete_day(&self, roadmap_id: &str, day_id: &str) -> Result<CompletionResult> {
        let lock = self.roadmap_lock(roadmap_id).await;
        let _guard = lock.lock().await;

        let roadmap = self
            .store
            .get_roadmap(roadmap_id)
            .map_err(anyhow_err)?
            .ok_or_else(|| ServiceError::not_found("roadmap", roadmap_id))?;
        let day = self
            .store
            .get_day(day_id)
            .map_err(anyhow_err)?
            .filter(|d| d.roadmap_id == roadmap_id)
            .ok_or_else(|| ServiceError::not_found("day", day_id))?;

        if day.status != DayStatus::Available {
            return Err(ServiceError::DayNotCompletable {
                roadmap: roadmap_id.to_string(),
                day: day.day_number,
                status: day.status.as_str().to_string(),
            });
        }

        self.store
            .mark_day_lesson_completed(day_id)
            .map_err(anyhow_err)?;
        self.store
            .set_day_status(roadmap_id, day.day_number, DayStatus::Completed)
            .map_err(anyhow_err)?;

        let next = day.day_number + 1;
        let unlocked = self
            .store
            .set_day_status(roadmap_id, next, DayStatus::Available)
            .map_err(anyhow_err)?;
        self.store
            .set_current_day(roadmap_id, next)
            .map_err(anyhow_err)?;

        let roadmap_completed = unlocked == 0 && next > roadmap.total_days;
        if roadmap_completed {
            self.store
                .set_roadmap_status(roadmap_id, RoadmapStatus::Completed)
                .map_err(anyhow_err)?;
            info!(roadmap = roadmap_id, "roadmap completed");
        } else if unlocked == 0 {
            // A gap in day numbering; nothing to unlock but not finished
            warn!(roadmap = roadmap_id, day = next, "no day row to unlock");
        }

        info!(
            roadmap = roadmap_id,
            completed = day.day_number,
            "day completed"
        );
        Ok(CompletionResult {
            completed_day: day.day_number,
            unlocked_day: (unlocked > 0).then_some(next),
            roadmap_completed,
        })
    }

    /// Cascade delete: content for every day, then the days, then the
    /// roadmap row. Safe on a roadmap with zero days.
    pub async fn delete_roadmap(&self, roadmap_id: &str) -> Result<()> {
        let lock = self.roadmap_lock(roadmap_id).await;
        let _guard = lock.lock().await;

        self.store
            .get_roadmap(roadmap_id)
            .map_err(anyhow_err)?
            .ok_or_else(|| ServiceError::not_found("roadmap", roadmap_id))?;

        let day_ids: Vec<String> = self
            .store
            .days_for_roadmap(roadmap_id)
            .map_err(anyhow_err)?
            .into_iter()
            .map(|d| d.id)
            .collect();
        self.store
            .delete_content_for_days(&day_ids)
            .map_err(anyhow_err)?;
        self.store
            .delete_roadmap_rows(roadmap_id)
            .map_err(anyhow_err)?;

        info!(roadmap = roadmap_id, days = day_ids.len(), "roadmap deleted");
        Ok(())
    }
}

fn anyhow_err(e: anyhow::Error) -> ServiceError {
    ServiceError::Other(e)
}

/// Difficulty ramps one bucket every 7 days, capped at 4.
pub fn difficulty_for_day(day_number: u32) -> u8 {
    let bucket = 1 + (day_number.saturating_sub(1)) / 7;
    bucket.min(4) as u8
}

/// Quiz length grows every 2 days from 3 questions, capped at 10.
pub fn quiz_questions_for_day(day_number: u32) -> u32 {
    (3 + day_number.saturating_sub(1) / 2).min(10)
}

/// Flashcard count grows every 3 days from 5 cards, capped at 15.
pub fn flashcards_for_day_number(day_number: u32) -> u32 {
    (5 + day_number.saturating_sub(1) / 3).min(15)
}
