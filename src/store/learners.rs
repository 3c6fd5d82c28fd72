//! Learner state and agent memory repositories
//!
//! `LearnerState` is the measured state the decision engine reads;
//! `LearnerMemory` is the agent's long-term record of habits and per-topic
//! performance, created lazily on first touch and updated after every
//! decision.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Store;

/// How many quiz scores are retained per learner
pub const MAX_RECENT_SCORES: usize = 5;

/// Measured learning state for one learner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerState {
    pub id: String,
    pub current_topic: String,
    /// 0-100 continuous mastery measure
    pub mastery_level: f64,
    pub last_activity: DateTime<Utc>,
    pub recent_scores: Vec<f64>,
    pub needs_attention: bool,
}

/// Running per-topic performance record; at most one per topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicPerformance {
    pub topic: String,
    pub average_score: f64,
    pub attempts: u32,
}

/// Long-term agent memory about one learner.
///
/// Pattern hints are `Option` so "first observation wins" is an explicit
/// check rather than an undefined-means-unset convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerMemory {
    pub learner_id: String,
    pub best_time_of_day: Option<String>,
    pub avg_session_minutes: Option<f64>,
    pub preferred_difficulty: Option<u8>,
    pub historical_performance: Vec<TopicPerformance>,
    pub last_updated: DateTime<Utc>,
}

impl LearnerMemory {
    fn empty(learner_id: &str) -> Self {
        Self {
            learner_id: learner_id.to_string(),
            best_time_of_day: None,
            avg_session_minutes: None,
            preferred_difficulty: None,
            historical_performance: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    /// Fold a new score into the per-topic running mean.
    pub fn record_topic_score(&mut self, topic: &str, score: f64) {
        let score = score.max(0.0);
        match self
            .historical_performance
            .iter_mut()
            .find(|p| p.topic == topic)
        {
            Some(record) => {
                let total = record.average_score * record.attempts as f64 + score;
                record.attempts += 1;
                record.average_score = (total / record.attempts as f64).max(0.0);
            }
            None => self.historical_performance.push(TopicPerformance {
                topic: topic.to_string(),
                average_score: score,
                attempts: 1,
            }),
        }
    }
}

impl Store {
    /// Insert or replace a learner row.
    pub fn upsert_learner(&self, state: &LearnerState) -> Result<()> {
        let scores = serde_json::to_string(&state.recent_scores)?;
        self.lock().execute(
            r#"
            INSERT INTO learners (id, current_topic, mastery_level, last_activity, recent_scores, needs_attention)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                current_topic = excluded.current_topic,
                mastery_level = excluded.mastery_level,
                last_activity = excluded.last_activity,
                recent_scores = excluded.recent_scores,
                needs_attention = excluded.needs_attention
            "#,
            params![
                state.id,
                state.current_topic,
                state.mastery_level.clamp(0.0, 100.0),
                state.last_activity,
                scores,
                state.needs_attention,
            ],
        )?;
        Ok(())
    }

    pub fn get_learner(&self, id: &str) -> Result<Option<LearnerState>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, current_topic, mastery_level, last_activity, recent_scores, needs_attention
                 FROM learners WHERE id = ?1",
                params![id],
                map_learner,
            )
            .optional()?;
        Ok(row)
    }

    /// Learners flagged as needing attention, in stable id order.
    pub fn find_learners_needing_attention(&self) -> Result<Vec<LearnerState>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, current_topic, mastery_level, last_activity, recent_scores, needs_attention
             FROM learners WHERE needs_attention = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], map_learner)?;
        let mut learners = Vec::new();
        for row in rows {
            learners.push(row?);
        }
        Ok(learners)
    }

    /// Persist a new mastery level for (learner, topic), clamped to [0,100].
    pub fn update_mastery(&self, learner_id: &str, topic: &str, level: f64) -> Result<()> {
        self.lock().execute(
            "UPDATE learners SET mastery_level = ?1 WHERE id = ?2 AND current_topic = ?3",
            params![level.clamp(0.0, 100.0), learner_id, topic],
        )?;
        Ok(())
    }

    /// Log an activity event and refresh the learner's last-activity stamp.
    pub fn record_activity(&self, learner_id: &str, event_type: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO activity_log (learner_id, event_type) VALUES (?1, ?2)",
            params![learner_id, event_type],
        )?;
        conn.execute(
            "UPDATE learners SET last_activity = ?1 WHERE id = ?2",
            params![Utc::now(), learner_id],
        )?;
        Ok(())
    }

    /// Append a quiz score, keeping at most [`MAX_RECENT_SCORES`] entries,
    /// and flag the learner for the next orchestrator cycle.
    pub fn push_recent_score(&self, learner_id: &str, score: f64) -> Result<()> {
        let state = self
            .get_learner(learner_id)?
            .ok_or_else(|| anyhow::anyhow!("learner not found: {learner_id}"))?;
        let mut scores = state.recent_scores;
        scores.push(score);
        if scores.len() > MAX_RECENT_SCORES {
            let excess = scores.len() - MAX_RECENT_SCORES;
            scores.drain(..excess);
        }
        self.lock().execute(
            "UPDATE learners SET recent_scores = ?1, needs_attention = 1 WHERE id = ?2",
            params![serde_json::to_string(&scores)?, learner_id],
        )?;
        Ok(())
    }

    /// Memory lookup without side effects; `None` if never created.
    pub fn get_memory(&self, learner_id: &str) -> Result<Option<LearnerMemory>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT learner_id, best_time_of_day, avg_session_minutes, preferred_difficulty, history, last_updated
                 FROM agent_memory WHERE learner_id = ?1",
                params![learner_id],
                map_memory,
            )
            .optional()?;
        Ok(row)
    }

    /// Memory lookup that lazily creates an empty record on first touch.
    pub fn get_or_create_memory(&self, learner_id: &str) -> Result<LearnerMemory> {
        if let Some(memory) = self.get_memory(learner_id)? {
            return Ok(memory);
        }
        debug!(learner_id, "creating initial memory");
        let memory = LearnerMemory::empty(learner_id);
        self.update_memory(&memory)?;
        Ok(memory)
    }

    /// Upsert the full memory record.
    pub fn update_memory(&self, memory: &LearnerMemory) -> Result<()> {
        let history = serde_json::to_string(&memory.historical_performance)?;
        self.lock().execute(
            r#"
            INSERT INTO agent_memory (learner_id, best_time_of_day, avg_session_minutes, preferred_difficulty, history, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(learner_id) DO UPDATE SET
                best_time_of_day = excluded.best_time_of_day,
                avg_session_minutes = excluded.avg_session_minutes,
                preferred_difficulty = excluded.preferred_difficulty,
                history = excluded.history,
                last_updated = excluded.last_updated
            "#,
            params![
                memory.learner_id,
                memory.best_time_of_day,
                memory.avg_session_minutes,
                memory.preferred_difficulty,
                history,
                memory.last_updated,
            ],
        )?;
        Ok(())
    }

    /// Explicit reset keeps the row but clears everything learned.
    pub fn reset_memory(&self, learner_id: &str) -> Result<()> {
        self.update_memory(&LearnerMemory::empty(learner_id))
    }
}

fn map_learner(row: &rusqlite::Row<'_>) -> rusqlite::Result<LearnerState> {
    let scores_json: String = row.get(4)?;
    Ok(LearnerState {
        id: row.get(0)?,
        current_topic: row.get(1)?,
        mastery_level: row.get(2)?,
        last_activity: row.get(3)?,
        recent_scores: serde_json::from_str(&scores_json).unwrap_or_default(),
        needs_attention: row.get(5)?,
    })
}

fn map_memory(row: &rusqlite::Row<'_>) -> rusqlite::Result<LearnerMemory> {
    let history_json: String = row.get(4)?;
    Ok(LearnerMemory {
        learner_id: row.get(0)?,
        best_time_of_day: row.get(1)?,
        avg_session_minutes: row.get(2)?,
        preferred_difficulty: row.get(3)?,
        historical_performance: serde_json::from_str(&history_json).unwrap_or_default(),
        last_updated: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn learner(id: &str) -> LearnerState {
        LearnerState {
            id: id.to_string(),
            current_topic: "rust".to_string(),
            mastery_level: 50.0,
            last_activity: Utc::now(),
            recent_scores: vec![],
            needs_attention: true,
        }
    }

    #[test]
    fn upsert_and_find_flagged() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_learner(&learner("a")).unwrap();
        let mut calm = learner("b");
        calm.needs_attention = false;
        store.upsert_learner(&calm).unwrap();

        let flagged = store.find_learners_needing_attention().unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, "a");
    }

    #[test]
    fn mastery_is_clamped() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_learner(&learner("a")).unwrap();
        store.update_mastery("a", "rust", 140.0).unwrap();
        let state = store.get_learner("a").unwrap().unwrap();
        assert_eq!(state.mastery_level, 100.0);
    }

    #[test]
    fn recent_scores_bounded() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_learner(&learner("a")).unwrap();
        for score in [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0] {
            store.push_recent_score("a", score).unwrap();
        }
        let state = store.get_learner("a").unwrap().unwrap();
        assert_eq!(state.recent_scores, vec![30.0, 40.0, 50.0, 60.0, 70.0]);
        assert!(state.needs_attention);
    }

    #[test]
    fn memory_created_lazily_once() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_memory("a").unwrap().is_none());

        let memory = store.get_or_create_memory("a").unwrap();
        assert!(memory.best_time_of_day.is_none());
        assert!(store.get_memory("a").unwrap().is_some());
    }

    #[test]
    fn topic_score_running_mean() {
        let mut memory = LearnerMemory::empty("a");
        memory.record_topic_score("rust", 80.0);
        memory.record_topic_score("rust", 60.0);
        memory.record_topic_score("sql", 90.0);

        assert_eq!(memory.historical_performance.len(), 2);
        let rust = &memory.historical_performance[0];
        assert_eq!(rust.attempts, 2);
        assert!((rust.average_score - 70.0).abs() < f64::EPSILON);
    }
}
