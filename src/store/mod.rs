//! State store for the agent core
//!
//! All learner, memory, content, and roadmap rows live in a single SQLite
//! database. Repositories are split by concern (`learners`, `content`,
//! `roadmaps`) but share one connection; callers never hold the lock
//! across an await point.

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub mod content;
pub mod learners;
pub mod roadmaps;

pub use content::{StoredFlashcard, StoredLesson, StoredQuiz};
pub use learners::{LearnerMemory, LearnerState, TopicPerformance};
pub use roadmaps::{Day, DayStatus, Roadmap, RoadmapStatus};

/// Shared SQLite-backed store.
///
/// The connection is guarded by a mutex so async callers can share one
/// handle; individual statements are short-lived.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the store at the given path and ensure the schema.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS learners (
                id TEXT PRIMARY KEY,
                current_topic TEXT NOT NULL,
                mastery_level REAL NOT NULL DEFAULT 0,
                last_activity DATETIME NOT NULL,
                recent_scores TEXT NOT NULL DEFAULT '[]',
                needs_attention INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS agent_memory (
                learner_id TEXT PRIMARY KEY,
                best_time_of_day TEXT,
                avg_session_minutes REAL,
                preferred_difficulty INTEGER,
                history TEXT NOT NULL DEFAULT '[]',
                last_updated DATETIME NOT NULL
            );

            CREATE TABLE IF NOT EXISTS activity_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                learner_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS roadmaps (
                id TEXT PRIMARY KEY,
                learner_id TEXT NOT NULL,
                topic TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                total_days INTEGER NOT NULL,
                daily_minutes INTEGER NOT NULL,
                current_day INTEGER NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Day rows are owned by their roadmap and cascade-deleted with it
            CREATE TABLE IF NOT EXISTS days (
                id TEXT PRIMARY KEY,
                roadmap_id TEXT NOT NULL,
                day_number INTEGER NOT NULL,
                topic TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'locked',
                UNIQUE(roadmap_id, day_number)
            );

            CREATE TABLE IF NOT EXISTS lessons (
                id TEXT PRIMARY KEY,
                learner_id TEXT NOT NULL,
                day_id TEXT,
                topic TEXT NOT NULL CHECK (topic <> ''),
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                key_points TEXT NOT NULL DEFAULT '[]',
                difficulty INTEGER NOT NULL,
                estimated_minutes INTEGER NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                completed_at DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS quizzes (
                id TEXT PRIMARY KEY,
                learner_id TEXT NOT NULL,
                day_id TEXT,
                topic TEXT NOT NULL,
                title TEXT NOT NULL,
                questions TEXT NOT NULL,
                difficulty INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS flashcards (
                id TEXT PRIMARY KEY,
                learner_id TEXT NOT NULL,
                day_id TEXT,
                topic TEXT NOT NULL,
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_learners_attention ON learners(needs_attention);
            CREATE INDEX IF NOT EXISTS idx_days_roadmap ON days(roadmap_id);
            CREATE INDEX IF NOT EXISTS idx_lessons_day ON lessons(day_id);
            CREATE INDEX IF NOT EXISTS idx_lessons_learner ON lessons(learner_id, topic);
            CREATE INDEX IF NOT EXISTS idx_quizzes_day ON quizzes(day_id);
            CREATE INDEX IF NOT EXISTS idx_flashcards_day ON flashcards(day_id);
            "#,
        )?;
        Ok(())
    }
}

/// Initialize storage and default configuration in the data directory.
pub fn init(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let db_path = dir.join("eduagent.sqlite");
    let _store = Store::open(&db_path)?;
    crate::config::Config::write_default(dir)?;
    info!("eduagent initialized at {:?}", dir);
    Ok(())
}
