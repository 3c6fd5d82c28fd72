//! Roadmap and day repositories
//!
//! A roadmap owns its days (cascade delete). Day status moves through
//! locked -> available -> completed; exactly one day per roadmap is current
//! (its day_number equals the roadmap's current_day pointer).

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadmapStatus {
    Active,
    Completed,
    Archived,
}

impl RoadmapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "archived" => Self::Archived,
            _ => Self::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Locked,
    Available,
    Completed,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Available => "available",
            Self::Completed => "completed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "available" => Self::Available,
            "completed" => Self::Completed,
            _ => Self::Locked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roadmap {
    pub id: String,
    pub learner_id: String,
    pub topic: String,
    pub status: RoadmapStatus,
    pub total_days: u32,
    pub daily_minutes: u32,
    /// 1-indexed pointer to the day the learner should be working on
    pub current_day: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Day {
    pub id: String,
    pub roadmap_id: String,
    pub day_number: u32,
    pub topic: String,
    pub description: Option<String>,
    pub status: DayStatus,
}

impl Store {
    pub fn insert_roadmap(&self, roadmap: &Roadmap) -> Result<()> {
        self.lock().execute(
            r#"
            INSERT INTO roadmaps (id, learner_id, topic, status, total_days, daily_minutes, current_day, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                roadmap.id,
                roadmap.learner_id,
                roadmap.topic,
                roadmap.status.as_str(),
                roadmap.total_days,
                roadmap.daily_minutes,
                roadmap.current_day,
                roadmap.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn insert_day(&self, day: &Day) -> Result<()> {
        self.lock().execute(
            r#"
            INSERT INTO days (id, roadmap_id, day_number, topic, description, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                day.id,
                day.roadmap_id,
                day.day_number,
                day.topic,
                day.description,
                day.status.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn get_roadmap(&self, id: &str) -> Result<Option<Roadmap>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, learner_id, topic, status, total_days, daily_minutes, current_day, created_at
                 FROM roadmaps WHERE id = ?1",
                params![id],
                map_roadmap,
            )
            .optional()?;
        Ok(row)
    }

    pub fn list_roadmaps(&self, learner_id: &str) -> Result<Vec<Roadmap>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, learner_id, topic, status, total_days, daily_minutes, current_day, created_at
             FROM roadmaps WHERE learner_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![learner_id], map_roadmap)?;
        let mut roadmaps = Vec::new();
        for row in rows {
            roadmaps.push(row?);
        }
        Ok(roadmaps)
    }

    pub fn get_day(&self, day_id: &str) -> Result<Option<Day>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, roadmap_id, day_number, topic, description, status
                 FROM days WHERE id = ?1",
                params![day_id],
                map_day,
            )
            .optional()?;
        Ok(row)
    }

    /// All days of a roadmap ordered by day number.
    pub fn days_for_roadmap(&self, roadmap_id: &str) -> Result<Vec<Day>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, roadmap_id, day_number, topic, description, status
             FROM days WHERE roadmap_id = ?1 ORDER BY day_number",
        )?;
        let rows = stmt.query_map(params![roadmap_id], map_day)?;
        let mut days = Vec::new();
        for row in rows {
            days.push(row?);
        }
        Ok(days)
    }

    /// Set a day's status addressed by (roadmap, day_number). Returns the
    /// number of affected rows; zero means no such day exists, which the
    /// unlock path treats as a safe no-op.
    pub fn set_day_status(
        &self,
        roadmap_id: &str,
        day_number: u32,
        status: DayStatus,
    ) -> Result<usize> {
        let changed = self.lock().execute(
            "UPDATE days SET status = ?1 WHERE roadmap_id = ?2 AND day_number = ?3",
            params![status.as_str(), roadmap_id, day_number],
        )?;
        Ok(changed)
    }

    pub fn set_current_day(&self, roadmap_id: &str, day_number: u32) -> Result<()> {
        self.lock().execute(
            "UPDATE roadmaps SET current_day = ?1 WHERE id = ?2",
            params![day_number, roadmap_id],
        )?;
        Ok(())
    }

    pub fn set_roadmap_status(&self, roadmap_id: &str, status: RoadmapStatus) -> Result<()> {
        self.lock().execute(
            "UPDATE roadmaps SET status = ?1 WHERE id = ?2",
            params![status.as_str(), roadmap_id],
        )?;
        Ok(())
    }

    /// Delete the roadmap row and its day rows. Content rows are removed
    /// separately via [`Store::delete_content_for_days`].
    pub fn delete_roadmap_rows(&self, roadmap_id: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM days WHERE roadmap_id = ?1", params![roadmap_id])?;
        conn.execute("DELETE FROM roadmaps WHERE id = ?1", params![roadmap_id])?;
        Ok(())
    }

    pub fn roadmap_count(&self) -> Result<i64> {
        let count = self
            .lock()
            .query_row("SELECT COUNT(*) FROM roadmaps", [], |r| r.get(0))?;
        Ok(count)
    }
}

fn map_roadmap(row: &rusqlite::Row<'_>) -> rusqlite::Result<Roadmap> {
    let status: String = row.get(3)?;
    Ok(Roadmap {
        id: row.get(0)?,
        learner_id: row.get(1)?,
        topic: row.get(2)?,
        status: RoadmapStatus::parse(&status),
        total_days: row.get(4)?,
        daily_minutes: row.get(5)?,
        current_day: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_day(row: &rusqlite::Row<'_>) -> rusqlite::Result<Day> {
    let status: String = row.get(5)?;
    Ok(Day {
        id: row.get(0)?,
        roadmap_id: row.get(1)?,
        day_number: row.get(2)?,
        topic: row.get(3)?,
        description: row.get(4)?,
        status: DayStatus::parse(&status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn roadmap(id: &str, total_days: u32) -> Roadmap {
        Roadmap {
            id: id.to_string(),
            learner_id: "a".to_string(),
            topic: "rust".to_string(),
            status: RoadmapStatus::Active,
            total_days,
            daily_minutes: 30,
            current_day: 1,
            created_at: Utc::now(),
        }
    }

    fn day(roadmap_id: &str, number: u32, status: DayStatus) -> Day {
        Day {
            id: Uuid::new_v4().to_string(),
            roadmap_id: roadmap_id.to_string(),
            day_number: number,
            topic: format!("topic {number}"),
            description: None,
            status,
        }
    }

    #[test]
    fn days_ordered_by_number() {
        let store = Store::open_in_memory().unwrap();
        store.insert_roadmap(&roadmap("r1", 3)).unwrap();
        for n in [3, 1, 2] {
            store.insert_day(&day("r1", n, DayStatus::Locked)).unwrap();
        }
        let days = store.days_for_roadmap("r1").unwrap();
        let numbers: Vec<u32> = days.iter().map(|d| d.day_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn set_day_status_on_missing_day_is_noop() {
        let store = Store::open_in_memory().unwrap();
        store.insert_roadmap(&roadmap("r1", 1)).unwrap();
        store
            .insert_day(&day("r1", 1, DayStatus::Available))
            .unwrap();

        let changed = store
            .set_day_status("r1", 2, DayStatus::Available)
            .unwrap();
        assert_eq!(changed, 0);
    }

    #[test]
    fn delete_roadmap_rows_cascades_days() {
        let store = Store::open_in_memory().unwrap();
        store.insert_roadmap(&roadmap("r1", 2)).unwrap();
        store.insert_day(&day("r1", 1, DayStatus::Available)).unwrap();
        store.insert_day(&day("r1", 2, DayStatus::Locked)).unwrap();

        store.delete_roadmap_rows("r1").unwrap();
        assert!(store.get_roadmap("r1").unwrap().is_none());
        assert!(store.days_for_roadmap("r1").unwrap().is_empty());
    }
}
