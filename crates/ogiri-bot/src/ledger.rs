//! SQLite-backed ledger of generated topics.
//!
//! One table, `topics`, holds every topic the bot has ever generated along
//! with its (possibly still absent) example answer and a sent flag. The
//! deferred-answer handshake is two queries: [`TopicLedger::oldest_pending_answer`]
//! finds the oldest record whose answer exists but has not gone out, and
//! [`TopicLedger::mark_answer_sent`] flips the flag once delivery succeeds.
//!
//! Every operation opens and closes its own connection; there is no pooling
//! and no cross-operation transaction. A crash between
//! [`TopicLedger::create_topic`] and [`TopicLedger::attach_answer`] leaves a
//! record with no answer, which is never picked up by the drain query and is
//! never repaired. Records are never deleted.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::PathBuf;
use tracing::debug;

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS topics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        topic TEXT NOT NULL,
        answer TEXT,
        prompt_source TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        answer_sent BOOLEAN DEFAULT FALSE
    )
";

/// A full row from the `topics` table.
#[derive(Debug, Clone)]
pub struct TopicRecord {
    pub id: i64,
    pub topic: String,
    pub answer: Option<String>,
    pub prompt_source: String,
    pub created_at: String,
    pub answer_sent: bool,
}

/// The oldest generated-but-unsent answer, as returned by the drain query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAnswer {
    pub id: i64,
    pub topic: String,
    pub answer: String,
}

/// Handle to the topics database. Holds only the file path — each call opens
/// a fresh connection and commits independently.
pub struct TopicLedger {
    db_path: PathBuf,
}

impl TopicLedger {
    /// Open the ledger at the given SQLite file, creating the parent
    /// directory and the schema if they do not exist yet.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, String> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
        }
        let ledger = Self { db_path };
        let conn = ledger.connect()?;
        conn.execute(CREATE_TABLE_SQL, [])
            .map_err(|e| format!("failed to create topics table: {e}"))?;
        Ok(ledger)
    }

    fn connect(&self) -> Result<Connection, String> {
        Connection::open(&self.db_path)
            .map_err(|e| format!("failed to open {}: {e}", self.db_path.display()))
    }

    /// Insert a new topic with no answer yet. Returns the new row id.
    pub fn create_topic(&self, topic: &str, prompt_source: &str) -> Result<i64, String> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO topics (topic, prompt_source) VALUES (?1, ?2)",
            params![topic, prompt_source],
        )
        .map_err(|e| format!("failed to insert topic: {e}"))?;
        let id = conn.last_insert_rowid();
        debug!("Created topic record {id} (source: {prompt_source})");
        Ok(id)
    }

    /// Set the generated answer on an existing topic record.
    pub fn attach_answer(&self, id: i64, answer: &str) -> Result<(), String> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE topics SET answer = ?1 WHERE id = ?2",
            params![answer, id],
        )
        .map_err(|e| format!("failed to attach answer to topic {id}: {e}"))?;
        Ok(())
    }

    /// The oldest record with an answer that has not been sent, or `None`.
    ///
    /// Timestamp ties resolve to the smallest id so repeated calls with no
    /// intervening write always return the same record.
    pub fn oldest_pending_answer(&self) -> Result<Option<PendingAnswer>, String> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT id, topic, answer FROM topics
             WHERE answer_sent = FALSE AND answer IS NOT NULL
             ORDER BY created_at ASC, id ASC
             LIMIT 1",
            [],
            |row| {
                Ok(PendingAnswer {
                    id: row.get(0)?,
                    topic: row.get(1)?,
                    answer: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| format!("failed to query pending answer: {e}"))
    }

    /// Mark a record's answer as delivered. The flag only ever goes
    /// false → true; setting it on an already-sent record is harmless.
    pub fn mark_answer_sent(&self, id: i64) -> Result<(), String> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE topics SET answer_sent = TRUE WHERE id = ?1",
            params![id],
        )
        .map_err(|e| format!("failed to mark answer sent for topic {id}: {e}"))?;
        debug!("Marked answer sent for topic {id}");
        Ok(())
    }

    /// Full history, newest first. Diagnostics only — the delivery handshake
    /// never reads this.
    pub fn all_topics(&self) -> Result<Vec<TopicRecord>, String> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, topic, answer, prompt_source, created_at, answer_sent
                 FROM topics
                 ORDER BY created_at DESC, id DESC",
            )
            .map_err(|e| format!("failed to prepare history query: {e}"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TopicRecord {
                    id: row.get(0)?,
                    topic: row.get(1)?,
                    answer: row.get(2)?,
                    prompt_source: row.get(3)?,
                    created_at: row.get(4)?,
                    answer_sent: row.get(5)?,
                })
            })
            .map_err(|e| format!("failed to query history: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("failed to read history rows: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_ledger(dir: &tempfile::TempDir) -> TopicLedger {
        TopicLedger::open(dir.path().join("test.db")).unwrap()
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("test.db");
        let ledger = TopicLedger::open(&path).unwrap();
        assert!(path.parent().unwrap().exists());
        assert!(ledger.all_topics().unwrap().is_empty());
    }

    #[test]
    fn create_topic_returns_strictly_increasing_ids() {
        let dir = tempdir().unwrap();
        let ledger = test_ledger(&dir);
        let mut previous = 0;
        for i in 0..5 {
            let id = ledger
                .create_topic(&format!("topic {i}"), "fileA.txt")
                .unwrap();
            assert!(id > previous, "id {id} not greater than {previous}");
            previous = id;
        }
    }

    #[test]
    fn no_pending_answer_when_answers_absent() {
        let dir = tempdir().unwrap();
        let ledger = test_ledger(&dir);
        assert_eq!(ledger.oldest_pending_answer().unwrap(), None);

        // A topic without an answer is invisible to the drain query.
        ledger.create_topic("T1", "fileA.txt").unwrap();
        assert_eq!(ledger.oldest_pending_answer().unwrap(), None);
    }

    #[test]
    fn attach_then_drain_then_mark_sent() {
        let dir = tempdir().unwrap();
        let ledger = test_ledger(&dir);
        let id = ledger.create_topic("T1", "fileA.txt").unwrap();
        ledger.attach_answer(id, "A1").unwrap();

        let pending = ledger.oldest_pending_answer().unwrap().unwrap();
        assert_eq!(pending.id, id);
        assert_eq!(pending.topic, "T1");
        assert_eq!(pending.answer, "A1");

        ledger.mark_answer_sent(id).unwrap();
        assert_eq!(ledger.oldest_pending_answer().unwrap(), None);
    }

    #[test]
    fn mark_answer_sent_is_idempotent() {
        let dir = tempdir().unwrap();
        let ledger = test_ledger(&dir);
        let id = ledger.create_topic("T1", "fileA.txt").unwrap();
        ledger.attach_answer(id, "A1").unwrap();
        ledger.mark_answer_sent(id).unwrap();
        ledger.mark_answer_sent(id).unwrap();
        assert_eq!(ledger.oldest_pending_answer().unwrap(), None);
    }

    #[test]
    fn drain_returns_oldest_of_two_pending_records() {
        let dir = tempdir().unwrap();
        let ledger = test_ledger(&dir);
        let first = ledger.create_topic("T1", "fileA.txt").unwrap();
        let second = ledger.create_topic("T2", "fileB.txt").unwrap();
        ledger.attach_answer(first, "A1").unwrap();
        ledger.attach_answer(second, "A2").unwrap();

        // Both inserted within the same timestamp second in all likelihood;
        // the id tie-break keeps the result deterministic either way.
        let pending = ledger.oldest_pending_answer().unwrap().unwrap();
        assert_eq!(pending.id, first);
        assert_eq!(pending.topic, "T1");

        ledger.mark_answer_sent(first).unwrap();
        let pending = ledger.oldest_pending_answer().unwrap().unwrap();
        assert_eq!(pending.id, second);
    }

    #[test]
    fn all_topics_newest_first() {
        let dir = tempdir().unwrap();
        let ledger = test_ledger(&dir);
        let first = ledger.create_topic("T1", "fileA.txt").unwrap();
        let second = ledger.create_topic("T2", "fileB.txt").unwrap();
        let third = ledger.create_topic("T3", "fileA.txt").unwrap();

        let history = ledger.all_topics().unwrap();
        let ids: Vec<i64> = history.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third, second, first]);
        assert_eq!(history[0].topic, "T3");
        assert_eq!(history[0].prompt_source, "fileA.txt");
        assert!(!history[0].answer_sent);
        assert_eq!(history[0].answer, None);
    }

    #[test]
    fn history_reflects_answer_and_sent_flag() {
        let dir = tempdir().unwrap();
        let ledger = test_ledger(&dir);
        let id = ledger.create_topic("T1", "fileA.txt").unwrap();
        ledger.attach_answer(id, "A1").unwrap();
        ledger.mark_answer_sent(id).unwrap();

        let history = ledger.all_topics().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].answer.as_deref(), Some("A1"));
        assert!(history[0].answer_sent);
    }
}
