use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::runner::RunnerStore;

const KEY_RUNNERS: &str = "runners";
const KEY_MASTER_TIME: &str = "master_time";
const KEY_TARGET_PACE: &str = "target_pace";

const UPSERT: &str = r#"
    INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
"#;

/// Everything that survives a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub runners: RunnerStore,
    pub elapsed_ms: u64,
    pub target_pace: String,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            runners: RunnerStore::with_default_runner(),
            elapsed_ms: 0,
            target_pace: String::new(),
        }
    }
}

pub trait SessionStore {
    /// Never fails: absent or unreadable values fall back to defaults.
    fn load(&self) -> Snapshot;
    fn save(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// SQLite-backed key-value store for the session snapshot.
#[derive(Debug)]
pub struct SessionDb {
    conn: Connection,
}

impl SessionDb {
    /// Opens (creating if needed) the database at the default location.
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("splitwatch.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "session database opened");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(UPSERT, params![key, value])?;
        Ok(())
    }

    fn load_runners(&self) -> RunnerStore {
        match self.get(KEY_RUNNERS) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("stored runners unreadable, starting fresh: {e}");
                RunnerStore::with_default_runner()
            }),
            Ok(None) => RunnerStore::with_default_runner(),
            Err(e) => {
                warn!("failed to read stored runners: {e}");
                RunnerStore::with_default_runner()
            }
        }
    }

    fn load_master_time(&self) -> u64 {
        match self.get(KEY_MASTER_TIME) {
            Ok(Some(text)) => text.trim().parse().unwrap_or_else(|_| {
                warn!(value = %text, "stored clock value unreadable, using 0");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!("failed to read stored clock value: {e}");
                0
            }
        }
    }

    fn load_target_pace(&self) -> String {
        self.get(KEY_TARGET_PACE).ok().flatten().unwrap_or_default()
    }
}

impl SessionStore for SessionDb {
    fn load(&self) -> Snapshot {
        Snapshot {
            runners: self.load_runners(),
            elapsed_ms: self.load_master_time(),
            target_pace: self.load_target_pace(),
        }
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        let runners = serde_json::to_string(&snapshot.runners)?;
        let tx = self.conn.transaction()?;
        for (key, value) in [
            (KEY_RUNNERS, runners),
            (KEY_MASTER_TIME, snapshot.elapsed_ms.to_string()),
            (KEY_TARGET_PACE, snapshot.target_pace.clone()),
        ] {
            tx.execute(UPSERT, params![key, value])?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splits::DEFAULT_FINISH_THRESHOLD_MS;
    use tempfile::tempdir;

    #[test]
    fn empty_database_loads_defaults() {
        let db = SessionDb::open_in_memory().unwrap();
        let snapshot = db.load();
        assert_eq!(snapshot, Snapshot::default());
        assert_eq!(snapshot.runners.len(), 1);
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut db = SessionDb::open_in_memory().unwrap();
        let mut runners = RunnerStore::new();
        let a = runners.add_named("Budi").unwrap();
        runners.record_split(a, 12_000).unwrap();
        runners
            .finish_runner(a, 25_000, DEFAULT_FINISH_THRESHOLD_MS)
            .unwrap();
        let snapshot = Snapshot {
            runners,
            elapsed_ms: 25_340,
            target_pace: "01:30".into(),
        };

        db.save(&snapshot).unwrap();
        assert_eq!(db.load(), snapshot);
    }

    #[test]
    fn saved_empty_runner_list_stays_empty() {
        let mut db = SessionDb::open_in_memory().unwrap();
        let snapshot = Snapshot {
            runners: RunnerStore::new(),
            ..Snapshot::default()
        };
        db.save(&snapshot).unwrap();
        assert!(db.load().runners.is_empty());
    }

    #[test]
    fn invalid_values_fall_back_per_key() {
        let db = SessionDb::open_in_memory().unwrap();
        db.put(KEY_RUNNERS, "{not json").unwrap();
        db.put(KEY_MASTER_TIME, "soon").unwrap();
        db.put(KEY_TARGET_PACE, "01:45").unwrap();

        let snapshot = db.load();
        assert_eq!(snapshot.runners, RunnerStore::with_default_runner());
        assert_eq!(snapshot.elapsed_ms, 0);
        assert_eq!(snapshot.target_pace, "01:45");
    }

    #[test]
    fn negative_clock_value_is_rejected() {
        let db = SessionDb::open_in_memory().unwrap();
        db.put(KEY_MASTER_TIME, "-500").unwrap();
        assert_eq!(db.load().elapsed_ms, 0);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.db");

        {
            let mut db = SessionDb::open(&path).unwrap();
            let mut snapshot = Snapshot::default();
            snapshot.runners.rename(1, "Siti").unwrap();
            snapshot.elapsed_ms = 900;
            db.save(&snapshot).unwrap();
        }

        let db = SessionDb::open(&path).unwrap();
        let snapshot = db.load();
        assert_eq!(snapshot.runners.get(1).unwrap().name, "Siti");
        assert_eq!(snapshot.elapsed_ms, 900);
    }

    #[test]
    fn put_overwrites() {
        let db = SessionDb::open_in_memory().unwrap();
        db.put("k", "one").unwrap();
        db.put("k", "two").unwrap();
        assert_eq!(db.get("k").unwrap().as_deref(), Some("two"));
        assert_eq!(db.get("missing").unwrap(), None);
    }
}
