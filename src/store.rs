use crate::app_dirs::AppDirs;
use crate::config::Backend;
use crate::record::{SessionInputs, SessionRecord};
use crate::section::SubSection;
use rusqlite::{params, Connection};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{} is unreadable ({source}); fix or move it before recording more sessions", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("a session with id {0} already exists")]
    DuplicateId(String),
}

/// Persistence for the session history.
///
/// `load` never fails: an unreadable or corrupt store reads as empty so the
/// rest of the tool keeps working. Writers do not coordinate; when two
/// processes save, the last one wins.
///
/// Read-modify-write operations go through `load_for_update`, which must fail
/// rather than hand back an empty history for a store it could not read.
pub trait SessionStore {
    fn load(&self) -> Vec<SessionRecord>;
    fn save(&self, records: &[SessionRecord]) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;

    fn load_for_update(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.load())
    }

    /// Adds `record`; ids are unique within a store
    fn append(&self, record: SessionRecord) -> Result<(), StoreError> {
        let mut records = self.load_for_update()?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        records.push(record);
        self.save(&records)
    }

    /// Removes the record with `id`; returns whether one existed
    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.load_for_update()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save(&records)?;
        Ok(true)
    }
}

/// Whole history as one JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonSessionStore {
    path: PathBuf,
}

impl JsonSessionStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_load(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }
}

impl SessionStore for JsonSessionStore {
    fn load(&self) -> Vec<SessionRecord> {
        self.try_load().unwrap_or_else(|e| {
            log::warn!("failed to load records from {}: {e}", self.path.display());
            Vec::new()
        })
    }

    fn load_for_update(&self) -> Result<Vec<SessionRecord>, StoreError> {
        self.try_load()
    }

    fn save(&self, records: &[SessionRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec(records)?;
        fs::write(&self.path, data)?;
        log::debug!("saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS practice_records (
        id TEXT PRIMARY KEY,
        timestamp INTEGER NOT NULL,
        duration_minutes INTEGER NOT NULL,
        practice_type TEXT NOT NULL,
        total_score REAL NOT NULL,
        score_listening REAL NOT NULL,
        score_reading REAL NOT NULL,
        score_writing REAL NOT NULL,
        score_translation REAL NOT NULL,
        inputs TEXT NOT NULL,
        attempts TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
"#;

const INSERT_RECORD: &str = r#"
    INSERT INTO practice_records
    (id, timestamp, duration_minutes, practice_type, total_score,
     score_listening, score_reading, score_writing, score_translation, inputs, attempts)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;

/// Flat score columns with the item counts and attempt map kept as JSON text
#[derive(Debug)]
pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_TABLE, [])?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_practice_records_timestamp ON practice_records(timestamp)",
            [],
        )?;
        Ok(Self { conn })
    }

    fn insert(conn: &Connection, record: &SessionRecord) -> Result<(), StoreError> {
        let inputs = serde_json::to_string(&record.inputs)?;
        let attempts = record
            .attempts
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        conn.execute(
            INSERT_RECORD,
            params![
                record.id,
                record.timestamp,
                record.duration_minutes,
                record.practice_type,
                record.total_score,
                record.score_listening,
                record.score_reading,
                record.score_writing,
                record.score_translation,
                inputs,
                attempts,
            ],
        )?;
        Ok(())
    }

    fn try_load(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, timestamp, duration_minutes, practice_type, total_score,
                   score_listening, score_reading, score_writing, score_translation,
                   inputs, attempts
            FROM practice_records
            ORDER BY timestamp ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let inputs: String = row.get(9)?;
            let inputs: SessionInputs = serde_json::from_str(&inputs).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    9,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            let attempts: Option<String> = row.get(10)?;
            let attempts = attempts
                .map(|a| serde_json::from_str::<BTreeMap<SubSection, bool>>(&a))
                .transpose()
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        10,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;

            Ok(SessionRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                duration_minutes: row.get(2)?,
                practice_type: row.get(3)?,
                total_score: row.get(4)?,
                score_listening: row.get(5)?,
                score_reading: row.get(6)?,
                score_writing: row.get(7)?,
                score_translation: row.get(8)?,
                inputs,
                attempts,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&self) -> Vec<SessionRecord> {
        self.try_load().unwrap_or_else(|e| {
            log::warn!("failed to load records from database: {e}");
            Vec::new()
        })
    }

    fn save(&self, records: &[SessionRecord]) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM practice_records", [])?;
        for record in records {
            Self::insert(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM practice_records", [])?;
        Ok(())
    }

    fn append(&self, record: SessionRecord) -> Result<(), StoreError> {
        match Self::insert(&self.conn, &record) {
            Err(StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _)))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateId(record.id))
            }
            other => other,
        }
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM practice_records WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }
}

/// Process-local store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<Vec<SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Vec<SessionRecord> {
        self.records.borrow().clone()
    }

    fn save(&self, records: &[SessionRecord]) -> Result<(), StoreError> {
        *self.records.borrow_mut() = records.to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.records.borrow_mut().clear();
        Ok(())
    }
}

/// Opens the configured backend at `path`, or at its default location
pub fn open_store(
    backend: Backend,
    path: Option<PathBuf>,
) -> Result<Box<dyn SessionStore>, StoreError> {
    let path = path
        .or_else(|| AppDirs::data_path(backend))
        .unwrap_or_else(|| PathBuf::from(backend.default_file_name()));
    log::debug!("opening {backend} store at {}", path.display());
    match backend {
        Backend::Json => Ok(Box::new(JsonSessionStore::with_path(path))),
        Backend::Sqlite => Ok(Box::new(SqliteSessionStore::open(path)?)),
    }
}
