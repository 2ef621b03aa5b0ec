//! The `searchIndex` table that documentation browsers query.
//!
//! SQLite does not like concurrent writers, so nothing but the writer task
//! spawned by [`IndexLog::open`] ever touches an [`IndexWriter`].  Page tasks
//! get a cloneable [`IndexSender`] and push entries through a channel; the
//! log drains it in arrival order.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};

use crate::classify::Category;
use crate::error::{BuildError, ErrorStage, Result};

const CHANNEL_DEPTH: usize = 256;

const SCHEMA: &str = "
    DROP TABLE IF EXISTS searchIndex;
    CREATE TABLE searchIndex(id INTEGER PRIMARY KEY, name TEXT, type TEXT, path TEXT);
    CREATE UNIQUE INDEX anchor ON searchIndex (name, type, path);
";

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IndexEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: Category,
    /// Relative to the docset's `Documents` directory, `/`-separated.
    pub path: String,
}

/// Destination for index rows.  Implementations are driven from a single
/// thread; see [`IndexLog`].
pub trait IndexWriter: Send {
    /// Record `entry` unless an identical `(name, type, path)` row already
    /// exists.  Returns whether a row was added.
    fn insert_if_absent(&mut self, entry: &IndexEntry) -> Result<bool>;

    /// Flush and release the underlying store.
    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// The docset's `docSet.dsidx`.
pub struct SqliteIndex {
    conn: Connection,
}

impl SqliteIndex {
    /// Open (or create) the database at `path`, replacing any existing
    /// `searchIndex` table.  All inserts happen inside one transaction that
    /// is committed by `close`.
    pub fn create(path: &Path) -> Result<SqliteIndex> {
        let conn = Connection::open(path)?;
        SqliteIndex::init(conn)
    }

    pub fn open_in_memory() -> Result<SqliteIndex> {
        SqliteIndex::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<SqliteIndex> {
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch("BEGIN")?;
        Ok(SqliteIndex { conn })
    }

    pub fn row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM searchIndex", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl IndexWriter for SqliteIndex {
    fn insert_if_absent(&mut self, entry: &IndexEntry) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT OR IGNORE INTO searchIndex(name, type, path) VALUES (?1, ?2, ?3)")?;
        let changed = stmt.execute(params![entry.name, entry.entry_type.as_str(), entry.path])?;
        Ok(changed > 0)
    }

    fn close(self: Box<Self>) -> Result<()> {
        let index = *self;
        index.conn.execute_batch("COMMIT")?;
        index.conn.close().map_err(|(_conn, err)| BuildError::from(err))
    }
}

/// Keeps entries in memory; used by `build-docset list` and the tests.  Clones
/// share the same storage so the entries can be read after the writer has
/// been handed to an `IndexLog` and closed.
#[derive(Clone, Default)]
pub struct MemoryIndex {
    entries: Arc<Mutex<BTreeSet<IndexEntry>>>,
}

impl MemoryIndex {
    pub fn new() -> MemoryIndex {
        MemoryIndex::default()
    }

    /// Entries sorted by `(name, type, path)`.
    pub fn entries(&self) -> Vec<IndexEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }
}

impl IndexWriter for MemoryIndex {
    fn insert_if_absent(&mut self, entry: &IndexEntry) -> Result<bool> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| BuildError::fatal(ErrorStage::Index, "memory index lock poisoned"))?;
        Ok(entries.insert(entry.clone()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    /// Entries that reached the writer.
    pub submitted: usize,
    /// Rows actually added.
    pub inserted: usize,
    /// Duplicates of an existing `(name, type, path)` row.
    pub ignored: usize,
}

/// Single-writer log in front of an `IndexWriter`.
///
/// The writer lives on a blocking thread for the lifetime of the log.  The
/// first failing insert stops the writer; the error is reported by `close`.
pub struct IndexLog {
    tx: mpsc::Sender<IndexEntry>,
    worker: JoinHandle<Result<IndexSummary>>,
}

#[derive(Clone)]
pub struct IndexSender {
    tx: mpsc::Sender<IndexEntry>,
}

impl IndexLog {
    pub fn open(writer: Box<dyn IndexWriter>) -> IndexLog {
        let (tx, mut rx) = mpsc::channel::<IndexEntry>(CHANNEL_DEPTH);

        let worker = task::spawn_blocking(move || -> Result<IndexSummary> {
            let mut writer = writer;
            let mut summary = IndexSummary::default();
            while let Some(entry) = rx.blocking_recv() {
                summary.submitted += 1;
                if writer.insert_if_absent(&entry)? {
                    summary.inserted += 1;
                } else {
                    // Two sources mapped to the same identity; first one wins.
                    debug!(name = %entry.name, path = %entry.path, "duplicate index entry ignored");
                    summary.ignored += 1;
                }
            }
            writer.close()?;
            Ok(summary)
        });

        IndexLog { tx, worker }
    }

    pub fn sender(&self) -> IndexSender {
        IndexSender {
            tx: self.tx.clone(),
        }
    }

    /// Stop accepting entries, wait for the writer to drain the channel and
    /// close the store.  Any `IndexSender` still alive at this point keeps the
    /// writer running, so callers must drop them first.
    pub async fn close(self) -> Result<IndexSummary> {
        drop(self.tx);
        match self.worker.await {
            Ok(result) => result,
            Err(err) => Err(BuildError::fatal(
                ErrorStage::Index,
                format!("index writer task failed: {}", err),
            )),
        }
    }
}

impl IndexSender {
    pub async fn insert_if_absent(&self, entry: IndexEntry) -> Result<()> {
        self.tx.send(entry).await.map_err(|_| {
            BuildError::fatal(ErrorStage::Index, "index writer stopped before the build finished")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, entry_type: Category, path: &str) -> IndexEntry {
        IndexEntry {
            name: name.to_string(),
            entry_type,
            path: path.to_string(),
        }
    }

    #[test]
    fn test_sqlite_insert_or_ignore() {
        let mut index = SqliteIndex::open_in_memory().unwrap();
        let e = entry(".onInit", Category::Function, "html/Callbacks/onInit.html");
        assert!(index.insert_if_absent(&e).unwrap());
        assert!(!index.insert_if_absent(&e).unwrap());
        // Same name, different path is a different row.
        assert!(index
            .insert_if_absent(&entry(".onInit", Category::Function, "html/Other/onInit.html"))
            .unwrap());
        assert_eq!(index.row_count().unwrap(), 2);
    }

    #[test]
    fn test_sqlite_stores_values_verbatim() {
        let mut index = SqliteIndex::open_in_memory().unwrap();
        // Quotes would have broken string-built SQL.
        let e = entry("it's ${x}", Category::Constant, "html/a'b.html");
        assert!(index.insert_if_absent(&e).unwrap());
        let (name, entry_type, path): (String, String, String) = index
            .conn
            .query_row("SELECT name, type, path FROM searchIndex", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .unwrap();
        assert_eq!(name, "it's ${x}");
        assert_eq!(entry_type, "Constant");
        assert_eq!(path, "html/a'b.html");
    }

    #[test]
    fn test_sqlite_create_replaces_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("docSet.dsidx");

        let mut first = Box::new(SqliteIndex::create(&db_path).unwrap());
        first
            .insert_if_absent(&entry("Abort", Category::Command, "html/Commands/Abort.html"))
            .unwrap();
        first.close().unwrap();

        let second = SqliteIndex::create(&db_path).unwrap();
        assert_eq!(second.row_count().unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_log_serializes_concurrent_senders() {
        let memory = MemoryIndex::new();
        let log = IndexLog::open(Box::new(memory.clone()));

        let mut handles = vec![];
        for i in 0..20 {
            let sender = log.sender();
            handles.push(tokio::spawn(async move {
                // Every other task submits a duplicate of its neighbour.
                let n = i / 2;
                sender
                    .insert_if_absent(entry(&format!("Cmd{}", n), Category::Command, "html/x.html"))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let summary = log.close().await.unwrap();
        assert_eq!(summary.submitted, 20);
        assert_eq!(summary.inserted, 10);
        assert_eq!(summary.ignored, 10);
        assert_eq!(memory.entries().len(), 10);
    }
}
