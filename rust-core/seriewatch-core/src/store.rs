//! # Record Store
//!
//! In-memory tables of typed records backed by a single JSON file.
//!
//! The whole store is one JSON object mapping table name to an array of
//! records. It is read once by [`Database::open`] and rewritten wholesale
//! after every mutation.
//!
//! ## Persistence
//!
//! Mutations are synchronous. Each one serializes a snapshot and hands it to a
//! background writer task; a failed write is logged and the in-memory state
//! stays authoritative, so memory and disk can diverge. Callers that need to
//! know the data reached disk take a [`Flush`] and await [`Flush::wait`].

use crate::error::{Error, Result};
use crate::json::{parse_json_bytes, to_json_pretty};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// A row type that can live in a [`Database`] table
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Partial update applied by [`Database::update`]
    type Patch;

    /// Identifier, unique within a table
    fn id(&self) -> &str;

    /// String form of a scalar field, used by search; `None` for unknown
    /// fields and for fields that are not scalars
    fn field(&self, name: &str) -> Option<String>;

    /// Shallow merge: fields set in the patch overwrite, others are kept
    fn merge(&mut self, patch: Self::Patch);
}

/// Field name to substring pairs; a row matches if any pair matches
pub type Search<'a> = [(&'a str, &'a str)];

/// A snapshot handed to the writer task
struct WriteJob {
    bytes: Vec<u8>,
    ack: Option<oneshot::Sender<io::Result<()>>>,
}

/// Pending explicit write, see [`Database::flush`]
#[derive(Debug)]
pub struct Flush {
    path: Option<PathBuf>,
    ack: Option<oneshot::Receiver<io::Result<()>>>,
}

impl Flush {
    /// Wait until the snapshot has been written
    ///
    /// Resolves immediately for stores without a backing file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Persistence` if the file could not be written or the
    /// writer task is gone.
    pub async fn wait(self) -> Result<()> {
        let (Some(path), Some(ack)) = (self.path, self.ack) else {
            return Ok(());
        };
        match ack.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(Error::Persistence { path, source }),
            Err(_) => Err(Error::Persistence {
                path,
                source: io::Error::new(io::ErrorKind::BrokenPipe, "store writer stopped"),
            }),
        }
    }
}

/// Table-oriented record store
#[derive(Debug)]
pub struct Database<R> {
    tables: BTreeMap<String, Vec<R>>,
    path: Option<PathBuf>,
    writer: Option<mpsc::UnboundedSender<WriteJob>>,
}

impl<R: Record> Default for Database<R> {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl<R: Record> Database<R> {
    /// Create an empty store with no backing file
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            tables: BTreeMap::new(),
            path: None,
            writer: None,
        }
    }

    /// Load the store from `path` and start its background writer
    ///
    /// A missing file or one that is not JSON yields an empty store, and
    /// that empty state is written out straight away. A JSON file whose
    /// tables do not fit `R` is first copied to `<path>.bak`; if that copy
    /// fails the store runs without a backing file so the original is never
    /// overwritten. Must be called inside a Tokio runtime.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let tables = match read_document(&path).await {
            Ok(document) => match serde_json::from_value::<BTreeMap<String, Vec<R>>>(document) {
                Ok(tables) => {
                    info!(path = %path.display(), tables = tables.len(), "Store loaded");
                    return Self::with_writer(tables, path);
                }
                Err(e) => {
                    let backup = backup_path(&path);
                    if let Err(copy_err) = tokio::fs::copy(&path, &backup).await {
                        error!(
                            path = %path.display(),
                            error = %e,
                            backup_error = %copy_err,
                            "Store file has an unexpected shape and could not be backed up, running without persistence"
                        );
                        return Self::in_memory();
                    }
                    error!(
                        path = %path.display(),
                        backup = %backup.display(),
                        error = %e,
                        "Store file has an unexpected shape, starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not load store, starting empty");
                BTreeMap::new()
            }
        };

        let db = Self::with_writer(tables, path);
        if let Err(e) = db.persist().await {
            error!(error = %e, "Failed to persist empty store");
        }
        db
    }

    fn with_writer(tables: BTreeMap<String, Vec<R>>, path: PathBuf) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(path.clone(), rx));
        Self {
            tables,
            path: Some(path),
            writer: Some(tx),
        }
    }

    /// Backing file, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Names of the tables currently present
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Rows of `table`, optionally filtered
    ///
    /// Without `search` every row is returned (none if the table is absent).
    /// With `search`, a row is kept when **any** of the given fields contains
    /// its substring, compared case-insensitively.
    #[must_use]
    pub fn select(&self, table: &str, search: Option<&Search<'_>>) -> Vec<&R> {
        let Some(rows) = self.tables.get(table) else {
            return Vec::new();
        };

        match search {
            None => rows.iter().collect(),
            Some(search) => rows.iter().filter(|row| matches_any(*row, search)).collect(),
        }
    }

    /// Append a record to `table`, creating the table if needed
    pub fn insert(&mut self, table: &str, record: R) -> R {
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        self.schedule_persist();
        record
    }

    /// Merge `patch` into the first record of `table` with the given id
    ///
    /// Returns `false` if the table or the record does not exist.
    pub fn update(&mut self, table: &str, id: &str, patch: R::Patch) -> bool {
        let Some(rows) = self.tables.get_mut(table) else {
            warn!(table, "Table not found");
            return false;
        };
        let Some(row) = rows.iter_mut().find(|r| r.id() == id) else {
            warn!(table, id, "Record not found");
            return false;
        };

        row.merge(patch);
        self.schedule_persist();
        true
    }

    /// Remove the first record of `table` with the given id
    ///
    /// Returns `false` if the table or the record does not exist.
    pub fn delete(&mut self, table: &str, id: &str) -> bool {
        let Some(rows) = self.tables.get_mut(table) else {
            warn!(table, "Table not found");
            return false;
        };
        let Some(index) = rows.iter().position(|r| r.id() == id) else {
            warn!(table, id, "Record not found");
            return false;
        };

        rows.remove(index);
        self.schedule_persist();
        true
    }

    /// Mutable access to the first record of `table` with the given id
    ///
    /// Changes made through this are not persisted until the next mutation
    /// or an explicit [`Database::persist`].
    pub fn find_mut(&mut self, table: &str, id: &str) -> Option<&mut R> {
        self.tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| r.id() == id))
    }

    /// Serialize the current state
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if a record fails to serialize.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        to_json_pretty(&self.tables)
    }

    /// Queue the current state for writing and return a handle to await it
    ///
    /// The write is ordered after every snapshot queued before it. Taking the
    /// handle is synchronous, so a caller holding a lock on the store can
    /// release it before awaiting.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if a record fails to serialize.
    pub fn flush(&self) -> Result<Flush> {
        let Some(writer) = &self.writer else {
            return Ok(Flush {
                path: None,
                ack: None,
            });
        };

        let (tx, rx) = oneshot::channel();
        let job = WriteJob {
            bytes: self.snapshot()?,
            ack: Some(tx),
        };
        // A closed channel surfaces as a failed ack in `Flush::wait`.
        let _ = writer.send(job);

        Ok(Flush {
            path: self.path.clone(),
            ack: Some(rx),
        })
    }

    /// Write the current state and wait for the result
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` or `Error::Persistence`.
    pub async fn persist(&self) -> Result<()> {
        self.flush()?.wait().await
    }

    /// Queue a snapshot for the background writer; failures are only logged
    pub(crate) fn schedule_persist(&self) {
        let Some(writer) = &self.writer else {
            return;
        };
        match self.snapshot() {
            Ok(bytes) => {
                if writer.send(WriteJob { bytes, ack: None }).is_err() {
                    error!("Store writer has stopped, snapshot dropped");
                }
            }
            Err(e) => error!(error = %e, "Failed to serialize store"),
        }
    }
}

fn matches_any<R: Record>(row: &R, search: &Search<'_>) -> bool {
    search.iter().any(|(field, needle)| {
        row.field(field).is_some_and(|value| {
            !value.is_empty() && value.to_lowercase().contains(&needle.to_lowercase())
        })
    })
}

async fn read_document(path: &Path) -> Result<Value> {
    let mut bytes = tokio::fs::read(path).await?;
    parse_json_bytes(&mut bytes)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Writes snapshots in arrival order; when several are queued only the
/// newest is written, and every waiting flush gets that write's outcome.
async fn run_writer(path: PathBuf, mut rx: mpsc::UnboundedReceiver<WriteJob>) {
    while let Some(job) = rx.recv().await {
        let mut bytes = job.bytes;
        let mut acks: Vec<_> = job.ack.into_iter().collect();
        while let Ok(newer) = rx.try_recv() {
            bytes = newer.bytes;
            acks.extend(newer.ack);
        }

        let result = tokio::fs::write(&path, &bytes).await;
        match &result {
            Ok(()) => debug!(path = %path.display(), bytes = bytes.len(), "Store persisted"),
            Err(e) => error!(path = %path.display(), error = %e, "Failed to persist store"),
        }

        for ack in acks {
            let outcome = match &result {
                Ok(()) => Ok(()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            };
            let _ = ack.send(outcome);
        }
    }
}
