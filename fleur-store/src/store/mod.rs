//! redb-based keyed collection store
//!
//! Each collection is one redb table keyed by record id with a
//! JSON-serialized value. Secondary indexes are separate tables keyed
//! by `(index_value, record_id)` with an empty value, so non-unique
//! lookups become a prefix range scan.
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `<collection>` | `record_id` | JSON record | Primary data |
//! | `<collection>.by_<field>` | `(value, record_id)` | `()` | Secondary index |
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: every mutation here is a
//! single write transaction, so a crash never leaves a record and its
//! index entries out of sync.

mod schema;

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{AppError, ErrorCode};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Declaration of one secondary index on a collection.
///
/// Table names must be `'static` because redb table definitions are
/// declared ahead of time; every index is listed in [`Record::INDEXES`]
/// and its table is created when the store opens.
#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    /// Logical field name passed to [`KeyedStore::get_by_index`]
    pub field: &'static str,
    /// redb table backing the index
    pub table: &'static str,
}

/// A record persistable in a [`KeyedStore`] collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the primary data table
    const COLLECTION: &'static str;
    /// Secondary indexes maintained for this collection
    const INDEXES: &'static [IndexSpec] = &[];

    /// Primary key, unique within the collection
    fn id(&self) -> &str;

    /// Current index value for `field`, or `None` to skip indexing
    /// this record under that field.
    fn index_value(&self, field: &str) -> Option<String>;
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Duplicate key in {collection}: {id}")]
    DuplicateKey { collection: &'static str, id: String },

    #[error("Not found in {collection}: {id}")]
    NotFound { collection: &'static str, id: String },

    #[error("Unknown index on {collection}: {field}")]
    UnknownIndex {
        collection: &'static str,
        field: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { collection, id } => {
                AppError::duplicate_key(collection).with_detail("id", id)
            }
            StoreError::NotFound { collection, id } => {
                AppError::not_found(collection).with_detail("id", id)
            }
            StoreError::Serialization(e) => {
                AppError::with_message(ErrorCode::SerializationError, e.to_string())
            }
            StoreError::UnknownIndex { .. } => AppError::internal(err.to_string()),
            other => AppError::storage_unavailable(other.to_string()),
        }
    }
}

fn data_table<R: Record>() -> TableDefinition<'static, &'static str, &'static [u8]> {
    TableDefinition::new(R::COLLECTION)
}

fn index_table(spec: &IndexSpec) -> TableDefinition<'static, (&'static str, &'static str), ()> {
    TableDefinition::new(spec.table)
}

/// Keyed collection store backed by redb
///
/// All operations are async to match the call sites in the service
/// layer; redb itself is synchronous and operations complete within a
/// single transaction.
#[derive(Clone)]
pub struct KeyedStore {
    db: Arc<Database>,
}

impl KeyedStore {
    /// Open or create the database at the given path.
    ///
    /// Creates every data and index table up front so read
    /// transactions never race table creation.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an ephemeral in-memory store.
    ///
    /// Used in tests and as a degraded fallback when the data
    /// directory is unavailable; contents are lost on drop.
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        let write_txn = db.begin_write()?;
        schema::create_tables(&write_txn)?;
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Insert a new record. Fails with [`StoreError::DuplicateKey`] if
    /// the id is already present.
    pub async fn put<R: Record>(&self, record: &R) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(data_table::<R>())?;
            if table.get(record.id())?.is_some() {
                return Err(StoreError::DuplicateKey {
                    collection: R::COLLECTION,
                    id: record.id().to_string(),
                });
            }
            let bytes = serde_json::to_vec(record)?;
            table.insert(record.id(), bytes.as_slice())?;
        }
        write_index_entries(&write_txn, record)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Replace an existing record. Fails with [`StoreError::NotFound`]
    /// if the id is absent. Index entries are moved if the indexed
    /// values changed.
    pub async fn update<R: Record>(&self, record: &R) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        let previous: R = {
            let mut table = write_txn.open_table(data_table::<R>())?;
            let previous = match table.get(record.id())? {
                Some(guard) => serde_json::from_slice(guard.value())?,
                None => {
                    return Err(StoreError::NotFound {
                        collection: R::COLLECTION,
                        id: record.id().to_string(),
                    });
                }
            };
            let bytes = serde_json::to_vec(record)?;
            table.insert(record.id(), bytes.as_slice())?;
            previous
        };
        remove_index_entries(&write_txn, &previous)?;
        write_index_entries(&write_txn, record)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Fetch a record by id.
    pub async fn get<R: Record>(&self, id: &str) -> StoreResult<Option<R>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(data_table::<R>())?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Fetch all records whose indexed `field` equals `value`.
    ///
    /// The index table is scanned from `(value, "")`; the scan stops at
    /// the first entry with a different value component.
    pub async fn get_by_index<R: Record>(&self, field: &str, value: &str) -> StoreResult<Vec<R>> {
        let spec = R::INDEXES
            .iter()
            .find(|s| s.field == field)
            .ok_or_else(|| StoreError::UnknownIndex {
                collection: R::COLLECTION,
                field: field.to_string(),
            })?;

        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(index_table(spec))?;
        let data = read_txn.open_table(data_table::<R>())?;

        let mut records = Vec::new();
        for entry in index.range((value, "")..)? {
            let (key, _) = entry?;
            let (entry_value, id) = key.value();
            if entry_value != value {
                break;
            }
            match data.get(id)? {
                Some(guard) => records.push(serde_json::from_slice(guard.value())?),
                None => {
                    tracing::warn!(
                        collection = R::COLLECTION,
                        field,
                        id,
                        "dangling index entry"
                    );
                }
            }
        }
        Ok(records)
    }

    /// Fetch every record in the collection.
    pub async fn get_all<R: Record>(&self) -> StoreResult<Vec<R>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(data_table::<R>())?;
        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, guard) = entry?;
            records.push(serde_json::from_slice(guard.value())?);
        }
        Ok(records)
    }

    /// Number of records in the collection.
    pub async fn count<R: Record>(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(data_table::<R>())?;
        Ok(table.len()?)
    }

    /// Delete a record by id. Returns `false` if the id was absent.
    pub async fn delete<R: Record>(&self, id: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed: Option<R> = {
            let mut table = write_txn.open_table(data_table::<R>())?;
            match table.remove(id)? {
                Some(guard) => Some(serde_json::from_slice(guard.value())?),
                None => None,
            }
        };
        if let Some(record) = &removed {
            remove_index_entries(&write_txn, record)?;
        }
        write_txn.commit()?;
        Ok(removed.is_some())
    }

    /// Remove every record in the collection along with its indexes.
    pub async fn clear<R: Record>(&self) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(data_table::<R>())?;
        let _ = write_txn.open_table(data_table::<R>())?;
        for spec in R::INDEXES {
            write_txn.delete_table(index_table(spec))?;
            let _ = write_txn.open_table(index_table(spec))?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

fn write_index_entries<R: Record>(write_txn: &WriteTransaction, record: &R) -> StoreResult<()> {
    for spec in R::INDEXES {
        if let Some(value) = record.index_value(spec.field) {
            let mut table = write_txn.open_table(index_table(spec))?;
            table.insert((value.as_str(), record.id()), ())?;
        }
    }
    Ok(())
}

fn remove_index_entries<R: Record>(write_txn: &WriteTransaction, record: &R) -> StoreResult<()> {
    for spec in R::INDEXES {
        if let Some(value) = record.index_value(spec.field) {
            let mut table = write_txn.open_table(index_table(spec))?;
            table.remove((value.as_str(), record.id()))?;
        }
    }
    Ok(())
}
