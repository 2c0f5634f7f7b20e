use redb::{
    Database as RedbDatabase, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for DatabaseError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for DatabaseError {
    fn from(e: redb::DatabaseError) -> Self {
        DatabaseError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::Error> for DatabaseError {
    fn from(e: redb::Error) -> Self {
        DatabaseError::Redb(Box::new(e))
    }
}

impl From<redb::StorageError> for DatabaseError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for DatabaseError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for DatabaseError {
    fn from(e: redb::TransactionError) -> Self {
        DatabaseError::Transaction(Box::new(e))
    }
}

/// Handle to the document store. Opened once at startup and passed to
/// every handler through `AppState`; clones share the same redb instance.
pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

/// Statistics from a purge operation
#[derive(Debug, Default)]
pub struct PurgeStats {
    pub users: u64,
    pub sounds: u64,
    pub soundboards: u64,
    pub favs: u64,
    pub messages: u64,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("sfx-share.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_UIDS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(SOUNDS)?;
            let _ = write_txn.open_table(SOUND_SLUGS)?;
            let _ = write_txn.open_table(SOUNDBOARDS)?;
            let _ = write_txn.open_table(SOUNDBOARD_ENTRIES)?;
            let _ = write_txn.open_table(FAVS)?;
            let _ = write_txn.open_table(MESSAGES)?;
            let _ = write_txn.open_table(NOT_FOUND)?;
            let _ = write_txn.open_table(VERIFICATION_TOKENS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    // ========================================================================
    // Admin operations
    // ========================================================================

    /// Purge all data - for testing only
    pub fn purge_all(&self) -> Result<PurgeStats, DatabaseError> {
        let write_txn = self.begin_write()?;
        let stats = PurgeStats {
            users: clear_table(&write_txn, USERS)?,
            sounds: clear_table(&write_txn, SOUNDS)?,
            soundboards: clear_table(&write_txn, SOUNDBOARDS)?,
            favs: clear_table(&write_txn, FAVS)?,
            messages: clear_table(&write_txn, MESSAGES)?,
        };

        clear_table(&write_txn, USER_UIDS)?;
        clear_table(&write_txn, USER_EMAILS)?;
        clear_table(&write_txn, SOUND_SLUGS)?;
        clear_table(&write_txn, SOUNDBOARD_ENTRIES)?;
        clear_table(&write_txn, NOT_FOUND)?;
        clear_table(&write_txn, VERIFICATION_TOKENS)?;

        write_txn.commit()?;
        Ok(stats)
    }
}

/// Remove every row of a string-keyed table, returning how many were removed.
fn clear_table<V: redb::Value + 'static>(
    txn: &WriteTransaction,
    definition: TableDefinition<'static, &'static str, V>,
) -> Result<u64, DatabaseError> {
    let mut table = txn.open_table(definition)?;
    let keys: Vec<String> = table
        .iter()?
        .map(|r| r.map(|(k, _)| k.value().to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    for key in &keys {
        table.remove(key.as_str())?;
    }
    Ok(keys.len() as u64)
}

/// Collect every key in `table` that starts with `prefix`.
pub(crate) fn keys_with_prefix<T, V>(table: &T, prefix: &str) -> Result<Vec<String>, DatabaseError>
where
    T: ReadableTable<&'static str, V>,
    V: redb::Value + 'static,
{
    let mut keys = Vec::new();
    for entry in table.range(prefix..)? {
        let (key, _) = entry?;
        let key = key.value();
        if !key.starts_with(prefix) {
            break;
        }
        keys.push(key.to_string());
    }
    Ok(keys)
}
