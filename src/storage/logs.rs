use chrono::Utc;
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{MessageRecord, NotFoundRecord, VerificationToken};
use super::tables::*;

impl Database {
    // ========================================================================
    // Messages and missing-page analytics
    // ========================================================================

    pub fn insert_message(&self, message: &MessageRecord) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(MESSAGES)?;
            let data = rmp_serde::to_vec_named(message)?;
            table.insert(message.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All messages, newest first
    pub fn list_messages(&self) -> Result<Vec<MessageRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(MESSAGES)?;

        let mut messages: Vec<MessageRecord> = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            messages.push(rmp_serde::from_slice(value.value())?);
        }
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    /// Count a hit on a path that resolved to nothing
    pub fn record_not_found(&self, path: &str) -> Result<NotFoundRecord, DatabaseError> {
        let now = Utc::now();
        let write_txn = self.begin_write()?;

        let record = {
            let mut table = write_txn.open_table(NOT_FOUND)?;
            let existing: Option<NotFoundRecord> = match table.get(path)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            let record = match existing {
                Some(mut record) => {
                    record.hits += 1;
                    record.last_seen = now;
                    record
                }
                None => NotFoundRecord {
                    path: path.to_string(),
                    hits: 1,
                    first_seen: now,
                    last_seen: now,
                },
            };

            let data = rmp_serde::to_vec_named(&record)?;
            table.insert(path, data.as_slice())?;
            record
        };

        write_txn.commit()?;
        Ok(record)
    }

    pub fn get_not_found(&self, path: &str) -> Result<Option<NotFoundRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(NOT_FOUND)?;

        match table.get(path)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Verification tokens
    // ========================================================================

    /// Store a token and drop every expired one in the same transaction
    pub fn put_verification_token(
        &self,
        token_hash: &str,
        token: &VerificationToken,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now();
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(VERIFICATION_TOKENS)?;

            let mut expired = Vec::new();
            for result in table.iter()? {
                let (key, value) = result?;
                let stored: VerificationToken = rmp_serde::from_slice(value.value())?;
                if stored.expires <= now {
                    expired.push(key.value().to_string());
                }
            }
            for key in &expired {
                table.remove(key.as_str())?;
            }
            if !expired.is_empty() {
                tracing::debug!(count = expired.len(), "Dropped expired sign-in tokens");
            }

            let data = rmp_serde::to_vec_named(token)?;
            table.insert(token_hash, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove and return a token. A token can be taken at most once.
    pub fn take_verification_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<VerificationToken>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let token = {
            let mut table = write_txn.open_table(VERIFICATION_TOKENS)?;
            let token = match table.remove(token_hash)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            token
        };
        write_txn.commit()?;
        Ok(token)
    }
}
