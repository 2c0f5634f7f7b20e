use chrono::Utc;
use redb::ReadableTable;

use super::db::{keys_with_prefix, Database, DatabaseError};
use super::tables::*;

impl Database {
    // ========================================================================
    // Favorite operations
    // ========================================================================

    /// Mark a sound as favorited. Repeating the call is a no-op.
    pub fn add_fav(&self, user_id: &str, s_id: &str) -> Result<(), DatabaseError> {
        let key = join_key(user_id, s_id);
        let write_txn = self.begin_write()?;
        {
            let mut favs = write_txn.open_table(FAVS)?;
            if favs.get(key.as_str())?.is_none() {
                favs.insert(key.as_str(), Utc::now().timestamp_millis())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Drop a favorite. Returns whether one existed.
    pub fn remove_fav(&self, user_id: &str, s_id: &str) -> Result<bool, DatabaseError> {
        let key = join_key(user_id, s_id);
        let write_txn = self.begin_write()?;
        let removed = {
            let mut favs = write_txn.open_table(FAVS)?;
            let removed = favs.remove(key.as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    pub fn is_fav(&self, user_id: &str, s_id: &str) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let favs = read_txn.open_table(FAVS)?;
        Ok(favs.get(join_key(user_id, s_id).as_str())?.is_some())
    }

    /// Sound ids favorited by an account, most recent first
    pub fn list_favs(&self, user_id: &str) -> Result<Vec<String>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let favs = read_txn.open_table(FAVS)?;
        let prefix = format!("{user_id}/");

        let mut entries: Vec<(i64, String)> = Vec::new();
        for key in keys_with_prefix(&favs, &prefix)? {
            let created_at = favs.get(key.as_str())?.map(|v| v.value()).unwrap_or(0);
            entries.push((created_at, key[prefix.len()..].to_string()));
        }
        entries.sort_by(|a, b| b.cmp(a));

        Ok(entries.into_iter().map(|(_, s_id)| s_id).collect())
    }
}
