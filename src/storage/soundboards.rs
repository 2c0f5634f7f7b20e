use chrono::Utc;
use redb::ReadableTable;

use super::db::{keys_with_prefix, Database, DatabaseError};
use super::models::{Soundboard, SoundboardRecord};
use super::tables::*;

impl Database {
    // ========================================================================
    // Soundboard operations
    // ========================================================================

    /// Store a soundboard header
    pub fn create_soundboard(&self, soundboard: &SoundboardRecord) -> Result<(), DatabaseError> {
        debug_assert!(!soundboard.sb_id.is_empty(), "sb_id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(SOUNDBOARDS)?;
            let data = rmp_serde::to_vec_named(soundboard)?;
            table.insert(soundboard.sb_id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a soundboard and its member sound ids, oldest entry first
    pub fn get_soundboard(&self, sb_id: &str) -> Result<Option<Soundboard>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SOUNDBOARDS)?;

        let record: SoundboardRecord = match table.get(sb_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(None),
        };

        let entries = read_txn.open_table(SOUNDBOARD_ENTRIES)?;
        let prefix = format!("{sb_id}/");
        let mut members: Vec<(i64, String)> = Vec::new();
        for key in keys_with_prefix(&entries, &prefix)? {
            let added_at = entries.get(key.as_str())?.map(|v| v.value()).unwrap_or(0);
            members.push((added_at, key[prefix.len()..].to_string()));
        }
        members.sort();

        Ok(Some(Soundboard {
            record,
            s_ids: members.into_iter().map(|(_, s_id)| s_id).collect(),
        }))
    }

    /// All soundboards owned by a handle, newest first
    pub fn list_soundboards_by_uid(
        &self,
        uid: &str,
    ) -> Result<Vec<SoundboardRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SOUNDBOARDS)?;

        let mut boards = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let board: SoundboardRecord = rmp_serde::from_slice(value.value())?;
            if board.user.uid == uid {
                boards.push(board);
            }
        }
        boards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(boards)
    }

    /// Link a sound into a soundboard. Returns false if it is already there.
    pub fn add_to_soundboard(&self, sb_id: &str, s_id: &str) -> Result<bool, DatabaseError> {
        let key = join_key(sb_id, s_id);
        let write_txn = self.begin_write()?;
        {
            let mut entries = write_txn.open_table(SOUNDBOARD_ENTRIES)?;
            if entries.get(key.as_str())?.is_some() {
                return Ok(false);
            }
            entries.insert(key.as_str(), Utc::now().timestamp_millis())?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    /// Unlink a sound from a soundboard. Returns whether a link existed.
    pub fn remove_from_soundboard(&self, sb_id: &str, s_id: &str) -> Result<bool, DatabaseError> {
        let key = join_key(sb_id, s_id);
        let write_txn = self.begin_write()?;
        let removed = {
            let mut entries = write_txn.open_table(SOUNDBOARD_ENTRIES)?;
            let removed = entries.remove(key.as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Delete a soundboard header and every entry that points into it
    pub fn delete_soundboard(&self, sb_id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(SOUNDBOARDS)?;
            let deleted = table.remove(sb_id)?.is_some();
            deleted
        };

        if deleted {
            let mut entries = write_txn.open_table(SOUNDBOARD_ENTRIES)?;
            for key in keys_with_prefix(&entries, &format!("{sb_id}/"))? {
                entries.remove(key.as_str())?;
            }
        }

        write_txn.commit()?;
        Ok(deleted)
    }

    /// Rewrite the denormalized owner name on every soundboard of `uid`.
    /// Returns how many soundboards changed.
    pub fn rename_in_soundboards(&self, uid: &str, name: &str) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let mut changed = 0;
        {
            let mut table = write_txn.open_table(SOUNDBOARDS)?;
            let mut owned: Vec<SoundboardRecord> = Vec::new();
            for result in table.iter()? {
                let (_, value) = result?;
                let board: SoundboardRecord = rmp_serde::from_slice(value.value())?;
                if board.user.uid == uid && board.user.name != name {
                    owned.push(board);
                }
            }

            for mut board in owned {
                board.user.name = name.to_string();
                let data = rmp_serde::to_vec_named(&board)?;
                table.insert(board.sb_id.as_str(), data.as_slice())?;
                changed += 1;
            }
        }
        write_txn.commit()?;
        Ok(changed)
    }
}
