use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{Counter, SoundFilter, SoundRecord};
use super::tables::*;

impl Database {
    // ========================================================================
    // Sound operations
    // ========================================================================

    /// Store a new sound and its slug index entry. Returns false when the
    /// slug is already taken.
    pub fn create_sound(&self, sound: &SoundRecord) -> Result<bool, DatabaseError> {
        debug_assert!(!sound.s_id.is_empty(), "sound id must not be empty");
        debug_assert!(!sound.slug.is_empty(), "sound slug must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut slugs = write_txn.open_table(SOUND_SLUGS)?;
            if slugs.get(sound.slug.as_str())?.is_some() {
                return Ok(false);
            }
            slugs.insert(sound.slug.as_str(), sound.s_id.as_str())?;

            let mut table = write_txn.open_table(SOUNDS)?;
            let data = rmp_serde::to_vec_named(sound)?;
            table.insert(sound.s_id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    /// Get a sound by its id
    pub fn get_sound(&self, s_id: &str) -> Result<Option<SoundRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SOUNDS)?;

        match table.get(s_id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Get a sound by its slug (resolves slug -> s_id -> sound)
    pub fn get_sound_by_slug(&self, slug: &str) -> Result<Option<SoundRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let slugs = read_txn.open_table(SOUND_SLUGS)?;

        let s_id = match slugs.get(slug)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let sounds = read_txn.open_table(SOUNDS)?;
        match sounds.get(s_id.as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Get all sounds (unordered)
    pub fn get_all_sounds(&self) -> Result<Vec<SoundRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SOUNDS)?;

        let mut sounds = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            sounds.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(sounds)
    }

    /// Count the matching sounds and return one page of them, newest first.
    ///
    /// Offsets are plain positions in the sorted result, so inserts landing
    /// between two page requests shift rows across pages.
    pub fn list_sounds(
        &self,
        filter: &SoundFilter,
        offset: usize,
        limit: usize,
    ) -> Result<(u64, Vec<SoundRecord>), DatabaseError> {
        let mut matching: Vec<SoundRecord> = self
            .get_all_sounds()?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.s_id.cmp(&b.s_id))
        });

        let total = matching.len() as u64;
        let page = matching.into_iter().skip(offset).take(limit).collect();
        Ok((total, page))
    }

    /// Fetch several sounds by id, skipping ids that no longer resolve.
    pub fn get_sounds(&self, s_ids: &[String]) -> Result<Vec<SoundRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SOUNDS)?;

        let mut sounds = Vec::with_capacity(s_ids.len());
        for s_id in s_ids {
            if let Some(data) = table.get(s_id.as_str())? {
                sounds.push(rmp_serde::from_slice(data.value())?);
            }
        }
        Ok(sounds)
    }

    /// Add one to a counter and return the new value, or `None` if the
    /// sound does not exist. Write transactions are serialized, so the
    /// read-modify-write cannot lose concurrent increments.
    pub fn increment_sound_counter(
        &self,
        s_id: &str,
        counter: Counter,
    ) -> Result<Option<u64>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let value = {
            let mut table = write_txn.open_table(SOUNDS)?;
            let existing: Option<SoundRecord> = match table.get(s_id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            match existing {
                Some(mut sound) => {
                    let value = match counter {
                        Counter::Views => {
                            sound.views += 1;
                            sound.views
                        }
                        Counter::Downloads => {
                            sound.downloads += 1;
                            sound.downloads
                        }
                    };
                    let data = rmp_serde::to_vec_named(&sound)?;
                    table.insert(s_id, data.as_slice())?;
                    Some(value)
                }
                None => None,
            }
        };

        write_txn.commit()?;
        Ok(value)
    }

    /// Rewrite the denormalized owner name on every sound of `uid`.
    /// Returns how many sounds changed.
    pub fn rename_in_sounds(&self, uid: &str, name: &str) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let mut changed = 0;
        {
            let mut table = write_txn.open_table(SOUNDS)?;
            let mut owned: Vec<SoundRecord> = Vec::new();
            for result in table.iter()? {
                let (_, value) = result?;
                let sound: SoundRecord = rmp_serde::from_slice(value.value())?;
                if sound.user.uid == uid && sound.user.name != name {
                    owned.push(sound);
                }
            }

            for mut sound in owned {
                sound.user.name = name.to_string();
                let data = rmp_serde::to_vec_named(&sound)?;
                table.insert(sound.s_id.as_str(), data.as_slice())?;
                changed += 1;
            }
        }
        write_txn.commit()?;
        Ok(changed)
    }

    /// Delete a sound, its slug, its favorites and its soundboard entries.
    /// Returns the removed record so the caller can drop the audio blob.
    pub fn delete_sound(&self, s_id: &str) -> Result<Option<SoundRecord>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let removed: Option<SoundRecord> = {
            let mut table = write_txn.open_table(SOUNDS)?;
            let removed = match table.remove(s_id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            removed
        };

        if let Some(ref sound) = removed {
            {
                let mut slugs = write_txn.open_table(SOUND_SLUGS)?;
                slugs.remove(sound.slug.as_str())?;
            }

            let suffix = format!("/{s_id}");
            {
                let mut favs = write_txn.open_table(FAVS)?;
                let keys: Vec<String> = favs
                    .iter()?
                    .map(|r| r.map(|(k, _)| k.value().to_string()))
                    .collect::<Result<Vec<_>, _>>()?;
                for key in keys.iter().filter(|k| k.ends_with(&suffix)) {
                    favs.remove(key.as_str())?;
                }
            }
            {
                let mut entries = write_txn.open_table(SOUNDBOARD_ENTRIES)?;
                let keys: Vec<String> = entries
                    .iter()?
                    .map(|r| r.map(|(k, _)| k.value().to_string()))
                    .collect::<Result<Vec<_>, _>>()?;
                for key in keys.iter().filter(|k| k.ends_with(&suffix)) {
                    entries.remove(key.as_str())?;
                }
            }
        }

        write_txn.commit()?;
        Ok(removed)
    }
}
