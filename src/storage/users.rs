use chrono::Utc;
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{ClaimOutcome, Preference, UserRecord};
use super::tables::*;

impl Database {
    // ========================================================================
    // User operations
    // ========================================================================

    /// Insert a new user and its email index entry. Returns false when the
    /// email is already registered.
    pub fn create_user(&self, user: &UserRecord) -> Result<bool, DatabaseError> {
        debug_assert!(!user.id.is_empty(), "user id must not be empty");

        let email = user.email.to_lowercase();
        let write_txn = self.begin_write()?;
        {
            let mut emails = write_txn.open_table(USER_EMAILS)?;
            if emails.get(email.as_str())?.is_some() {
                return Ok(false);
            }
            emails.insert(email.as_str(), user.id.as_str())?;

            if let Some(ref uid) = user.uid {
                let mut uids = write_txn.open_table(USER_UIDS)?;
                if uids.get(uid.as_str())?.is_some() {
                    return Ok(false);
                }
                uids.insert(uid.as_str(), user.id.as_str())?;
            }

            let mut table = write_txn.open_table(USERS)?;
            let data = rmp_serde::to_vec_named(user)?;
            table.insert(user.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    /// Get a user by account id
    pub fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Get a user by public handle (resolves uid -> id -> user)
    pub fn get_user_by_uid(&self, uid: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let uids = read_txn.open_table(USER_UIDS)?;

        let id = match uids.get(uid)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let users = read_txn.open_table(USERS)?;
        match users.get(id.as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Get a user by email (case-insensitive)
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let emails = read_txn.open_table(USER_EMAILS)?;

        let id = match emails.get(email.to_lowercase().as_str())? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let users = read_txn.open_table(USERS)?;
        match users.get(id.as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Check if a handle is already held by some account
    pub fn uid_exists(&self, uid: &str) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USER_UIDS)?;
        Ok(table.get(uid)?.is_some())
    }

    /// Assign a handle to an account. The uniqueness check and the insert
    /// share one write transaction, so two racing claims cannot both win.
    pub fn claim_uid(&self, id: &str, uid: &str) -> Result<ClaimOutcome, DatabaseError> {
        let write_txn = self.begin_write()?;

        let outcome = {
            let mut users = write_txn.open_table(USERS)?;
            let existing: Option<UserRecord> = match users.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            match existing {
                None => ClaimOutcome::UnknownUser,
                Some(user) if user.uid.is_some() => ClaimOutcome::AlreadySet,
                Some(mut user) => {
                    let mut uids = write_txn.open_table(USER_UIDS)?;
                    if uids.get(uid)?.is_some() {
                        ClaimOutcome::Taken
                    } else {
                        uids.insert(uid, id)?;
                        user.uid = Some(uid.to_string());
                        user.updated_at = Utc::now();
                        let data = rmp_serde::to_vec_named(&user)?;
                        users.insert(id, data.as_slice())?;
                        ClaimOutcome::Claimed
                    }
                }
            }
        };

        if outcome == ClaimOutcome::Claimed {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(outcome)
    }

    /// Replace a user's preferences. Returns the updated user.
    pub fn update_preference(
        &self,
        id: &str,
        preference: &Preference,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        self.modify_user(id, |user| user.preference = preference.clone())
    }

    /// Update the canonical display name on the user document only.
    /// Denormalized copies are refreshed by `rename_in_sounds` and
    /// `rename_in_soundboards`.
    pub fn rename_user(&self, id: &str, name: &str) -> Result<Option<UserRecord>, DatabaseError> {
        self.modify_user(id, |user| user.name = name.to_string())
    }

    fn modify_user<F>(&self, id: &str, apply: F) -> Result<Option<UserRecord>, DatabaseError>
    where
        F: FnOnce(&mut UserRecord),
    {
        let write_txn = self.begin_write()?;

        let updated = {
            let mut table = write_txn.open_table(USERS)?;
            let existing: Option<UserRecord> = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            match existing {
                Some(mut user) => {
                    apply(&mut user);
                    user.updated_at = Utc::now();
                    let data = rmp_serde::to_vec_named(&user)?;
                    table.insert(id, data.as_slice())?;
                    Some(user)
                }
                None => None,
            }
        };

        write_txn.commit()?;
        Ok(updated)
    }
}
