use redb::TableDefinition;

/// User documents: user id -> UserRecord (msgpack)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Handle index: uid -> user id (unique)
pub const USER_UIDS: TableDefinition<&str, &str> = TableDefinition::new("user_uids");

/// Email index: lowercased email -> user id (unique)
pub const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");

/// Sound documents: s_id -> SoundRecord (msgpack)
pub const SOUNDS: TableDefinition<&str, &[u8]> = TableDefinition::new("sounds");

/// Slug index: slug -> s_id (unique)
pub const SOUND_SLUGS: TableDefinition<&str, &str> = TableDefinition::new("sound_slugs");

/// Soundboard documents: sb_id -> SoundboardRecord (msgpack)
pub const SOUNDBOARDS: TableDefinition<&str, &[u8]> = TableDefinition::new("soundboards");

/// Soundboard membership: "{sb_id}/{s_id}" -> added_at (unix millis)
pub const SOUNDBOARD_ENTRIES: TableDefinition<&str, i64> =
    TableDefinition::new("soundboard_entries");

/// Favorites: "{user_id}/{s_id}" -> created_at (unix millis)
pub const FAVS: TableDefinition<&str, i64> = TableDefinition::new("favs");

/// Moderation messages: id -> MessageRecord (msgpack)
pub const MESSAGES: TableDefinition<&str, &[u8]> = TableDefinition::new("messages");

/// Missing-page analytics: path -> NotFoundRecord (msgpack)
pub const NOT_FOUND: TableDefinition<&str, &[u8]> = TableDefinition::new("not_found");

/// Email sign-in tokens: base64url(sha256(token)) -> VerificationToken (msgpack)
pub const VERIFICATION_TOKENS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("verification_tokens");

/// Build the key of a two-part join table row.
pub fn join_key(left: &str, right: &str) -> String {
    format!("{left}/{right}")
}
