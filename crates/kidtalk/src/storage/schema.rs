//! `SQLite` schema definitions for kidtalk.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the doctors table.
pub const CREATE_DOCTORS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS doctors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL UNIQUE,
    phone INTEGER NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    dob TEXT NOT NULL,
    full_name TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the kids table.
pub const CREATE_KIDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS kids (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    k_id INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    dob TEXT NOT NULL,
    phone INTEGER NOT NULL UNIQUE,
    age INTEGER NOT NULL,
    doctor_id INTEGER NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the weeks table.
pub const CREATE_WEEKS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS weeks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kid_id INTEGER NOT NULL REFERENCES kids(id) ON DELETE CASCADE,
    week_number INTEGER NOT NULL CHECK (week_number BETWEEN 1 AND 4),
    UNIQUE (kid_id, week_number)
)
";

/// SQL statement to create the media table.
pub const CREATE_MEDIA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    week_id INTEGER NOT NULL REFERENCES weeks(id) ON DELETE CASCADE,
    kind TEXT NOT NULL CHECK (kind IN ('picture', 'video')),
    file TEXT NOT NULL DEFAULT '',
    url TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the voice recordings table.
pub const CREATE_VOICE_RECORDINGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS voice_recordings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    week_id INTEGER NOT NULL REFERENCES weeks(id) ON DELETE CASCADE,
    file TEXT NOT NULL DEFAULT '',
    url TEXT,
    media_type TEXT,
    feedback_state INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the feedback table.
///
/// The unique recording reference makes feedback one-to-one.
pub const CREATE_FEEDBACK_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    voice_recording_id INTEGER NOT NULL UNIQUE
        REFERENCES voice_recordings(id) ON DELETE CASCADE,
    stars INTEGER NOT NULL CHECK (stars BETWEEN 1 AND 5),
    note TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// Index for listing a doctor's kids.
pub const CREATE_KIDS_DOCTOR_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_kids_doctor ON kids(doctor_id)
";

/// Index for listing a week's media.
pub const CREATE_MEDIA_WEEK_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_media_week ON media(week_id, kind)
";

/// Index for listing a week's voice recordings.
pub const CREATE_VOICE_WEEK_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_voice_recordings_week ON voice_recordings(week_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_DOCTORS_TABLE,
    CREATE_KIDS_TABLE,
    CREATE_WEEKS_TABLE,
    CREATE_MEDIA_TABLE,
    CREATE_VOICE_RECORDINGS_TABLE,
    CREATE_FEEDBACK_TABLE,
    CREATE_KIDS_DOCTOR_INDEX,
    CREATE_MEDIA_WEEK_INDEX,
    CREATE_VOICE_WEEK_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_identifiers_are_unique() {
        assert!(CREATE_DOCTORS_TABLE.contains("job_id INTEGER NOT NULL UNIQUE"));
        assert!(CREATE_DOCTORS_TABLE.contains("email TEXT NOT NULL UNIQUE"));
        assert!(CREATE_KIDS_TABLE.contains("k_id INTEGER NOT NULL UNIQUE"));
    }

    #[test]
    fn test_feedback_is_one_to_one() {
        assert!(CREATE_FEEDBACK_TABLE.contains("voice_recording_id INTEGER NOT NULL UNIQUE"));
    }

    #[test]
    fn test_children_cascade() {
        for stmt in [
            CREATE_KIDS_TABLE,
            CREATE_WEEKS_TABLE,
            CREATE_MEDIA_TABLE,
            CREATE_VOICE_RECORDINGS_TABLE,
            CREATE_FEEDBACK_TABLE,
        ] {
            assert!(stmt.contains("ON DELETE CASCADE"));
        }
    }
}
