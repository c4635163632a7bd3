//! Storage layer for kidtalk.
//!
//! This module provides `SQLite`-based persistence for doctors, kids, their
//! weekly periods, attached media, voice recordings and feedback.
//!
//! Multi-row writes run inside a transaction: a kid is inserted together
//! with its four weeks, and feedback is inserted together with the flip of
//! the recording's `feedback_state` flag.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Params};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{
    Doctor, DoctorChanges, Feedback, Kid, KidChanges, Media, MediaKind, NewDoctor, NewFeedback,
    NewKid, NewMedia, NewVoiceRecording, Stars, VoiceRecording, Week, WEEKS_PER_KID,
};
use crate::validation::FieldErrors;

const DOCTOR_COLUMNS: &str = "id, job_id, phone, email, dob, full_name";
const KID_COLUMNS: &str = "id, k_id, name, dob, phone, age, doctor_id";
const WEEK_COLUMNS: &str = "id, kid_id, week_number";
const MEDIA_COLUMNS: &str = "id, week_id, kind, file, url";
const VOICE_COLUMNS: &str = "id, week_id, file, url, media_type, feedback_state";

/// Storage engine for the doctor/kid records.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Doctors ===

    /// Register a doctor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the job id, phone or email is taken,
    /// or a database error.
    pub fn create_doctor(&mut self, doctor: &NewDoctor) -> Result<Doctor> {
        let tx = self.conn.transaction()?;

        let mut errors = FieldErrors::default();
        if exists(&tx, "SELECT 1 FROM doctors WHERE job_id = ?1", [doctor.job_id])? {
            errors.add("job_id", "doctor with this job id already exists.");
        }
        if exists(&tx, "SELECT 1 FROM doctors WHERE phone = ?1", [doctor.phone])? {
            errors.add("phone", "doctor with this phone already exists.");
        }
        if exists(&tx, "SELECT 1 FROM doctors WHERE email = ?1", [&doctor.email])? {
            errors.add("email", "doctor with this email already exists.");
        }
        errors.into_result()?;

        tx.execute(
            "INSERT INTO doctors (job_id, phone, email, dob, full_name) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                doctor.job_id,
                doctor.phone,
                doctor.email,
                doctor.dob,
                doctor.full_name
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!(id, job_id = doctor.job_id, "Registered doctor");
        self.doctor(id)?
            .ok_or_else(|| Error::internal("doctor vanished after insert"))
    }

    /// Get a doctor by database id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn doctor(&self, id: i64) -> Result<Option<Doctor>> {
        let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [id], Self::row_to_doctor)
            .optional()?)
    }

    /// Get a doctor by login identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn doctor_by_job_id(&self, job_id: i64) -> Result<Option<Doctor>> {
        let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE job_id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [job_id], Self::row_to_doctor)
            .optional()?)
    }

    /// List all doctors in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_doctors(&self) -> Result<Vec<Doctor>> {
        let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let doctors = stmt
            .query_map([], Self::row_to_doctor)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(doctors)
    }

    /// Apply a partial profile update to the doctor with the given job id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such doctor exists,
    /// [`Error::Validation`] if a new phone or email is taken, or a database error.
    pub fn update_doctor(&mut self, job_id: i64, changes: &DoctorChanges) -> Result<Doctor> {
        let tx = self.conn.transaction()?;

        let id: i64 = tx
            .query_row("SELECT id FROM doctors WHERE job_id = ?1", [job_id], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or_else(|| Error::not_found("doctor"))?;

        let mut errors = FieldErrors::default();
        if let Some(phone) = changes.phone {
            if exists(
                &tx,
                "SELECT 1 FROM doctors WHERE phone = ?1 AND id != ?2",
                params![phone, id],
            )? {
                errors.add("phone", "doctor with this phone already exists.");
            }
        }
        if let Some(email) = &changes.email {
            if exists(
                &tx,
                "SELECT 1 FROM doctors WHERE email = ?1 AND id != ?2",
                params![email, id],
            )? {
                errors.add("email", "doctor with this email already exists.");
            }
        }
        errors.into_result()?;

        tx.execute(
            r"
            UPDATE doctors SET
                phone = COALESCE(?1, phone),
                email = COALESCE(?2, email),
                dob = COALESCE(?3, dob),
                full_name = COALESCE(?4, full_name)
            WHERE id = ?5
            ",
            params![
                changes.phone,
                changes.email,
                changes.dob,
                changes.full_name,
                id
            ],
        )?;
        tx.commit()?;

        debug!(id, job_id, "Updated doctor profile");
        self.doctor(id)?
            .ok_or_else(|| Error::internal("doctor vanished after update"))
    }

    // === Kids ===

    /// Register a kid and provision its weeks.
    ///
    /// The kid and all of its weeks are written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the doctor does not exist or the
    /// kid id or phone is taken, or a database error.
    pub fn create_kid(&mut self, kid: &NewKid) -> Result<Kid> {
        let tx = self.conn.transaction()?;

        let mut errors = FieldErrors::default();
        if !exists(&tx, "SELECT 1 FROM doctors WHERE id = ?1", [kid.doctor])? {
            errors.add(
                "doctor",
                format!("Invalid pk \"{}\" - object does not exist.", kid.doctor),
            );
        }
        if exists(&tx, "SELECT 1 FROM kids WHERE k_id = ?1", [kid.k_id])? {
            errors.add("k_id", "kid with this k id already exists.");
        }
        if exists(&tx, "SELECT 1 FROM kids WHERE phone = ?1", [kid.phone])? {
            errors.add("phone", "kid with this phone already exists.");
        }
        errors.into_result()?;

        tx.execute(
            "INSERT INTO kids (k_id, name, dob, phone, age, doctor_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![kid.k_id, kid.name, kid.dob, kid.phone, kid.age, kid.doctor],
        )?;
        let id = tx.last_insert_rowid();

        {
            let mut insert_week =
                tx.prepare("INSERT INTO weeks (kid_id, week_number) VALUES (?1, ?2)")?;
            for week_number in 1..=WEEKS_PER_KID {
                insert_week.execute(params![id, week_number])?;
            }
        }
        tx.commit()?;

        info!(id, k_id = kid.k_id, doctor = kid.doctor, "Registered kid");
        self.kid(id)?
            .ok_or_else(|| Error::internal("kid vanished after insert"))
    }

    /// Get a kid by database id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn kid(&self, id: i64) -> Result<Option<Kid>> {
        let sql = format!("SELECT {KID_COLUMNS} FROM kids WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [id], Self::row_to_kid)
            .optional()?)
    }

    /// Get a kid by login identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn kid_by_k_id(&self, k_id: i64) -> Result<Option<Kid>> {
        let sql = format!("SELECT {KID_COLUMNS} FROM kids WHERE k_id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [k_id], Self::row_to_kid)
            .optional()?)
    }

    /// List the kids assigned to a doctor.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn kids_for_doctor(&self, doctor_id: i64) -> Result<Vec<Kid>> {
        let sql = format!("SELECT {KID_COLUMNS} FROM kids WHERE doctor_id = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let kids = stmt
            .query_map([doctor_id], Self::row_to_kid)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(kids)
    }

    /// Apply a partial profile update to the kid with the given kid id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such kid exists,
    /// [`Error::Validation`] if the new phone is taken or the new doctor does
    /// not exist, or a database error.
    pub fn update_kid(&mut self, k_id: i64, changes: &KidChanges) -> Result<Kid> {
        let tx = self.conn.transaction()?;

        let id: i64 = tx
            .query_row("SELECT id FROM kids WHERE k_id = ?1", [k_id], |row| row.get(0))
            .optional()?
            .ok_or_else(|| Error::not_found("kid"))?;

        let mut errors = FieldErrors::default();
        if let Some(phone) = changes.phone {
            if exists(
                &tx,
                "SELECT 1 FROM kids WHERE phone = ?1 AND id != ?2",
                params![phone, id],
            )? {
                errors.add("phone", "kid with this phone already exists.");
            }
        }
        if let Some(doctor) = changes.doctor {
            if !exists(&tx, "SELECT 1 FROM doctors WHERE id = ?1", [doctor])? {
                errors.add(
                    "doctor",
                    format!("Invalid pk \"{doctor}\" - object does not exist."),
                );
            }
        }
        errors.into_result()?;

        tx.execute(
            r"
            UPDATE kids SET
                name = COALESCE(?1, name),
                dob = COALESCE(?2, dob),
                phone = COALESCE(?3, phone),
                age = COALESCE(?4, age),
                doctor_id = COALESCE(?5, doctor_id)
            WHERE id = ?6
            ",
            params![
                changes.name,
                changes.dob,
                changes.phone,
                changes.age,
                changes.doctor,
                id
            ],
        )?;
        tx.commit()?;

        debug!(id, k_id, "Updated kid profile");
        self.kid(id)?
            .ok_or_else(|| Error::internal("kid vanished after update"))
    }

    // === Weeks ===

    /// Get a week by database id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn week(&self, id: i64) -> Result<Option<Week>> {
        let sql = format!("SELECT {WEEK_COLUMNS} FROM weeks WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [id], Self::row_to_week)
            .optional()?)
    }

    /// List the weeks of a kid, ordered by week number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn weeks_for_kid(&self, kid_id: i64) -> Result<Vec<Week>> {
        let sql = format!("SELECT {WEEK_COLUMNS} FROM weeks WHERE kid_id = ?1 ORDER BY week_number");
        let mut stmt = self.conn.prepare(&sql)?;
        let weeks = stmt
            .query_map([kid_id], Self::row_to_week)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(weeks)
    }

    // === Media ===

    /// Attach a picture or video to a week.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the week does not exist or already
    /// holds its quota of this media kind, or a database error.
    pub fn add_media(&mut self, media: &NewMedia) -> Result<Media> {
        let tx = self.conn.transaction()?;

        ensure_week(&tx, media.week)?;
        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM media WHERE week_id = ?1 AND kind = ?2",
            params![media.week, media.kind.to_string()],
            |row| row.get(0),
        )?;
        if count >= media.kind.per_week() {
            return Err(FieldErrors::single(
                "week",
                format!(
                    "This week already holds the maximum of {} {}.",
                    media.kind.per_week(),
                    media.kind.plural()
                ),
            )
            .into());
        }

        tx.execute(
            "INSERT INTO media (week_id, kind, file, url) VALUES (?1, ?2, ?3, ?4)",
            params![
                media.week,
                media.kind.to_string(),
                media.file.as_deref().unwrap_or_default(),
                media.url
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(id, week = media.week, kind = %media.kind, "Saved media");
        Ok(Media {
            id,
            week: media.week,
            kind: media.kind,
            file: media.file.clone().unwrap_or_default(),
            url: Some(media.url.clone()),
        })
    }

    /// List the media attached to a week.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn media_for_week(&self, week_id: i64) -> Result<Vec<Media>> {
        let sql = format!("SELECT {MEDIA_COLUMNS} FROM media WHERE week_id = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let media = stmt
            .query_map([week_id], Self::row_to_media)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(media)
    }

    // === Voice recordings ===

    /// Save a kid's voice recording for a week.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the week does not exist, or a database error.
    pub fn add_voice_recording(&mut self, voice: &NewVoiceRecording) -> Result<VoiceRecording> {
        let tx = self.conn.transaction()?;
        ensure_week(&tx, voice.week)?;

        tx.execute(
            "INSERT INTO voice_recordings (week_id, file, url, media_type) VALUES (?1, ?2, ?3, ?4)",
            params![
                voice.week,
                voice.file.as_deref().unwrap_or_default(),
                voice.url,
                voice.media_type
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(id, week = voice.week, "Saved voice recording");
        Ok(VoiceRecording {
            id,
            week: voice.week,
            file: voice.file.clone().unwrap_or_default(),
            url: Some(voice.url.clone()),
            media_type: voice.media_type.clone(),
            feedback_state: false,
        })
    }

    /// Get a voice recording by database id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn voice_recording(&self, id: i64) -> Result<Option<VoiceRecording>> {
        let sql = format!("SELECT {VOICE_COLUMNS} FROM voice_recordings WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [id], Self::row_to_voice)
            .optional()?)
    }

    /// List the voice recordings of a week.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn voice_recordings_for_week(&self, week_id: i64) -> Result<Vec<VoiceRecording>> {
        let sql =
            format!("SELECT {VOICE_COLUMNS} FROM voice_recordings WHERE week_id = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let recordings = stmt
            .query_map([week_id], Self::row_to_voice)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(recordings)
    }

    // === Feedback ===

    /// Rate a voice recording.
    ///
    /// The recording's `feedback_state` is claimed with a conditional update
    /// in the same transaction as the insert, so at most one feedback entry
    /// can ever be written per recording.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the recording does not exist,
    /// [`Error::Conflict`] if it already has feedback, or a database error.
    pub fn create_feedback(&mut self, voice_id: i64, feedback: &NewFeedback) -> Result<Feedback> {
        let tx = self.conn.transaction()?;

        if !exists(&tx, "SELECT 1 FROM voice_recordings WHERE id = ?1", [voice_id])? {
            return Err(Error::not_found("voice recording"));
        }

        let claimed = tx.execute(
            "UPDATE voice_recordings SET feedback_state = 1 WHERE id = ?1 AND feedback_state = 0",
            [voice_id],
        )?;
        if claimed == 0 {
            warn!(voice_id, "Rejected second feedback for voice recording");
            return Err(Error::conflict(
                "feedback already exists for this voice recording",
            ));
        }

        tx.execute(
            "INSERT INTO feedback (voice_recording_id, stars, note) VALUES (?1, ?2, ?3)",
            params![voice_id, feedback.stars.get(), feedback.note],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!(id, voice_id, stars = feedback.stars.get(), "Recorded feedback");
        Ok(Feedback {
            id,
            voice_recording: voice_id,
            stars: feedback.stars,
            note: feedback.note.clone(),
        })
    }

    /// List the feedback a kid received across all weeks.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn feedback_for_kid(&self, k_id: i64) -> Result<Vec<Feedback>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT f.id, f.voice_recording_id, f.stars, f.note
            FROM feedback f
            JOIN voice_recordings v ON v.id = f.voice_recording_id
            JOIN weeks w ON w.id = v.week_id
            JOIN kids k ON k.id = w.kid_id
            WHERE k.k_id = ?1
            ORDER BY w.week_number, v.id
            ",
        )?;
        let feedback = stmt
            .query_map([k_id], Self::row_to_feedback)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(feedback)
    }

    // === Statistics ===

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?)
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            doctors: count("doctors")?,
            kids: count("kids")?,
            weeks: count("weeks")?,
            media: count("media")?,
            voice_recordings: count("voice_recordings")?,
            feedback: count("feedback")?,
            db_size_bytes,
        })
    }

    // === Row mapping ===

    fn row_to_doctor(row: &rusqlite::Row) -> rusqlite::Result<Doctor> {
        Ok(Doctor {
            id: row.get(0)?,
            job_id: row.get(1)?,
            phone: row.get(2)?,
            email: row.get(3)?,
            dob: row.get(4)?,
            full_name: row.get(5)?,
        })
    }

    fn row_to_kid(row: &rusqlite::Row) -> rusqlite::Result<Kid> {
        Ok(Kid {
            id: row.get(0)?,
            k_id: row.get(1)?,
            name: row.get(2)?,
            dob: row.get(3)?,
            phone: row.get(4)?,
            age: row.get(5)?,
            doctor: row.get(6)?,
        })
    }

    fn row_to_week(row: &rusqlite::Row) -> rusqlite::Result<Week> {
        Ok(Week {
            id: row.get(0)?,
            kid: row.get(1)?,
            week_number: row.get(2)?,
        })
    }

    fn row_to_media(row: &rusqlite::Row) -> rusqlite::Result<Media> {
        let kind_str: String = row.get(2)?;
        let kind = MediaKind::parse(&kind_str).unwrap_or_else(|| {
            warn!("Unknown media kind: {}, defaulting to picture", kind_str);
            MediaKind::Picture
        });

        Ok(Media {
            id: row.get(0)?,
            week: row.get(1)?,
            kind,
            file: row.get(3)?,
            url: row.get(4)?,
        })
    }

    fn row_to_voice(row: &rusqlite::Row) -> rusqlite::Result<VoiceRecording> {
        Ok(VoiceRecording {
            id: row.get(0)?,
            week: row.get(1)?,
            file: row.get(2)?,
            url: row.get(3)?,
            media_type: row.get(4)?,
            feedback_state: row.get(5)?,
        })
    }

    fn row_to_feedback(row: &rusqlite::Row) -> rusqlite::Result<Feedback> {
        let stars_raw: i64 = row.get(2)?;
        let stars = Stars::new(stars_raw).ok_or(rusqlite::Error::IntegralValueOutOfRange(
            2, stars_raw,
        ))?;

        Ok(Feedback {
            id: row.get(0)?,
            voice_recording: row.get(1)?,
            stars,
            note: row.get(3)?,
        })
    }
}

/// Check whether a query returns at least one row.
fn exists<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<bool> {
    Ok(conn
        .query_row(sql, params, |_| Ok(()))
        .optional()?
        .is_some())
}

/// Fail with a field error on `week` if the week does not exist.
fn ensure_week(conn: &Connection, week_id: i64) -> Result<()> {
    if exists(conn, "SELECT 1 FROM weeks WHERE id = ?1", [week_id])? {
        Ok(())
    } else {
        Err(FieldErrors::single(
            "week",
            format!("Invalid pk \"{week_id}\" - object does not exist."),
        )
        .into())
    }
}

/// Row counts per table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Registered doctors.
    pub doctors: i64,
    /// Registered kids.
    pub kids: i64,
    /// Provisioned weeks.
    pub weeks: i64,
    /// Saved pictures and videos.
    pub media: i64,
    /// Saved voice recordings.
    pub voice_recordings: i64,
    /// Feedback entries.
    pub feedback: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
