//! Core record types for kidtalk.
//!
//! This module defines the stored records (doctors, kids, weeks, media,
//! voice recordings and feedback) and the validated inputs used to create
//! or change them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::validation::{FieldErrors, Payload};

/// Number of weeks provisioned for every kid.
pub const WEEKS_PER_KID: i64 = 4;

/// Maximum length of names.
pub const NAME_MAX_LENGTH: usize = 255;

/// Maximum length of stored URLs.
pub const URL_MAX_LENGTH: usize = 300;

/// Valid star ratings.
pub const STAR_RANGE: std::ops::RangeInclusive<i64> = 1..=5;

/// A registered doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    /// Database identifier.
    pub id: i64,
    /// Human-chosen login identifier.
    pub job_id: i64,
    /// Phone number.
    pub phone: i64,
    /// Email address.
    pub email: String,
    /// Date of birth.
    pub dob: NaiveDate,
    /// Display name.
    pub full_name: String,
}

/// A registered kid, owned by a doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kid {
    /// Database identifier.
    pub id: i64,
    /// Human-chosen login identifier.
    pub k_id: i64,
    /// Display name.
    pub name: String,
    /// Date of birth.
    pub dob: NaiveDate,
    /// Phone number.
    pub phone: i64,
    /// Age in years.
    pub age: i64,
    /// Database identifier of the owning doctor.
    pub doctor: i64,
}

/// One of the fixed weekly periods of a kid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    /// Database identifier.
    pub id: i64,
    /// Database identifier of the owning kid.
    pub kid: i64,
    /// Ordinal from 1 to [`WEEKS_PER_KID`].
    pub week_number: i64,
}

/// The kind of media a doctor attaches to a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A still picture.
    Picture,
    /// A video clip.
    Video,
}

impl MediaKind {
    /// How many items of this kind a week may hold.
    #[must_use]
    pub fn per_week(self) -> i64 {
        match self {
            Self::Picture => 4,
            Self::Video => 1,
        }
    }

    /// Plural label used in messages.
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            Self::Picture => "pictures",
            Self::Video => "videos",
        }
    }

    /// Parse the stored representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "picture" => Some(Self::Picture),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Picture => write!(f, "picture"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// A picture or video attached to a week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Database identifier.
    pub id: i64,
    /// Database identifier of the owning week.
    pub week: i64,
    /// Picture or video.
    pub kind: MediaKind,
    /// Stored file path, empty when only a URL was saved.
    pub file: String,
    /// Public URL of the file.
    pub url: Option<String>,
}

/// A voice recording a kid submitted for a week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceRecording {
    /// Database identifier.
    pub id: i64,
    /// Database identifier of the owning week.
    pub week: i64,
    /// Stored file path, empty when only a URL was saved.
    pub file: String,
    /// Public URL of the file.
    pub url: Option<String>,
    /// MIME type reported by the client.
    pub media_type: Option<String>,
    /// Whether a doctor has already given feedback.
    pub feedback_state: bool,
}

/// A star rating between 1 and 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stars(u8);

impl Stars {
    /// Create a rating, returning `None` outside 1..=5.
    #[must_use]
    pub fn new(value: i64) -> Option<Self> {
        if STAR_RANGE.contains(&value) {
            u8::try_from(value).ok().map(Self)
        } else {
            None
        }
    }

    /// The numeric rating.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

/// A doctor's feedback on one voice recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Database identifier.
    pub id: i64,
    /// Database identifier of the rated recording.
    pub voice_recording: i64,
    /// Star rating.
    pub stars: Stars,
    /// Free-form note for the kid.
    pub note: String,
}

/// Validated input for registering a doctor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDoctor {
    /// Login identifier.
    pub job_id: i64,
    /// Phone number.
    pub phone: i64,
    /// Email address.
    pub email: String,
    /// Date of birth.
    pub dob: NaiveDate,
    /// Display name.
    pub full_name: String,
}

impl NewDoctor {
    /// Validate a registration payload.
    ///
    /// # Errors
    ///
    /// Returns the messages for every invalid or missing field.
    pub fn from_payload(fields: &Map<String, Value>) -> Result<Self, FieldErrors> {
        let mut payload = Payload::new(fields);
        let job_id = payload.integer("job_id");
        let phone = payload.integer("phone");
        let email = payload.email("email");
        let dob = payload.date("dob");
        let full_name = payload.text("full_name", Some(NAME_MAX_LENGTH));
        payload.finish()?;

        match (job_id, phone, email, dob, full_name) {
            (Some(job_id), Some(phone), Some(email), Some(dob), Some(full_name)) => Ok(Self {
                job_id,
                phone,
                email,
                dob,
                full_name,
            }),
            _ => Err(FieldErrors::single("non_field_errors", "Invalid data.")),
        }
    }
}

/// Validated partial update of a doctor profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorChanges {
    /// New phone number.
    pub phone: Option<i64>,
    /// New email address.
    pub email: Option<String>,
    /// New date of birth.
    pub dob: Option<NaiveDate>,
    /// New display name.
    pub full_name: Option<String>,
}

impl DoctorChanges {
    /// Validate a profile edit payload. The login identifier is fixed.
    ///
    /// # Errors
    ///
    /// Returns the messages for every invalid field.
    pub fn from_payload(fields: &Map<String, Value>) -> Result<Self, FieldErrors> {
        let mut payload = Payload::partial(fields);
        if fields.contains_key("job_id") {
            payload.reject("job_id", "This field cannot be changed.");
        }
        let changes = Self {
            phone: payload.integer("phone"),
            email: payload.email("email"),
            dob: payload.date("dob"),
            full_name: payload.text("full_name", Some(NAME_MAX_LENGTH)),
        };
        payload.finish()?;
        Ok(changes)
    }
}

/// Validated input for registering a kid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKid {
    /// Login identifier.
    pub k_id: i64,
    /// Display name.
    pub name: String,
    /// Date of birth.
    pub dob: NaiveDate,
    /// Phone number.
    pub phone: i64,
    /// Age in years.
    pub age: i64,
    /// Database identifier of the owning doctor.
    pub doctor: i64,
}

impl NewKid {
    /// Validate a registration payload.
    ///
    /// # Errors
    ///
    /// Returns the messages for every invalid or missing field.
    pub fn from_payload(fields: &Map<String, Value>) -> Result<Self, FieldErrors> {
        let mut payload = Payload::new(fields);
        let k_id = payload.integer("k_id");
        let name = payload.text("name", Some(NAME_MAX_LENGTH));
        let dob = payload.date("dob");
        let phone = payload.integer("phone");
        let age = payload.non_negative("age");
        let doctor = payload.primary_key("doctor");
        payload.finish()?;

        match (k_id, name, dob, phone, age, doctor) {
            (Some(k_id), Some(name), Some(dob), Some(phone), Some(age), Some(doctor)) => {
                Ok(Self {
                    k_id,
                    name,
                    dob,
                    phone,
                    age,
                    doctor,
                })
            }
            _ => Err(FieldErrors::single("non_field_errors", "Invalid data.")),
        }
    }
}

/// Validated partial update of a kid profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KidChanges {
    /// New display name.
    pub name: Option<String>,
    /// New date of birth.
    pub dob: Option<NaiveDate>,
    /// New phone number.
    pub phone: Option<i64>,
    /// New age.
    pub age: Option<i64>,
    /// New owning doctor.
    pub doctor: Option<i64>,
}

impl KidChanges {
    /// Validate a profile edit payload. The login identifier is fixed.
    ///
    /// # Errors
    ///
    /// Returns the messages for every invalid field.
    pub fn from_payload(fields: &Map<String, Value>) -> Result<Self, FieldErrors> {
        let mut payload = Payload::partial(fields);
        if fields.contains_key("k_id") {
            payload.reject("k_id", "This field cannot be changed.");
        }
        let changes = Self {
            name: payload.text("name", Some(NAME_MAX_LENGTH)),
            dob: payload.date("dob"),
            phone: payload.integer("phone"),
            age: payload.non_negative("age"),
            doctor: payload.primary_key("doctor"),
        };
        payload.finish()?;
        Ok(changes)
    }
}

/// Validated input for attaching media to a week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMedia {
    /// Database identifier of the target week.
    pub week: i64,
    /// Picture or video.
    pub kind: MediaKind,
    /// Public URL returned by an earlier upload.
    pub url: String,
    /// Stored file path behind the URL, when it is a local upload.
    pub file: Option<String>,
}

impl NewMedia {
    /// Validate a save payload for the given media kind.
    ///
    /// # Errors
    ///
    /// Returns the messages for every invalid or missing field.
    pub fn from_payload(kind: MediaKind, fields: &Map<String, Value>) -> Result<Self, FieldErrors> {
        let mut payload = Payload::new(fields);
        let week = payload.primary_key("week");
        let url = payload.text("url", Some(URL_MAX_LENGTH));
        payload.finish()?;

        match (week, url) {
            (Some(week), Some(url)) => Ok(Self {
                week,
                kind,
                url,
                file: None,
            }),
            _ => Err(FieldErrors::single("non_field_errors", "Invalid data.")),
        }
    }
}

/// Validated input for saving a voice recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVoiceRecording {
    /// Database identifier of the target week.
    pub week: i64,
    /// Stored file path, if known.
    pub file: Option<String>,
    /// Public URL returned by an earlier upload.
    pub url: String,
    /// MIME type reported by the client.
    pub media_type: Option<String>,
}

impl NewVoiceRecording {
    /// Validate a save payload.
    ///
    /// # Errors
    ///
    /// Returns the messages for every invalid or missing field.
    pub fn from_payload(fields: &Map<String, Value>) -> Result<Self, FieldErrors> {
        let mut payload = Payload::new(fields);
        let week = payload.primary_key("week");
        let url = payload.text("url", Some(URL_MAX_LENGTH));
        let file = payload.optional_text("file", Some(URL_MAX_LENGTH));
        let media_type = payload.optional_text("media_type", Some(100));
        payload.finish()?;

        match (week, url) {
            (Some(week), Some(url)) => Ok(Self {
                week,
                file,
                url,
                media_type,
            }),
            _ => Err(FieldErrors::single("non_field_errors", "Invalid data.")),
        }
    }
}

/// Validated input for rating a voice recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    /// Star rating.
    pub stars: Stars,
    /// Free-form note.
    pub note: String,
}

impl NewFeedback {
    /// Validate a feedback payload.
    ///
    /// # Errors
    ///
    /// Returns the messages for every invalid or missing field.
    pub fn from_payload(fields: &Map<String, Value>) -> Result<Self, FieldErrors> {
        let mut payload = Payload::new(fields);
        let stars = payload.choice("stars", STAR_RANGE).and_then(Stars::new);
        let note = payload.text("note", None);
        payload.finish()?;

        match (stars, note) {
            (Some(stars), Some(note)) => Ok(Self { stars, note }),
            _ => Err(FieldErrors::single("non_field_errors", "Invalid data.")),
        }
    }
}
