//! Field-level validation of request payloads.
//!
//! Payloads arrive as JSON objects. [`Payload`] reads typed values out of an
//! object field by field and collects every problem into [`FieldErrors`],
//! so a client sees all invalid fields at once rather than the first one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Message for a missing required field.
pub const REQUIRED: &str = "This field is required.";

/// Message for an explicit `null` in a required field.
pub const NOT_NULL: &str = "This field may not be null.";

/// Message for an empty string in a required text field.
pub const NOT_BLANK: &str = "This field may not be blank.";

/// Message for a value that is not an integer.
pub const INVALID_INTEGER: &str = "A valid integer is required.";

/// Message for a malformed email address.
pub const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Message for a malformed date.
pub const INVALID_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

/// Maximum length of an email address.
const EMAIL_MAX_LENGTH: usize = 254;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
            .expect("email pattern is valid")
    })
}

/// Validation messages keyed by field name.
///
/// Serializes as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an error set holding a single message.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Check whether any message was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Convert into `Ok(())` when empty, `Err(self)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns the collected errors if any were recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Reader over a JSON object that accumulates field errors.
///
/// In partial mode, absent fields are skipped instead of reported as
/// required; this backs the profile edit endpoints.
#[derive(Debug)]
pub struct Payload<'a> {
    fields: &'a Map<String, Value>,
    partial: bool,
    errors: FieldErrors,
}

impl<'a> Payload<'a> {
    /// Read a payload where every requested field is required.
    #[must_use]
    pub fn new(fields: &'a Map<String, Value>) -> Self {
        Self {
            fields,
            partial: false,
            errors: FieldErrors::default(),
        }
    }

    /// Read a payload where absent fields are left unchanged.
    #[must_use]
    pub fn partial(fields: &'a Map<String, Value>) -> Self {
        Self {
            fields,
            partial: true,
            errors: FieldErrors::default(),
        }
    }

    /// Record an additional error for a field.
    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// Finish reading.
    ///
    /// # Errors
    ///
    /// Returns every error recorded while reading.
    pub fn finish(self) -> Result<(), FieldErrors> {
        self.errors.into_result()
    }

    /// Look up a field that must be present (unless partial) and non-null.
    fn present(&mut self, field: &str) -> Option<&'a Value> {
        match self.fields.get(field) {
            None => {
                if !self.partial {
                    self.errors.add(field, REQUIRED);
                }
                None
            }
            Some(Value::Null) => {
                self.errors.add(field, NOT_NULL);
                None
            }
            Some(value) => Some(value),
        }
    }

    /// Read a required integer. Numeric strings are accepted.
    pub fn integer(&mut self, field: &str) -> Option<i64> {
        let value = self.present(field)?;
        let parsed = coerce_integer(value);
        if parsed.is_none() {
            self.errors.add(field, INVALID_INTEGER);
        }
        parsed
    }

    /// Read a required integer that must not be negative.
    pub fn non_negative(&mut self, field: &str) -> Option<i64> {
        let value = self.integer(field)?;
        if value < 0 {
            self.errors
                .add(field, "Ensure this value is greater than or equal to 0.");
            return None;
        }
        Some(value)
    }

    /// Read a required primary key reference.
    pub fn primary_key(&mut self, field: &str) -> Option<i64> {
        let value = self.present(field)?;
        let parsed = coerce_integer(value);
        if parsed.is_none() {
            let received = match value {
                Value::String(_) => "str",
                Value::Bool(_) => "bool",
                Value::Array(_) => "list",
                Value::Object(_) => "dict",
                _ => "float",
            };
            self.errors.add(
                field,
                format!("Incorrect type. Expected pk value, received {received}."),
            );
        }
        parsed
    }

    /// Read a required integer restricted to an inclusive set of choices.
    pub fn choice(&mut self, field: &str, choices: std::ops::RangeInclusive<i64>) -> Option<i64> {
        let value = self.present(field)?;
        match coerce_integer(value) {
            Some(n) if choices.contains(&n) => Some(n),
            _ => {
                self.errors
                    .add(field, format!("\"{}\" is not a valid choice.", display_raw(value)));
                None
            }
        }
    }

    /// Read a required, non-blank string of at most `max_length` characters.
    pub fn text(&mut self, field: &str, max_length: Option<usize>) -> Option<String> {
        let value = self.present(field)?;
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                self.errors.add(field, "Not a valid string.");
                return None;
            }
        };
        if text.trim().is_empty() {
            self.errors.add(field, NOT_BLANK);
            return None;
        }
        if let Some(max) = max_length {
            if text.chars().count() > max {
                self.errors.add(
                    field,
                    format!("Ensure this field has no more than {max} characters."),
                );
                return None;
            }
        }
        Some(text)
    }

    /// Read an optional string. Absent, `null` and empty values yield `None`.
    pub fn optional_text(&mut self, field: &str, max_length: Option<usize>) -> Option<String> {
        match self.fields.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(_) => self.text(field, max_length),
        }
    }

    /// Read a required email address.
    pub fn email(&mut self, field: &str) -> Option<String> {
        let text = self.text(field, Some(EMAIL_MAX_LENGTH))?;
        if email_regex().is_match(&text) {
            Some(text)
        } else {
            self.errors.add(field, INVALID_EMAIL);
            None
        }
    }

    /// Read a required `YYYY-MM-DD` date.
    pub fn date(&mut self, field: &str) -> Option<NaiveDate> {
        let value = self.present(field)?;
        let parsed = value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
        if parsed.is_none() {
            self.errors.add(field, INVALID_DATE);
        }
        parsed
    }
}

/// Interpret a JSON value as an integer.
///
/// Accepts integral numbers, floats without a fractional part and strings
/// holding either.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
