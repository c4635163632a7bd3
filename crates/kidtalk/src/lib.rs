//! `kidtalk` - Backend for weekly doctor/kid speech practice
//!
//! Doctors register kids, each kid gets four weeks of practice material
//! (pictures and a video), kids send voice recordings back, and doctors rate
//! each recording once with stars and a note.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;
pub mod storage;
pub mod uploads;
pub mod validation;

pub use api::AppState;
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use models::{Doctor, Feedback, Kid, Media, MediaKind, Stars, VoiceRecording, Week};
pub use storage::{Storage, StorageStats};
pub use uploads::{FileStore, LocalFileStore};
