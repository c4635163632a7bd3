//! HTTP API.
//!
//! Every endpoint lives under `/api/` and answers with the same JSON
//! envelope, `{"status": bool, "message": str, "data": any}`, so clients
//! can branch on `status` without inspecting the HTTP code.

pub mod endpoints;
pub mod error;
pub mod response;
pub mod router;

use std::sync::{Arc, Mutex, MutexGuard};

pub use error::ApiError;
pub use response::{Envelope, IdPath, JsonObject, Reply};
pub use router::router;

use crate::storage::Storage;
use crate::uploads::FileStore;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    storage: Arc<Mutex<Storage>>,
    files: Arc<dyn FileStore>,
}

impl AppState {
    /// Wrap an open database and a file store.
    #[must_use]
    pub fn new(storage: Storage, files: Arc<dyn FileStore>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            files,
        }
    }

    /// Lock the database.
    ///
    /// The guard must be dropped before the handler awaits.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if a previous holder panicked.
    pub fn storage(&self) -> Result<MutexGuard<'_, Storage>, ApiError> {
        self.storage
            .lock()
            .map_err(|_| ApiError::Internal("storage lock poisoned".into()))
    }

    /// The upload destination.
    #[must_use]
    pub fn files(&self) -> &dyn FileStore {
        self.files.as_ref()
    }
}
