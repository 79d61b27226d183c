//! Crate-wide error type.
//!
//! Nothing here is fatal to a host process: source-load failures leave the
//! editing surface empty, mask/state-load failures fall back to defaults,
//! and persistence failures are logged while the in-memory state keeps
//! running. The variants exist so callers can tell those cases apart.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The selected source image or folder could not be loaded.
    #[error("cannot load source {path:?}: {reason}")]
    SourceLoad { path: PathBuf, reason: String },

    /// Writing the mask or data record failed. In-memory state is kept.
    #[error("cannot save session state: {0}")]
    Persist(String),

    /// A mask or composite rebuild failed (e.g. allocation failure on a
    /// very large source). The commit control is re-armed so the operator
    /// can retry.
    #[error("cannot update display image: {0}")]
    Recompute(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
