//! NovaBackup Interface Definition
//!
//! Shared types handed to the presentation layer: resolved layout settings,
//! non-fatal diagnostics and the fatal load error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown to the user when a backup cannot be loaded at all.
pub const LOAD_FAILED_MESSAGE: &str = "Could not read backup";

// ═══════════════════════════════════════════════════════════════════════════════
// SETTINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Grid dimensions and the page shown first, resolved from the preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSettings {
    pub rows: usize,
    pub cols: usize,
    pub dock_cols: usize,
    /// Screen id from `desktop_default_page`, if the backup names one
    pub default_screen: Option<i64>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// What a failed cross-reference was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialKind {
    /// No installed app matches the favorite's package name
    App,
    /// The favorite's container names a folder id that does not exist
    Folder,
}

/// Non-fatal anomaly found while loading or placing a backup.
///
/// These never abort a load; the affected field is left empty or the
/// offending placement is dropped from the affected cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "diagnostic", rename_all = "snake_case")]
pub enum Diagnostic {
    PreferenceMissing { name: String },
    PreferenceInvalid { name: String, value: String },
    PreferencesUnreadable { reason: String },
    PreferencesAbsent,
    ReferentialMiss {
        kind: ReferentialKind,
        favorite_id: i64,
        key: String,
    },
    GridCollision {
        x: i64,
        y: i64,
        occupant: i64,
        intruder: i64,
    },
    GridOutOfBounds { item: i64, x: i64, y: i64 },
    /// The grid itself is too large to lay out; nothing is placed
    GridTooLarge { rows: usize, cols: usize },
}

impl Diagnostic {
    pub fn is_grid_anomaly(&self) -> bool {
        matches!(
            self,
            Diagnostic::GridCollision { .. } | Diagnostic::GridOutOfBounds { .. } | Diagnostic::GridTooLarge { .. }
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Fatal load error. A load that fails leaves the session unloaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Archive corrupt: {0}")]
    ArchiveCorrupt(String),
    #[error("Backup has no {0} entry")]
    MissingDatabase(String),
    #[error("Database open error: {0}")]
    DatabaseOpen(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Query engine stopped")]
    EngineStopped,
    #[error("A load is already in progress")]
    LoadInProgress,
    #[error("Backup source error: {0}")]
    Source(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl LoadError {
    /// Generic text for the presentation layer; details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        LOAD_FAILED_MESSAGE
    }
}

impl From<crate::archive::ArchiveError> for LoadError {
    fn from(e: crate::archive::ArchiveError) -> Self {
        match e {
            crate::archive::ArchiveError::Task(msg) => LoadError::Runtime(msg),
            other => LoadError::ArchiveCorrupt(other.to_string()),
        }
    }
}

impl From<crate::database::DatabaseError> for LoadError {
    fn from(e: crate::database::DatabaseError) -> Self {
        use crate::database::DatabaseError;
        match e {
            DatabaseError::Open(_) | DatabaseError::Io(_) => LoadError::DatabaseOpen(e.to_string()),
            DatabaseError::Query(_) | DatabaseError::UnknownHandle(_) => LoadError::Query(e.to_string()),
            DatabaseError::EngineStopped => LoadError::EngineStopped,
        }
    }
}
