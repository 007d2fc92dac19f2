//! Backup archive reader
//!
//! Picks the two payload entries out of a `.novabackup` zip held in memory.
//! Everything else in the archive (wallpapers, icon packs) is ignored.

use std::io::{Cursor, Read};
use std::time::Instant;

use thiserror::Error;
use zip::ZipArchive;

pub const DATABASE_ENTRY: &str = "launcher.db";
pub const PREFERENCES_SUFFIX: &str = "launcher_preferences.xml";

/// Upper bound on the buffer reserved from an entry's declared size
const PREALLOCATE_LIMIT: u64 = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("cannot open archive: {0}")]
    Corrupt(#[from] zip::result::ZipError),
    #[error("cannot read entry {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("entry {0} is not valid UTF-8")]
    NotUtf8(String),
    #[error("archive task failed: {0}")]
    Task(String),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Names used to recognise the payload entries
#[derive(Debug, Clone)]
pub struct EntryNames {
    /// Exact entry name of the database image
    pub database: String,
    /// Suffix of the preferences entry name
    pub preferences_suffix: String,
}

impl Default for EntryNames {
    fn default() -> Self {
        Self {
            database: DATABASE_ENTRY.to_string(),
            preferences_suffix: PREFERENCES_SUFFIX.to_string(),
        }
    }
}

/// Payload extracted from a backup. Either member may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupContents {
    pub database: Option<Vec<u8>>,
    pub preferences: Option<String>,
}

/// Read the payload entries on the blocking pool.
pub async fn read_backup(bytes: Vec<u8>, names: EntryNames) -> ArchiveResult<BackupContents> {
    tokio::task::spawn_blocking(move || read_backup_sync(&bytes, &names))
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))?
}

/// Synchronous core of [`read_backup`].
///
/// When several entries match, the last one in archive order wins.
pub fn read_backup_sync(bytes: &[u8], names: &EntryNames) -> ArchiveResult<BackupContents> {
    let started = Instant::now();
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    tracing::debug!(
        entries = archive.len(),
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "opened backup archive"
    );

    let mut contents = BackupContents::default();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();

        if name == names.database {
            let mut buf = Vec::with_capacity(entry.size().min(PREALLOCATE_LIMIT) as usize);
            entry
                .read_to_end(&mut buf)
                .map_err(|source| ArchiveError::Entry { name: name.clone(), source })?;
            contents.database = Some(buf);
        } else if name.ends_with(&names.preferences_suffix) {
            let mut buf = Vec::with_capacity(entry.size().min(PREALLOCATE_LIMIT) as usize);
            entry
                .read_to_end(&mut buf)
                .map_err(|source| ArchiveError::Entry { name: name.clone(), source })?;
            let text = String::from_utf8(buf).map_err(|_| ArchiveError::NotUtf8(name.clone()))?;
            contents.preferences = Some(text);
        } else {
            tracing::trace!(entry = %name, "skipping archive entry");
        }
    }

    Ok(contents)
}
