//! NovaBackup Core - home-screen layout reconstruction from launcher backups
//!
//! A backup is a zip holding a SQLite image (`launcher.db`) and a shared
//! preferences XML. This library reads both, maps the database rows into typed
//! records, links favorites to installed apps, screens and folders, and places
//! items on the launcher grid for an external renderer to draw.

pub mod archive;
pub mod database;
pub mod grid;
mod icon;
pub mod interface;
mod loader;
pub mod models;
pub mod preferences;
pub mod resolver;

pub use icon::{decode_icon_url, icon_url};
pub use interface::*;
pub use loader::{BackupSource, BytesSource, LoadOutcome, LoadState, Loader, LoaderConfig, Session};
pub use resolver::LauncherLayout;
