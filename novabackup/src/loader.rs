//! Session - load pipeline for launcher backups
//!
//! Architecture: archive → {preferences, database → records} → resolver
//!
//! Concurrency Model:
//! - Zip extraction runs on tokio's blocking pool
//! - Preference parsing and the database queries run concurrently and join
//!   before resolution
//! - The query engine is started once per loader and reused by every load
//! - A finished layout is immutable and shared as `Arc<LauncherLayout>`

use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::archive::{self, EntryNames, DATABASE_ENTRY, PREFERENCES_SUFFIX};
use crate::database::{DatabaseHandle, QueryEngine};
use crate::interface::{Diagnostic, LayoutSettings, LoadError};
use crate::models::{App, Favorite};
use crate::preferences::{GridFallback, Preferences, DEFAULT_DOCK_COLS};
use crate::resolver::{self, LauncherLayout};

// ─────────────────────────────────────────────────────────────────────────────
// CONFIGURATION
// ─────────────────────────────────────────────────────────────────────────────

/// Loader configuration. Every field has a default, so a partial JSON
/// document is enough.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Grid rows when the backup does not record `desktop_grid_rows`
    pub fallback_rows: usize,
    /// Grid columns when the backup does not record `desktop_grid_cols`
    pub fallback_cols: usize,
    pub fallback_dock_cols: usize,
    pub database_entry: String,
    pub preferences_suffix: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            fallback_rows: 5,
            fallback_cols: 5,
            fallback_dock_cols: DEFAULT_DOCK_COLS,
            database_entry: DATABASE_ENTRY.to_string(),
            preferences_suffix: PREFERENCES_SUFFIX.to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    fn entry_names(&self) -> EntryNames {
        EntryNames {
            database: self.database_entry.clone(),
            preferences_suffix: self.preferences_suffix.clone(),
        }
    }

    fn grid_fallback(&self) -> GridFallback {
        GridFallback {
            rows: self.fallback_rows,
            cols: self.fallback_cols,
            dock_cols: self.fallback_dock_cols,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BACKUP SOURCES
// ─────────────────────────────────────────────────────────────────────────────

/// Supplies the raw archive bytes (file picker, download, test fixture)
#[async_trait::async_trait]
pub trait BackupSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, LoadError>;
}

/// Archive bytes already in memory
pub struct BytesSource(pub Vec<u8>);

#[async_trait::async_trait]
impl BackupSource for BytesSource {
    async fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        Ok(self.0.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LOADER
// ─────────────────────────────────────────────────────────────────────────────

/// A successful load: the layout plus every non-fatal diagnostic, in the
/// order they were found
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub layout: Arc<LauncherLayout>,
    pub diagnostics: Vec<Diagnostic>,
}

struct Records {
    apps: Vec<App>,
    favorites: Vec<Favorite>,
}

/// Runs the pipeline. Holds the query engine, started on first use.
pub struct Loader {
    config: LoaderConfig,
    engine: OnceCell<QueryEngine>,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config, engine: OnceCell::new() }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn engine(&self) -> Result<&QueryEngine, LoadError> {
        self.engine
            .get_or_try_init(QueryEngine::start)
            .map_err(LoadError::from)
    }

    /// Load a backup archive held in memory.
    pub async fn load(&self, archive_bytes: Vec<u8>) -> Result<LoadOutcome, LoadError> {
        let started = Instant::now();
        let contents = archive::read_backup(archive_bytes, self.config.entry_names()).await?;
        tracing::debug!(
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            has_database = contents.database.is_some(),
            has_preferences = contents.preferences.is_some(),
            "read backup archive"
        );

        let image = contents
            .database
            .ok_or_else(|| LoadError::MissingDatabase(self.config.database_entry.clone()))?;
        let engine = self.engine()?;
        let preferences = contents.preferences;

        let ((settings, mut diagnostics), records) = tokio::join!(
            async { self.load_settings(preferences.as_deref()) },
            Self::load_records(engine, image),
        );
        let records = records?;

        let resolve_started = Instant::now();
        let apps = resolver::app_table(records.apps);
        let (layout, resolve_diagnostics) = resolver::resolve(apps, records.favorites, settings);
        diagnostics.extend(resolve_diagnostics);
        tracing::debug!(
            elapsed_ms = resolve_started.elapsed().as_secs_f64() * 1000.0,
            screens = layout.screens().len(),
            favorites = layout.favorites().len(),
            "resolved layout"
        );

        tracing::info!(
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            apps = layout.apps().len(),
            diagnostics = diagnostics.len(),
            "loaded backup"
        );
        Ok(LoadOutcome { layout: Arc::new(layout), diagnostics })
    }

    /// Fetch the archive from `source`, then [`load`](Self::load) it.
    pub async fn load_from(&self, source: &dyn BackupSource) -> Result<LoadOutcome, LoadError> {
        let bytes = source.fetch().await?;
        self.load(bytes).await
    }

    fn load_settings(&self, xml: Option<&str>) -> (LayoutSettings, Vec<Diagnostic>) {
        let fallback = self.config.grid_fallback();
        let mut diagnostics = Vec::new();

        let Some(xml) = xml else {
            tracing::warn!("backup has no preferences entry, using default grid");
            diagnostics.push(Diagnostic::PreferencesAbsent);
            return (LayoutSettings::fallback(fallback), diagnostics);
        };

        match Preferences::parse(xml) {
            Ok(prefs) => {
                let settings = LayoutSettings::from_preferences(&prefs, fallback, &mut diagnostics);
                (settings, diagnostics)
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not parse preferences, using default grid");
                diagnostics.push(Diagnostic::PreferencesUnreadable { reason: e.to_string() });
                (LayoutSettings::fallback(fallback), diagnostics)
            }
        }
    }

    async fn load_records(engine: &QueryEngine, image: Vec<u8>) -> Result<Records, LoadError> {
        let db: DatabaseHandle = engine.open(image).await?;

        let started = Instant::now();
        let apps = db.all_apps().await?.map_rows(App::from_row);
        tracing::debug!(elapsed_ms = started.elapsed().as_secs_f64() * 1000.0, count = apps.len(), "loaded allapps");

        let started = Instant::now();
        let favorites = db.all_favorites().await?.map_rows(Favorite::from_row);
        tracing::debug!(elapsed_ms = started.elapsed().as_secs_f64() * 1000.0, count = favorites.len(), "loaded favorites");

        Ok(Records { apps, favorites })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SESSION
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loading,
    Loaded(Arc<LauncherLayout>),
}

/// One user-facing session: at most one load at a time, and the last good
/// layout stays available until a new load starts.
pub struct Session {
    loader: Loader,
    state: RwLock<LoadState>,
    diagnostics: RwLock<Vec<Diagnostic>>,
}

impl Session {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            loader: Loader::new(config),
            state: RwLock::new(LoadState::NotLoaded),
            diagnostics: RwLock::new(Vec::new()),
        }
    }

    pub fn state(&self) -> LoadState {
        self.state.read().clone()
    }

    pub fn layout(&self) -> Option<Arc<LauncherLayout>> {
        match &*self.state.read() {
            LoadState::Loaded(layout) => Some(Arc::clone(layout)),
            _ => None,
        }
    }

    /// Diagnostics from the most recent successful load
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.read().clone()
    }

    pub async fn load(&self, archive_bytes: Vec<u8>) -> Result<Arc<LauncherLayout>, LoadError> {
        self.begin()?;
        let result = self.loader.load(archive_bytes).await;
        self.finish(result)
    }

    pub async fn load_from(&self, source: &dyn BackupSource) -> Result<Arc<LauncherLayout>, LoadError> {
        self.begin()?;
        let result = self.loader.load_from(source).await;
        self.finish(result)
    }

    fn begin(&self) -> Result<(), LoadError> {
        let mut state = self.state.write();
        if matches!(*state, LoadState::Loading) {
            return Err(LoadError::LoadInProgress);
        }
        *state = LoadState::Loading;
        self.diagnostics.write().clear();
        Ok(())
    }

    fn finish(&self, result: Result<LoadOutcome, LoadError>) -> Result<Arc<LauncherLayout>, LoadError> {
        match result {
            Ok(outcome) => {
                *self.diagnostics.write() = outcome.diagnostics;
                *self.state.write() = LoadState::Loaded(Arc::clone(&outcome.layout));
                Ok(outcome.layout)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load backup");
                *self.state.write() = LoadState::NotLoaded;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.fallback_dock_cols, 5);
        assert_eq!(config.database_entry, "launcher.db");
        assert_eq!(config.preferences_suffix, "launcher_preferences.xml");
    }

    #[test]
    fn test_partial_json_config() {
        let config = LoaderConfig::from_json(r#"{ "fallback_rows": 6 }"#).unwrap();
        assert_eq!(config.fallback_rows, 6);
        assert_eq!(config.fallback_cols, 5);
    }

    #[test]
    fn test_missing_preferences_use_fallback() {
        let loader = Loader::new(LoaderConfig { fallback_rows: 7, ..LoaderConfig::default() });
        let (settings, diagnostics) = loader.load_settings(None);
        assert_eq!(settings.rows, 7);
        assert_eq!(settings.dock_cols, 5);
        assert_eq!(diagnostics, vec![Diagnostic::PreferencesAbsent]);
    }

    #[test]
    fn test_unreadable_preferences_use_fallback() {
        let loader = Loader::new(LoaderConfig::default());
        let (settings, diagnostics) = loader.load_settings(Some("<map><int"));
        assert_eq!(settings, LayoutSettings::fallback(GridFallback::default()));
        assert!(matches!(diagnostics[0], Diagnostic::PreferencesUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_archive_leaves_session_unloaded() {
        let session = Session::new(LoaderConfig::default());
        let err = session.load(b"not a zip".to_vec()).await.unwrap_err();
        assert!(matches!(err, LoadError::ArchiveCorrupt(_)));
        assert!(matches!(session.state(), LoadState::NotLoaded));
        assert!(session.layout().is_none());
    }

    #[test]
    fn test_second_begin_while_loading_is_rejected() {
        let session = Session::new(LoaderConfig::default());
        session.begin().unwrap();
        assert!(matches!(session.begin(), Err(LoadError::LoadInProgress)));
    }

    #[test]
    fn test_engine_starts_once() {
        let loader = Loader::new(LoaderConfig::default());
        let first = loader.engine().unwrap() as *const QueryEngine;
        let second = loader.engine().unwrap() as *const QueryEngine;
        assert_eq!(first, second);
    }
}
