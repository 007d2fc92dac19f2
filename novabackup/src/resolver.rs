//! Cross-reference resolution
//!
//! Joins favorites against installed apps by package name, then groups them
//! into screens and folders. The result is immutable once built.

use std::collections::HashMap;

use serde::Serialize;

use crate::icon::icon_url;
use crate::interface::{Diagnostic, LayoutSettings, ReferentialKind};
use crate::models::{App, Favorite, Screen};

/// Apps keyed by package name; a later app with the same package replaces an
/// earlier one.
pub fn app_table(apps: impl IntoIterator<Item = App>) -> HashMap<String, App> {
    apps.into_iter().map(|app| (app.package_name.clone(), app)).collect()
}

/// A fully linked home-screen layout
#[derive(Debug, Clone, Serialize)]
pub struct LauncherLayout {
    pub settings: LayoutSettings,
    apps: HashMap<String, App>,
    /// Row order of the favorites query
    favorites: Vec<Favorite>,
    #[serde(skip)]
    favorite_index: HashMap<i64, usize>,
    /// Discovery order
    screens: Vec<Screen>,
    #[serde(skip)]
    screen_index: HashMap<i64, usize>,
}

/// A visible page in navigation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageEntry {
    pub screen_id: i64,
    pub screen_rank: i64,
    /// 1-based position shown on the page indicator
    pub page_number: i64,
}

impl LauncherLayout {
    pub fn app(&self, package_name: &str) -> Option<&App> {
        self.apps.get(package_name)
    }

    pub fn apps(&self) -> &HashMap<String, App> {
        &self.apps
    }

    pub fn favorite(&self, id: i64) -> Option<&Favorite> {
        self.favorite_index.get(&id).map(|&i| &self.favorites[i])
    }

    pub fn favorites(&self) -> &[Favorite] {
        &self.favorites
    }

    pub fn screen(&self, id: i64) -> Option<&Screen> {
        self.screen_index.get(&id).map(|&i| &self.screens[i])
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    /// Favorites of a screen, in discovery order
    pub fn screen_favorites(&self, id: i64) -> Vec<&Favorite> {
        self.screen(id)
            .map(|screen| screen.favorites.iter().filter_map(|&fid| self.favorite(fid)).collect())
            .unwrap_or_default()
    }

    /// Children of a folder, in row order
    pub fn folder_contents(&self, folder: &Favorite) -> Vec<&Favorite> {
        folder.folder_contents.iter().filter_map(|&id| self.favorite(id)).collect()
    }

    /// Every dock item, in row order
    pub fn hotseat(&self) -> Vec<&Favorite> {
        self.favorites.iter().filter(|fav| fav.in_hotseat()).collect()
    }

    /// Visible screens sorted by rank ascending
    pub fn navigation(&self) -> Vec<PageEntry> {
        let mut visible: Vec<&Screen> = self.screens.iter().filter(|s| s.is_visible()).collect();
        visible.sort_by_key(|s| s.screen_rank);
        visible
            .into_iter()
            .map(|s| PageEntry {
                screen_id: s.id,
                screen_rank: s.screen_rank,
                page_number: s.screen_rank + 1,
            })
            .collect()
    }

    /// Screen to show first: the configured default page, else the first page
    /// in navigation order, else the first discovered screen.
    pub fn default_screen(&self) -> i64 {
        self.settings
            .default_screen
            .or_else(|| self.navigation().first().map(|page| page.screen_id))
            .or_else(|| self.screens.first().map(|s| s.id))
            .unwrap_or(0)
    }
}

/// Link favorites to apps, screens and folders.
///
/// Favorites must be in query row order; screens and folder contents keep
/// that order.
pub fn resolve(
    apps: HashMap<String, App>,
    favorites: Vec<Favorite>,
    settings: LayoutSettings,
) -> (LauncherLayout, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut screens: Vec<Screen> = Vec::new();
    let mut screen_index: HashMap<i64, usize> = HashMap::new();
    let mut favorite_index: HashMap<i64, usize> = HashMap::with_capacity(favorites.len());

    let mut linked = Vec::with_capacity(favorites.len());
    for mut favorite in favorites {
        let app = if favorite.package_name.is_empty() {
            None
        } else {
            let found = apps.get(&favorite.package_name);
            if found.is_none() {
                tracing::debug!(favorite = favorite.id, package = %favorite.package_name, "no installed app for favorite");
                diagnostics.push(Diagnostic::ReferentialMiss {
                    kind: ReferentialKind::App,
                    favorite_id: favorite.id,
                    key: favorite.package_name.clone(),
                });
            }
            found
        };

        if favorite.is_widget() {
            if let Some(app) = app {
                favorite.widget_title = app.title.clone();
            }
        }

        favorite.icon_url = if favorite.has_own_icon() {
            favorite.icon.as_deref().and_then(icon_url)
        } else {
            app.and_then(|app| app.icon.as_deref()).and_then(icon_url)
        };

        let slot = *screen_index.entry(favorite.screen).or_insert_with(|| {
            screens.push(Screen::new(favorite.screen, favorite.screen_rank));
            screens.len() - 1
        });
        screens[slot].favorites.push(favorite.id);

        favorite_index.insert(favorite.id, linked.len());
        linked.push(favorite);
    }

    // Folder membership needs every favorite indexed first
    let mut memberships = Vec::new();
    for favorite in &linked {
        let Some(folder) = favorite.folder_id() else {
            continue;
        };
        match favorite_index.get(&folder) {
            Some(&parent) => memberships.push((parent, favorite.id)),
            None => {
                tracing::warn!(favorite = favorite.id, container = folder, "favorite points at a missing folder");
                diagnostics.push(Diagnostic::ReferentialMiss {
                    kind: ReferentialKind::Folder,
                    favorite_id: favorite.id,
                    key: folder.to_string(),
                });
            }
        }
    }
    for (parent, child) in memberships {
        linked[parent].folder_contents.push(child);
    }

    let layout = LauncherLayout {
        settings,
        apps,
        favorites: linked,
        favorite_index,
        screens,
        screen_index,
    };
    (layout, diagnostics)
}
