//! Synthetic launcher backups for tests and demos.
//!
//! Builds a real SQLite image with the `allapps`, `favorites` and
//! `workspaceScreens` tables, a shared-preferences XML, and zips them the way
//! the launcher's export does.

use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const DATABASE_ENTRY: &str = "launcher.db";
pub const PREFERENCES_ENTRY: &str = "shared_prefs/com.teslacoilsw.launcher_preferences.xml";

pub const CONTAINER_NONE: i64 = -100;
pub const CONTAINER_HOTSEAT: i64 = -101;

pub const ITEM_APP: i64 = 0;
pub const ITEM_FOLDER: i64 = 2;
pub const ITEM_WIDGET: i64 = 4;

const SCHEMA: &str = r#"
    CREATE TABLE allapps (
        _id INTEGER PRIMARY KEY,
        componentName TEXT NOT NULL,
        title TEXT,
        icon BLOB,
        profileId INTEGER DEFAULT 0
    );
    CREATE TABLE workspaceScreens (
        _id INTEGER PRIMARY KEY,
        screenRank INTEGER
    );
    CREATE TABLE favorites (
        _id INTEGER PRIMARY KEY,
        title TEXT,
        intent TEXT,
        container INTEGER,
        screen INTEGER,
        cellX INTEGER,
        cellY INTEGER,
        spanX INTEGER,
        spanY INTEGER,
        itemType INTEGER,
        appWidgetId INTEGER NOT NULL DEFAULT -1,
        iconPackage TEXT,
        iconResource TEXT,
        icon BLOB,
        appWidgetProvider TEXT,
        modified INTEGER NOT NULL DEFAULT 0,
        restored INTEGER NOT NULL DEFAULT 0,
        profileId INTEGER DEFAULT 0,
        rank INTEGER NOT NULL DEFAULT 0,
        options INTEGER NOT NULL DEFAULT 0,
        hotseatRank INTEGER DEFAULT -1,
        zOrder INTEGER DEFAULT 0,
        flags INTEGER DEFAULT 0
    );
"#;

pub struct SampleApp {
    pub id: i64,
    pub component: &'static str,
    pub title: Option<&'static str>,
    /// Solid icon colour; `None` stores a NULL icon
    pub icon_rgb: Option<[u8; 3]>,
}

pub struct SampleFavorite {
    pub id: i64,
    pub title: Option<&'static str>,
    pub intent: Option<&'static str>,
    pub container: i64,
    pub screen: i64,
    pub cell: (i64, i64),
    pub span: (i64, i64),
    pub item_type: i64,
    pub app_widget_provider: Option<&'static str>,
    pub icon_rgb: Option<[u8; 3]>,
}

pub struct SampleScreen {
    pub id: i64,
    pub rank: i64,
}

/// `(element, name, value)` triples of the preferences document
pub type SamplePreference = (&'static str, &'static str, &'static str);

pub const DEMO_APPS: &[SampleApp] = &[
    SampleApp {
        id: 1,
        component: "com.android.chrome/com.google.android.apps.chrome.Main",
        title: Some("Chrome"),
        icon_rgb: Some([219, 68, 55]),
    },
    SampleApp {
        id: 2,
        component: "com.google.android.gm/.ConversationListActivityGmail",
        title: Some("Gmail"),
        icon_rgb: Some([66, 133, 244]),
    },
    SampleApp {
        id: 3,
        component: "com.spotify.music/.MainActivity",
        title: Some("Spotify"),
        icon_rgb: Some([30, 215, 96]),
    },
    SampleApp {
        id: 4,
        component: "com.google.android.deskclock/com.android.deskclock.DeskClock",
        title: Some("Clock"),
        icon_rgb: Some([60, 64, 67]),
    },
    SampleApp {
        id: 5,
        component: "org.telegram.messenger/.DefaultIcon",
        title: None,
        icon_rgb: Some([0, 136, 204]),
    },
    SampleApp {
        id: 6,
        component: "com.google.android.dialer/.extensions.GoogleDialtactsActivity",
        title: Some("Phone"),
        icon_rgb: None,
    },
];

pub const DEMO_SCREENS: &[SampleScreen] = &[
    SampleScreen { id: 1, rank: 0 },
    SampleScreen { id: 2, rank: 1 },
];

pub const DEMO_FAVORITES: &[SampleFavorite] = &[
    SampleFavorite {
        id: 1,
        title: Some("Chrome"),
        intent: Some("#Intent;action=android.intent.action.MAIN;category=android.intent.category.LAUNCHER;launchFlags=0x10200000;component=com.android.chrome/com.google.android.apps.chrome.Main;end"),
        container: CONTAINER_NONE,
        screen: 1,
        cell: (0, 0),
        span: (1, 1),
        item_type: ITEM_APP,
        app_widget_provider: None,
        icon_rgb: None,
    },
    SampleFavorite {
        id: 2,
        title: None,
        intent: None,
        container: CONTAINER_NONE,
        screen: 1,
        cell: (0, 1),
        span: (4, 2),
        item_type: ITEM_WIDGET,
        app_widget_provider: Some("com.google.android.deskclock/com.android.alarmclock.DigitalAppWidgetProvider"),
        icon_rgb: None,
    },
    SampleFavorite {
        id: 3,
        title: Some("Social"),
        intent: None,
        container: CONTAINER_NONE,
        screen: 1,
        cell: (1, 0),
        span: (1, 1),
        item_type: ITEM_FOLDER,
        app_widget_provider: None,
        icon_rgb: None,
    },
    SampleFavorite {
        id: 4,
        title: Some("Telegram"),
        intent: Some("#Intent;action=android.intent.action.MAIN;component=org.telegram.messenger/.DefaultIcon;end"),
        container: 3,
        screen: 0,
        cell: (1, 0),
        span: (1, 1),
        item_type: ITEM_APP,
        app_widget_provider: None,
        icon_rgb: None,
    },
    SampleFavorite {
        id: 5,
        title: Some("Gmail"),
        intent: Some("#Intent;action=android.intent.action.MAIN;component=com.google.android.gm/.ConversationListActivityGmail;end"),
        container: 3,
        screen: 0,
        cell: (0, 0),
        span: (1, 1),
        item_type: ITEM_APP,
        app_widget_provider: None,
        icon_rgb: None,
    },
    SampleFavorite {
        id: 6,
        title: Some("Spotify"),
        intent: Some("#Intent;action=android.intent.action.MAIN;component=com.spotify.music/.MainActivity;end"),
        container: CONTAINER_NONE,
        screen: 2,
        cell: (3, 4),
        span: (1, 1),
        item_type: ITEM_APP,
        app_widget_provider: None,
        icon_rgb: Some([255, 255, 255]),
    },
    SampleFavorite {
        id: 7,
        title: Some("Phone"),
        intent: Some("#Intent;action=android.intent.action.MAIN;component=com.google.android.dialer/.extensions.GoogleDialtactsActivity;end"),
        container: CONTAINER_HOTSEAT,
        screen: 0,
        cell: (0, 0),
        span: (1, 1),
        item_type: ITEM_APP,
        app_widget_provider: None,
        icon_rgb: None,
    },
    SampleFavorite {
        id: 8,
        title: Some("Maps"),
        intent: Some("#Intent;action=android.intent.action.MAIN;component=com.google.android.apps.maps/com.google.android.maps.MapsActivity;end"),
        container: CONTAINER_HOTSEAT,
        screen: 1,
        cell: (2, 0),
        span: (1, 1),
        item_type: ITEM_APP,
        app_widget_provider: None,
        icon_rgb: None,
    },
    SampleFavorite {
        id: 9,
        title: Some("Lost"),
        intent: Some("#Intent;component=com.android.chrome/com.google.android.apps.chrome.Main;end"),
        container: 42,
        screen: 0,
        cell: (0, 0),
        span: (1, 1),
        item_type: ITEM_APP,
        app_widget_provider: None,
        icon_rgb: None,
    },
    SampleFavorite {
        id: 10,
        title: Some("Gmail"),
        intent: Some("#Intent;component=com.google.android.gm/.ConversationListActivityGmail;end"),
        container: CONTAINER_NONE,
        screen: 7,
        cell: (0, 0),
        span: (1, 1),
        item_type: ITEM_APP,
        app_widget_provider: None,
        icon_rgb: None,
    },
];

pub const DEMO_PREFERENCES: &[SamplePreference] = &[
    ("int", "desktop_grid_rows", "5"),
    ("int", "desktop_grid_cols", "4"),
    ("int", "desktop_default_page", "1"),
    ("boolean", "dock_enabled", "true"),
    ("string", "desktop_icon_size", "large"),
];

/// A complete backup, ready to serialize
pub struct SampleBackup<'a> {
    pub apps: &'a [SampleApp],
    pub screens: &'a [SampleScreen],
    pub favorites: &'a [SampleFavorite],
    /// `None` leaves the preferences entry out of the archive
    pub preferences: Option<&'a [SamplePreference]>,
}

impl SampleBackup<'static> {
    /// Two pages, a folder, a widget, a dock and a few broken references
    pub fn demo() -> Self {
        Self {
            apps: DEMO_APPS,
            screens: DEMO_SCREENS,
            favorites: DEMO_FAVORITES,
            preferences: Some(DEMO_PREFERENCES),
        }
    }
}

impl SampleBackup<'_> {
    /// The SQLite image as it would appear inside the zip
    pub fn database_image(&self) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir().context("creating scratch directory")?;
        let path = dir.path().join(DATABASE_ENTRY);
        {
            let conn = Connection::open(&path).context("creating database")?;
            conn.execute_batch(SCHEMA)?;
            self.insert_rows(&conn)?;
        }
        std::fs::read(&path).context("reading database image")
    }

    fn insert_rows(&self, conn: &Connection) -> Result<()> {
        for app in self.apps {
            let icon = app.icon_rgb.map(solid_png).transpose()?;
            conn.execute(
                "INSERT INTO allapps (_id, componentName, title, icon) VALUES (?1, ?2, ?3, ?4)",
                params![app.id, app.component, app.title, icon],
            )?;
        }
        for screen in self.screens {
            conn.execute(
                "INSERT INTO workspaceScreens (_id, screenRank) VALUES (?1, ?2)",
                params![screen.id, screen.rank],
            )?;
        }
        for (offset, fav) in self.favorites.iter().enumerate() {
            let icon = fav.icon_rgb.map(solid_png).transpose()?;
            conn.execute(
                r#"INSERT INTO favorites
                   (_id, title, intent, container, screen, cellX, cellY, spanX, spanY,
                    itemType, icon, appWidgetProvider, modified)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
                params![
                    fav.id,
                    fav.title,
                    fav.intent,
                    fav.container,
                    fav.screen,
                    fav.cell.0,
                    fav.cell.1,
                    fav.span.0,
                    fav.span.1,
                    fav.item_type,
                    icon,
                    fav.app_widget_provider,
                    1_700_000_000_000_i64 + offset as i64,
                ],
            )?;
        }
        Ok(())
    }

    pub fn preferences_xml(&self) -> Option<String> {
        self.preferences.map(preferences_xml)
    }

    /// The zipped backup, with a wallpaper entry the loader must ignore
    pub fn to_zip(&self) -> Result<Vec<u8>> {
        let image = self.database_image()?;
        let prefs = self.preferences_xml();
        let mut entries: Vec<(&str, &[u8])> = vec![("wallpaper.jpg", &b"\xFF\xD8\xFF\xE0"[..]), (DATABASE_ENTRY, &image[..])];
        if let Some(prefs) = prefs.as_deref() {
            entries.push((PREFERENCES_ENTRY, prefs.as_bytes()));
        }
        zip_entries(&entries)
    }
}

/// Render a shared-preferences document
pub fn preferences_xml(prefs: &[SamplePreference]) -> String {
    let mut xml = String::from("<?xml version='1.0' encoding='utf-8' standalone='yes' ?>\n<map>\n");
    for (element, name, value) in prefs {
        if *element == "string" {
            xml.push_str(&format!("    <string name=\"{}\">{}</string>\n", name, value));
        } else {
            xml.push_str(&format!("    <{} name=\"{}\" value=\"{}\" />\n", element, name, value));
        }
    }
    xml.push_str("</map>\n");
    xml
}

/// Zip arbitrary entries, in order
pub fn zip_entries(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, SimpleFileOptions::default())?;
        writer.write_all(data)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// A 4×4 single-colour PNG
pub fn solid_png(rgb: [u8; 3]) -> Result<Vec<u8>> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb(rgb));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_database_has_rows() {
        let image = SampleBackup::demo().database_image().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copy.db");
        std::fs::write(&path, image).unwrap();
        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM favorites", [], |r| r.get(0)).unwrap();
        assert_eq!(count as usize, DEMO_FAVORITES.len());
    }

    #[test]
    fn test_solid_png_has_png_magic() {
        assert!(solid_png([1, 2, 3]).unwrap().starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_preferences_xml_shapes() {
        let xml = preferences_xml(&[("int", "rows", "5"), ("string", "theme", "dark")]);
        assert!(xml.contains(r#"<int name="rows" value="5" />"#));
        assert!(xml.contains(r#"<string name="theme">dark</string>"#));
    }
}
