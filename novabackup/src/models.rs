//! Core data models for launcher backups
//!
//! Records are built from generic query rows: each column is dispatched by
//! name onto a field. Unknown columns are ignored and missing ones keep the
//! field default.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Value;
use serde::Serialize;

use crate::icon::icon_url;

/// `container` value for items placed directly on a screen
pub const CONTAINER_NONE: i64 = -100;
/// `container` value for items in the dock
pub const CONTAINER_HOTSEAT: i64 = -101;
/// `screenRank` of a favorite whose screen has no `workspaceScreens` row
pub const SCREEN_RANK_HIDDEN: i64 = -1;

// ─────────────────────────────────────────────────────────────────────────────
// VALUE COERCION
// ─────────────────────────────────────────────────────────────────────────────

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Real(f) => Some(*f as i64),
        Value::Text(s) => s.trim().parse().ok(),
        Value::Null | Value::Blob(_) => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Blob(b) => String::from_utf8(b.clone()).ok(),
        Value::Null => None,
    }
}

fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Blob(b) => Some(b.clone()),
        Value::Text(s) => Some(s.clone().into_bytes()),
        _ => None,
    }
}

/// Split a `package/activity` component name on the first `/`.
///
/// A name without `/` is all package.
pub fn split_component(component: &str) -> (String, String) {
    match component.split_once('/') {
        Some((package, activity)) => (package.to_string(), activity.to_string()),
        None => (component.to_string(), String::new()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// APP
// ─────────────────────────────────────────────────────────────────────────────

/// An installed application from the `allapps` table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct App {
    pub id: i64,
    pub component_name: String,
    /// Sometimes NULL in the database; the favorite's title is used instead
    pub title: Option<String>,
    #[serde(skip)]
    pub icon: Option<Vec<u8>>,
    pub package_name: String,
    pub activity_name: String,
    pub icon_url: Option<String>,
}

impl App {
    pub fn from_row(columns: &[String], values: &[Value]) -> Self {
        let mut app = App::default();
        for (column, value) in columns.iter().zip(values) {
            match column.as_str() {
                "_id" => app.id = as_i64(value).unwrap_or_default(),
                "componentName" => app.component_name = as_string(value).unwrap_or_default(),
                "title" => app.title = as_string(value),
                "icon" => app.icon = as_bytes(value),
                _ => {}
            }
        }

        let (package_name, activity_name) = split_component(&app.component_name);
        app.package_name = package_name;
        app.activity_name = activity_name;
        app.icon_url = app.icon.as_deref().and_then(icon_url);
        app
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FAVORITE
// ─────────────────────────────────────────────────────────────────────────────

/// What a favorite row represents (`itemType` column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ItemType {
    #[default]
    App,
    Action,
    Folder,
    Widget,
    Link,
    Unknown(i64),
}

impl ItemType {
    pub fn from_database(value: i64) -> Self {
        match value {
            0 => ItemType::App,
            1 => ItemType::Action,
            2 => ItemType::Folder,
            4 => ItemType::Widget,
            6 => ItemType::Link,
            other => ItemType::Unknown(other),
        }
    }
}

/// The `key=value` pairs of a `;`-delimited intent string, in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedIntent(pub Vec<(String, String)>);

impl ParsedIntent {
    pub fn parse(intent: &str) -> Self {
        let pairs = intent
            .split(';')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (segment.to_string(), String::new()),
            })
            .collect();
        Self(pairs)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A placed item: app shortcut, folder, widget, link or dock entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Favorite {
    pub id: i64,
    /// Label shown below the icon
    pub title: Option<String>,
    pub intent: Option<String>,
    /// [`CONTAINER_NONE`], [`CONTAINER_HOTSEAT`] or the id of a folder
    pub container: i64,
    /// Home screen page; 0 for items inside a folder
    pub screen: i64,
    /// Order of the page; [`SCREEN_RANK_HIDDEN`] when not on a visible page
    pub screen_rank: i64,
    pub hotseat_rank: i64,
    pub cell_x: i64,
    pub cell_y: i64,
    pub span_x: i64,
    pub span_y: i64,
    pub z_order: i64,
    pub item_type: ItemType,
    pub app_widget_id: i64,
    #[serde(skip)]
    pub icon: Option<Vec<u8>>,
    pub app_widget_provider: Option<String>,
    pub flags: i64,
    /// Epoch milliseconds
    pub modified: i64,

    pub parsed_intent: Option<ParsedIntent>,
    pub package_name: String,
    pub activity_name: String,
    pub icon_url: Option<String>,
    pub widget_title: Option<String>,
    /// Ids of the favorites inside this folder, in row order
    pub folder_contents: Vec<i64>,
}

impl Default for Favorite {
    fn default() -> Self {
        Self {
            id: 0,
            title: None,
            intent: None,
            container: CONTAINER_NONE,
            screen: 0,
            screen_rank: SCREEN_RANK_HIDDEN,
            hotseat_rank: -1,
            cell_x: 0,
            cell_y: 0,
            span_x: 1,
            span_y: 1,
            z_order: 0,
            item_type: ItemType::App,
            app_widget_id: -1,
            icon: None,
            app_widget_provider: None,
            flags: 0,
            modified: 0,
            parsed_intent: None,
            package_name: String::new(),
            activity_name: String::new(),
            icon_url: None,
            widget_title: None,
            folder_contents: Vec::new(),
        }
    }
}

impl Favorite {
    pub fn from_row(columns: &[String], values: &[Value]) -> Self {
        let mut fav = Favorite::default();
        for (column, value) in columns.iter().zip(values) {
            let int = || as_i64(value);
            match column.as_str() {
                "_id" => fav.id = int().unwrap_or_default(),
                "title" => fav.title = as_string(value),
                "intent" => fav.intent = as_string(value),
                "container" => fav.container = int().unwrap_or(CONTAINER_NONE),
                "screen" => fav.screen = int().unwrap_or_default(),
                "screenRank" => fav.screen_rank = int().unwrap_or(SCREEN_RANK_HIDDEN),
                "hotseatRank" => fav.hotseat_rank = int().unwrap_or(-1),
                "cellX" => fav.cell_x = int().unwrap_or_default(),
                "cellY" => fav.cell_y = int().unwrap_or_default(),
                "spanX" => fav.span_x = int().unwrap_or(1).max(1),
                "spanY" => fav.span_y = int().unwrap_or(1).max(1),
                "zOrder" => fav.z_order = int().unwrap_or_default(),
                "itemType" => fav.item_type = ItemType::from_database(int().unwrap_or_default()),
                "appWidgetId" => fav.app_widget_id = int().unwrap_or(-1),
                "icon" => fav.icon = as_bytes(value),
                "appWidgetProvider" => fav.app_widget_provider = as_string(value),
                "flags" => fav.flags = int().unwrap_or_default(),
                "modified" => fav.modified = int().unwrap_or_default(),
                _ => {}
            }
        }

        if let Some(intent) = fav.intent.as_deref() {
            let parsed = ParsedIntent::parse(intent);
            if let Some(component) = parsed.get("component") {
                let (package, activity) = split_component(component);
                fav.package_name = package;
                fav.activity_name = activity;
            }
            fav.parsed_intent = Some(parsed);
        } else if let Some(provider) = fav.app_widget_provider.as_deref() {
            let (package, activity) = split_component(provider);
            fav.package_name = package;
            fav.activity_name = activity;
        }

        fav.icon_url = fav.icon.as_deref().and_then(icon_url);
        fav
    }

    pub fn is_folder(&self) -> bool {
        self.item_type == ItemType::Folder
    }

    pub fn is_widget(&self) -> bool {
        self.item_type == ItemType::Widget
    }

    pub fn in_hotseat(&self) -> bool {
        self.container == CONTAINER_HOTSEAT
    }

    pub fn on_desktop(&self) -> bool {
        self.container == CONTAINER_NONE
    }

    /// Id of the folder holding this favorite, if any
    pub fn folder_id(&self) -> Option<i64> {
        (self.container > 0).then_some(self.container)
    }

    /// A stored blob counts even when empty; only a NULL column defers to the app
    pub fn has_own_icon(&self) -> bool {
        self.icon.is_some()
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.modified).single()
    }

    /// Label for display: widgets fall back to their package name
    pub fn display_title(&self) -> Option<&str> {
        if self.is_widget() {
            self.widget_title
                .as_deref()
                .filter(|title| !title.is_empty())
                .or_else(|| (!self.package_name.is_empty()).then_some(self.package_name.as_str()))
        } else {
            self.title.as_deref()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SCREEN
// ─────────────────────────────────────────────────────────────────────────────

/// One home-screen page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Screen {
    pub id: i64,
    pub screen_rank: i64,
    /// Ids of favorites whose `screen` is this page, in discovery order
    pub favorites: Vec<i64>,
}

impl Screen {
    pub fn new(id: i64, screen_rank: i64) -> Self {
        Self { id, screen_rank, favorites: Vec::new() }
    }

    pub fn is_visible(&self) -> bool {
        self.screen_rank > SCREEN_RANK_HIDDEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_component() {
        assert_eq!(
            split_component("com.android.chrome/com.google.android.apps.chrome.Main"),
            ("com.android.chrome".to_string(), "com.google.android.apps.chrome.Main".to_string())
        );
        assert_eq!(split_component("com.example"), ("com.example".to_string(), String::new()));
        assert_eq!(split_component("a/b/c"), ("a".to_string(), "b/c".to_string()));
    }

    #[test]
    fn test_app_from_row() {
        let app = App::from_row(
            &columns(&["_id", "componentName", "title", "icon", "profileId"]),
            &[
                Value::Integer(3),
                Value::Text("com.spotify.music/.MainActivity".into()),
                Value::Null,
                Value::Blob(vec![1, 2, 3]),
                Value::Integer(0),
            ],
        );
        assert_eq!(app.id, 3);
        assert_eq!(app.package_name, "com.spotify.music");
        assert_eq!(app.activity_name, ".MainActivity");
        assert_eq!(app.title, None);
        assert!(app.icon_url.is_some());
    }

    #[test]
    fn test_app_missing_columns_keep_defaults() {
        let app = App::from_row(&columns(&["_id"]), &[Value::Integer(9)]);
        assert_eq!(app.id, 9);
        assert!(app.package_name.is_empty());
        assert!(app.icon_url.is_none());
    }

    #[test]
    fn test_parse_intent() {
        let parsed = ParsedIntent::parse("action=view;component=a.b/c.d;");
        assert_eq!(
            parsed.0,
            vec![
                ("action".to_string(), "view".to_string()),
                ("component".to_string(), "a.b/c.d".to_string()),
            ]
        );
        assert_eq!(parsed, ParsedIntent::parse("action=view;component=a.b/c.d;"));
    }

    #[test]
    fn test_parse_android_intent_uri() {
        let parsed = ParsedIntent::parse(
            "#Intent;action=android.intent.action.MAIN;launchFlags=0x10200000;component=com.android.chrome/com.google.android.apps.chrome.Main;end",
        );
        assert_eq!(parsed.get("#Intent"), Some(""));
        assert_eq!(parsed.get("launchFlags"), Some("0x10200000"));
        assert_eq!(parsed.get("end"), Some(""));
        assert_eq!(parsed.len(), 5);
    }

    #[test]
    fn test_favorite_from_intent() {
        let fav = Favorite::from_row(
            &columns(&["_id", "title", "intent", "container", "screen", "itemType", "unknownColumn"]),
            &[
                Value::Integer(1),
                Value::Text("Viewer".into()),
                Value::Text("action=view;component=a.b/c.d;".into()),
                Value::Integer(CONTAINER_NONE),
                Value::Integer(2),
                Value::Integer(0),
                Value::Text("ignored".into()),
            ],
        );
        assert_eq!(fav.package_name, "a.b");
        assert_eq!(fav.activity_name, "c.d");
        assert_eq!(fav.parsed_intent.as_ref().unwrap().get("action"), Some("view"));
        assert!(fav.on_desktop());
        assert_eq!(fav.span_x, 1);
        assert_eq!(fav.screen_rank, SCREEN_RANK_HIDDEN);
    }

    #[test]
    fn test_widget_uses_provider_without_intent() {
        let fav = Favorite::from_row(
            &columns(&["_id", "intent", "itemType", "appWidgetProvider", "spanX", "spanY"]),
            &[
                Value::Integer(2),
                Value::Null,
                Value::Integer(4),
                Value::Text("com.google.android.deskclock/com.android.alarmclock.DigitalAppWidgetProvider".into()),
                Value::Integer(4),
                Value::Integer(0),
            ],
        );
        assert!(fav.is_widget());
        assert_eq!(fav.package_name, "com.google.android.deskclock");
        assert_eq!(fav.span_x, 4);
        assert_eq!(fav.span_y, 1, "zero span is clamped");
        assert_eq!(fav.display_title(), Some("com.google.android.deskclock"));
    }

    #[test]
    fn test_intent_without_component_leaves_package_empty() {
        let fav = Favorite::from_row(
            &columns(&["intent", "appWidgetProvider"]),
            &[Value::Text("action=call".into()), Value::Text("x.y/z".into())],
        );
        assert!(fav.package_name.is_empty());
        assert!(fav.parsed_intent.is_some());
    }

    #[test]
    fn test_item_type_mapping() {
        assert_eq!(ItemType::from_database(2), ItemType::Folder);
        assert_eq!(ItemType::from_database(6), ItemType::Link);
        assert_eq!(ItemType::from_database(5), ItemType::Unknown(5));
    }

    #[test]
    fn test_folder_id_and_modified() {
        let fav = Favorite { container: 12, modified: 1_600_000_000_000, ..Favorite::default() };
        assert_eq!(fav.folder_id(), Some(12));
        assert_eq!(fav.modified_at().unwrap().timestamp(), 1_600_000_000);
        assert_eq!(Favorite::default().folder_id(), None);
    }

    #[test]
    fn test_empty_widget_title_falls_back_to_package() {
        let widget = Favorite {
            item_type: ItemType::Widget,
            package_name: "com.weather".into(),
            widget_title: Some(String::new()),
            ..Favorite::default()
        };
        assert_eq!(widget.display_title(), Some("com.weather"));

        let bare = Favorite { item_type: ItemType::Widget, widget_title: Some(String::new()), ..Favorite::default() };
        assert_eq!(bare.display_title(), None);
    }

    #[test]
    fn test_empty_icon_blob_is_still_own_icon() {
        assert!(Favorite { icon: Some(Vec::new()), ..Favorite::default() }.has_own_icon());
        assert!(!Favorite::default().has_own_icon());
    }
}
