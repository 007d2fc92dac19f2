//! Launcher shared-preferences parser
//!
//! The preferences file is an Android `SharedPreferences` dump: a `<map>` root
//! whose children are typed elements such as
//! `<int name="desktop_grid_rows" value="5" />` or
//! `<string name="theme">dark</string>`.

use serde::Serialize;
use thiserror::Error;

use crate::interface::{Diagnostic, LayoutSettings};

pub const PREF_GRID_ROWS: &str = "desktop_grid_rows";
pub const PREF_GRID_COLS: &str = "desktop_grid_cols";
pub const PREF_DOCK_COLS: &str = "dock_grid_cols";
pub const PREF_DEFAULT_PAGE: &str = "desktop_default_page";

/// Dock width the launcher uses when the backup does not record one
pub const DEFAULT_DOCK_COLS: usize = 5;
/// Largest grid dimension accepted from a backup
pub const MAX_GRID_DIMENSION: usize = 100;

#[derive(Error, Debug)]
pub enum PreferencesError {
    #[error("malformed preferences XML: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Element type of a stored preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrefKind {
    Boolean,
    Int,
    Float,
    String,
}

impl PrefKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "boolean" => PrefKind::Boolean,
            "int" => PrefKind::Int,
            "float" => PrefKind::Float,
            _ => PrefKind::String,
        }
    }
}

/// A preference value coerced per its element type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl PrefValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PrefValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrefValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PrefValue::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PrefEntry {
    kind: PrefKind,
    name: String,
    raw: String,
}

impl PrefEntry {
    fn value(&self) -> PrefValue {
        match self.kind {
            PrefKind::Boolean => PrefValue::Bool(self.raw == "true"),
            PrefKind::Int | PrefKind::Float => PrefValue::Number(parse_number_prefix(&self.raw)),
            // `long` and anything else stay raw text
            PrefKind::String => PrefValue::String(self.raw.clone()),
        }
    }
}

/// Preference entries in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    entries: Vec<PrefEntry>,
}

impl Preferences {
    pub fn parse(xml: &str) -> Result<Self, PreferencesError> {
        let doc = roxmltree::Document::parse(xml)?;
        let entries = doc
            .root_element()
            .children()
            .filter(|node| node.is_element())
            .filter_map(|node| {
                let name = node.attribute("name")?;
                let raw = node
                    .attribute("value")
                    .or_else(|| node.text())
                    .unwrap_or_default();
                Some(PrefEntry {
                    kind: PrefKind::from_tag(node.tag_name().name()),
                    name: name.to_string(),
                    raw: raw.to_string(),
                })
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First element named `name`, coerced per its type.
    pub fn find_pref(&self, name: &str) -> Option<PrefValue> {
        let found = self.entries.iter().find(|entry| entry.name == name);
        if found.is_none() {
            tracing::warn!(setting = name, "could not find setting");
        }
        found.map(PrefEntry::value)
    }

    pub fn find_number(&self, name: &str) -> Option<f64> {
        self.find_pref(name).and_then(|v| v.as_number())
    }

    pub fn find_bool(&self, name: &str) -> Option<bool> {
        self.find_pref(name).and_then(|v| v.as_bool())
    }

    pub fn find_string(&self, name: &str) -> Option<String> {
        self.find_pref(name).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn kind_of(&self, name: &str) -> Option<PrefKind> {
        self.entries.iter().find(|entry| entry.name == name).map(|entry| entry.kind)
    }
}

/// Fallback grid dimensions for settings the backup does not provide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridFallback {
    pub rows: usize,
    pub cols: usize,
    pub dock_cols: usize,
}

impl Default for GridFallback {
    fn default() -> Self {
        Self { rows: 5, cols: 5, dock_cols: DEFAULT_DOCK_COLS }
    }
}

impl LayoutSettings {
    /// Resolve layout settings, recording a diagnostic for each missing key.
    pub fn from_preferences(
        prefs: &Preferences,
        fallback: GridFallback,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let mut dimension = |name: &str, default: usize| -> usize {
            match prefs.find_pref(name) {
                None => {
                    diagnostics.push(Diagnostic::PreferenceMissing { name: name.to_string() });
                    default
                }
                Some(value) => match value.as_number().and_then(grid_dimension) {
                    Some(n) => n,
                    None => {
                        tracing::warn!(setting = name, ?value, "ignoring unusable grid setting");
                        diagnostics.push(Diagnostic::PreferenceInvalid {
                            name: name.to_string(),
                            value: describe(&value),
                        });
                        default
                    }
                },
            }
        };

        let rows = dimension(PREF_GRID_ROWS, fallback.rows);
        let cols = dimension(PREF_GRID_COLS, fallback.cols);
        let dock_cols = dimension(PREF_DOCK_COLS, fallback.dock_cols);

        let default_screen = match prefs.find_pref(PREF_DEFAULT_PAGE) {
            None => {
                diagnostics.push(Diagnostic::PreferenceMissing { name: PREF_DEFAULT_PAGE.to_string() });
                None
            }
            Some(value) => match value.as_number().filter(|n| n.is_finite()) {
                Some(n) => Some(n as i64),
                None => {
                    diagnostics.push(Diagnostic::PreferenceInvalid {
                        name: PREF_DEFAULT_PAGE.to_string(),
                        value: describe(&value),
                    });
                    None
                }
            },
        };

        Self { rows, cols, dock_cols, default_screen }
    }

    /// Settings used when the backup carries no preferences file at all
    pub fn fallback(fallback: GridFallback) -> Self {
        Self {
            rows: fallback.rows,
            cols: fallback.cols,
            dock_cols: fallback.dock_cols,
            default_screen: None,
        }
    }
}

/// Longest leading decimal number of `raw`, after leading whitespace.
///
/// `"5px"` reads as 5 and `"1.5e2x"` as 150; text with no leading digits is NaN.
fn parse_number_prefix(raw: &str) -> f64 {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        start + bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    if text[end..].starts_with("Infinity") {
        return if bytes[0] == b'-' { f64::NEG_INFINITY } else { f64::INFINITY };
    }

    let int_end = digits_from(end);
    let mut digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        digits += frac_end - (end + 1);
        end = frac_end;
    }
    if digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    text[..end].parse().unwrap_or(f64::NAN)
}

// Zero, NaN and anything above MAX_GRID_DIMENSION count as "not set"
fn grid_dimension(n: f64) -> Option<usize> {
    if n.is_finite() && (1.0..=MAX_GRID_DIMENSION as f64).contains(&n) {
        Some(n as usize)
    } else {
        None
    }
}

fn describe(value: &PrefValue) -> String {
    match value {
        PrefValue::Bool(b) => b.to_string(),
        PrefValue::Number(n) => n.to_string(),
        PrefValue::String(s) => s.clone(),
    }
}
