use std::cell::RefCell;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StorageError;
use crate::storage::KeyValueStore;

pub const SETTINGS_KEY: &str = "webClockSettings";
pub const SETTINGS_VERSION: &str = "1.1.0";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    Auto,
}

impl ThemeMode {
    pub const ALL: [ThemeMode; 3] = [ThemeMode::Auto, ThemeMode::Light, ThemeMode::Dark];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::Auto => "auto",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            "auto" => Some(ThemeMode::Auto),
            _ => None,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User preferences. Always fully populated: anything missing or corrupt in
/// storage is backfilled from [`Settings::default`].
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub show_date: bool,
    pub show_seconds: bool,
    pub theme_mode: ThemeMode,
    pub version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_date: true,
            show_seconds: true,
            theme_mode: ThemeMode::Auto,
            version: SETTINGS_VERSION.to_string(),
        }
    }
}

impl Settings {
    pub fn to_json_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// The stored record as found, before any field is checked. Fields stay
/// untyped so one corrupt value does not discard the others.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    #[serde(default)]
    show_date: Option<Value>,
    #[serde(default)]
    show_seconds: Option<Value>,
    #[serde(default)]
    theme_mode: Option<Value>,
    #[serde(default)]
    version: Option<Value>,
}

/// Parses a persisted record, merging it over the defaults field by field.
/// Never fails; unusable input yields the defaults.
pub fn parse_settings_text(content: &str) -> Settings {
    let raw = match serde_json::from_str::<Value>(content) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            log::warn!("stored settings are not a JSON object ({other}); using defaults");
            return Settings::default();
        }
        Err(err) => {
            let line = err.line();
            let column = err.column();
            log::warn!(
                "invalid settings JSON at line {line}, column {column}: {err}; using defaults"
            );
            return Settings::default();
        }
    };
    match serde_json::from_value::<StoredSettings>(raw) {
        Ok(stored) => merge_over_defaults(stored),
        Err(err) => {
            log::warn!("unreadable settings record: {err}; using defaults");
            Settings::default()
        }
    }
}

fn merge_over_defaults(stored: StoredSettings) -> Settings {
    let defaults = Settings::default();
    let mut rejected = Vec::new();

    let show_date = typed_field(stored.show_date, "showDate", &mut rejected)
        .unwrap_or(defaults.show_date);
    let show_seconds = typed_field(stored.show_seconds, "showSeconds", &mut rejected)
        .unwrap_or(defaults.show_seconds);
    let theme_mode = typed_field(stored.theme_mode, "themeMode", &mut rejected)
        .unwrap_or(defaults.theme_mode);
    let version =
        typed_field(stored.version, "version", &mut rejected).unwrap_or(defaults.version);

    if !rejected.is_empty() {
        log::warn!(
            "ignoring corrupt settings fields [{}]; defaults substituted",
            rejected.join(", ")
        );
    }

    Settings {
        show_date,
        show_seconds,
        theme_mode,
        version,
    }
}

fn typed_field<T>(
    value: Option<Value>,
    name: &'static str,
    rejected: &mut Vec<&'static str>,
) -> Option<T>
where
    T: serde::de::DeserializeOwned,
{
    match serde_json::from_value(value?) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            rejected.push(name);
            None
        }
    }
}

/// Single source of truth for [`Settings`]; every mutation is written through
/// to the backing store immediately.
pub struct SettingsStore {
    storage: Box<dyn KeyValueStore>,
    current: RefCell<Settings>,
}

impl SettingsStore {
    pub fn load(storage: Box<dyn KeyValueStore>) -> Self {
        let current = match storage.get(SETTINGS_KEY) {
            Ok(Some(text)) => parse_settings_text(&text),
            Ok(None) => Settings::default(),
            Err(err) => {
                log::warn!("failed to read settings: {err}; using defaults");
                Settings::default()
            }
        };
        log::info!("settings loaded: {current:?}");
        Self {
            storage,
            current: RefCell::new(current),
        }
    }

    pub fn current(&self) -> Settings {
        self.current.borrow().clone()
    }

    pub fn show_date(&self) -> bool {
        self.current.borrow().show_date
    }

    pub fn show_seconds(&self) -> bool {
        self.current.borrow().show_seconds
    }

    pub fn theme_mode(&self) -> ThemeMode {
        self.current.borrow().theme_mode
    }

    /// Applies `mutate` and persists the result with exactly one write.
    /// A failed write is logged; the in-memory value still changes.
    pub fn update<F>(&self, mutate: F) -> Settings
    where
        F: FnOnce(&mut Settings),
    {
        let next = {
            let mut current = self.current.borrow_mut();
            mutate(&mut current);
            current.clone()
        };
        if let Err(err) = self.persist(&next) {
            log::error!("failed to save settings: {err}");
        } else {
            log::debug!("settings saved");
        }
        next
    }

    fn persist(&self, settings: &Settings) -> Result<(), StorageError> {
        let text = settings.to_json_text().map_err(|err| StorageError::Write {
            key: SETTINGS_KEY.to_string(),
            reason: err.to_string(),
        })?;
        self.storage.set(SETTINGS_KEY, &text)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn parses_complete_record() {
        let json = r#"{"showDate": false, "showSeconds": false, "themeMode": "dark", "version": "1.0.0"}"#;
        let settings = parse_settings_text(json);
        assert!(!settings.show_date);
        assert!(!settings.show_seconds);
        assert_eq!(settings.theme_mode, ThemeMode::Dark);
        assert_eq!(settings.version, "1.0.0");
    }

    #[test]
    fn malformed_inputs_fall_back_to_defaults() {
        for text in ["", "{ not-json", "null", "42", "\"auto\"", "[true, false]", "{}"] {
            assert_eq!(parse_settings_text(text), Settings::default(), "input {text:?}");
        }
    }

    #[test]
    fn corrupt_fields_are_backfilled_individually() {
        let json = r#"{"showDate": "yes", "showSeconds": false, "themeMode": "sepia", "version": 3}"#;
        let settings = parse_settings_text(json);
        assert!(settings.show_date);
        assert!(!settings.show_seconds);
        assert_eq!(settings.theme_mode, ThemeMode::Auto);
        assert_eq!(settings.version, SETTINGS_VERSION);
    }

    #[test]
    fn partial_record_keeps_saved_fields() {
        let settings = parse_settings_text(r#"{"themeMode": "light"}"#);
        assert_eq!(settings.theme_mode, ThemeMode::Light);
        assert!(settings.show_date);
        assert!(settings.show_seconds);
    }

    #[test]
    fn serialized_record_uses_stored_field_names() {
        let settings = Settings {
            theme_mode: ThemeMode::Dark,
            show_seconds: false,
            ..Settings::default()
        };
        let text = settings.to_json_text().expect("settings serialize");
        let value: Value = serde_json::from_str(&text).expect("valid JSON");
        assert_eq!(value["showDate"], Value::Bool(true));
        assert_eq!(value["showSeconds"], Value::Bool(false));
        assert_eq!(value["themeMode"], Value::from("dark"));
        assert_eq!(value["version"], Value::from(SETTINGS_VERSION));
        assert_eq!(parse_settings_text(&text), settings);
    }

    #[test]
    fn null_fields_read_as_missing() {
        let settings = parse_settings_text(r#"{"showDate": null, "themeMode": "dark"}"#);
        assert!(settings.show_date);
        assert_eq!(settings.theme_mode, ThemeMode::Dark);
    }

    #[test]
    fn missing_record_loads_defaults_without_writing() {
        let storage = Rc::new(MemoryStore::new());
        let store = SettingsStore::load(Box::new(Rc::clone(&storage)));
        assert_eq!(store.current(), Settings::default());
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn update_writes_once_and_round_trips() {
        let storage = Rc::new(MemoryStore::with_entry(SETTINGS_KEY, "{ broken"));
        let store = SettingsStore::load(Box::new(Rc::clone(&storage)));
        store.update(|settings| settings.show_seconds = false);
        assert_eq!(storage.write_count(), 1);

        let raw = storage.raw(SETTINGS_KEY).expect("record written");
        let reloaded = parse_settings_text(&raw);
        assert!(!reloaded.show_seconds);
        assert_eq!(reloaded, store.current());
    }
}
