/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Case-insensitive session settings dictionary.
//!
//! [`Settings`] holds the raw key/value pairs a configuration source
//! produced (file parsing itself lives outside this crate) and offers
//! typed getters. [`crate::config::SessionConfig`] is built from it.

use chrono::{NaiveTime, Weekday};
use std::collections::HashMap;

/// Case-insensitive string key/value dictionary.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    entries: HashMap<String, String>,
}

impl Settings {
    /// Creates an empty settings dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a key; keys compare case-insensitively.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_ascii_lowercase(), value.into());
    }

    /// Gets a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// True when the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    /// Gets a value parsed as an integer.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key)?.trim().parse().ok()
    }

    /// Gets a value parsed as a FIX boolean (`Y`/`N`, case-insensitive).
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim() {
            "Y" | "y" => Some(true),
            "N" | "n" => Some(false),
            _ => None,
        }
    }

    /// Gets a value parsed as a `HH:MM:SS` time of day.
    #[must_use]
    pub fn get_time(&self, key: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(self.get(key)?.trim(), "%H:%M:%S").ok()
    }

    /// Gets a value parsed as a weekday name (`Monday`, `monday`, `MON`).
    #[must_use]
    pub fn get_day(&self, key: &str) -> Option<Weekday> {
        self.get(key)?.trim().parse().ok()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut settings = Self::new();
        for (k, v) in iter {
            settings.set(k.as_ref(), v);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut s = Settings::new();
        s.set("BeginString", "FIX.4.2");
        assert_eq!(s.get("beginstring"), Some("FIX.4.2"));
        assert_eq!(s.get("BEGINSTRING"), Some("FIX.4.2"));
        assert!(s.contains("BeginString"));
    }

    #[test]
    fn test_typed_getters() {
        let s: Settings = [
            ("HeartBtInt", "30"),
            ("ResetOnLogon", "Y"),
            ("ResetOnLogout", "N"),
            ("StartTime", "08:00:00"),
            ("StartDay", "Monday"),
        ]
        .into_iter()
        .collect();

        assert_eq!(s.get_int("HeartBtInt"), Some(30));
        assert_eq!(s.get_bool("ResetOnLogon"), Some(true));
        assert_eq!(s.get_bool("ResetOnLogout"), Some(false));
        assert_eq!(
            s.get_time("StartTime"),
            NaiveTime::from_hms_opt(8, 0, 0)
        );
        assert_eq!(s.get_day("StartDay"), Some(Weekday::Mon));
    }

    #[test]
    fn test_missing_and_malformed() {
        let mut s = Settings::new();
        s.set("HeartBtInt", "abc");
        assert_eq!(s.get_int("HeartBtInt"), None);
        assert_eq!(s.get("nothing"), None);
        assert_eq!(s.get_bool("nothing"), None);
    }
}
