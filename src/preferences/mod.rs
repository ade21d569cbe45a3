// User Preference File
// Plain key=value lines stored in the home directory (~/.vigil)

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Key holding the update prompt preference
pub const UPDATE_PREF_KEY: &str = "update_pref";

const FILE_NAME: &str = ".vigil";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("home directory could not be determined")]
    NoHomeDir,

    #[error("invalid preference entry {key:?}: keys must be non-empty and neither part may contain '=' or line breaks")]
    InvalidEntry { key: String },

    #[error("preference file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PreferenceError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Default preference file location
pub fn default_path() -> Result<PathBuf, PreferenceError> {
    let home = dirs::home_dir().ok_or(PreferenceError::NoHomeDir)?;
    Ok(home.join(FILE_NAME))
}

/// In-memory view of the preference file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    entries: BTreeMap<String, String>,
}

impl Preferences {
    /// Read the file; lines that are not exactly `key=value` are skipped
    pub fn load(path: &Path) -> Result<Self, PreferenceError> {
        let contents = std::fs::read_to_string(path).map_err(|e| PreferenceError::io(path, e))?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .filter_map(|line| {
                let mut parts = line.split('=');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(key), Some(value), None) => Some((key.to_string(), value.to_string())),
                    _ => None,
                }
            })
            .collect();
        Self { entries }
    }

    /// Write every entry as `key=value`, replacing the file
    pub fn save(&self, path: &Path) -> Result<(), PreferenceError> {
        std::fs::write(path, self.render()).map_err(|e| PreferenceError::io(path, e))
    }

    fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{}={}\n", key, value))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or replace an entry that survives a save/load cycle unchanged
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), PreferenceError> {
        let (key, value) = (key.into(), value.into());
        if key.is_empty() || !is_plain(&key) || !is_plain(&value) {
            return Err(PreferenceError::InvalidEntry { key });
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_plain(part: &str) -> bool {
    !part.contains(['=', '\n', '\r'])
}

/// Whether the user asked not to be prompted about updates
///
/// A missing file counts as no preference.
pub fn update_opted_out(path: &Path) -> Result<bool, PreferenceError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(PreferenceError::io(path, e)),
    };
    let prefix = format!("{}=", UPDATE_PREF_KEY);

    let opted_out = contents
        .lines()
        .find_map(|line| line.strip_prefix(&prefix))
        .map(|value| value.trim() == "no")
        .unwrap_or(false);
    Ok(opted_out)
}

/// Store the update preference, leaving every other line untouched
pub fn save_update_preference(path: &Path, value: &str) -> Result<(), PreferenceError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(PreferenceError::io(path, e)),
    };

    let prefix = format!("{}=", UPDATE_PREF_KEY);
    let entry = format!("{}{}", prefix, value);
    let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();

    match lines.iter_mut().find(|line| line.starts_with(&prefix)) {
        Some(line) => *line = entry,
        None => {
            debug!(path = %path.display(), "Adding update preference line");
            lines.push(entry);
        }
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    std::fs::write(path, rendered).map_err(|e| PreferenceError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_skips_malformed_lines() {
        let prefs = Preferences::parse("update_pref=no\n# comment\nurl=a=b\n\ntheme=dark\n");
        assert_eq!(prefs.len(), 2);
        assert_eq!(prefs.get("update_pref"), Some("no"));
        assert_eq!(prefs.get("theme"), Some("dark"));
        assert_eq!(prefs.get("url"), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".vigil");

        let mut prefs = Preferences::default();
        prefs.set("theme", "dark").unwrap();
        prefs.set("update_pref", "yes").unwrap();
        prefs.save(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "theme=dark\nupdate_pref=yes\n");
        assert_eq!(Preferences::load(&path).unwrap(), prefs);
    }

    #[test]
    fn test_set_rejects_entries_that_would_not_reload() {
        let mut prefs = Preferences::default();

        assert!(matches!(prefs.set("a=b", "x"), Err(PreferenceError::InvalidEntry { .. })));
        assert!(matches!(prefs.set("theme", "x\ny"), Err(PreferenceError::InvalidEntry { .. })));
        assert!(matches!(prefs.set("theme", "dark\r"), Err(PreferenceError::InvalidEntry { .. })));
        assert!(matches!(prefs.set("url", "a=b"), Err(PreferenceError::InvalidEntry { .. })));
        assert!(matches!(prefs.set("", "x"), Err(PreferenceError::InvalidEntry { .. })));
        assert!(prefs.is_empty());

        prefs.set("theme", "").unwrap();
        assert_eq!(Preferences::parse(&prefs.render()), prefs);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Preferences::load(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, PreferenceError::Io { .. }));
    }

    #[test]
    fn test_update_preference_replaced_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".vigil");
        std::fs::write(&path, "# managed by vigil\nupdate_pref=yes\ntheme=dark\n").unwrap();

        save_update_preference(&path, "no").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# managed by vigil\nupdate_pref=no\ntheme=dark\n"
        );
        assert!(update_opted_out(&path).unwrap());
    }

    #[test]
    fn test_update_preference_created_when_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".vigil");

        save_update_preference(&path, "no").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "update_pref=no\n");
    }

    #[test]
    fn test_opt_out_defaults_to_false() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".vigil");
        std::fs::write(&path, "theme=dark\nupdate_pref= yes \n").unwrap();
        assert!(!update_opted_out(&path).unwrap());

        std::fs::write(&path, "theme=dark\n").unwrap();
        assert!(!update_opted_out(&path).unwrap());

        std::fs::remove_file(&path).unwrap();
        assert!(!update_opted_out(&path).unwrap());
    }
}
