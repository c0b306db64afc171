// User settings
// Loaded from ~/.config/insurstat/settings.json

use std::fs;
use std::path::{Path, PathBuf};

use insurstat_core::config::{JobConfig, NameNormalization, ProfileOverride, DEFAULT_ISSUE_LIMIT, DEFAULT_UNIT_RATE};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Statistics
    #[serde(rename = "stat.unitRate")]
    pub unit_rate: f64,

    // Ingestion
    #[serde(rename = "ingest.issueLimit")]
    pub issue_limit: usize,

    #[serde(rename = "ingest.stripNameBlanks")]
    pub strip_name_blanks: bool,

    // Export
    #[serde(rename = "export.outputDir")]
    pub output_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            unit_rate: DEFAULT_UNIT_RATE,
            issue_limit: DEFAULT_ISSUE_LIMIT,
            strip_name_blanks: false,
            output_dir: None, // None = current directory
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Amount charged per enrolled month
    "stat.unitRate": 650,

    // How many malformed rows are listed before the rest are only counted
    "ingest.issueLimit": 1000,

    // Remove every blank inside names, not just leading/trailing ones
    "ingest.stripNameBlanks": false,

    // Where exported documents go when no --out is given (null = current directory)
    "export.outputDir": null
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("insurstat");
        config_dir.join("settings.json")
    }

    /// Load settings from the user config directory, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing file is created with commented defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            create_default_file(path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                warn!("error parsing {}: {e}; using default settings", path.display());
                Self::default()
            }),
            Err(e) => {
                warn!("error reading {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring lines that start with `//`.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Fill a built-in job config (no job file given) with these user defaults.
    pub fn apply_to(&self, job: &mut JobConfig) {
        job.stats.unit_rate = self.unit_rate;
        job.issue_limit = self.issue_limit.max(1);
        if self.strip_name_blanks {
            let profile = job.profile.get_or_insert_with(ProfileOverride::default);
            profile.name_normalization.get_or_insert(NameNormalization::StripBlanks);
        }
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir.as_deref().filter(|s| !s.is_empty()).map(PathBuf::from)
    }
}

fn create_default_file(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("error creating config directory: {e}");
            return;
        }
    }
    if let Err(e) = fs::write(path, DEFAULT_FILE) {
        warn!("error writing default {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insurstat_core::SourceShape;
    use tempfile::tempdir;

    #[test]
    fn test_default_file_parses_to_defaults() {
        assert_eq!(Settings::parse(DEFAULT_FILE).unwrap(), Settings::default());
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("insurstat").join("settings.json");
        let settings = Settings::load_from(&path);
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings = Settings::parse("{\n  // custom rate\n  \"stat.unitRate\": 700\n}").unwrap();
        assert_eq!(settings.unit_rate, 700.0);
        assert_eq!(settings.issue_limit, DEFAULT_ISSUE_LIMIT);
    }

    #[test]
    fn test_bad_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings { unit_rate: 720.5, output_dir: Some("/tmp/out".into()), ..Settings::default() };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_apply_to_job() {
        let settings = Settings { unit_rate: 800.0, strip_name_blanks: true, ..Settings::default() };
        let mut job = JobConfig::for_shape(SourceShape::MonthlySheets);
        settings.apply_to(&mut job);
        assert_eq!(job.stats.unit_rate, 800.0);
        assert_eq!(job.ingest_profile().name_normalization, NameNormalization::StripBlanks);
    }
}
