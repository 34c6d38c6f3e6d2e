//! Named CLI profiles persisted as JSON under the user's config directory.
//!
//! A profile holds the non-secret remote settings. The access token is only
//! ever read from the environment.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use drawbook_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const PROFILE_ENV: &str = "DRAWBOOK_PROFILE";
const DEFAULT_PROFILE: &str = "default";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ProfileFileError {
    #[error("Failed to resolve CLI config directory")]
    NoConfigDir,
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Contents of `cli-config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfilesFile {
    #[serde(default = "format_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

impl Default for ProfilesFile {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            active_profile: None,
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_anon_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autosave_interval_ms: Option<u64>,
}

const fn format_version() -> u32 {
    FORMAT_VERSION
}

pub fn profiles_file_path() -> Result<PathBuf, ProfileFileError> {
    let dir = dirs::config_dir().ok_or(ProfileFileError::NoConfigDir)?;
    Ok(dir.join("drawbook").join("cli-config.json"))
}

fn clean_name(value: Option<&str>) -> Option<String> {
    normalize_text_option(value.map(str::to_string))
}

impl ProfilesFile {
    pub fn load() -> Result<Self, ProfileFileError> {
        Self::load_from(&profiles_file_path()?)
    }

    /// Read a profiles file; a missing file yields an empty one
    pub fn load_from(path: &Path) -> Result<Self, ProfileFileError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ProfileFileError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let parsed: Self = serde_json::from_str(&raw).map_err(|source| ProfileFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(parsed.cleaned())
    }

    pub fn save(&self) -> Result<PathBuf, ProfileFileError> {
        let path = profiles_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ProfileFileError> {
        let write_error = |source| ProfileFileError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let serialized = serde_json::to_string_pretty(&self.clone().cleaned())
            .map_err(|error| write_error(io::Error::other(error)))?;
        std::fs::write(path, serialized).map_err(write_error)
    }

    /// Explicit name, then `DRAWBOOK_PROFILE`, then the active profile
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        clean_name(explicit)
            .or_else(|| clean_name(std::env::var(PROFILE_ENV).ok().as_deref()))
            .or_else(|| clean_name(self.active_profile.as_deref()))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_entry(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn cleaned(mut self) -> Self {
        self.active_profile = clean_name(self.active_profile.as_deref());
        self.profiles = self
            .profiles
            .into_iter()
            .filter_map(|(name, profile)| Some((clean_name(Some(&name))?, profile.cleaned())))
            .collect();
        self
    }
}

impl CliProfile {
    pub fn supabase_url(&self) -> Option<String> {
        normalize_text_option(self.supabase_url.clone())
    }

    pub fn supabase_anon_key(&self) -> Option<String> {
        normalize_text_option(self.supabase_anon_key.clone())
    }

    pub fn user_id(&self) -> Option<String> {
        normalize_text_option(self.user_id.clone())
    }

    fn cleaned(self) -> Self {
        Self {
            supabase_url: normalize_text_option(self.supabase_url),
            supabase_anon_key: normalize_text_option(self.supabase_anon_key),
            user_id: normalize_text_option(self.user_id),
            autosave_interval_ms: self.autosave_interval_ms.filter(|ms| *ms > 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn saved_profiles_are_trimmed_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cli-config.json");

        let mut file = ProfilesFile {
            active_profile: Some(" default ".to_string()),
            ..ProfilesFile::default()
        };
        *file.profile_entry("default") = CliProfile {
            supabase_url: Some(" https://project.supabase.co ".to_string()),
            supabase_anon_key: Some(" anon-key ".to_string()),
            user_id: Some("  ".to_string()),
            autosave_interval_ms: Some(0),
        };
        file.profile_entry("   ");

        file.save_to(&path).unwrap();
        let loaded = ProfilesFile::load_from(&path).unwrap();
        assert_eq!(loaded.active_profile.as_deref(), Some("default"));
        assert_eq!(loaded.profiles.len(), 1);
        assert_eq!(
            loaded.profile("default"),
            Some(&CliProfile {
                supabase_url: Some("https://project.supabase.co".to_string()),
                supabase_anon_key: Some("anon-key".to_string()),
                user_id: None,
                autosave_interval_ms: None,
            })
        );
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ProfilesFile::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, ProfilesFile::default());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli-config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ProfilesFile::load_from(&path),
            Err(ProfileFileError::Parse { .. })
        ));
    }

    #[test]
    fn explicit_profile_name_wins_over_active() {
        let file = ProfilesFile {
            active_profile: Some("work".to_string()),
            ..ProfilesFile::default()
        };
        assert_eq!(file.resolve_profile_name(Some(" laptop ")), "laptop");
        if std::env::var_os(PROFILE_ENV).is_none() {
            assert_eq!(file.resolve_profile_name(None), "work");
            assert_eq!(ProfilesFile::default().resolve_profile_name(None), "default");
        }
    }
}
