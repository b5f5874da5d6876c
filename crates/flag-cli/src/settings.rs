//! CLI settings: TOML file merged with command-line paths

use anyhow::Context;
use flag_registry::RegistryConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of an optional `flagctl.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct FileSettings {
    /// Directory of the persistent store
    pub(crate) dir: Option<PathBuf>,
    /// Directory of the session store
    pub(crate) session_dir: Option<PathBuf>,
    /// Registry options
    pub(crate) registry: RegistryConfig,
}

impl FileSettings {
    /// Read settings from `path`
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub(crate) fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

/// Resolved settings for one invocation
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) dir: PathBuf,
    pub(crate) session_dir: PathBuf,
    pub(crate) registry: RegistryConfig,
}

impl Settings {
    /// Command-line paths win over the file, the file over defaults
    pub(crate) fn resolve(
        file: Option<FileSettings>,
        dir: Option<PathBuf>,
        session_dir: Option<PathBuf>,
    ) -> Self {
        let file = file.unwrap_or_default();
        let dir = dir
            .or(file.dir)
            .unwrap_or_else(|| PathBuf::from(".flagctl/local"));
        let session_dir = session_dir
            .or(file.session_dir)
            .unwrap_or_else(|| dir.with_file_name("session"));
        Self {
            dir,
            session_dir,
            registry: file.registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toml() {
        let file = FileSettings::parse(
            r#"
            dir = "/var/flags"

            [registry]
            snapshot_key = "flags-v2"
            persist_on_mutation = false
            "#,
        )
        .unwrap();
        assert_eq!(file.dir.as_deref(), Some(Path::new("/var/flags")));
        assert_eq!(file.registry.snapshot_key, "flags-v2");
        assert!(!file.registry.persist_on_mutation);
        assert_eq!(file.registry.group_key, "ab-test-group");
    }

    #[test]
    fn resolve_precedence() {
        let file = FileSettings {
            dir: Some(PathBuf::from("/from/file")),
            ..FileSettings::default()
        };
        let settings = Settings::resolve(Some(file), Some(PathBuf::from("/cli/local")), None);
        assert_eq!(settings.dir, PathBuf::from("/cli/local"));
        assert_eq!(settings.session_dir, PathBuf::from("/cli/session"));
    }

    #[test]
    fn resolve_defaults() {
        let settings = Settings::resolve(None, None, None);
        assert_eq!(settings.dir, PathBuf::from(".flagctl/local"));
        assert_eq!(settings.session_dir, PathBuf::from(".flagctl/session"));
    }
}
