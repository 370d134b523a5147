use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::theme::ThemeConfig;

/// Config file names looked up in the project root, in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["sunsite.yaml", "sunsite.yml", "sunsite.toml"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found in {} (expected one of sunsite.yaml, sunsite.yml, sunsite.toml)", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML parse error in {}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("TOML parse error in {}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level project configuration.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub description: String,
    pub theme: ThemeConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Sunsite".into(),
            description: String::new(),
            theme: ThemeConfig::default(),
        }
    }
}

impl SiteConfig {
    /// First existing config file in `project_dir`.
    pub fn locate<P: AsRef<Path>>(project_dir: P) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| project_dir.as_ref().join(name))
            .find(|path| path.is_file())
    }

    pub fn load<P: AsRef<Path>>(project_dir: P) -> Result<Self, ConfigError> {
        let path = Self::locate(&project_dir)
            .ok_or_else(|| ConfigError::NotFound(project_dir.as_ref().to_path_buf()))?;
        Self::read(path)
    }

    /// Parse a config file, choosing the format from its extension.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext == "toml") {
            return toml::from_str(&data).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            });
        }

        let yaml_error = |source: serde_yaml::Error| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        };
        let value: serde_yaml::Value = serde_yaml::from_str(&data).map_err(yaml_error)?;
        // An empty document means "all defaults"
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value).map_err(yaml_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Roundness;

    #[test]
    fn test_yaml_config_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("sunsite.yaml"),
            "title: Docs\ntheme:\n  accent_color: \"#ff0000\"\n  roundness: large\n",
        )
        .unwrap();

        let config = SiteConfig::load(dir.path()).unwrap();
        assert_eq!(config.title, "Docs");
        assert_eq!(config.description, "");
        assert_eq!(config.theme.accent_color, "#ff0000");
        assert_eq!(config.theme.roundness, Roundness::Large);
        assert_eq!(config.theme.font, "Inter");
        assert!(config.theme.shadows);
    }

    #[test]
    fn test_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("sunsite.toml"),
            "title = \"Docs\"\ndescription = \"All the docs\"\n\n[theme]\nshadows = false\n",
        )
        .unwrap();

        let config = SiteConfig::load(dir.path()).unwrap();
        assert_eq!(config.title, "Docs");
        assert_eq!(config.description, "All the docs");
        assert!(!config.theme.shadows);
    }

    #[test]
    fn test_yaml_preferred_over_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sunsite.toml"), "title = \"From TOML\"\n").unwrap();
        std::fs::write(dir.path().join("sunsite.yaml"), "title: From YAML\n").unwrap();

        assert_eq!(SiteConfig::load(dir.path()).unwrap().title, "From YAML");
    }

    #[test]
    fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SiteConfig::load(dir.path()),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_unparseable_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sunsite.yaml"), "title: [broken\n").unwrap();
        assert!(matches!(
            SiteConfig::load(dir.path()),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn test_empty_config_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sunsite.yaml"), "# nothing yet\n").unwrap();
        assert_eq!(SiteConfig::load(dir.path()).unwrap(), SiteConfig::default());
    }
}
