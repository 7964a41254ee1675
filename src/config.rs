//! Engine configuration, loaded from a TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::frontmatter::DEFAULT_ID_FIELD;
use crate::log;

pub const DEFAULT_REGISTRY_FILE: &str = "data/registry.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    /// Where the registry JSON lives.
    pub registry_file: PathBuf,
    /// Frontmatter field holding a declared identifier.
    pub id_field: String,
    /// Pretty-print the registry file on save.
    pub pretty: bool,
    /// Cache file digests between resolutions.
    pub digest_cache: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            registry_file: PathBuf::from(DEFAULT_REGISTRY_FILE),
            id_field: DEFAULT_ID_FIELD.to_string(),
            pretty: true,
            digest_cache: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            log!(
                "warning";
                "unknown fields in {}: {}",
                path.display(),
                ignored.join(", ")
            );
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn validate(&self) -> Result<()> {
        if self.id_field.is_empty() {
            bail!("id-field must not be empty");
        }
        if self.registry_file.as_os_str().is_empty() {
            bail!("registry-file must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.registry_file, PathBuf::from(DEFAULT_REGISTRY_FILE));
        assert_eq!(config.id_field, "uuid");
        assert!(config.pretty);
        assert!(config.digest_cache);
    }

    #[test]
    fn test_parse() {
        let toml = r#"
registry-file = "state/ids.json"
id-field = "stable-id"
pretty = false
"#;
        let (config, ignored) = EngineConfig::parse_with_ignored(toml).unwrap();
        assert!(ignored.is_empty());
        assert_eq!(config.registry_file, PathBuf::from("state/ids.json"));
        assert_eq!(config.id_field, "stable-id");
        assert!(!config.pretty);
        // Unspecified fields keep their defaults
        assert!(config.digest_cache);
    }

    #[test]
    fn test_unknown_fields_collected() {
        let toml = r#"
id-field = "uuid"
registry-fiel = "typo.json"
"#;
        let (_, ignored) = EngineConfig::parse_with_ignored(toml).unwrap();
        assert_eq!(ignored, vec!["registry-fiel".to_string()]);
    }

    #[test]
    fn test_validation_rejects_empty_id_field() {
        let (config, _) = EngineConfig::parse_with_ignored("id-field = \"\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stele.toml");
        fs::write(&path, "pretty = false\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert!(!config.pretty);

        assert!(EngineConfig::load(&dir.path().join("absent.toml")).is_err());
    }
}
