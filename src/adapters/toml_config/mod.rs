// Config file adapter - Loads configuration layers from TOML, YAML or JSON files

use std::path::Path;

use tracing::debug;

use crate::config_initialization::FileConfig;
use crate::domain::errors::*;
use crate::ports::*;

/// Configuration file adapter; the format follows the file extension
#[derive(Debug, Default)]
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Parse `content` as the format named by `extension`
    pub fn parse(content: &str, extension: &str) -> Result<FileConfig, DomainError> {
        match extension.to_lowercase().as_str() {
            "toml" => {
                // Accept either top-level keys or a [montage] table
                let value: toml::Value = toml::from_str(content)
                    .map_err(|e| DomainError::BadArgs(format!("Failed to parse TOML config: {}", e)))?;
                let table = value.get("montage").cloned().unwrap_or(value);
                table
                    .try_into()
                    .map_err(|e| DomainError::BadArgs(format!("Invalid TOML config: {}", e)))
            }
            "yaml" | "yml" => serde_yaml::from_str(content)
                .map_err(|e| DomainError::BadArgs(format!("Failed to parse YAML config: {}", e))),
            "json" => serde_json::from_str(content)
                .map_err(|e| DomainError::BadArgs(format!("Failed to parse JSON config: {}", e))),
            other => Err(DomainError::BadArgs(format!(
                "Unsupported config format: {}. Valid formats: toml, yaml, yml, json",
                other
            ))),
        }
    }
}

impl ConfigPort for TomlConfigAdapter {
    fn load_file(&self, path: &Path) -> Result<FileConfig, DomainError> {
        if !path.exists() {
            return Err(DomainError::FsFail(format!(
                "Config file does not exist: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainError::FsFail(format!("Failed to read config file: {}", e)))?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

        let config = Self::parse(&content, extension)?;
        debug!(path = %path.display(), ?config, "Config file loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_toml_with_section() {
        let config = TomlConfigAdapter::parse(
            "[montage]\nfps = 25\nhardware_acceleration = \"off\"\nseed = 9\n",
            "toml",
        )
        .unwrap();
        assert_eq!(config.fps, Some(25));
        assert_eq!(config.hardware_acceleration.as_deref(), Some("off"));
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_parse_top_level_toml() {
        let config = TomlConfigAdapter::parse("ffmpeg = \"/opt/ffmpeg/bin/ffmpeg\"\n", "toml").unwrap();
        assert_eq!(config.ffmpeg, Some("/opt/ffmpeg/bin/ffmpeg".into()));
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = TomlConfigAdapter::parse("sample_rate: 16000\nanalysis_window: 0.5\n", "yml").unwrap();
        assert_eq!(yaml.sample_rate, Some(16000));
        assert_eq!(yaml.analysis_window, Some(0.5));

        let json = TomlConfigAdapter::parse(r#"{"encode_timeout": 120}"#, "json").unwrap();
        assert_eq!(json.encode_timeout, Some(120));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(TomlConfigAdapter::parse("crf = 18\n", "toml").is_err());
        assert!(TomlConfigAdapter::parse("fps: 30\n", "ini").is_err());
    }

    #[test]
    fn test_load_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"fps": 24}}"#).unwrap();
        let config = TomlConfigAdapter::new().load_file(file.path()).unwrap();
        assert_eq!(config.fps, Some(24));

        let missing = TomlConfigAdapter::new().load_file(Path::new("/no/such/montage.toml"));
        assert!(matches!(missing, Err(DomainError::FsFail(_))));
    }
}
