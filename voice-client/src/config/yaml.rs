use serde::Deserialize;
use std::path::Path;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override the environment.
///
/// # Example YAML structure
/// ```yaml
/// azure:
///   api_key: "your-azure-openai-key"
///   endpoint: "https://my-resource.openai.azure.com"
///   webrtc_url: "https://swedencentral.realtimeapi-preview.ai.azure.com/v1/realtimertc"
///
/// realtime:
///   deployment: "gpt-realtime"
///   voice: "verse"
///   instructions_file: "prompts/helly.txt"
///   transcription_model: "whisper-1"
///
/// http:
///   timeout_seconds: 30
///
/// shell:
///   auto_listen_delay_ms: 1000
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct YamlConfig {
    pub azure: Option<AzureYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub http: Option<HttpYaml>,
    pub shell: Option<ShellYaml>,
}

/// Azure resource and endpoint settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AzureYaml {
    pub api_key: Option<String>,
    /// Resource endpoint; the sessions URL is derived from it
    pub endpoint: Option<String>,
    /// Full sessions URL, takes precedence over `endpoint`
    pub sessions_url: Option<String>,
    pub webrtc_url: Option<String>,
}

/// Realtime session settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RealtimeYaml {
    pub deployment: Option<String>,
    pub voice: Option<String>,
    pub instructions: Option<String>,
    /// Read instructions from a file, takes precedence over `instructions`
    pub instructions_file: Option<String>,
    pub transcription_model: Option<String>,
    pub control_channel_label: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HttpYaml {
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ShellYaml {
    pub auto_listen_delay_ms: Option<u64>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from YAML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty mapping
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
azure:
  api_key: "yaml-key"
  endpoint: "https://res.openai.azure.com"
  webrtc_url: "https://eastus2.realtimeapi-preview.ai.azure.com/v1/realtimertc"

realtime:
  deployment: "gpt-4o-realtime-preview"
  voice: "verse"
  instructions: "Be brief."
  transcription_model: "whisper-1"
  control_channel_label: "oai-events"

http:
  timeout_seconds: 15

shell:
  auto_listen_delay_ms: 250
"#;

        let config = YamlConfig::parse(yaml).unwrap();

        let azure = config.azure.as_ref().unwrap();
        assert_eq!(azure.api_key, Some("yaml-key".to_string()));
        assert_eq!(
            azure.endpoint,
            Some("https://res.openai.azure.com".to_string())
        );
        assert!(azure.sessions_url.is_none());

        let realtime = config.realtime.as_ref().unwrap();
        assert_eq!(
            realtime.deployment,
            Some("gpt-4o-realtime-preview".to_string())
        );
        assert_eq!(realtime.voice, Some("verse".to_string()));
        assert_eq!(realtime.transcription_model, Some("whisper-1".to_string()));
        assert_eq!(
            realtime.control_channel_label,
            Some("oai-events".to_string())
        );

        assert_eq!(config.http.as_ref().unwrap().timeout_seconds, Some(15));
        assert_eq!(
            config.shell.as_ref().unwrap().auto_listen_delay_ms,
            Some(250)
        );
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
realtime:
  voice: "coral"
"#;
        let config = YamlConfig::parse(yaml).unwrap();
        assert!(config.azure.is_none());
        assert!(config.http.is_none());
        assert_eq!(
            config.realtime.unwrap().voice,
            Some("coral".to_string())
        );
    }

    #[test]
    fn test_yaml_config_empty() {
        let config = YamlConfig::parse("").unwrap();
        assert!(config.azure.is_none());
        assert!(config.realtime.is_none());
    }

    #[test]
    fn test_yaml_config_invalid_type() {
        let yaml = r#"
http:
  timeout_seconds: "soon"
"#;
        let err = YamlConfig::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }

    #[test]
    fn test_yaml_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "shell:\n  auto_listen_delay_ms: 10\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(config.shell.unwrap().auto_listen_delay_ms, Some(10));
    }

    #[test]
    fn test_yaml_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.yaml");

        let err = YamlConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
