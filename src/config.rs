use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Whether a generation pass returns the document or streams it into a caller-supplied sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    #[default]
    ReturnValue,
    WriteToSink,
}

/// Generator settings. Every field has a default, so `{}` is a complete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GeneratorConfig {
    /// One level of indentation.
    #[serde(alias = "indentation-unit")]
    pub indent: String,
    pub output_mode: OutputMode,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            indent: "    ".to_string(),
            output_mode: OutputMode::ReturnValue,
        }
    }
}

impl GeneratorConfig {
    pub fn with_indent(indent: impl Into<String>) -> Result<Self, ConfigError> {
        let config = GeneratorConfig {
            indent: indent.into(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns `ConfigError::Json` for malformed input and `InvalidIndent` for a bad indentation unit.
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns `ConfigError::Yaml` for malformed input and `InvalidIndent` for a bad indentation unit.
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indent.is_empty() || !self.indent.chars().all(|c| c == ' ' || c == '\t') {
            return Err(ConfigError::InvalidIndent {
                indent: self.indent.clone(),
            });
        }
        Ok(())
    }
}
