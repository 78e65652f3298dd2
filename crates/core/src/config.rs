use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{LightBehavior, LightColor, Settings};

/// Configuration manager for mirror settings
/// Provides a layered configuration system that separates schema, available options, and persisted
/// values Configuration is stored in config.json in the repository root by default
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub midi: MidiConfigSchema,
    pub lights: LightConfigSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiConfigSchema {
    pub midi_device: ConfigOption<String>,
    pub midi_channel: ConfigOption<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightConfigSchema {
    pub light_behavior: ConfigOption<LightBehavior>,
    pub default_color: ConfigOption<LightColor>,
    pub blink: ConfigOption<bool>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub valid_choices: Option<Vec<T>>,
    pub description: String,
    pub requires_restart: bool,
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

impl ConfigManager {
    /// Create a new configuration manager
    /// If no path is provided, defaults to 'config.json' in the current working directory
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("config.json"));

        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load settings from configuration file
    /// Returns default settings if file doesn't exist or is invalid
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            // Create default config file
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Validate version compatibility
        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match application version {}. Using defaults for new settings.",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        self.settings = config_file.settings;
        Ok(self.settings.clone())
    }

    /// Save current settings to configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        // Ensure config directory exists (if config is in a subdirectory)
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            modified_at: chrono::Utc::now().to_rfc3339(),
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Update settings and save to file
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        self.settings = settings;
        self.save()
    }

    /// Get current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get configuration schema with available options
    pub fn schema() -> ConfigSchema {
        ConfigSchema {
            midi: MidiConfigSchema {
                midi_device: ConfigOption {
                    default: "APC MINI".to_string(),
                    valid_range: None,
                    valid_choices: None, // Will be populated from port enumeration
                    description: "Substring matched against MIDI port names".to_string(),
                    requires_restart: true,
                },
                midi_channel: ConfigOption {
                    default: 0,
                    valid_range: Some((0, 15)),
                    valid_choices: None,
                    description: "MIDI channel the surface listens on (0-15)".to_string(),
                    requires_restart: true,
                },
            },
            lights: LightConfigSchema {
                light_behavior: ConfigOption {
                    default: LightBehavior::Toggle,
                    valid_range: None,
                    valid_choices: Some(vec![LightBehavior::Toggle, LightBehavior::Gate]),
                    description: "Whether pad lights toggle through colors or gate with the press"
                        .to_string(),
                    requires_restart: true,
                },
                default_color: ConfigOption {
                    default: LightColor::Green,
                    valid_range: None,
                    valid_choices: Some(vec![
                        LightColor::Green,
                        LightColor::Red,
                        LightColor::Yellow,
                    ]),
                    description: "Color a pad takes on its first press".to_string(),
                    requires_restart: true,
                },
                blink: ConfigOption {
                    default: false,
                    valid_range: None,
                    valid_choices: None,
                    description: "Use the blinking variant of each color for lit pads".to_string(),
                    requires_restart: true,
                },
            },
        }
    }

    /// Validate settings against schema
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        if let Some((min, max)) = schema.midi.midi_channel.valid_range {
            if settings.midi_channel < min || settings.midi_channel > max {
                errors.push(format!("midi_channel must be between {} and {}", min, max));
            }
        }

        if let Some(choices) = &schema.lights.default_color.valid_choices {
            if !choices.contains(&settings.default_color) {
                errors.push(format!("default_color must be one of: {:?}", choices));
            }
        }

        if settings.midi_device.trim().is_empty() {
            errors.push("midi_device must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reset settings to defaults
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.settings = Settings::default();
        self.save()
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    ReadError(String),
    WriteError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(msg) => write!(f, "Failed to read config file: {}", msg),
            ConfigError::WriteError(msg) => write!(f, "Failed to write config file: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config file: {}", msg),
            ConfigError::SerializeError(msg) => write!(f, "Failed to serialize config: {}", msg),
            ConfigError::ValidationError(errors) => {
                write!(f, "Config validation errors: {}", errors.join(", "))
            }
        }
    }
}

impl std::error::Error for ConfigError {}
