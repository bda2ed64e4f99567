//! Client settings loaded from TOML.
//!
//! - `parse_settings_toml(content)` parses and validates a settings file
//! - Default values are embedded via `include_str!("default_settings.toml")`
//!
//! The controller takes a `Settings` value at construction.

use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub service: ServiceSettings,
    pub recovery: RecoverySettings,
    pub channel: ChannelSettings,
    pub parcel: ParcelSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceSettings {
    pub system_ability_id: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecoverySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RecoverySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelSettings {
    pub capacity: usize,
    pub result_timeout_ms: u64,
}

impl ChannelSettings {
    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParcelSettings {
    pub max_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service: ServiceSettings {
                system_ability_id: 3703,
            },
            recovery: RecoverySettings {
                max_attempts: 5,
                base_delay_ms: 100,
            },
            channel: ChannelSettings {
                capacity: 256,
                result_timeout_ms: 1000,
            },
            parcel: ParcelSettings {
                max_capacity: crate::parcel::DEFAULT_MAX_CAPACITY,
            },
        }
    }
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_positive {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }

    if s.service.system_ability_id < 0 {
        return Err(SettingsError::InvalidValue {
            field: "service.system_ability_id".to_string(),
            reason: "must be non-negative".to_string(),
        });
    }

    check_positive!(recovery.max_attempts);
    check_positive!(channel.capacity);
    check_positive!(channel.result_timeout_ms);
    check_positive!(parcel.max_capacity);

    // base_delay_ms = 0 is allowed: every attempt runs back to back.

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_toml() {
        let s = parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(s.service.system_ability_id, 3703);
        assert_eq!(s.recovery.max_attempts, 5);
        assert_eq!(s.recovery.base_delay(), Duration::from_millis(100));
        assert_eq!(s.channel.capacity, 256);
        assert_eq!(s.channel.result_timeout(), Duration::from_secs(1));
        assert_eq!(s.parcel.max_capacity, 204800);
    }

    #[test]
    fn embedded_toml_matches_default_impl() {
        let s = parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn rejects_zero_attempts() {
        let toml = DEFAULT_SETTINGS_TOML.replace("max_attempts = 5", "max_attempts = 0");
        let err = parse_settings_toml(&toml).unwrap_err();
        match err {
            SettingsError::InvalidValue { field, .. } => {
                assert_eq!(field, "recovery.max_attempts")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_negative_ability_id() {
        let toml = DEFAULT_SETTINGS_TOML.replace("system_ability_id = 3703", "system_ability_id = -1");
        assert!(matches!(
            parse_settings_toml(&toml),
            Err(SettingsError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_missing_section() {
        let err = parse_settings_toml("[service]\nsystem_ability_id = 1\n").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let custom = DEFAULT_SETTINGS_TOML.replace("base_delay_ms = 100", "base_delay_ms = 5");
        file.write_all(custom.as_bytes()).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        let s = parse_settings_toml(&content).unwrap();
        assert_eq!(s.recovery.base_delay_ms, 5);
    }
}
