//! Guard configuration.
//!
//! Only the activation target, notification presentation, audit trail and
//! logging are configurable. What gets blocked and what the caller receives
//! is fixed in [`crate::policy::PolicyTable`].

use crate::host::ChannelSpec;
use crate::policy::engine::DEFAULT_NOTIFICATION_ID_BASE;
use crate::policy::{OperationName, PolicyTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_TARGET_IDENTITY: &str = "com.google.android.apps.work.clouddpc";
pub const DEFAULT_TARGET_COMPONENT: &str = "android.app.admin.DevicePolicyManager";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub filter: String,
    /// Directory for daily-rotated log files; stderr only when absent.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "admin_guard=debug".to_string(),
            directory: None,
            file_prefix: "admin-guard.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardConfig {
    /// Identity of the loaded component that triggers activation.
    pub target_identity: String,
    /// Component whose operations are intercepted.
    pub target_component: String,
    pub enforced: Vec<OperationName>,
    pub notification_id_base: i32,
    pub channel: ChannelSpec,
    pub audit_log: Option<PathBuf>,
    pub logging: LogConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            target_identity: DEFAULT_TARGET_IDENTITY.to_string(),
            target_component: DEFAULT_TARGET_COMPONENT.to_string(),
            enforced: OperationName::ALL.to_vec(),
            notification_id_base: DEFAULT_NOTIFICATION_ID_BASE,
            channel: ChannelSpec::default(),
            audit_log: None,
            logging: LogConfig::default(),
        }
    }
}

impl GuardConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: GuardConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_identity.trim().is_empty() {
            return Err(ConfigError::Invalid("targetIdentity is empty".to_string()));
        }
        if self.target_component.trim().is_empty() {
            return Err(ConfigError::Invalid("targetComponent is empty".to_string()));
        }
        if self.enforced.is_empty() {
            return Err(ConfigError::Invalid("no operations enforced".to_string()));
        }
        if self.channel.id.trim().is_empty() {
            return Err(ConfigError::Invalid("channel id is empty".to_string()));
        }
        let table = PolicyTable::global();
        for operation in &self.enforced {
            let offset = table.lookup(*operation).notification_offset;
            if self.notification_id_base.checked_add(offset).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "notificationIdBase {} overflows for {}",
                    self.notification_id_base, operation
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ChannelImportance;

    #[test]
    fn test_default_config_is_valid() {
        let config = GuardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.enforced.len(), 4);
        assert_eq!(config.notification_id_base, 1234);
        assert_eq!(config.channel.importance, ChannelImportance::High);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = GuardConfig::from_json(
            r#"{ "targetIdentity": "com.example.dpc", "enforced": ["lockNow", "wipeData"] }"#,
        )
        .unwrap();

        assert_eq!(config.target_identity, "com.example.dpc");
        assert_eq!(config.target_component, DEFAULT_TARGET_COMPONENT);
        assert_eq!(
            config.enforced,
            vec![OperationName::LockNow, OperationName::WipeData]
        );
        assert_eq!(config.logging, LogConfig::default());
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let err = GuardConfig::from_json(r#"{ "enforced": ["factoryReset"] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_enforcement_rejected() {
        let err = GuardConfig::from_json(r#"{ "enforced": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_blank_identity_rejected() {
        let err = GuardConfig::from_json(r#"{ "targetIdentity": "  " }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_overflowing_notification_base_rejected() {
        let config = GuardConfig {
            notification_id_base: i32::MAX,
            ..GuardConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let lock_only = GuardConfig {
            notification_id_base: i32::MAX,
            enforced: vec![OperationName::LockNow],
            ..GuardConfig::default()
        };
        assert!(lock_only.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = GuardConfig::load(Path::new("/nonexistent/admin-guard.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
