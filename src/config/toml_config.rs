use crate::core::reconcile::{DEFAULT_KEY_COLUMN, DEFAULT_MODE};
use crate::domain::model::Mode;
use crate::utils::error::{AnalyticsError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_one_of, validate_range, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 未指定 `--config` 時嘗試讀取的檔案
pub const DEFAULT_CONFIG_FILE: &str = "analytics.toml";

const LOG_FORMATS: [&str; 2] = ["compact", "json"];

/// 請求主體上限的最大值（MB）
const MAX_BODY_MB: usize = 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub reconcile: ReconcileConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 請求主體上限（MB）
    pub max_body_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8004,
            max_body_mb: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub default_key_column: String,
    pub default_mode: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            default_key_column: DEFAULT_KEY_COLUMN.to_string(),
            default_mode: DEFAULT_MODE.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: String,
    pub level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "compact".to_string(),
            level: None,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 載入指定檔案；未指定時讀取 `analytics.toml`（不存在則使用預設值），最後套用環境變數覆蓋
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// 替換環境變數 (例如 ${API_KEY})；未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AnalyticsError::Config {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("ANALYTICS_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("ANALYTICS_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| AnalyticsError::InvalidConfigValue {
                    field: "ANALYTICS_PORT".to_string(),
                    value: port.clone(),
                    reason: "Port must be a number between 1 and 65535".to_string(),
                })?;
        }
        Ok(())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("server.host", &self.server.host)?;
        validate_range("server.port", self.server.port, 1, u16::MAX)?;
        validate_range("server.max_body_mb", self.server.max_body_mb, 1, MAX_BODY_MB)?;

        validate_non_empty_string("reconcile.default_key_column", &self.reconcile.default_key_column)?;
        if self.reconcile.default_mode.parse::<Mode>().is_err() {
            return Err(AnalyticsError::InvalidConfigValue {
                field: "reconcile.default_mode".to_string(),
                value: self.reconcile.default_mode.clone(),
                reason: format!("Valid modes: {}", Mode::valid_names()),
            });
        }

        validate_one_of("logging.format", &self.logging.format, &LOG_FORMATS)?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.server.max_body_mb.saturating_mul(1024 * 1024)
    }

    /// 驗證後呼叫；無法解析時回退為 missing_in_a
    pub fn default_mode(&self) -> Mode {
        self.reconcile.default_mode.parse().unwrap_or(DEFAULT_MODE)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.format == "json"
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 8004);
        assert_eq!(config.bind_address(), "0.0.0.0:8004");
        assert_eq!(config.reconcile.default_key_column, "CUFE");
        assert_eq!(config.default_mode(), Mode::MissingInA);
        assert!(!config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
[server]
port = 9000

[reconcile]
default_key_column = "U_CUFE"
default_mode = "intersection"

[logging]
format = "json"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.max_body_mb, 50);
        assert_eq!(config.reconcile.default_key_column, "U_CUFE");
        assert_eq!(config.default_mode(), Mode::Intersection);
        assert!(config.json_logs());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_ANALYTICS_KEY_COLUMN", "DocKey");

        let toml_content = r#"
[reconcile]
default_key_column = "${TEST_ANALYTICS_KEY_COLUMN}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.reconcile.default_key_column, "DocKey");

        std::env::remove_var("TEST_ANALYTICS_KEY_COLUMN");
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::from_toml_str("[reconcile]\ndefault_mode = \"foo\"").unwrap();
        assert!(config.validate().is_err());

        let config = AppConfig::from_toml_str("[server]\nport = 0").unwrap();
        assert!(config.validate().is_err());

        let config = AppConfig::from_toml_str("[logging]\nformat = \"xml\"").unwrap();
        assert!(config.validate().is_err());

        let config = AppConfig::from_toml_str("[server]\nmax_body_mb = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_body_limit_bounds() {
        let config = AppConfig::from_toml_str("[server]\nmax_body_mb = 1024").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_body_bytes(), 1024 * 1024 * 1024);

        let config = AppConfig::from_toml_str("[server]\nmax_body_mb = 1025").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.max_body_mb"));

        let mut config = AppConfig::default();
        config.server.max_body_mb = usize::MAX;
        assert_eq!(config.max_body_bytes(), usize::MAX);
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_toml_str("[server\nport = 1").unwrap_err();
        assert!(matches!(err, AnalyticsError::Toml(_)));
    }
}
