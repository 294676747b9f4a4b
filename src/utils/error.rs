use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Dataset {dataset} is empty")]
    EmptyDataset { dataset: String },

    #[error("Column '{column}' not found in dataset {dataset}. Available columns: {available}")]
    ColumnNotFound {
        dataset: String,
        column: String,
        available: String,
    },

    #[error("Invalid mode '{mode}'. Must be one of: {valid}")]
    InvalidMode { mode: String, valid: String },

    #[error("Tool '{name}' not found")]
    ToolNotFound { name: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Data processing error: {message}")]
    Processing { message: String },

    #[error("Chart rendering error: {message}")]
    Chart { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': '{value}' ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 呼叫端輸入不合法
    Input,
    /// 找不到要求的資源（例如 tool）
    NotFound,
    /// 設定檔或啟動參數問題
    Configuration,
    /// 系統層級錯誤（IO、編碼）
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// CLI 退出碼：輸入錯誤 2、設定錯誤 1、系統錯誤 3
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl AnalyticsError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn empty_dataset(dataset: impl ToString) -> Self {
        Self::EmptyDataset {
            dataset: dataset.to_string(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyDataset { .. }
            | Self::ColumnNotFound { .. }
            | Self::InvalidMode { .. }
            | Self::Validation { .. }
            | Self::Processing { .. }
            | Self::Serialization(_) => ErrorCategory::Input,
            Self::ToolNotFound { .. } => ErrorCategory::NotFound,
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::Toml(_) => {
                ErrorCategory::Configuration
            }
            Self::Chart { .. } | Self::Io(_) | Self::Csv(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::NotFound => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::EmptyDataset { dataset } => format!("Dataset {} has no records", dataset),
            Self::ColumnNotFound {
                dataset,
                column,
                available,
            } => format!(
                "Dataset {} has no column '{}' (available: {})",
                dataset, column, available
            ),
            Self::InvalidConfigValue { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::EmptyDataset { .. } => "Provide at least one record for each dataset",
            Self::ColumnNotFound { .. } => {
                "Check the key column name or pass key_column_a / key_column_b explicitly"
            }
            Self::InvalidMode { .. } => "Use missing_in_a, missing_in_b or intersection",
            Self::ToolNotFound { .. } => "List the registered tools with GET /tools",
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::Toml(_) => {
                "Fix the configuration file and restart"
            }
            Self::Io(_) | Self::Csv(_) => "Check that the input files exist and are readable",
            _ => "Check the request payload and try again",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_not_found_lists_available() {
        let err = AnalyticsError::ColumnNotFound {
            dataset: "A".to_string(),
            column: "invoice_id".to_string(),
            available: "CUFE, Date".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("invoice_id"));
        assert!(msg.contains("CUFE, Date"));
        assert!(msg.contains("dataset A"));
    }

    #[test]
    fn test_categories() {
        let err = AnalyticsError::InvalidMode {
            mode: "foo".to_string(),
            valid: "missing_in_a".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = AnalyticsError::ToolNotFound {
            name: "x".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::NotFound);

        let err = AnalyticsError::Config {
            message: "bad".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_every_failure_exits_non_zero() {
        let errors = [
            AnalyticsError::empty_dataset("A"),
            AnalyticsError::ToolNotFound {
                name: "x".to_string(),
            },
            AnalyticsError::Config {
                message: "bad".to_string(),
            },
            AnalyticsError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
        ];
        let codes: Vec<i32> = errors.iter().map(|e| e.severity().exit_code()).collect();
        assert_eq!(codes, vec![2, 2, 1, 3]);
    }
}
