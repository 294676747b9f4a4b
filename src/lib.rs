pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

pub use config::{AppConfig, Cli};
pub use core::reconcile::{reconcile, ReconcileRequest, ReconciliationResult};
pub use core::registry::ToolRegistry;
pub use domain::model::{Dataset, Mode, Record, Scalar, Side};
pub use utils::error::{AnalyticsError, Result};
