pub mod chart;
pub mod forecast;
pub mod frame;
pub mod reconcile;
pub mod registry;
pub mod stats;
pub mod transform;

pub use crate::domain::model::{Dataset, Mode, Record, Scalar, Side};
pub use crate::domain::ports::Tool;
pub use crate::utils::error::Result;
pub use reconcile::{reconcile, ReconcileRequest, ReconciliationResult};
pub use registry::ToolRegistry;
