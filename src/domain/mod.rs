// Domain layer: record model and ports. No transport or storage concerns here.

pub mod model;
pub mod ports;
