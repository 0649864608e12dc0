pub mod compare_service;
pub mod engine_config;

pub use compare_service::{CompareRequest, CompareRun, CompareService};
pub use engine_config::{EngineConfig, EngineConfigError};
