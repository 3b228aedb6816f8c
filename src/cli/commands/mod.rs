//! CLI command implementations.

mod config;
mod doctor;
mod models;
mod replicate;

pub use config::run_config;
pub use doctor::run_doctor;
pub use models::run_models;
pub use replicate::run_replicate;
