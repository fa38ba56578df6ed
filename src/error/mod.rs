mod app;
mod config;
mod run;
mod transport;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use run::{RunError, StartPhase};
pub use transport::TransportError;
pub use validation::ValidationError;
