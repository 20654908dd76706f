pub mod config;
pub mod error;
pub mod event_bus;
pub mod loyalty;
pub mod recommendation;

pub use config::AppConfig;
pub use error::{VoyageError, VoyageResult};
