pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;

pub use config::{BusConfig, CoreConfig, FeedConfig, LoggingConfig};
pub use envelope::Envelope;
pub use error::{format_error_chain, CoreError, CoreResult};
