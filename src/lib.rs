pub mod config;
pub mod data_url;
pub mod dispatcher;
pub mod error;
pub mod logger;
pub mod models;
pub mod normalizer;
pub mod prompt;
pub mod providers;
pub mod response;
pub mod server;

pub use config::{Config, OpenAiConfig, StabilityConfig};
pub use dispatcher::Dispatcher;
pub use error::{ErrorKind, RedesignError, Result};
pub use models::*;
pub use providers::{ImageProvider, OpenAiProvider, StabilityProvider};
pub use response::ResponseEncoder;
pub use server::AppState;
