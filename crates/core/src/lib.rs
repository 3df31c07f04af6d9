pub mod config;
pub mod error;
pub mod sources;
pub mod types;

pub use config::parse_site_toml;
pub use error::{CycleError, Error, FetchError, Result};
pub use sources::Sources;
pub use types::*;
