pub mod config;
pub mod core;
pub mod dashboard;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::{storage::LocalStorage, toml_config::WardstatsConfig};
pub use core::{etl::EtlEngine, pipeline::VirtualWardPipeline};
pub use utils::error::{EtlError, Result};
