pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{LocalStorage, OneMapGeocoder};
pub use config::ReportConfig;
pub use core::{etl::EtlEngine, pipeline::BubbleMapPipeline};
pub use utils::error::{EtlError, Result};
