pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{LocalStorage, OpensslSigner};
pub use config::toml_config::ClientConfig;
pub use core::{wsaa::AccessTicket, wsaa::WsaaClient, wslpg::WslpgClient};
pub use utils::error::{Result, WslpgError};
