//! Backend API Config

use std::time::Duration;

use clap::Args;

use crate::api::DEFAULT_BASE_URL;

/// Backend connection settings.
#[derive(Debug, Clone, Args)]
pub struct ApiConfig {
    /// Base URL of the bookshop REST API
    #[arg(long, global = true, env = "BOOKCART_API_BASE", default_value = DEFAULT_BASE_URL)]
    pub api_base: String,

    /// Request timeout in seconds
    #[arg(
        long,
        global = true,
        env = "BOOKCART_TIMEOUT_SECONDS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_seconds: u64,
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
