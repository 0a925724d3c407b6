//! Session Config

use std::path::PathBuf;

use clap::Args;

/// Where the signed-in credential and backend session cookie are remembered.
#[derive(Debug, Clone, Args)]
pub struct SessionConfig {
    /// Credentials file
    #[arg(
        long,
        global = true,
        env = "BOOKCART_CREDENTIALS",
        default_value = ".bookcart/credentials.json"
    )]
    pub credentials: PathBuf,
}
