//! Client configuration module

use clap::Args;

pub mod api;
pub mod logging;
pub mod offline;
pub mod session;

pub use api::ApiConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use offline::OfflineConfig;
pub use session::SessionConfig;

/// Bookcart client configuration, flattened into the CLI as global flags.
#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    /// Backend connection settings.
    #[command(flatten)]
    pub api: ApiConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Remembered credential settings.
    #[command(flatten)]
    pub session: SessionConfig,

    /// Offline sandbox settings.
    #[command(flatten)]
    pub offline: OfflineConfig,
}
