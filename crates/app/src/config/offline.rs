//! Offline Sandbox Config

use std::path::PathBuf;

use clap::Args;

/// Offline sandbox settings.
#[derive(Debug, Clone, Args)]
pub struct OfflineConfig {
    /// Answer every call from the in-memory sandbox instead of the backend
    #[arg(long, global = true, env = "BOOKCART_OFFLINE")]
    pub offline: bool,

    /// YAML catalog to seed the offline sandbox with
    #[arg(long = "offline-fixture", global = true, env = "BOOKCART_OFFLINE_FIXTURE")]
    pub fixture: Option<PathBuf>,
}
