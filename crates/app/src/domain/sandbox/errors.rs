//! Sandbox service errors.

use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum SandboxServiceError {
    #[error("unknown webhook event {0:?}")]
    UnknownEvent(String),

    #[error("{0}")]
    Api(#[from] ApiError),
}
