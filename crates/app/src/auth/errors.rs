//! Auth service errors.

use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("email and password are required")]
    MissingCredentials,

    #[error("{0}")]
    Api(#[from] ApiError),
}
