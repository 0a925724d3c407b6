//! Orders service errors.

use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    #[error("order not found")]
    NotFound,

    /// The backend refused, e.g. cancelling a shipped order.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Api(#[source] ApiError),
}

impl From<ApiError> for OrdersServiceError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Rejected { status: 404, .. } => Self::NotFound,
            ApiError::Rejected { message, .. } => Self::Rejected(message),
            other => Self::Api(other),
        }
    }
}
