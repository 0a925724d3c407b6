//! Catalog service errors.

use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum CatalogServiceError {
    #[error("book not found")]
    NotFound,

    #[error("{0}")]
    Api(#[source] ApiError),
}

impl From<ApiError> for CatalogServiceError {
    fn from(error: ApiError) -> Self {
        if error.status() == Some(404) {
            return Self::NotFound;
        }

        Self::Api(error)
    }
}
