//! Carts service errors.

use bookcart::prelude::QuantityError;
use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum CartsServiceError {
    /// Rejected before anything was sent.
    #[error("invalid quantity")]
    InvalidQuantity(#[from] QuantityError),

    /// The backend refused or could not be reached. The cache is untouched.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// The change was accepted but the refetch failed, so the cache is stale.
    #[error("cart updated but could not be refreshed: {0}")]
    Resync(#[source] ApiError),
}
