//! Checkout service errors.

use bookcart::prelude::{CheckoutError, PaymentDetailsError};
use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum CheckoutServiceError {
    /// The step is not allowed from the current checkout state.
    #[error(transparent)]
    State(#[from] CheckoutError),

    /// Payment details failed validation and were not sent.
    #[error("invalid payment details: {0}")]
    InvalidPayment(#[from] PaymentDetailsError),

    /// Step 1 failed; the draft is retained.
    #[error("order could not be created: {0}")]
    Order(#[source] ApiError),

    /// Step 2 failed; the order is kept for another attempt.
    #[error("payment failed: {reason}")]
    Charge {
        reason: String,
        #[source]
        source: ApiError,
    },

    #[error("no payment has been attempted")]
    NoPayment,

    #[error("payment status unavailable: {0}")]
    Status(#[source] ApiError),
}
