//! Checkout
//!
//! Client-visible checkout state machine:
//!
//! ```text
//! NoOrder -> OrderCreated -> PaymentPending -> PaymentSucceeded
//!                                  ^       \-> PaymentFailed
//!                                  \______________/  (retry the charge, same order)
//! ```
//!
//! Once the backend assigns an order id it never changes until [`Checkout::reset`]. A failed
//! payment is retried against the same order; there is no way back to order creation short of
//! a reset, and a reset never rolls the created order back.

use thiserror::Error;

use crate::{
    orders::{OrderDraft, OrderId},
    payments::{PaymentId, PaymentOutcome, PaymentStatus},
};

/// Checkout states.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    /// Nothing submitted yet.
    #[default]
    NoOrder,

    /// Step 1 done; no charge attempted.
    OrderCreated {
        /// Order assigned by the backend.
        order_id: OrderId,
    },

    /// A charge is in flight (`payment_id` is `None`) or settled as pending.
    PaymentPending {
        /// Order being paid.
        order_id: OrderId,
        /// Payment the backend reported, once known.
        payment_id: Option<PaymentId>,
    },

    /// The order is paid. Terminal until a reset.
    PaymentSucceeded {
        /// Paid order.
        order_id: OrderId,
        /// Payment that settled it.
        payment_id: PaymentId,
    },

    /// The last charge was refused; it may be retried against the same order.
    PaymentFailed {
        /// Order still awaiting payment.
        order_id: OrderId,
        /// Refused payment, when the backend named one.
        payment_id: Option<PaymentId>,
        /// Refusal reason as the backend gave it.
        reason: String,
    },
}

impl CheckoutState {
    /// Order the checkout is bound to, if one was created.
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            Self::NoOrder => None,
            Self::OrderCreated { order_id }
            | Self::PaymentPending { order_id, .. }
            | Self::PaymentSucceeded { order_id, .. }
            | Self::PaymentFailed { order_id, .. } => Some(*order_id),
        }
    }

    /// Payment the checkout last learned about.
    pub fn payment_id(&self) -> Option<&PaymentId> {
        match self {
            Self::NoOrder | Self::OrderCreated { .. } => None,
            Self::PaymentPending { payment_id, .. } | Self::PaymentFailed { payment_id, .. } => {
                payment_id.as_ref()
            }
            Self::PaymentSucceeded { payment_id, .. } => Some(payment_id),
        }
    }

    /// Short state name for logs and display.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NoOrder => "no_order",
            Self::OrderCreated { .. } => "order_created",
            Self::PaymentPending { .. } => "payment_pending",
            Self::PaymentSucceeded { .. } => "payment_succeeded",
            Self::PaymentFailed { .. } => "payment_failed",
        }
    }
}

/// Rejected checkout transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Draft has no lines
    #[error("order draft has no lines")]
    EmptyDraft,

    /// An order is already bound to this checkout
    #[error("order {0} already exists; reset the checkout to start another")]
    OrderExists(OrderId),

    /// An order creation has not replied yet
    #[error("an order creation is already in flight")]
    OrderInFlight,

    /// Charge attempted before step 1
    #[error("no order has been created")]
    NoOrder,

    /// A charge for this order has not settled
    #[error("order {0} already has an outstanding payment")]
    PaymentOutstanding(OrderId),

    /// The order is paid
    #[error("order {0} is already paid")]
    AlreadyPaid(OrderId),

    /// Nothing retained to resubmit
    #[error("no order draft to resubmit")]
    NoDraft,
}

/// Checkout session: the retained draft plus the current state.
#[derive(Debug, Clone, Default)]
pub struct Checkout {
    draft: Option<OrderDraft>,
    submitting: bool,
    state: CheckoutState,
}

impl Checkout {
    /// Fresh checkout in `NoOrder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Draft retained for resubmission or display.
    pub const fn draft(&self) -> Option<&OrderDraft> {
        self.draft.as_ref()
    }

    /// Start step 1 with a new draft. The draft is retained whatever the outcome.
    ///
    /// # Errors
    ///
    /// Fails for an empty draft, when an order already exists, or when a submission is in flight.
    pub fn begin_order(&mut self, draft: OrderDraft) -> Result<OrderDraft, CheckoutError> {
        self.ensure_can_order()?;

        if draft.is_empty() {
            return Err(CheckoutError::EmptyDraft);
        }

        self.draft = Some(draft.clone());
        self.submitting = true;

        Ok(draft)
    }

    /// Restart step 1 with the retained draft after a failed submission.
    ///
    /// # Errors
    ///
    /// Fails when there is no retained draft, or for the same reasons as [`Checkout::begin_order`].
    pub fn resubmit_order(&mut self) -> Result<OrderDraft, CheckoutError> {
        self.ensure_can_order()?;

        let draft = self.draft.clone().ok_or(CheckoutError::NoDraft)?;

        self.submitting = true;

        Ok(draft)
    }

    /// Step 1 succeeded.
    ///
    /// # Errors
    ///
    /// Fails if an order already exists; the existing order id is kept.
    pub fn order_created(&mut self, order_id: OrderId) -> Result<(), CheckoutError> {
        self.submitting = false;

        if let Some(existing) = self.state.order_id() {
            return Err(CheckoutError::OrderExists(existing));
        }

        self.state = CheckoutState::OrderCreated { order_id };

        Ok(())
    }

    /// Pick up an order created earlier, e.g. by a previous run, so step 2 can be retried
    /// against it without a draft.
    ///
    /// # Errors
    ///
    /// Fails when an order already exists or a submission is in flight.
    pub fn resume_order(&mut self, order_id: OrderId) -> Result<(), CheckoutError> {
        self.ensure_can_order()?;

        self.state = CheckoutState::OrderCreated { order_id };

        Ok(())
    }

    /// Step 1 failed. The state stays at `NoOrder` and the draft is retained.
    pub fn order_failed(&mut self) {
        self.submitting = false;
    }

    /// Start step 2 and return the order to charge.
    ///
    /// # Errors
    ///
    /// Fails without an order, while a payment is outstanding, or once the order is paid.
    pub fn begin_charge(&mut self) -> Result<OrderId, CheckoutError> {
        let order_id = match &self.state {
            CheckoutState::NoOrder => return Err(CheckoutError::NoOrder),
            CheckoutState::PaymentPending { order_id, .. } => {
                return Err(CheckoutError::PaymentOutstanding(*order_id));
            }
            CheckoutState::PaymentSucceeded { order_id, .. } => {
                return Err(CheckoutError::AlreadyPaid(*order_id));
            }
            CheckoutState::OrderCreated { order_id }
            | CheckoutState::PaymentFailed { order_id, .. } => *order_id,
        };

        self.state = CheckoutState::PaymentPending {
            order_id,
            payment_id: None,
        };

        Ok(order_id)
    }

    /// Step 2 got a reply from the backend.
    pub fn charge_settled(
        &mut self,
        payment_id: PaymentId,
        status: &PaymentStatus,
        message: Option<String>,
    ) {
        let Some(order_id) = self.state.order_id() else {
            return;
        };

        self.state = match status.outcome() {
            PaymentOutcome::Pending => CheckoutState::PaymentPending {
                order_id,
                payment_id: Some(payment_id),
            },
            PaymentOutcome::Succeeded => CheckoutState::PaymentSucceeded {
                order_id,
                payment_id,
            },
            PaymentOutcome::Failed => CheckoutState::PaymentFailed {
                order_id,
                payment_id: Some(payment_id),
                reason: message.unwrap_or_else(|| format!("payment {status}")),
            },
        };
    }

    /// Step 2 failed outright. The order id is kept so the charge can be retried.
    pub fn charge_failed(&mut self, payment_id: Option<PaymentId>, reason: impl Into<String>) {
        let Some(order_id) = self.state.order_id() else {
            return;
        };

        self.state = CheckoutState::PaymentFailed {
            order_id,
            payment_id,
            reason: reason.into(),
        };
    }

    /// Apply a point-in-time status read (step 3).
    ///
    /// Reads for any payment other than the current one are ignored, as is every read once the
    /// order is paid. A failed read does not overwrite the reason a refusal already recorded.
    /// Returns whether the state changed.
    pub fn status_observed(
        &mut self,
        payment_id: &PaymentId,
        status: &PaymentStatus,
        message: Option<String>,
    ) -> bool {
        if self.state.payment_id() != Some(payment_id) {
            return false;
        }

        match (&self.state, status.outcome()) {
            (CheckoutState::PaymentSucceeded { .. }, _)
            | (CheckoutState::PaymentFailed { .. }, PaymentOutcome::Failed) => return false,
            _ => {}
        }

        let before = self.state.clone();

        self.charge_settled(payment_id.clone(), status, message);

        before != self.state
    }

    /// Drop the draft and return to `NoOrder`.
    ///
    /// # Errors
    ///
    /// Fails while an order creation is in flight, since its reply would bind an order the
    /// checkout no longer expects.
    pub fn reset(&mut self) -> Result<(), CheckoutError> {
        if self.submitting {
            return Err(CheckoutError::OrderInFlight);
        }

        *self = Self::default();

        Ok(())
    }

    fn ensure_can_order(&self) -> Result<(), CheckoutError> {
        if let Some(order_id) = self.state.order_id() {
            return Err(CheckoutError::OrderExists(order_id));
        }

        if self.submitting {
            return Err(CheckoutError::OrderInFlight);
        }

        Ok(())
    }
}
