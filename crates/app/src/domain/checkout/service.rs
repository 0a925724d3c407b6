//! Checkout sequencer: order creation, then payment, then on-demand status reads.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bookcart::prelude::*;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    api::{ApiError, ChargeReceipt, ChargeRequest, OrderReceipt, PaymentStatusReport, ShopApi},
    domain::checkout::errors::CheckoutServiceError,
};

pub struct CheckoutSequencer {
    api: Arc<dyn ShopApi>,
    checkout: Mutex<Checkout>,
}

impl CheckoutSequencer {
    #[must_use]
    pub fn new(api: Arc<dyn ShopApi>) -> Self {
        Self {
            api,
            checkout: Mutex::new(Checkout::new()),
        }
    }

    /// Step 1: submit a draft. On failure the draft is retained and no payment is attempted.
    pub async fn create_order(
        &self,
        draft: OrderDraft,
    ) -> Result<OrderReceipt, CheckoutServiceError> {
        let draft = self.lock().begin_order(draft)?;

        self.submit(draft).await
    }

    /// Resubmit the draft retained from a failed step 1.
    pub async fn retry_order(&self) -> Result<OrderReceipt, CheckoutServiceError> {
        let draft = self.lock().resubmit_order()?;

        self.submit(draft).await
    }

    /// Attach an order created earlier so step 2 can be retried against it.
    pub fn resume_order(&self, order_id: OrderId) -> Result<(), CheckoutServiceError> {
        self.lock().resume_order(order_id)?;

        Ok(())
    }

    /// Step 2: charge the current order.
    ///
    /// Invalid details are refused before anything is sent. A refusal keeps the order id so the
    /// charge can be retried against the same order.
    pub async fn charge(
        &self,
        payment: PaymentDetails,
    ) -> Result<ChargeReceipt, CheckoutServiceError> {
        payment.validate()?;

        let order_id = self.lock().begin_charge()?;

        debug!(%order_id, method = %payment.method, "charging order");

        match self.api.charge(ChargeRequest::new(order_id, payment)).await {
            Ok(receipt) => {
                let mut checkout = self.lock();

                if receipt.success == Some(false) && receipt.status.outcome() != PaymentOutcome::Failed
                {
                    checkout.charge_failed(
                        Some(receipt.payment_id.clone()),
                        receipt
                            .message
                            .clone()
                            .unwrap_or_else(|| "payment refused".to_string()),
                    );
                } else {
                    checkout.charge_settled(
                        receipt.payment_id.clone(),
                        &receipt.status,
                        receipt.message.clone(),
                    );
                }

                info!(
                    %order_id,
                    payment_id = %receipt.payment_id,
                    status = %receipt.status,
                    state = checkout.state().name(),
                    "charge settled"
                );

                Ok(receipt)
            }
            Err(source) => {
                let reason = source.user_message();
                let payment_id = source.body().and_then(payment_id_in);

                warn!(%order_id, "charge failed: {reason}");

                self.lock().charge_failed(payment_id, reason.clone());

                Err(CheckoutServiceError::Charge { reason, source })
            }
        }
    }

    /// Steps 1 and 2 together. Step 1 is skipped when an order already exists, so a retry never
    /// creates a second order.
    pub async fn checkout(
        &self,
        draft: OrderDraft,
        payment: PaymentDetails,
    ) -> Result<ChargeReceipt, CheckoutServiceError> {
        payment.validate()?;

        if let Some(order_id) = self.order_id() {
            debug!(%order_id, "order exists, retrying payment only");
        } else {
            self.create_order(draft).await?;
        }

        self.charge(payment).await
    }

    /// Step 3 for the current payment.
    pub async fn refresh_status(&self) -> Result<PaymentStatusReport, CheckoutServiceError> {
        let payment_id = self
            .lock()
            .state()
            .payment_id()
            .cloned()
            .ok_or(CheckoutServiceError::NoPayment)?;

        self.payment_status(payment_id).await
    }

    /// Step 3: a single point-in-time read. It is applied to the checkout only when it names
    /// the current payment.
    pub async fn payment_status(
        &self,
        payment_id: PaymentId,
    ) -> Result<PaymentStatusReport, CheckoutServiceError> {
        let report = self
            .api
            .payment_status(payment_id.clone())
            .await
            .map_err(CheckoutServiceError::Status)?;

        let changed =
            self.lock()
                .status_observed(&payment_id, &report.status, report.message.clone());

        debug!(%payment_id, status = %report.status, changed, "payment status read");

        Ok(report)
    }

    pub fn state(&self) -> CheckoutState {
        self.lock().state().clone()
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.lock().state().order_id()
    }

    /// Forget the checkout. Any created order stays on the server.
    ///
    /// Refused while an order creation is in flight.
    pub fn reset(&self) -> Result<(), CheckoutServiceError> {
        self.lock().reset()?;

        Ok(())
    }

    async fn submit(&self, draft: OrderDraft) -> Result<OrderReceipt, CheckoutServiceError> {
        match self.api.create_order(draft).await {
            Ok(receipt) => {
                if let Err(error) = self.lock().order_created(receipt.order_id) {
                    warn!(
                        orphaned_order_id = %receipt.order_id,
                        "order created but checkout already holds another: {error}"
                    );

                    return Err(error.into());
                }

                info!(order_id = %receipt.order_id, total = %receipt.total_amount, "order created");

                Ok(receipt)
            }
            Err(error) => {
                warn!("order creation failed: {error}");

                self.lock().order_failed();

                Err(CheckoutServiceError::Order(error))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Checkout> {
        self.checkout.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CheckoutSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutSequencer")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Payment id carried by a decline payload, if any.
fn payment_id_in(body: &Value) -> Option<PaymentId> {
    body.get("payment_id")
        .filter(|value| !value.is_null())
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;
    use testresult::TestResult;

    use crate::{api::MockShopApi, domain::sandbox::SandboxService, test::TestContext};

    use super::*;

    fn draft() -> OrderDraft {
        OrderDraft::new().with_line(BookId::new(1), Quantity::ONE)
    }

    fn receipt(order: u64) -> OrderReceipt {
        OrderReceipt {
            order_id: OrderId::new(order),
            customer_id: Some(1),
            order_date: None,
            total_amount: Decimal::new(1999, 2),
            status: "pending".to_string(),
            items: Vec::new(),
        }
    }

    fn charged(payment: u64, order: u64, status: &str) -> ChargeReceipt {
        ChargeReceipt {
            payment_id: PaymentId::from(payment),
            order_id: Some(OrderId::new(order)),
            amount: Some(Decimal::new(1999, 2)),
            payment_method: Some("credit_card".to_string()),
            status: PaymentStatus::from(status),
            transaction_id: None,
            payment_date: None,
            message: None,
            sandbox_mode: Some(true),
            success: None,
        }
    }

    fn card(number: &str) -> PaymentDetails {
        PaymentDetails::card(
            PaymentMethod::CreditCard,
            CardDetails {
                number: number.to_string(),
                holder: "A Reader".to_string(),
                expiry: "12/30".to_string(),
                cvv: "123".to_string(),
            },
        )
    }

    fn declined(payment: u64) -> ApiError {
        ApiError::Rejected {
            status: 402,
            message: DeclineReason::InsufficientFunds.message().to_string(),
            body: json!({
                "error": DeclineReason::InsufficientFunds.message(),
                "decline_code": "insufficient_funds",
                "payment_id": payment,
                "status": "failed"
            }),
        }
    }

    #[tokio::test]
    async fn successful_order_and_charge_end_in_success() -> TestResult {
        let mut api = MockShopApi::new();

        api.expect_create_order()
            .withf(|draft| draft.total_quantity() == 1)
            .once()
            .returning(|_| Ok(receipt(5)));
        api.expect_charge()
            .withf(|request| request.order_id == OrderId::new(5))
            .once()
            .returning(|_| Ok(charged(8, 5, "completed")));
        api.expect_payment_status()
            .once()
            .returning(|_| {
                Ok(PaymentStatusReport {
                    payment_id: PaymentId::from(8),
                    status: PaymentStatus::Completed,
                    transaction_id: Some("TXN_1".to_string()),
                    payment_date: None,
                    message: None,
                })
            });

        let sequencer = CheckoutSequencer::new(Arc::new(api));

        sequencer
            .checkout(draft(), card(TestCard::SUCCESS_VISA.number))
            .await?;

        assert_eq!(
            sequencer.state(),
            CheckoutState::PaymentSucceeded {
                order_id: OrderId::new(5),
                payment_id: PaymentId::from(8),
            }
        );

        let report = sequencer.refresh_status().await?;

        assert_eq!(report.status.outcome(), PaymentOutcome::Succeeded);
        assert!(
            matches!(sequencer.state(), CheckoutState::PaymentSucceeded { .. }),
            "status read should agree"
        );

        Ok(())
    }

    #[tokio::test]
    async fn decline_keeps_the_order_and_retry_reuses_it() -> TestResult {
        let mut api = MockShopApi::new();
        let mut attempts = 0;

        api.expect_create_order().once().returning(|_| Ok(receipt(5)));
        api.expect_charge()
            .withf(|request| request.order_id == OrderId::new(5))
            .times(2)
            .returning(move |_| {
                attempts += 1;

                if attempts == 1 {
                    Err(declined(7))
                } else {
                    Ok(charged(8, 5, "completed"))
                }
            });

        let sequencer = CheckoutSequencer::new(Arc::new(api));

        let first = sequencer
            .checkout(draft(), card(TestCard::DECLINE_INSUFFICIENT.number))
            .await;

        assert!(
            matches!(first, Err(CheckoutServiceError::Charge { ref reason, .. }) if reason == DeclineReason::InsufficientFunds.message()),
            "got {first:?}"
        );
        assert_eq!(
            sequencer.state(),
            CheckoutState::PaymentFailed {
                order_id: OrderId::new(5),
                payment_id: Some(PaymentId::from(7)),
                reason: DeclineReason::InsufficientFunds.message().to_string(),
            }
        );

        sequencer
            .checkout(draft(), card(TestCard::SUCCESS_VISA.number))
            .await?;

        assert_eq!(sequencer.order_id(), Some(OrderId::new(5)));
        assert!(
            matches!(sequencer.state(), CheckoutState::PaymentSucceeded { .. }),
            "retry should succeed"
        );

        Ok(())
    }

    #[tokio::test]
    async fn failed_order_creation_aborts_before_payment() -> TestResult {
        let mut api = MockShopApi::new();
        let mut attempts = 0;

        api.expect_create_order().times(2).returning(move |_| {
            attempts += 1;

            if attempts == 1 {
                Err(ApiError::Rejected {
                    status: 400,
                    message: "Not enough stock for Dune. Available: 0".to_string(),
                    body: json!({ "error": "Not enough stock for Dune. Available: 0" }),
                })
            } else {
                Ok(receipt(6))
            }
        });
        api.expect_charge().never();

        let sequencer = CheckoutSequencer::new(Arc::new(api));
        let result = sequencer
            .checkout(draft(), card(TestCard::SUCCESS_VISA.number))
            .await;

        assert!(
            matches!(result, Err(CheckoutServiceError::Order(_))),
            "got {result:?}"
        );
        assert_eq!(sequencer.state(), CheckoutState::NoOrder);

        let receipt = sequencer.retry_order().await?;

        assert_eq!(receipt.order_id, OrderId::new(6));
        assert_eq!(
            sequencer.state(),
            CheckoutState::OrderCreated {
                order_id: OrderId::new(6)
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn invalid_payment_details_are_never_sent() -> TestResult {
        let mut api = MockShopApi::new();

        api.expect_create_order().once().returning(|_| Ok(receipt(5)));
        api.expect_charge().never();

        let sequencer = CheckoutSequencer::new(Arc::new(api));

        sequencer.create_order(draft()).await?;

        let result = sequencer
            .charge(PaymentDetails::without_card(PaymentMethod::CreditCard))
            .await;

        assert!(
            matches!(result, Err(CheckoutServiceError::InvalidPayment(_))),
            "got {result:?}"
        );
        assert_eq!(
            sequencer.state(),
            CheckoutState::OrderCreated {
                order_id: OrderId::new(5)
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn refused_two_hundred_reply_is_a_failed_payment() -> TestResult {
        let mut api = MockShopApi::new();

        api.expect_create_order().once().returning(|_| Ok(receipt(5)));
        api.expect_charge().once().returning(|_| {
            let mut receipt = charged(8, 5, "failed");
            receipt.message = Some("Payment declined by bank".to_string());
            Ok(receipt)
        });

        let sequencer = CheckoutSequencer::new(Arc::new(api));

        sequencer.create_order(draft()).await?;

        let receipt = sequencer
            .charge(PaymentDetails::without_card(PaymentMethod::BankTransfer))
            .await?;

        assert!(receipt.is_refused(), "receipt should read as refused");
        assert_eq!(
            sequencer.state(),
            CheckoutState::PaymentFailed {
                order_id: OrderId::new(5),
                payment_id: Some(PaymentId::from(8)),
                reason: "Payment declined by bank".to_string(),
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn status_reads_after_payment_never_reopen_the_charge() -> TestResult {
        let mut api = MockShopApi::new();

        api.expect_create_order().once().returning(|_| Ok(receipt(5)));
        api.expect_charge()
            .once()
            .returning(|_| Ok(charged(8, 5, "completed")));
        api.expect_payment_status().once().returning(|_| {
            Ok(PaymentStatusReport {
                payment_id: PaymentId::from(8),
                status: PaymentStatus::Refunded,
                transaction_id: None,
                payment_date: None,
                message: Some("Payment processed successfully".to_string()),
            })
        });

        let sequencer = CheckoutSequencer::new(Arc::new(api));

        sequencer
            .checkout(draft(), card(TestCard::SUCCESS_VISA.number))
            .await?;

        let report = sequencer.refresh_status().await?;

        assert_eq!(report.status, PaymentStatus::Refunded);
        assert_eq!(
            sequencer.state(),
            CheckoutState::PaymentSucceeded {
                order_id: OrderId::new(5),
                payment_id: PaymentId::from(8),
            }
        );

        let again = sequencer.charge(card(TestCard::SUCCESS_VISA.number)).await;

        assert!(
            matches!(
                again,
                Err(CheckoutServiceError::State(CheckoutError::AlreadyPaid(order))) if order == OrderId::new(5)
            ),
            "got {again:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn offline_refund_does_not_allow_a_second_charge() -> TestResult {
        let ctx = TestContext::signed_in().await?;
        let draft = OrderDraft::new().with_line(ctx.first_book(), Quantity::ONE);

        let receipt = ctx
            .checkout
            .checkout(draft, card(TestCard::SUCCESS_VISA.number))
            .await?;

        ctx.sandbox
            .simulate_webhook(
                receipt.payment_id.clone(),
                "charge.dispute.funds_withdrawn".to_string(),
            )
            .await?;

        let report = ctx.checkout.refresh_status().await?;

        assert_eq!(report.status, PaymentStatus::Refunded);
        assert!(
            matches!(ctx.checkout.state(), CheckoutState::PaymentSucceeded { .. }),
            "got {:?}",
            ctx.checkout.state()
        );

        let again = ctx
            .checkout
            .charge(card(TestCard::SUCCESS_VISA.number))
            .await;

        assert!(
            matches!(again, Err(CheckoutServiceError::State(CheckoutError::AlreadyPaid(_)))),
            "got {again:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn reset_waits_for_an_in_flight_order() -> TestResult {
        let mut api = MockShopApi::new();

        api.expect_create_order().once().returning(|_| Ok(receipt(5)));

        let sequencer = CheckoutSequencer::new(Arc::new(api));

        sequencer.lock().begin_order(draft())?;

        let refused = sequencer.reset();

        assert!(
            matches!(
                refused,
                Err(CheckoutServiceError::State(CheckoutError::OrderInFlight))
            ),
            "got {refused:?}"
        );

        sequencer.lock().order_failed();
        sequencer.reset()?;
        sequencer.create_order(draft()).await?;

        assert_eq!(sequencer.order_id(), Some(OrderId::new(5)));

        Ok(())
    }

    #[tokio::test]
    async fn refresh_without_payment_is_refused() {
        let sequencer = CheckoutSequencer::new(Arc::new(MockShopApi::new()));
        let result = sequencer.refresh_status().await;

        assert!(
            matches!(result, Err(CheckoutServiceError::NoPayment)),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn offline_sandbox_runs_the_whole_pipeline() -> TestResult {
        let ctx = TestContext::signed_in().await?;
        let book = ctx.first_book();
        let draft = OrderDraft::new().with_line(book, Quantity::ONE);

        let declined = ctx
            .checkout
            .checkout(draft.clone(), card(TestCard::DECLINE_EXPIRED.number))
            .await;

        assert!(
            matches!(declined, Err(CheckoutServiceError::Charge { .. })),
            "got {declined:?}"
        );

        let order_id = ctx.checkout.order_id();

        assert!(order_id.is_some(), "order should survive the decline");

        let receipt = ctx
            .checkout
            .checkout(draft, card(TestCard::SUCCESS_MASTERCARD.number))
            .await?;

        assert_eq!(receipt.order_id, order_id);
        assert_eq!(ctx.api.list_orders().await?.len(), 1);

        let report = ctx.checkout.refresh_status().await?;

        assert_eq!(report.payment_id, receipt.payment_id);
        assert_eq!(report.status, PaymentStatus::Completed);

        Ok(())
    }
}
