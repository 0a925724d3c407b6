//! Integration tests for the checkout state machine

use testresult::TestResult;

use bookcart::prelude::*;

fn single_book_draft() -> OrderDraft {
    OrderDraft::new().with_line(BookId::new(1), Quantity::ONE)
}

#[test]
fn successful_order_and_charge_reach_payment_succeeded() -> TestResult {
    let mut checkout = Checkout::new();

    let submitted = checkout.begin_order(single_book_draft())?;

    assert_eq!(submitted.lines().len(), 1);

    checkout.order_created(OrderId::new(100))?;

    let order_id = checkout.begin_charge()?;

    assert_eq!(order_id, OrderId::new(100));

    checkout.charge_settled(PaymentId::from(7), &PaymentStatus::Completed, None);

    assert_eq!(
        checkout.state(),
        &CheckoutState::PaymentSucceeded {
            order_id: OrderId::new(100),
            payment_id: PaymentId::from(7),
        }
    );
    assert_eq!(
        checkout.begin_charge(),
        Err(CheckoutError::AlreadyPaid(OrderId::new(100)))
    );

    Ok(())
}

#[test]
fn declined_charge_keeps_order_and_retry_reuses_it() -> TestResult {
    let mut checkout = Checkout::new();

    checkout.begin_order(single_book_draft())?;
    checkout.order_created(OrderId::new(41))?;
    checkout.begin_charge()?;
    checkout.charge_failed(
        Some(PaymentId::from(3)),
        DeclineReason::InsufficientFunds.message(),
    );

    assert_eq!(checkout.state().order_id(), Some(OrderId::new(41)));
    assert_eq!(checkout.state().name(), "payment_failed");

    let retried = checkout.begin_charge()?;

    assert_eq!(retried, OrderId::new(41), "retry must reuse the order");
    assert_eq!(
        checkout.begin_order(single_book_draft()),
        Err(CheckoutError::OrderExists(OrderId::new(41)))
    );

    checkout.charge_settled(PaymentId::from(4), &PaymentStatus::Completed, None);

    assert_eq!(checkout.state().order_id(), Some(OrderId::new(41)));
    assert_eq!(checkout.state().payment_id(), Some(&PaymentId::from(4)));

    Ok(())
}

#[test]
fn failed_status_in_a_successful_reply_is_a_failed_payment() -> TestResult {
    let mut checkout = Checkout::new();

    checkout.begin_order(single_book_draft())?;
    checkout.order_created(OrderId::new(5))?;
    checkout.begin_charge()?;
    checkout.charge_settled(
        PaymentId::from(8),
        &PaymentStatus::Failed,
        Some("Payment declined by bank".to_string()),
    );

    assert_eq!(
        checkout.state(),
        &CheckoutState::PaymentFailed {
            order_id: OrderId::new(5),
            payment_id: Some(PaymentId::from(8)),
            reason: "Payment declined by bank".to_string(),
        }
    );

    Ok(())
}

#[test]
fn pending_charge_settles_on_a_later_status_read() -> TestResult {
    let mut checkout = Checkout::new();

    checkout.begin_order(single_book_draft())?;
    checkout.order_created(OrderId::new(12))?;
    checkout.begin_charge()?;
    checkout.charge_settled(PaymentId::from(30), &PaymentStatus::Pending, None);

    assert_eq!(
        checkout.begin_charge(),
        Err(CheckoutError::PaymentOutstanding(OrderId::new(12)))
    );

    checkout.status_observed(
        &PaymentId::from(30),
        &PaymentStatus::Failed,
        Some("Payment failed".to_string()),
    );

    assert_eq!(checkout.begin_charge()?, OrderId::new(12));

    Ok(())
}
