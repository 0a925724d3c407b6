//! Bookcart prelude

pub use crate::{
    books::{Book, BookId},
    cart::{Cart, CartItem, CartTotalsError, Quantity, QuantityError},
    checkout::{Checkout, CheckoutError, CheckoutState},
    orders::{DraftLine, OrderDraft, OrderId},
    payments::{
        CardDetails, PaymentDetails, PaymentDetailsError, PaymentId, PaymentMethod,
        PaymentOutcome, PaymentStatus,
    },
    test_cards::{CardBehaviour, DeclineReason, TestCard},
};
