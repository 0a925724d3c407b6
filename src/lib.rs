//! Bookcart
//!
//! Client-side model of a bookshop cart and checkout: the server-held cart and its totals invariant,
//! order drafts, payment details and the checkout state machine that sequences order creation,
//! payment charge and status reads.

pub mod books;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod payments;
pub mod test_cards;

pub mod prelude;
