//! Cart
//!
//! The cart is owned by the server. A client only ever holds a read-through copy of the last
//! payload it fetched; nothing here recomputes totals into that copy. [`Cart::verify_totals`]
//! exists to check what the server sent, not to replace it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::books::BookId;

/// Quantity of a single cart line. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

/// Quantity validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// Zero is not a quantity; removal has its own operation.
    #[error("quantity must be at least 1")]
    Zero,
}

impl Quantity {
    /// A single copy.
    pub const ONE: Self = Self(1);

    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] for `0`.
    pub const fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 {
            return Err(QuantityError::Zero);
        }

        Ok(Self(value))
    }

    /// Raw quantity.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = u32::deserialize(deserializer)?;

        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// A single line of the server-held cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Book on this line
    pub book_id: BookId,

    /// Book title at the time of fetch
    pub title: String,

    /// Unit price
    pub price: Decimal,

    /// Copies on the line
    pub quantity: u32,

    /// Line total as the server computed it
    pub subtotal: Decimal,
}

/// Server-held cart as last fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart lines, one per book
    #[serde(default)]
    pub items: Vec<CartItem>,

    /// Copies across all lines
    #[serde(default)]
    pub total_items: u32,

    /// Sum of line subtotals
    #[serde(default)]
    pub total_amount: Decimal,
}

/// A server payload that breaks the cart totals invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartTotalsError {
    /// `total_items` disagrees with the lines
    #[error("total_items is {reported} but line quantities sum to {expected}")]
    TotalItems {
        /// Value the server sent
        reported: u32,
        /// Sum of line quantities
        expected: u32,
    },

    /// `total_amount` disagrees with the lines
    #[error("total_amount is {reported} but line subtotals sum to {expected}")]
    TotalAmount {
        /// Value the server sent
        reported: Decimal,
        /// Sum of line subtotals
        expected: Decimal,
    },

    /// A line subtotal is not price times quantity
    #[error("line for book {book_id} has subtotal {reported}, expected {expected}")]
    Subtotal {
        /// Offending line
        book_id: BookId,
        /// Subtotal the server sent
        reported: Decimal,
        /// Price times quantity
        expected: Decimal,
    },

    /// A line holds no copies
    #[error("line for book {0} has a zero quantity")]
    ZeroQuantity(BookId),

    /// Two lines for one book
    #[error("book {0} appears on more than one line")]
    DuplicateLine(BookId),
}

impl Cart {
    /// The cart a client starts with before its first successful fetch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Line for the given book, if present.
    pub fn item(&self, book_id: BookId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.book_id == book_id)
    }

    /// Quantity of the given book in the cart, zero when absent.
    pub fn quantity_of(&self, book_id: BookId) -> u32 {
        self.item(book_id).map_or(0, |item| item.quantity)
    }

    /// Check the totals the server reported against its own lines.
    ///
    /// # Errors
    ///
    /// Returns the first mismatch found.
    pub fn verify_totals(&self) -> Result<(), CartTotalsError> {
        let mut expected_items = 0_u32;
        let mut expected_amount = Decimal::ZERO;

        for (index, item) in self.items.iter().enumerate() {
            if item.quantity == 0 {
                return Err(CartTotalsError::ZeroQuantity(item.book_id));
            }

            if self
                .items
                .iter()
                .skip(index + 1)
                .any(|other| other.book_id == item.book_id)
            {
                return Err(CartTotalsError::DuplicateLine(item.book_id));
            }

            let line_total = item.price * Decimal::from(item.quantity);

            if line_total != item.subtotal {
                return Err(CartTotalsError::Subtotal {
                    book_id: item.book_id,
                    reported: item.subtotal,
                    expected: line_total,
                });
            }

            expected_items = expected_items.saturating_add(item.quantity);
            expected_amount += item.subtotal;
        }

        if expected_items != self.total_items {
            return Err(CartTotalsError::TotalItems {
                reported: self.total_items,
                expected: expected_items,
            });
        }

        if expected_amount != self.total_amount {
            return Err(CartTotalsError::TotalAmount {
                reported: self.total_amount,
                expected: expected_amount,
            });
        }

        Ok(())
    }
}
