//! Orders

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    books::BookId,
    cart::{Cart, Quantity},
};

/// Order identifier assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(u64);

impl OrderId {
    /// Wrap a backend order id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw order id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for OrderId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

/// One requested line of an order draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLine {
    /// Book to order
    pub book_id: BookId,

    /// Copies of it
    pub quantity: Quantity,
}

/// Order draft built on the client before submission.
///
/// Book ids are unique within a draft: adding a book twice merges the quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDraft {
    lines: SmallVec<[DraftLine; 4]>,
    customer_name: Option<String>,
}

impl OrderDraft {
    /// Empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draft mirroring the current lines of a fetched cart.
    ///
    /// Lines with a zero quantity, which a consistent cart never has, are skipped.
    pub fn from_cart(cart: &Cart) -> Self {
        let mut draft = Self::new();

        for item in &cart.items {
            if let Ok(quantity) = Quantity::new(item.quantity) {
                draft.add(item.book_id, quantity);
            }
        }

        draft
    }

    /// Builder-style variant of [`OrderDraft::add`].
    #[must_use]
    pub fn with_line(mut self, book_id: BookId, quantity: Quantity) -> Self {
        self.add(book_id, quantity);
        self
    }

    /// Attach the customer name the payment screen collects.
    #[must_use]
    pub fn with_customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    /// Add a line, merging into an existing line for the same book.
    pub fn add(&mut self, book_id: BookId, quantity: Quantity) {
        if let Some(line) = self.lines.iter_mut().find(|line| line.book_id == book_id) {
            let merged = line.quantity.get().saturating_add(quantity.get());

            if let Ok(merged) = Quantity::new(merged) {
                line.quantity = merged;
            }

            return;
        }

        self.lines.push(DraftLine { book_id, quantity });
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    /// Customer name, if one was attached.
    pub fn customer_name(&self) -> Option<&str> {
        self.customer_name.as_deref()
    }

    /// Whether the draft has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total copies requested across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |sum, line| sum.saturating_add(line.quantity.get()))
    }
}
