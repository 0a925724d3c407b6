//! Books

use std::fmt::{Display, Formatter, Result as FmtResult};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Book identifier, as assigned by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(u64);

impl BookId {
    /// Wrap a raw catalog identifier.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw catalog identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for BookId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for BookId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

/// Catalog entry for a single book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Catalog identifier.
    pub id: BookId,

    /// Display title.
    pub title: String,

    /// Author reference, if the catalog links one.
    pub author_id: Option<u64>,

    /// Publisher reference, if the catalog links one.
    pub publisher_id: Option<u64>,

    /// Category reference, if the catalog links one.
    pub category_id: Option<u64>,

    /// Unit price.
    pub price: Decimal,

    /// Copies the backend reports as available.
    pub stock: u32,

    /// Free-form description.
    pub description: Option<String>,

    /// Publication date as reported by the catalog.
    pub publication_date: Option<String>,
}

impl Book {
    /// Whether `quantity` copies can currently be supplied.
    pub const fn in_stock(&self, quantity: u32) -> bool {
        quantity > 0 && self.stock >= quantity
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn book(stock: u32) -> Book {
        Book {
            id: BookId::new(1),
            title: "Dune".to_string(),
            author_id: None,
            publisher_id: None,
            category_id: None,
            price: Decimal::new(1_999, 2),
            stock,
            description: None,
            publication_date: None,
        }
    }

    #[test]
    fn in_stock_respects_available_copies() {
        let book = book(2);

        assert!(book.in_stock(1), "one copy should be available");
        assert!(book.in_stock(2), "two copies should be available");
        assert!(!book.in_stock(3), "three copies exceed stock");
    }

    #[test]
    fn zero_quantity_is_never_in_stock() {
        assert!(!book(5).in_stock(0), "zero copies is not a valid request");
    }

    #[test]
    fn book_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&BookId::new(42)).ok();

        assert_eq!(json.as_deref(), Some("42"));
    }
}
