//! Offline catalog fixtures

use std::{fs, path::Path};

use bookcart::prelude::*;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::Customer;

const BUILTIN: &str = include_str!("../../fixtures/catalog.yml");

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading the fixture file
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Fixture has no books
    #[error("Fixture defines no books")]
    NoBooks,

    /// Two books share an id
    #[error("Duplicate book id: {0}")]
    DuplicateBook(u64),

    /// Two customers share an email
    #[error("Duplicate customer email: {0}")]
    DuplicateCustomer(String),

    /// Price is zero or negative
    #[error("Book {id} has a non-positive price: {price}")]
    InvalidPrice { id: u64, price: Decimal },
}

/// Book entry in a catalog fixture.
#[derive(Debug, Clone, Deserialize)]
pub struct BookFixture {
    pub id: u64,
    pub title: String,

    #[serde(default)]
    pub author_id: Option<u64>,

    #[serde(default)]
    pub publisher_id: Option<u64>,

    #[serde(default)]
    pub category_id: Option<u64>,
    pub price: Decimal,

    #[serde(default)]
    pub stock: u32,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub publication_date: Option<String>,
}

impl From<BookFixture> for Book {
    fn from(fixture: BookFixture) -> Self {
        Self {
            id: BookId::new(fixture.id),
            title: fixture.title,
            author_id: fixture.author_id,
            publisher_id: fixture.publisher_id,
            category_id: fixture.category_id,
            price: fixture.price,
            stock: fixture.stock,
            description: fixture.description,
            publication_date: fixture.publication_date,
        }
    }
}

/// Customer account seeded into the offline backend.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerFixture {
    pub id: u64,
    pub email: String,
    pub password: String,

    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub username: Option<String>,
}

impl CustomerFixture {
    pub fn customer(&self) -> Customer {
        Customer {
            customer_id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            username: self.username.clone(),
        }
    }
}

/// Books and customers the offline backend starts with.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFixture {
    pub books: Vec<BookFixture>,

    #[serde(default)]
    pub customers: Vec<CustomerFixture>,
}

impl CatalogFixture {
    /// The catalog compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded YAML does not parse or validate.
    pub fn builtin() -> Result<Self, FixtureError> {
        Self::parse(BUILTIN)
    }

    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let contents = fs::read_to_string(path)?;

        Self::parse(&contents)
    }

    /// Parse and validate a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed YAML, an empty catalog, duplicate ids or emails, or a
    /// non-positive price.
    pub fn parse(contents: &str) -> Result<Self, FixtureError> {
        let fixture: Self = serde_norway::from_str(contents)?;

        fixture.validate()?;

        Ok(fixture)
    }

    /// First seeded customer, used as the demo login.
    pub fn demo_customer(&self) -> Option<&CustomerFixture> {
        self.customers.first()
    }

    /// Catalog as domain books, in fixture order.
    pub fn books(&self) -> Vec<Book> {
        self.books.iter().cloned().map(Book::from).collect()
    }

    fn validate(&self) -> Result<(), FixtureError> {
        if self.books.is_empty() {
            return Err(FixtureError::NoBooks);
        }

        let mut ids = FxHashSet::default();

        for book in &self.books {
            if !ids.insert(book.id) {
                return Err(FixtureError::DuplicateBook(book.id));
            }

            if book.price <= Decimal::ZERO {
                return Err(FixtureError::InvalidPrice {
                    id: book.id,
                    price: book.price,
                });
            }
        }

        let mut emails = FxHashSet::default();

        for customer in &self.customers {
            if !emails.insert(customer.email.to_lowercase()) {
                return Err(FixtureError::DuplicateCustomer(customer.email.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use testresult::TestResult;

    use super::*;

    #[test]
    fn builtin_catalog_is_valid() -> TestResult {
        let fixture = CatalogFixture::builtin()?;
        let books = fixture.books();

        assert_eq!(books.first().map(|book| book.id), Some(BookId::new(1)));
        assert!(
            books.iter().filter(|book| book.stock >= 3).count() >= 2,
            "at least two books should be comfortably in stock"
        );
        assert!(fixture.demo_customer().is_some(), "a demo customer is seeded");

        Ok(())
    }

    #[test]
    fn prices_parse_exactly() -> TestResult {
        let fixture = CatalogFixture::parse(
            r#"
books:
  - id: 7
    title: Exact
    price: "0.10"
    stock: 1
"#,
        )?;

        assert_eq!(fixture.books().first().map(|book| book.price), Some(Decimal::new(10, 2)));

        Ok(())
    }

    #[test]
    fn duplicate_book_ids_are_rejected() {
        let result = CatalogFixture::parse(
            r#"
books:
  - { id: 1, title: One, price: "1.00" }
  - { id: 1, title: Also One, price: "2.00" }
"#,
        );

        assert!(
            matches!(result, Err(FixtureError::DuplicateBook(1))),
            "expected DuplicateBook, got {result:?}"
        );
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let result = CatalogFixture::parse("books: []\n");

        assert!(
            matches!(result, Err(FixtureError::NoBooks)),
            "expected NoBooks, got {result:?}"
        );
    }

    #[test]
    fn free_books_are_rejected() {
        let result = CatalogFixture::parse(
            r#"
books:
  - { id: 3, title: Free, price: "0" }
"#,
        );

        assert!(
            matches!(result, Err(FixtureError::InvalidPrice { id: 3, .. })),
            "expected InvalidPrice, got {result:?}"
        );
    }

    #[test]
    fn loads_from_a_file() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;

        writeln!(
            file,
            "books:\n  - {{ id: 9, title: On Disk, price: \"5.00\", stock: 2 }}"
        )?;

        let fixture = CatalogFixture::load(file.path())?;

        assert_eq!(fixture.books().len(), 1);
        assert!(fixture.customers.is_empty(), "no customers were defined");

        Ok(())
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = CatalogFixture::load(Path::new("/nonexistent/bookcart/catalog.yml"));

        assert!(
            matches!(result, Err(FixtureError::Io(_))),
            "expected Io, got {result:?}"
        );
    }
}
