//! Request and response bodies as the backend spells them.

use std::collections::BTreeMap;

use bookcart::prelude::*;
use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Catalog book record (`catalog/books/`). Field names follow the database columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(rename = "BookID")]
    pub id: BookId,

    #[serde(rename = "Title")]
    pub title: String,

    #[serde(rename = "AuthorID", default)]
    pub author_id: Option<u64>,

    #[serde(rename = "PublisherID", default)]
    pub publisher_id: Option<u64>,

    #[serde(rename = "CategoryID", default)]
    pub category_id: Option<u64>,

    #[serde(rename = "Price")]
    pub price: Decimal,

    #[serde(rename = "Stock", default)]
    pub stock: u32,

    #[serde(rename = "Description", default)]
    pub description: Option<String>,

    #[serde(rename = "PublicationDate", default)]
    pub publication_date: Option<String>,
}

impl From<BookRecord> for Book {
    fn from(record: BookRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            author_id: record.author_id,
            publisher_id: record.publisher_id,
            category_id: record.category_id,
            price: record.price,
            stock: record.stock,
            description: record.description,
            publication_date: record.publication_date,
        }
    }
}

impl From<&Book> for BookRecord {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author_id: book.author_id,
            publisher_id: book.publisher_id,
            category_id: book.category_id,
            price: book.price,
            stock: book.stock,
            description: book.description.clone(),
            publication_date: book.publication_date.clone(),
        }
    }
}

/// Book listing: a bare array, or a page when pagination is switched on.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BookPage {
    Paged { results: Vec<BookRecord> },
    List(Vec<BookRecord>),
}

impl BookPage {
    pub fn into_books(self) -> Vec<Book> {
        let (Self::Paged { results: records } | Self::List(records)) = self;

        records.into_iter().map(Book::from).collect()
    }
}

/// Catalog filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    /// Free-text search over title and description.
    pub search: Option<String>,

    /// Ordering field, e.g. `Price` or `-PublicationDate`.
    pub ordering: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AddToCartRequest {
    pub book_id: BookId,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UpdateQuantityRequest {
    pub quantity: Quantity,
}

/// `POST orders/` body. The client always sends explicit items.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub from_cart: bool,
    pub items: Vec<DraftLine>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
}

impl From<&OrderDraft> for CreateOrderRequest {
    fn from(draft: &OrderDraft) -> Self {
        Self {
            from_cart: false,
            items: draft.lines().to_vec(),
            customer_name: draft.customer_name().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default)]
    pub order_detail_id: Option<u64>,
    pub book_id: BookId,

    #[serde(default)]
    pub book_title: Option<String>,
    pub quantity: u32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

/// A created or fetched order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: OrderId,

    #[serde(default)]
    pub customer_id: Option<u64>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub order_date: Option<Timestamp>,
    pub total_amount: Decimal,
    pub status: String,

    #[serde(default)]
    pub items: Vec<OrderLine>,
}

/// Row of `orders/list/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub order_date: Option<Timestamp>,
    pub total_amount: Decimal,
    pub status: String,

    #[serde(default)]
    pub total_items: u32,
}

/// `POST payments/charge/` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeRequest {
    pub order_id: OrderId,
    pub payment_method: PaymentMethod,

    #[serde(flatten)]
    pub card: Option<CardDetails>,
}

impl ChargeRequest {
    pub fn new(order_id: OrderId, details: PaymentDetails) -> Self {
        let details = details.normalized();

        Self {
            order_id,
            payment_method: details.method,
            card: details.card,
        }
    }
}

/// Charge reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub payment_id: PaymentId,

    #[serde(default)]
    pub order_id: Option<OrderId>,

    #[serde(default)]
    pub amount: Option<Decimal>,

    #[serde(default)]
    pub payment_method: Option<String>,
    pub status: PaymentStatus,

    #[serde(default)]
    pub transaction_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub payment_date: Option<Timestamp>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub sandbox_mode: Option<bool>,

    /// Some sandbox builds flag refusals with `success: false` on a 2xx reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl ChargeReceipt {
    /// Whether the backend refused the charge despite answering 2xx.
    pub fn is_refused(&self) -> bool {
        self.success == Some(false) || self.status.outcome() == PaymentOutcome::Failed
    }
}

/// Reply of `payments/{id}/status/` and `payments/order/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusReport {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,

    #[serde(default)]
    pub transaction_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub payment_date: Option<Timestamp>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Sandbox description (`payments/sandbox/info/`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxInfo {
    #[serde(default)]
    pub sandbox_mode: bool,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub supported_methods: Vec<String>,

    #[serde(default)]
    pub test_cards: TestCardSets,

    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Advertised test cards, keyed by a label such as `visa`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCardSets {
    #[serde(default, alias = "success_cards", deserialize_with = "card_set")]
    pub success: BTreeMap<String, String>,

    #[serde(default, alias = "decline_cards", deserialize_with = "card_set")]
    pub decline: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookRequest<'a> {
    pub event_type: &'a str,
}

/// Generic `{message}` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Card sets arrive either as `{label: number}` or as a bare list of numbers.
fn card_set<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Named(BTreeMap<String, String>),
        Listed(Vec<String>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Named(map) => map,
        Raw::Listed(numbers) => numbers
            .into_iter()
            .enumerate()
            .map(|(index, number)| ((index + 1).to_string(), number))
            .collect(),
    })
}

/// Timestamps the backend may render without an offset are dropped rather than failing the
/// whole payload.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;

    Ok(raw.and_then(|raw| raw.parse().ok()))
}
