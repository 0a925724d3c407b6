use std::error::Error;

use bookcart::prelude::*;
use bookcart_app::api::{OrderLine, OrderSummary};
use rust_decimal::Decimal;
use tabled::{Table, Tabled, settings::Style};

#[derive(Tabled)]
struct BookRow {
    #[tabled(rename = "ID")]
    id: u64,

    #[tabled(rename = "Title")]
    title: String,

    #[tabled(rename = "Price")]
    price: String,

    #[tabled(rename = "Stock")]
    stock: u32,

    #[tabled(rename = "Published")]
    published: String,
}

#[derive(Tabled)]
struct CartRow {
    #[tabled(rename = "Book")]
    book_id: u64,

    #[tabled(rename = "Title")]
    title: String,

    #[tabled(rename = "Price")]
    price: String,

    #[tabled(rename = "Qty")]
    quantity: u32,

    #[tabled(rename = "Subtotal")]
    subtotal: String,
}

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "Order")]
    order_id: u64,

    #[tabled(rename = "Placed")]
    placed: String,

    #[tabled(rename = "Items")]
    items: u32,

    #[tabled(rename = "Total")]
    total: String,

    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct OrderLineRow {
    #[tabled(rename = "Book")]
    book_id: u64,

    #[tabled(rename = "Title")]
    title: String,

    #[tabled(rename = "Qty")]
    quantity: u32,

    #[tabled(rename = "Price")]
    price: String,

    #[tabled(rename = "Subtotal")]
    subtotal: String,
}

pub(crate) fn money(amount: Decimal) -> String {
    format!("${amount:.2}")
}

pub(crate) fn books(books: &[Book]) -> String {
    let rows = books.iter().map(|book| BookRow {
        id: book.id.get(),
        title: book.title.clone(),
        price: money(book.price),
        stock: book.stock,
        published: book.publication_date.clone().unwrap_or_default(),
    });

    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn cart(cart: &Cart) -> String {
    if cart.is_empty() {
        return "cart is empty".to_string();
    }

    let rows = cart.items.iter().map(|item| CartRow {
        book_id: item.book_id.get(),
        title: item.title.clone(),
        price: money(item.price),
        quantity: item.quantity,
        subtotal: money(item.subtotal),
    });

    format!(
        "{}\ntotal items: {}\ntotal: {}",
        Table::new(rows).with(Style::rounded()),
        cart.total_items,
        money(cart.total_amount)
    )
}

pub(crate) fn orders(orders: &[OrderSummary]) -> String {
    let rows = orders.iter().map(|order| OrderRow {
        order_id: order.order_id.get(),
        placed: order
            .order_date
            .map(|date| date.to_string())
            .unwrap_or_default(),
        items: order.total_items,
        total: money(order.total_amount),
        status: order.status.clone(),
    });

    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn order_lines(lines: &[OrderLine]) -> String {
    let rows = lines.iter().map(|line| OrderLineRow {
        book_id: line.book_id.get(),
        title: line.book_title.clone().unwrap_or_default(),
        quantity: line.quantity,
        price: money(line.price),
        subtotal: money(line.subtotal),
    });

    Table::new(rows).with(Style::rounded()).to_string()
}

/// `context: error: source: ...`, skipping sources already spelled out by their parent.
pub(crate) fn failure(context: &str, error: &dyn Error) -> String {
    let mut message = format!("{context}: {error}");
    let mut source = error.source();

    while let Some(cause) = source {
        let text = cause.to_string();

        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }

        source = cause.source();
    }

    message
}

#[cfg(test)]
mod tests {
    use bookcart_app::api::ApiError;

    use super::*;

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(Decimal::new(44, 0)), "$44.00");
        assert_eq!(money(Decimal::new(3995, 2)), "$39.95");
    }

    #[test]
    fn failure_does_not_repeat_nested_messages() {
        let error = bookcart_app::domain::checkout::CheckoutServiceError::Status(ApiError::Server {
            status: 503,
            message: "Service Unavailable".to_string(),
        });
        let message = failure("status", &error);

        assert_eq!(message.matches("Service Unavailable").count(), 1, "{message}");
    }
}
