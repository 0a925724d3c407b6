//! Offline sandbox backend
//!
//! An in-memory [`Transport`] that answers the same routes as the bookshop REST backend. It
//! backs `bookcart --offline` and the scenario tests. One instance is one browser session: a
//! single server-side cart, plus whatever bearer tokens have been issued through `users/login/`.
//!
//! Replies mirror the backend's shapes and status codes, including DRF-style field errors on
//! registration and a 402 with a `decline_code` for sandbox decline cards.

use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt,
    path::Path,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use bookcart::prelude::*;
use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::{
    api::{ApiRequest, ApiResponse, BookRecord, Method, Transport, TransportError},
    auth::Customer,
};

pub mod fixtures;

pub use fixtures::*;

const WEBHOOK_URL: &str = "payments/sandbox/webhook/{payment_id}/";

/// In-memory stand-in for the bookshop backend.
pub struct OfflineBackend {
    state: Mutex<State>,
}

impl OfflineBackend {
    pub fn new(fixture: &CatalogFixture) -> Self {
        Self {
            state: Mutex::new(State::seed(fixture)),
        }
    }

    /// Backend seeded from the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded fixture is invalid.
    pub fn builtin() -> Result<Self, FixtureError> {
        Ok(Self::new(&CatalogFixture::builtin()?))
    }

    /// Backend seeded from a YAML catalog on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture cannot be loaded.
    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        Ok(Self::new(&CatalogFixture::load(path)?))
    }

    fn route(state: &mut State, request: &ApiRequest) -> ApiResponse {
        let segments: Vec<&str> = request
            .path
            .trim_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        let customer = request
            .bearer
            .as_ref()
            .and_then(|token| state.tokens.get(token.expose()).copied());

        let body = request.body.as_ref();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["catalog", "books"]) => state.list_books(&request.query),
            (Method::Get, ["catalog", "books", id]) => state.get_book(id),

            (Method::Get, ["cart"]) => ok(state.cart_body()),
            (Method::Post, ["cart", "add"]) => state.add_to_cart(body),
            (Method::Patch, ["cart", "items", id]) => state.update_cart_item(id, body),
            (Method::Delete, ["cart", "items", id, "remove"]) => state.remove_cart_item(id),
            (Method::Delete, ["cart", "clear"]) => {
                state.cart.clear();
                ok(json!({ "message": "Cart cleared" }))
            }

            (Method::Post, ["users", "login"]) => state.login(body),
            (Method::Post, ["users", "register"]) => state.register(body),
            (Method::Post, ["users", "logout"]) => {
                if let Some(token) = &request.bearer {
                    state.tokens.remove(token.expose());
                }

                ApiResponse::new(204, Value::Null)
            }
            (Method::Get, ["users", "me"]) => ok(customer
                .and_then(|id| state.customer(id))
                .map_or(Value::Null, |account| json!(account.customer))),

            (Method::Get, ["payments", "sandbox", "info"]) => ok(sandbox_info()),
            (Method::Post, ["payments", "sandbox", "webhook", id]) => state.webhook(id, body),

            (_, ["orders", ..] | ["payments", ..]) => match customer {
                Some(customer) => state.authenticated(customer, request.method, &segments, body),
                None => error(401, "Authentication credentials were not provided."),
            },

            _ => not_found("Not found."),
        }
    }
}

impl fmt::Debug for OfflineBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        f.debug_struct("OfflineBackend")
            .field("books", &state.books.len())
            .field("cart_lines", &state.cart.len())
            .field("orders", &state.orders.len())
            .field("payments", &state.payments.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for OfflineBackend {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let response = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

            Self::route(&mut state, &request)
        };

        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            "offline backend replied"
        );

        Ok(response)
    }
}

struct Account {
    customer: Customer,
    password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl OrderStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

struct OrderLine {
    book_id: BookId,
    title: String,
    quantity: u32,
    price: Decimal,
}

impl OrderLine {
    fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

struct Order {
    id: OrderId,
    customer_id: u64,
    placed_at: Timestamp,
    status: OrderStatus,
    lines: Vec<OrderLine>,
}

impl Order {
    fn total_amount(&self) -> Decimal {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }

    fn total_items(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    fn receipt(&self) -> Value {
        json!({
            "order_id": self.id,
            "customer_id": self.customer_id,
            "order_date": self.placed_at.to_string(),
            "total_amount": self.total_amount(),
            "status": self.status.as_str(),
            "items": self
                .lines
                .iter()
                .enumerate()
                .map(|(index, line)| json!({
                    "order_detail_id": index + 1,
                    "book_id": line.book_id,
                    "book_title": line.title,
                    "quantity": line.quantity,
                    "price": line.price,
                    "subtotal": line.subtotal(),
                }))
                .collect::<Vec<_>>(),
        })
    }

    fn summary(&self) -> Value {
        json!({
            "order_id": self.id,
            "order_date": self.placed_at.to_string(),
            "total_amount": self.total_amount(),
            "status": self.status.as_str(),
            "total_items": self.total_items(),
        })
    }
}

struct Payment {
    id: u64,
    order_id: OrderId,
    amount: Decimal,
    method: PaymentMethod,
    status: PaymentStatus,
    transaction_id: String,
    paid_at: Timestamp,
    message: String,
}

impl Payment {
    fn report(&self) -> Value {
        json!({
            "payment_id": self.id,
            "status": self.status,
            "transaction_id": self.transaction_id,
            "payment_date": self.paid_at.to_string(),
            "message": self.message,
        })
    }
}

#[derive(Deserialize)]
struct AddToCartBody {
    book_id: u64,

    #[serde(default = "one")]
    quantity: i64,
}

#[derive(Deserialize)]
struct QuantityBody {
    quantity: i64,
}

#[derive(Deserialize)]
struct OrderLineBody {
    book_id: u64,
    quantity: i64,
}

#[derive(Deserialize)]
struct CreateOrderBody {
    #[serde(default)]
    from_cart: bool,

    #[serde(default)]
    items: Vec<OrderLineBody>,
}

#[derive(Deserialize)]
struct ChargeBody {
    order_id: u64,
    payment_method: String,

    #[serde(default)]
    card_number: Option<String>,
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RegisterBody {
    #[serde(default)]
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct WebhookBody {
    event_type: String,
}

const fn one() -> i64 {
    1
}

struct State {
    books: BTreeMap<BookId, Book>,
    cart: BTreeMap<BookId, u32>,
    accounts: Vec<Account>,
    tokens: FxHashMap<String, u64>,
    orders: BTreeMap<OrderId, Order>,
    payments: BTreeMap<u64, Payment>,
    next_customer: u64,
    next_order: u64,
    next_payment: u64,
}

impl State {
    fn seed(fixture: &CatalogFixture) -> Self {
        let books: BTreeMap<BookId, Book> = fixture
            .books()
            .into_iter()
            .map(|book| (book.id, book))
            .collect();

        let accounts: Vec<Account> = fixture
            .customers
            .iter()
            .map(|seed| Account {
                customer: seed.customer(),
                password: seed.password.clone(),
            })
            .collect();

        let next_customer = accounts
            .iter()
            .map(|account| account.customer.customer_id)
            .max()
            .unwrap_or(0)
            + 1;

        Self {
            books,
            cart: BTreeMap::new(),
            accounts,
            tokens: FxHashMap::default(),
            orders: BTreeMap::new(),
            payments: BTreeMap::new(),
            next_customer,
            next_order: 1,
            next_payment: 1,
        }
    }

    fn customer(&self, id: u64) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|account| account.customer.customer_id == id)
    }

    fn book(&self, raw: &str) -> Result<&Book, ApiResponse> {
        parse_id(raw)
            .and_then(|id| self.books.get(&BookId::new(id)))
            .ok_or_else(|| not_found("Book not found"))
    }

    fn list_books(&self, query: &[(String, String)]) -> ApiResponse {
        let param = |key: &str| {
            query
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str())
        };

        let mut books: Vec<&Book> = self.books.values().collect();

        if let Some(search) = param("search").map(str::to_lowercase) {
            books.retain(|book| {
                book.title.to_lowercase().contains(&search)
                    || book
                        .description
                        .as_deref()
                        .is_some_and(|description| description.to_lowercase().contains(&search))
            });
        }

        if let Some(ordering) = param("ordering") {
            let (descending, field) = match ordering.strip_prefix('-') {
                Some(field) => (true, field),
                None => (false, ordering),
            };

            if let Some(compare) = ordering_for(field) {
                books.sort_by(|a, b| {
                    let order = compare(a, b);

                    if descending { order.reverse() } else { order }
                });
            }
        }

        let results: Vec<BookRecord> = books.into_iter().map(BookRecord::from).collect();

        ok(json!({
            "count": results.len(),
            "next": null,
            "previous": null,
            "results": results,
        }))
    }

    fn get_book(&self, raw: &str) -> ApiResponse {
        match self.book(raw) {
            Ok(book) => ok(json!(BookRecord::from(book))),
            Err(response) => response,
        }
    }

    fn cart_body(&self) -> Value {
        let items: Vec<Value> = self
            .cart
            .iter()
            .filter_map(|(book_id, quantity)| {
                let book = self.books.get(book_id)?;

                Some(json!({
                    "book_id": book_id,
                    "title": book.title,
                    "price": book.price,
                    "quantity": quantity,
                    "subtotal": book.price * Decimal::from(*quantity),
                }))
            })
            .collect();

        let total_items: u32 = self.cart.values().sum();
        let total_amount: Decimal = self
            .cart
            .iter()
            .filter_map(|(book_id, quantity)| {
                self.books
                    .get(book_id)
                    .map(|book| book.price * Decimal::from(*quantity))
            })
            .sum();

        json!({
            "items": items,
            "total_items": total_items,
            "total_amount": total_amount,
        })
    }

    fn add_to_cart(&mut self, body: Option<&Value>) -> ApiResponse {
        let request: AddToCartBody = match parse(body) {
            Ok(request) => request,
            Err(response) => return response,
        };

        let Some(quantity) = positive(request.quantity) else {
            return error(400, "Quantity must be positive");
        };

        let book_id = BookId::new(request.book_id);

        let Some(book) = self.books.get(&book_id) else {
            return not_found("Book not found");
        };

        let Some(wanted) = self
            .cart
            .get(&book_id)
            .copied()
            .unwrap_or(0)
            .checked_add(quantity)
            .filter(|wanted| *wanted <= book.stock)
        else {
            return error(400, format!("Not enough stock. Available: {}", book.stock));
        };

        self.cart.insert(book_id, wanted);

        ok(json!({ "message": "Book added to cart", "cart": self.cart_body() }))
    }

    fn update_cart_item(&mut self, raw: &str, body: Option<&Value>) -> ApiResponse {
        let request: QuantityBody = match parse(body) {
            Ok(request) => request,
            Err(response) => return response,
        };

        let (book_id, stock) = match self.book(raw) {
            Ok(book) => (book.id, book.stock),
            Err(response) => return response,
        };

        if !self.cart.contains_key(&book_id) {
            return not_found("Item not in cart");
        }

        if request.quantity <= 0 {
            self.cart.remove(&book_id);

            return ok(json!({ "message": "Item removed from cart", "cart": self.cart_body() }));
        }

        let Some(quantity) = positive(request.quantity) else {
            return error(400, "Invalid quantity");
        };

        if quantity > stock {
            return error(400, format!("Not enough stock. Available: {stock}"));
        }

        self.cart.insert(book_id, quantity);

        ok(json!({ "message": "Cart updated", "cart": self.cart_body() }))
    }

    fn remove_cart_item(&mut self, raw: &str) -> ApiResponse {
        let book_id = match self.book(raw) {
            Ok(book) => book.id,
            Err(response) => return response,
        };

        if self.cart.remove(&book_id).is_none() {
            return not_found("Item not in cart");
        }

        ok(json!({ "message": "Item removed from cart", "cart": self.cart_body() }))
    }

    fn login(&mut self, body: Option<&Value>) -> ApiResponse {
        let request: LoginBody = match parse(body) {
            Ok(request) => request,
            Err(response) => return response,
        };

        let Some(account) = self.accounts.iter().find(|account| {
            account.customer.email.eq_ignore_ascii_case(request.email.trim())
                && account.password == request.password
        }) else {
            return error(400, "Invalid email or password");
        };

        let token = Uuid::now_v7().simple().to_string();
        let mut reply = json!(account.customer);

        self.tokens.insert(token.clone(), account.customer.customer_id);

        if let Value::Object(fields) = &mut reply {
            fields.insert("token".to_string(), Value::String(token));
        }

        ok(reply)
    }

    fn register(&mut self, body: Option<&Value>) -> ApiResponse {
        let request: RegisterBody = match parse(body) {
            Ok(request) => request,
            Err(response) => return response,
        };

        let email = request.email.trim().to_string();

        if !email.contains('@') {
            return ApiResponse::new(400, json!({ "email": ["Enter a valid email address."] }));
        }

        if request.password.len() < 6 {
            return ApiResponse::new(
                400,
                json!({ "password": ["Ensure this field has at least 6 characters."] }),
            );
        }

        if self
            .accounts
            .iter()
            .any(|account| account.customer.email.eq_ignore_ascii_case(&email))
        {
            return ApiResponse::new(
                400,
                json!({ "email": ["customer with this Email already exists."] }),
            );
        }

        let customer = Customer {
            customer_id: self.next_customer,
            email,
            full_name: None,
            username: Some(request.username).filter(|name| !name.trim().is_empty()),
        };

        self.next_customer += 1;

        let reply = json!(customer);

        self.accounts.push(Account {
            customer,
            password: request.password,
        });

        ApiResponse::new(201, reply)
    }

    fn authenticated(
        &mut self,
        customer: u64,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> ApiResponse {
        match (method, segments) {
            (Method::Post, ["orders"]) => self.create_order(customer, body),
            (Method::Get, ["orders", "list"]) => self.list_orders(customer),
            (Method::Get, ["orders", id]) => match self.owned_order(customer, id) {
                Ok(order) => ok(order.receipt()),
                Err(response) => response,
            },
            (Method::Patch, ["orders", id, "cancel"]) => self.cancel_order(customer, id),

            (Method::Post, ["payments", "charge"]) => self.charge(customer, body),
            (Method::Get, ["payments", "order", id]) => self.order_payment(customer, id),
            (Method::Get, ["payments", id, "status"]) => self.payment_status(customer, id),

            _ => not_found("Not found."),
        }
    }

    fn owned_order(&self, customer: u64, raw: &str) -> Result<&Order, ApiResponse> {
        parse_id(raw)
            .and_then(|id| self.orders.get(&OrderId::new(id)))
            .filter(|order| order.customer_id == customer)
            .ok_or_else(|| not_found("Order not found"))
    }

    fn create_order(&mut self, customer: u64, body: Option<&Value>) -> ApiResponse {
        let request: CreateOrderBody = match parse(body) {
            Ok(request) => request,
            Err(response) => return response,
        };

        let mut wanted: BTreeMap<BookId, u32> = BTreeMap::new();

        if request.from_cart {
            wanted.clone_from(&self.cart);
        } else {
            for line in &request.items {
                let Some(quantity) = positive(line.quantity) else {
                    return error(400, "Quantity must be positive");
                };

                let merged = wanted.entry(BookId::new(line.book_id)).or_default();

                // an overflowing sum is beyond any stock and fails the check below
                *merged = merged.saturating_add(quantity);
            }
        }

        if wanted.is_empty() {
            return error(400, "No items provided");
        }

        let mut lines = Vec::with_capacity(wanted.len());

        for (book_id, quantity) in &wanted {
            let Some(book) = self.books.get(book_id) else {
                return not_found(format!("Book with ID {book_id} not found"));
            };

            if book.stock < *quantity {
                return error(
                    400,
                    format!(
                        "Not enough stock for {}. Available: {}",
                        book.title, book.stock
                    ),
                );
            }

            lines.push(OrderLine {
                book_id: *book_id,
                title: book.title.clone(),
                quantity: *quantity,
                price: book.price,
            });
        }

        for line in &lines {
            if let Some(book) = self.books.get_mut(&line.book_id) {
                book.stock -= line.quantity;
            }
        }

        if request.from_cart {
            self.cart.clear();
        }

        let order = Order {
            id: OrderId::new(self.next_order),
            customer_id: customer,
            placed_at: Timestamp::now(),
            status: OrderStatus::Pending,
            lines,
        };

        self.next_order += 1;

        let reply = order.receipt();

        self.orders.insert(order.id, order);

        ApiResponse::new(201, reply)
    }

    fn list_orders(&self, customer: u64) -> ApiResponse {
        let orders: Vec<Value> = self
            .orders
            .values()
            .rev()
            .filter(|order| order.customer_id == customer)
            .map(Order::summary)
            .collect();

        ok(Value::Array(orders))
    }

    fn cancel_order(&mut self, customer: u64, raw: &str) -> ApiResponse {
        let order_id = match self.owned_order(customer, raw) {
            Ok(order) => order.id,
            Err(response) => return response,
        };

        let Some(order) = self.orders.get_mut(&order_id) else {
            return not_found("Order not found");
        };

        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Confirmed) {
            return error(
                400,
                format!("Cannot cancel order with status: {}", order.status.as_str()),
            );
        }

        order.status = OrderStatus::Cancelled;

        for line in &order.lines {
            if let Some(book) = self.books.get_mut(&line.book_id) {
                book.stock += line.quantity;
            }
        }

        ok(json!({ "message": "Order cancelled successfully" }))
    }

    fn charge(&mut self, customer: u64, body: Option<&Value>) -> ApiResponse {
        let request: ChargeBody = match parse(body) {
            Ok(request) => request,
            Err(response) => return response,
        };

        let (order_id, status, amount) =
            match self.owned_order(customer, &request.order_id.to_string()) {
                Ok(order) => (order.id, order.status, order.total_amount()),
                Err(response) => return response,
            };

        if status == OrderStatus::Cancelled {
            return error(400, "Cannot pay for a cancelled order");
        }

        if self.payments.values().any(|payment| {
            payment.order_id == order_id && payment.status == PaymentStatus::Completed
        }) {
            return error(400, "Order has already been paid");
        }

        let Some(method) = PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == request.payment_method)
        else {
            return error(400, "Invalid payment method");
        };

        let card = request
            .card_number
            .as_deref()
            .map(str::trim)
            .filter(|number| !number.is_empty());

        if method.requires_card() && card.is_none() {
            return error(400, "Card details are required for card payments");
        }

        let behaviour = card
            .and_then(TestCard::lookup)
            .map_or(CardBehaviour::Approve, |card| card.behaviour);

        let (status, message) = match behaviour {
            CardBehaviour::Approve => (PaymentStatus::Completed, "Payment processed successfully"),
            CardBehaviour::Decline(reason) => (PaymentStatus::Failed, reason.message()),
            CardBehaviour::RequiresAuthentication => {
                (PaymentStatus::Pending, "Additional authentication required")
            }
        };

        let payment = Payment {
            id: self.next_payment,
            order_id,
            amount,
            method,
            status: status.clone(),
            transaction_id: format!("sandbox_{}", Uuid::now_v7().simple()),
            paid_at: Timestamp::now(),
            message: message.to_string(),
        };

        self.next_payment += 1;

        if let CardBehaviour::Decline(reason) = behaviour {
            let reply = json!({
                "success": false,
                "error": reason.message(),
                "decline_code": reason.code(),
                "payment_id": payment.id,
                "status": payment.status,
            });

            self.payments.insert(payment.id, payment);

            return ApiResponse::new(402, reply);
        }

        if status == PaymentStatus::Completed
            && let Some(order) = self.orders.get_mut(&order_id)
        {
            order.status = OrderStatus::Confirmed;
        }

        let reply = json!({
            "success": true,
            "payment_id": payment.id,
            "order_id": payment.order_id,
            "amount": payment.amount,
            "payment_method": payment.method.as_str(),
            "status": payment.status,
            "transaction_id": payment.transaction_id,
            "payment_date": payment.paid_at.to_string(),
            "message": payment.message,
            "sandbox_mode": true,
        });

        self.payments.insert(payment.id, payment);

        ApiResponse::new(201, reply)
    }

    fn owned_payment(&self, customer: u64, raw: &str) -> Result<&Payment, ApiResponse> {
        parse_id(raw)
            .and_then(|id| self.payments.get(&id))
            .filter(|payment| {
                self.orders
                    .get(&payment.order_id)
                    .is_some_and(|order| order.customer_id == customer)
            })
            .ok_or_else(|| not_found("Payment not found"))
    }

    fn payment_status(&self, customer: u64, raw: &str) -> ApiResponse {
        match self.owned_payment(customer, raw) {
            Ok(payment) => ok(payment.report()),
            Err(response) => response,
        }
    }

    fn order_payment(&self, customer: u64, raw: &str) -> ApiResponse {
        let order_id = match self.owned_order(customer, raw) {
            Ok(order) => order.id,
            Err(response) => return response,
        };

        self.payments
            .values()
            .rev()
            .find(|payment| payment.order_id == order_id)
            .map_or_else(
                || not_found("No payment found for this order"),
                |payment| ok(payment.report()),
            )
    }

    fn webhook(&mut self, raw: &str, body: Option<&Value>) -> ApiResponse {
        let request: WebhookBody = match parse(body) {
            Ok(request) => request,
            Err(response) => return response,
        };

        let status = match request.event_type.as_str() {
            "payment_intent.succeeded" => PaymentStatus::Completed,
            "payment_intent.payment_failed" => PaymentStatus::Failed,
            "charge.dispute.funds_withdrawn" => PaymentStatus::Refunded,
            other => return error(400, format!("Unknown event type: {other}")),
        };

        let Some(payment) = parse_id(raw).and_then(|id| self.payments.get_mut(&id)) else {
            return not_found("Payment not found");
        };

        payment.status = status.clone();

        if status == PaymentStatus::Completed
            && let Some(order) = self.orders.get_mut(&payment.order_id)
            && order.status == OrderStatus::Pending
        {
            order.status = OrderStatus::Confirmed;
        }

        ok(json!({
            "message": "Webhook simulated",
            "event_type": request.event_type,
            "payment_id": payment.id,
            "status": status,
        }))
    }
}

fn sandbox_info() -> Value {
    let cards = |pick: fn(CardBehaviour) -> bool| -> BTreeMap<&'static str, &'static str> {
        TestCard::ALL
            .into_iter()
            .filter(|card| pick(card.behaviour))
            .map(|card| (card.name, card.number))
            .collect()
    };

    json!({
        "sandbox_mode": true,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": "offline",
        "supported_methods": PaymentMethod::ALL.map(PaymentMethod::as_str),
        "test_cards": {
            "success": cards(|behaviour| behaviour == CardBehaviour::Approve),
            "decline": cards(|behaviour| matches!(behaviour, CardBehaviour::Decline(_))),
            "authentication": cards(|behaviour| behaviour == CardBehaviour::RequiresAuthentication),
        },
        "webhook_url": WEBHOOK_URL,
    })
}

fn ordering_for(field: &str) -> Option<fn(&&Book, &&Book) -> Ordering> {
    let compare: fn(&&Book, &&Book) -> Ordering = match field {
        "BookID" => |a, b| a.id.cmp(&b.id),
        "Title" => |a, b| a.title.cmp(&b.title),
        "Price" => |a, b| a.price.cmp(&b.price),
        "Stock" => |a, b| a.stock.cmp(&b.stock),
        "PublicationDate" => |a, b| a.publication_date.cmp(&b.publication_date),
        _ => return None,
    };

    Some(compare)
}

fn parse<T: DeserializeOwned>(body: Option<&Value>) -> Result<T, ApiResponse> {
    let body = body.cloned().unwrap_or(Value::Null);

    serde_json::from_value(body).map_err(|source| error(400, format!("Invalid request: {source}")))
}

fn parse_id(raw: &str) -> Option<u64> {
    raw.parse().ok()
}

fn positive(quantity: i64) -> Option<u32> {
    u32::try_from(quantity).ok().filter(|quantity| *quantity > 0)
}

const fn ok(body: Value) -> ApiResponse {
    ApiResponse::new(200, body)
}

fn error(status: u16, message: impl Into<String>) -> ApiResponse {
    ApiResponse::new(status, json!({ "error": message.into() }))
}

fn not_found(message: impl Into<String>) -> ApiResponse {
    error(404, message)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::auth::AccessToken;

    use super::*;

    fn backend() -> TestResult<OfflineBackend> {
        Ok(OfflineBackend::builtin()?)
    }

    async fn send(backend: &OfflineBackend, request: ApiRequest) -> TestResult<ApiResponse> {
        Ok(backend.execute(request).await?)
    }

    async fn sign_in(backend: &OfflineBackend) -> TestResult<Option<AccessToken>> {
        let reply = send(
            backend,
            ApiRequest::post(
                "users/login/",
                json!({ "email": "reader@bookcart.test", "password": "sandbox" }),
            ),
        )
        .await?;

        assert_eq!(reply.status, 200);

        Ok(reply
            .body
            .get("token")
            .and_then(Value::as_str)
            .and_then(AccessToken::new))
    }

    async fn place_order(
        backend: &OfflineBackend,
        token: Option<&AccessToken>,
    ) -> TestResult<u64> {
        let reply = send(
            backend,
            ApiRequest::post(
                "orders/",
                json!({ "from_cart": false, "items": [{ "book_id": 1, "quantity": 1 }] }),
            )
            .with_bearer(token.cloned()),
        )
        .await?;

        assert_eq!(reply.status, 201);

        Ok(reply
            .body
            .get("order_id")
            .and_then(Value::as_u64)
            .unwrap_or_default())
    }

    fn charge(order_id: u64, card: &str) -> ApiRequest {
        ApiRequest::post(
            "payments/charge/",
            json!({
                "order_id": order_id,
                "payment_method": "credit_card",
                "card_number": card,
                "card_holder": "Test User",
                "card_expiry": "12/2030",
                "card_cvv": "123",
            }),
        )
    }

    #[tokio::test]
    async fn adding_beyond_stock_is_rejected() -> TestResult {
        let backend = backend()?;
        let reply = send(
            &backend,
            ApiRequest::post("cart/add/", json!({ "book_id": 4, "quantity": 4 })),
        )
        .await?;

        assert_eq!(reply.status, 400);
        assert_eq!(
            reply.body.get("error").and_then(Value::as_str),
            Some("Not enough stock. Available: 3")
        );

        Ok(())
    }

    #[tokio::test]
    async fn overflowing_cart_quantity_is_out_of_stock() -> TestResult {
        let backend = backend()?;

        let first = send(
            &backend,
            ApiRequest::post("cart/add/", json!({ "book_id": 1, "quantity": 1 })),
        )
        .await?;

        assert_eq!(first.status, 200);

        let reply = send(
            &backend,
            ApiRequest::post("cart/add/", json!({ "book_id": 1, "quantity": u32::MAX })),
        )
        .await?;

        assert_eq!(reply.status, 400);
        assert!(
            reply
                .body
                .get("error")
                .and_then(Value::as_str)
                .is_some_and(|message| message.starts_with("Not enough stock")),
            "got {:?}",
            reply.body
        );

        let cart = send(&backend, ApiRequest::get("cart/")).await?;

        assert_eq!(cart.body.get("total_items").and_then(Value::as_u64), Some(1));

        Ok(())
    }

    #[tokio::test]
    async fn overflowing_order_lines_are_out_of_stock() -> TestResult {
        let backend = backend()?;
        let token = sign_in(&backend).await?;

        let reply = send(
            &backend,
            ApiRequest::post(
                "orders/",
                json!({
                    "from_cart": false,
                    "items": [
                        { "book_id": 1, "quantity": u32::MAX },
                        { "book_id": 1, "quantity": 2 }
                    ]
                }),
            )
            .with_bearer(token),
        )
        .await?;

        assert_eq!(reply.status, 400);
        assert!(
            reply
                .body
                .get("error")
                .and_then(Value::as_str)
                .is_some_and(|message| message.starts_with("Not enough stock for")),
            "got {:?}",
            reply.body
        );

        Ok(())
    }

    #[tokio::test]
    async fn unknown_book_is_not_found() -> TestResult {
        let backend = backend()?;
        let reply = send(
            &backend,
            ApiRequest::post("cart/add/", json!({ "book_id": 404, "quantity": 1 })),
        )
        .await?;

        assert_eq!(reply.status, 404);

        Ok(())
    }

    #[tokio::test]
    async fn patching_to_zero_removes_the_line() -> TestResult {
        let backend = backend()?;

        send(
            &backend,
            ApiRequest::post("cart/add/", json!({ "book_id": 2, "quantity": 2 })),
        )
        .await?;

        let reply = send(
            &backend,
            ApiRequest::patch("cart/items/2/", json!({ "quantity": 0 })),
        )
        .await?;

        assert_eq!(reply.status, 200);

        let cart: Cart = serde_json::from_value(send(&backend, ApiRequest::get("cart/")).await?.body)?;

        assert!(cart.is_empty(), "line should be gone, got {cart:?}");

        Ok(())
    }

    #[tokio::test]
    async fn cart_totals_follow_the_lines() -> TestResult {
        let backend = backend()?;

        send(
            &backend,
            ApiRequest::post("cart/add/", json!({ "book_id": 1, "quantity": 2 })),
        )
        .await?;
        send(
            &backend,
            ApiRequest::post("cart/add/", json!({ "book_id": 4 })),
        )
        .await?;

        let cart: Cart = serde_json::from_value(send(&backend, ApiRequest::get("cart/")).await?.body)?;

        assert_eq!(cart.total_items, 3);
        assert_eq!(cart.total_amount, Decimal::new(8989, 2));
        assert_eq!(cart.verify_totals(), Ok(()));

        Ok(())
    }

    #[tokio::test]
    async fn orders_require_a_bearer_token() -> TestResult {
        let backend = backend()?;
        let reply = send(&backend, ApiRequest::get("orders/list/")).await?;

        assert_eq!(reply.status, 401);

        Ok(())
    }

    #[tokio::test]
    async fn anonymous_me_is_null() -> TestResult {
        let backend = backend()?;
        let reply = send(&backend, ApiRequest::get("users/me/")).await?;

        assert_eq!(reply, ApiResponse::new(200, Value::Null));

        Ok(())
    }

    #[tokio::test]
    async fn order_creation_reserves_stock() -> TestResult {
        let backend = backend()?;
        let token = sign_in(&backend).await?;
        let reply = send(
            &backend,
            ApiRequest::post(
                "orders/",
                json!({ "items": [{ "book_id": 4, "quantity": 3 }] }),
            )
            .with_bearer(token.clone()),
        )
        .await?;

        assert_eq!(reply.status, 201);

        let again = send(
            &backend,
            ApiRequest::post(
                "orders/",
                json!({ "items": [{ "book_id": 4, "quantity": 1 }] }),
            )
            .with_bearer(token),
        )
        .await?;

        assert_eq!(again.status, 400);
        assert_eq!(
            again.body.get("error").and_then(Value::as_str),
            Some("Not enough stock for The Left Hand of Darkness. Available: 0")
        );

        Ok(())
    }

    #[tokio::test]
    async fn decline_cards_reply_with_402_and_a_payment_id() -> TestResult {
        let backend = backend()?;
        let token = sign_in(&backend).await?;
        let order_id = place_order(&backend, token.as_ref()).await?;

        let reply = send(
            &backend,
            charge(order_id, TestCard::DECLINE_CVC.number).with_bearer(token.clone()),
        )
        .await?;

        assert_eq!(reply.status, 402);
        assert_eq!(
            reply.body.get("decline_code").and_then(Value::as_str),
            Some("incorrect_cvc")
        );
        assert_eq!(
            reply.body.get("status").and_then(Value::as_str),
            Some("failed")
        );
        assert!(
            reply.body.get("payment_id").is_some(),
            "decline should carry a payment id"
        );

        let retry = send(
            &backend,
            charge(order_id, TestCard::SUCCESS_VISA.number).with_bearer(token.clone()),
        )
        .await?;

        assert_eq!(retry.status, 201);

        let duplicate = send(
            &backend,
            charge(order_id, TestCard::SUCCESS_VISA.number).with_bearer(token),
        )
        .await?;

        assert_eq!(duplicate.status, 400);

        Ok(())
    }

    #[tokio::test]
    async fn webhook_moves_the_payment() -> TestResult {
        let backend = backend()?;
        let token = sign_in(&backend).await?;
        let order_id = place_order(&backend, token.as_ref()).await?;

        let reply = send(
            &backend,
            charge(order_id, TestCard::SUCCESS_VISA.number).with_bearer(token.clone()),
        )
        .await?;
        let payment_id = reply
            .body
            .get("payment_id")
            .and_then(Value::as_u64)
            .unwrap_or_default();

        send(
            &backend,
            ApiRequest::post(
                format!("payments/sandbox/webhook/{payment_id}/"),
                json!({ "event_type": "charge.dispute.funds_withdrawn" }),
            ),
        )
        .await?;

        let status = send(
            &backend,
            ApiRequest::get(format!("payments/{payment_id}/status/")).with_bearer(token),
        )
        .await?;

        assert_eq!(
            status.body.get("status").and_then(Value::as_str),
            Some("refunded")
        );

        Ok(())
    }

    #[tokio::test]
    async fn search_and_ordering_apply_to_the_listing() -> TestResult {
        let backend = backend()?;
        let reply = send(
            &backend,
            ApiRequest::get("catalog/books/")
                .with_query("search", Some("RUST"))
                .with_query("ordering", Some("-Price")),
        )
        .await?;

        let titles: Vec<&str> = reply
            .body
            .get("results")
            .and_then(Value::as_array)
            .map(|results| {
                results
                    .iter()
                    .filter_map(|book| book.get("Title").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        assert_eq!(
            titles,
            vec![
                "Programming Rust",
                "Zero To Production In Rust",
                "The Rust Programming Language",
            ]
        );

        Ok(())
    }
}
