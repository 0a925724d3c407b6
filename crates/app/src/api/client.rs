//! Typed bookshop API client.

use std::sync::Arc;

use async_trait::async_trait;
use bookcart::prelude::*;
use mockall::automock;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    api::{
        AddToCartRequest, ApiError, ApiRequest, ApiResponse, BookPage, BookQuery, BookRecord,
        ChargeReceipt, ChargeRequest, CreateOrderRequest, MessageResponse, Method, OrderReceipt,
        OrderSummary, PaymentStatusReport, SandboxInfo, Transport, UpdateQuantityRequest,
        WebhookRequest,
    },
    auth::{Customer, LoginRequest, LoginResponse, RegisterRequest, Session},
};

/// Typed client over a [`Transport`].
///
/// Attaches the session's bearer token to every call and evicts it on any 401.
#[derive(Debug)]
pub struct ShopClient<T> {
    transport: T,
    session: Arc<Session>,
}

impl<T: Transport> ShopClient<T> {
    pub fn new(transport: T, session: Arc<Session>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let method = request.method;
        let request = request.with_bearer(self.session.bearer());
        let path = request.path.clone();

        let response = self.transport.execute(request).await?;

        debug!(%method, %path, status = response.status, "backend replied");

        if let Some(error) = ApiError::from_response(&response) {
            if error.is_unauthorized() && self.session.evict() {
                warn!(%method, %path, "credential rejected, signed out");
            }

            return Err(error);
        }

        Ok(response)
    }

    async fn fetch<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;

        serde_json::from_value(response.body).map_err(|source| ApiError::Decode { path, source })
    }

    async fn acknowledge(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.send(request).await.map(drop)
    }
}

fn encode<B: Serialize>(path: &str, body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|source| ApiError::Encode {
        path: path.to_string(),
        source,
    })
}

fn with_json<B: Serialize>(method: Method, path: String, body: &B) -> Result<ApiRequest, ApiError> {
    let body = encode(&path, body)?;

    Ok(ApiRequest::new(method, path).with_body(body))
}

#[async_trait]
impl<T: Transport> ShopApi for ShopClient<T> {
    async fn get_cart(&self) -> Result<Cart, ApiError> {
        self.fetch(ApiRequest::get("cart/")).await
    }

    async fn add_to_cart(&self, book_id: BookId, quantity: Quantity) -> Result<(), ApiError> {
        let request = with_json(
            Method::Post,
            "cart/add/".to_string(),
            &AddToCartRequest { book_id, quantity },
        )?;

        self.acknowledge(request).await
    }

    async fn update_cart_item(&self, book_id: BookId, quantity: Quantity) -> Result<(), ApiError> {
        let request = with_json(
            Method::Patch,
            format!("cart/items/{book_id}/"),
            &UpdateQuantityRequest { quantity },
        )?;

        self.acknowledge(request).await
    }

    async fn remove_cart_item(&self, book_id: BookId) -> Result<(), ApiError> {
        self.acknowledge(ApiRequest::delete(format!("cart/items/{book_id}/remove/")))
            .await
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.acknowledge(ApiRequest::delete("cart/clear/")).await
    }

    async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>, ApiError> {
        let request = ApiRequest::get("catalog/books/")
            .with_query("search", query.search.as_deref())
            .with_query("ordering", query.ordering.as_deref());

        self.fetch::<BookPage>(request)
            .await
            .map(BookPage::into_books)
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, ApiError> {
        self.fetch::<BookRecord>(ApiRequest::get(format!("catalog/books/{book_id}/")))
            .await
            .map(Book::from)
    }

    async fn create_order(&self, draft: OrderDraft) -> Result<OrderReceipt, ApiError> {
        let request = with_json(
            Method::Post,
            "orders/".to_string(),
            &CreateOrderRequest::from(&draft),
        )?;

        self.fetch(request).await
    }

    async fn list_orders(&self) -> Result<Vec<OrderSummary>, ApiError> {
        self.fetch(ApiRequest::get("orders/list/")).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<OrderReceipt, ApiError> {
        self.fetch(ApiRequest::get(format!("orders/{order_id}/")))
            .await
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<MessageResponse, ApiError> {
        self.fetch(ApiRequest::patch(
            format!("orders/{order_id}/cancel/"),
            Value::Object(serde_json::Map::new()),
        ))
        .await
    }

    async fn charge(&self, request: ChargeRequest) -> Result<ChargeReceipt, ApiError> {
        let request = with_json(Method::Post, "payments/charge/".to_string(), &request)?;

        self.fetch(request).await
    }

    async fn payment_status(&self, payment_id: PaymentId) -> Result<PaymentStatusReport, ApiError> {
        self.fetch(ApiRequest::get(format!("payments/{payment_id}/status/")))
            .await
    }

    async fn order_payment(&self, order_id: OrderId) -> Result<PaymentStatusReport, ApiError> {
        self.fetch(ApiRequest::get(format!("payments/order/{order_id}/")))
            .await
    }

    async fn sandbox_info(&self) -> Result<SandboxInfo, ApiError> {
        self.fetch(ApiRequest::get("payments/sandbox/info/")).await
    }

    async fn simulate_webhook(
        &self,
        payment_id: PaymentId,
        event_type: String,
    ) -> Result<Value, ApiError> {
        let request = with_json(
            Method::Post,
            format!("payments/sandbox/webhook/{payment_id}/"),
            &WebhookRequest {
                event_type: &event_type,
            },
        )?;

        self.fetch(request).await
    }

    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApiError> {
        let request = with_json(Method::Post, "users/login/".to_string(), &request)?;

        self.fetch(request).await
    }

    async fn register(&self, request: RegisterRequest) -> Result<Customer, ApiError> {
        let request = with_json(Method::Post, "users/register/".to_string(), &request)?;

        self.fetch(request).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.acknowledge(ApiRequest::new(Method::Post, "users/logout/"))
            .await
    }

    async fn me(&self) -> Result<Option<Customer>, ApiError> {
        self.fetch(ApiRequest::get("users/me/")).await
    }
}

/// One method per backend endpoint used by the shop screens.
#[automock]
#[async_trait]
pub trait ShopApi: Send + Sync {
    /// Current server-held cart.
    async fn get_cart(&self) -> Result<Cart, ApiError>;

    /// Add copies of a book. The reply body is discarded; callers resync.
    async fn add_to_cart(&self, book_id: BookId, quantity: Quantity) -> Result<(), ApiError>;

    async fn update_cart_item(&self, book_id: BookId, quantity: Quantity) -> Result<(), ApiError>;

    async fn remove_cart_item(&self, book_id: BookId) -> Result<(), ApiError>;

    async fn clear_cart(&self) -> Result<(), ApiError>;

    async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>, ApiError>;

    async fn get_book(&self, book_id: BookId) -> Result<Book, ApiError>;

    /// Submit an order draft with explicit items.
    async fn create_order(&self, draft: OrderDraft) -> Result<OrderReceipt, ApiError>;

    async fn list_orders(&self) -> Result<Vec<OrderSummary>, ApiError>;

    async fn get_order(&self, order_id: OrderId) -> Result<OrderReceipt, ApiError>;

    async fn cancel_order(&self, order_id: OrderId) -> Result<MessageResponse, ApiError>;

    /// Charge an existing order.
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeReceipt, ApiError>;

    async fn payment_status(&self, payment_id: PaymentId) -> Result<PaymentStatusReport, ApiError>;

    /// Latest payment recorded against an order.
    async fn order_payment(&self, order_id: OrderId) -> Result<PaymentStatusReport, ApiError>;

    async fn sandbox_info(&self) -> Result<SandboxInfo, ApiError>;

    /// Ask the sandbox to emit a webhook event for a payment.
    async fn simulate_webhook(
        &self,
        payment_id: PaymentId,
        event_type: String,
    ) -> Result<Value, ApiError>;

    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApiError>;

    async fn register(&self, request: RegisterRequest) -> Result<Customer, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;

    /// Signed-in customer, or `None` for an anonymous session.
    async fn me(&self) -> Result<Option<Customer>, ApiError>;
}
