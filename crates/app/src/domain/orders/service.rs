//! Orders service.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bookcart::prelude::*;
use mockall::automock;
use tracing::info;

use crate::{
    api::{OrderReceipt, OrderSummary, PaymentStatusReport, ShopApi},
    domain::orders::errors::OrdersServiceError,
};

#[derive(Clone)]
pub struct ShopOrdersService {
    api: Arc<dyn ShopApi>,
}

impl ShopOrdersService {
    #[must_use]
    pub fn new(api: Arc<dyn ShopApi>) -> Self {
        Self { api }
    }
}

impl fmt::Debug for ShopOrdersService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopOrdersService").finish_non_exhaustive()
    }
}

#[async_trait]
impl OrdersService for ShopOrdersService {
    async fn list_orders(&self) -> Result<Vec<OrderSummary>, OrdersServiceError> {
        Ok(self.api.list_orders().await?)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<OrderReceipt, OrdersServiceError> {
        Ok(self.api.get_order(order_id).await?)
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<String, OrdersServiceError> {
        let reply = self.api.cancel_order(order_id).await?;

        info!(%order_id, "order cancelled");

        Ok(reply
            .message
            .unwrap_or_else(|| format!("order {order_id} cancelled")))
    }

    async fn order_payment(
        &self,
        order_id: OrderId,
    ) -> Result<PaymentStatusReport, OrdersServiceError> {
        Ok(self.api.order_payment(order_id).await?)
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// The signed-in customer's orders, newest first.
    async fn list_orders(&self) -> Result<Vec<OrderSummary>, OrdersServiceError>;

    async fn get_order(&self, order_id: OrderId) -> Result<OrderReceipt, OrdersServiceError>;

    /// Cancel a pending or confirmed order. Returns the backend's confirmation.
    async fn cancel_order(&self, order_id: OrderId) -> Result<String, OrdersServiceError>;

    /// Latest payment recorded against an order.
    async fn order_payment(
        &self,
        order_id: OrderId,
    ) -> Result<PaymentStatusReport, OrdersServiceError>;
}
