//! Sandbox service.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bookcart::prelude::PaymentId;
use mockall::automock;
use serde_json::Value;
use tracing::info;

use crate::{
    api::{SandboxInfo, ShopApi},
    domain::sandbox::errors::SandboxServiceError,
};

/// Webhook events the sandbox knows how to simulate.
pub const WEBHOOK_EVENTS: [&str; 3] = [
    "payment_intent.succeeded",
    "payment_intent.payment_failed",
    "charge.dispute.funds_withdrawn",
];

#[derive(Clone)]
pub struct ShopSandboxService {
    api: Arc<dyn ShopApi>,
}

impl ShopSandboxService {
    #[must_use]
    pub fn new(api: Arc<dyn ShopApi>) -> Self {
        Self { api }
    }
}

impl fmt::Debug for ShopSandboxService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopSandboxService").finish_non_exhaustive()
    }
}

#[async_trait]
impl SandboxService for ShopSandboxService {
    async fn info(&self) -> Result<SandboxInfo, SandboxServiceError> {
        Ok(self.api.sandbox_info().await?)
    }

    async fn simulate_webhook(
        &self,
        payment_id: PaymentId,
        event_type: String,
    ) -> Result<Value, SandboxServiceError> {
        if !WEBHOOK_EVENTS.contains(&event_type.as_str()) {
            return Err(SandboxServiceError::UnknownEvent(event_type));
        }

        let reply = self
            .api
            .simulate_webhook(payment_id.clone(), event_type.clone())
            .await?;

        info!(%payment_id, %event_type, "webhook simulated");

        Ok(reply)
    }
}

#[automock]
#[async_trait]
pub trait SandboxService: Send + Sync {
    /// Sandbox mode, supported methods and advertised test cards.
    async fn info(&self) -> Result<SandboxInfo, SandboxServiceError>;

    /// Have the sandbox emit a webhook event for a payment. Returns the raw reply.
    async fn simulate_webhook(
        &self,
        payment_id: PaymentId,
        event_type: String,
    ) -> Result<Value, SandboxServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{api::MockShopApi, test::TestContext};

    use super::*;

    #[tokio::test]
    async fn unknown_events_are_not_sent() {
        let mut api = MockShopApi::new();

        api.expect_simulate_webhook().never();

        let result = ShopSandboxService::new(Arc::new(api))
            .simulate_webhook(PaymentId::new("1"), "payment_intent.created".to_string())
            .await;

        assert!(
            matches!(result, Err(SandboxServiceError::UnknownEvent(ref event)) if event == "payment_intent.created"),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn offline_sandbox_describes_itself() -> TestResult {
        let ctx = TestContext::new();
        let info = ctx.sandbox.info().await?;

        assert!(info.sandbox_mode, "offline backend is a sandbox");
        assert!(
            info.test_cards.decline.values().any(|number| number == "4000000000000002"),
            "decline cards should be advertised"
        );

        Ok(())
    }
}
