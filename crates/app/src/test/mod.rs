//! Test context for service-level scenario tests against the offline backend.

use std::sync::Arc;

use bookcart::prelude::*;
use testresult::TestResult;

use crate::{
    api::{ShopApi, ShopClient},
    auth::{AuthService, Session, ShopAuthService},
    domain::{
        carts::CartManager, catalog::ShopCatalogService, checkout::CheckoutSequencer,
        orders::ShopOrdersService, sandbox::ShopSandboxService,
    },
    offline::{CatalogFixture, OfflineBackend},
};

pub struct TestContext {
    pub fixture: CatalogFixture,
    pub session: Arc<Session>,
    pub api: Arc<dyn ShopApi>,
    pub auth: ShopAuthService,
    pub carts: CartManager,
    pub checkout: CheckoutSequencer,
    pub catalog: ShopCatalogService,
    pub orders: ShopOrdersService,
    pub sandbox: ShopSandboxService,
}

impl TestContext {
    /// Anonymous session over a freshly seeded offline backend.
    pub fn new() -> Self {
        let fixture = CatalogFixture::builtin().expect("Built-in catalog should parse");
        let session = Arc::new(Session::in_memory());
        let api: Arc<dyn ShopApi> = Arc::new(ShopClient::new(
            OfflineBackend::new(&fixture),
            session.clone(),
        ));

        Self {
            auth: ShopAuthService::new(api.clone(), session.clone()),
            carts: CartManager::new(api.clone()),
            checkout: CheckoutSequencer::new(api.clone()),
            catalog: ShopCatalogService::new(api.clone()),
            orders: ShopOrdersService::new(api.clone()),
            sandbox: ShopSandboxService::new(api.clone()),
            fixture,
            session,
            api,
        }
    }

    /// Same as [`TestContext::new`], signed in as the fixture's demo customer.
    pub async fn signed_in() -> TestResult<Self> {
        let ctx = Self::new();
        let demo = ctx
            .fixture
            .demo_customer()
            .cloned()
            .expect("Built-in catalog should seed a demo customer");

        ctx.auth.login(demo.email, demo.password).await?;

        assert!(ctx.session.is_authenticated(), "demo login should sign in");

        Ok(ctx)
    }

    /// Books the backend was seeded with, in fixture order.
    pub fn books(&self) -> Vec<Book> {
        self.fixture.books()
    }

    /// Id of the first seeded book.
    pub fn first_book(&self) -> BookId {
        self.books()
            .first()
            .map(|book| book.id)
            .expect("Built-in catalog should have a book")
    }
}
