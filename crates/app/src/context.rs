//! App Context

use std::{fmt, sync::Arc};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    api::{HttpTransport, ShopApi, ShopClient, TransportError},
    auth::{
        AuthService, AuthServiceError, CredentialsError, FileCredentialStore, Session,
        ShopAuthService,
    },
    config::AppConfig,
    domain::{
        carts::CartManager,
        catalog::{CatalogService, ShopCatalogService},
        checkout::CheckoutSequencer,
        orders::{OrdersService, ShopOrdersService},
        sandbox::{SandboxService, ShopSandboxService},
    },
    offline::{CatalogFixture, FixtureError, OfflineBackend},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to open credentials")]
    Credentials(#[from] CredentialsError),

    #[error("failed to build http client")]
    Transport(#[from] TransportError),

    #[error("failed to load offline catalog")]
    Fixture(#[from] FixtureError),

    #[error("failed to sign in to the offline sandbox")]
    OfflineSignIn(#[source] AuthServiceError),
}

/// Everything a command needs, wired over one session and one backend.
#[derive(Clone)]
pub struct AppContext {
    pub session: Arc<Session>,
    pub api: Arc<dyn ShopApi>,
    pub auth: Arc<dyn AuthService>,
    pub catalog: Arc<dyn CatalogService>,
    pub orders: Arc<dyn OrdersService>,
    pub sandbox: Arc<dyn SandboxService>,
    pub carts: Arc<CartManager>,
    pub checkout: Arc<CheckoutSequencer>,
    offline: bool,
}

impl AppContext {
    /// Build application context from configuration.
    ///
    /// Online, the session is read from the credentials file and calls go over HTTP. Offline,
    /// the session lives in memory and, when the catalog seeds a demo customer, starts signed
    /// in as that customer.
    ///
    /// # Errors
    ///
    /// Returns an error when the credentials file is unreadable, the base URL is invalid, the
    /// offline catalog fails to load, or the offline demo sign-in fails.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppInitError> {
        if config.offline.offline {
            let fixture = match &config.offline.fixture {
                Some(path) => CatalogFixture::load(path)?,
                None => CatalogFixture::builtin()?,
            };

            return Self::offline(&fixture).await;
        }

        let store = Arc::new(FileCredentialStore::new(&config.session.credentials));
        let session = Arc::new(Session::open(store)?);
        let transport = HttpTransport::new(
            &config.api.api_base,
            config.api.timeout(),
            session.clone(),
        )?;

        info!(base_url = %transport.base_url(), "using backend");

        Ok(Self::with_api(
            Arc::new(ShopClient::new(transport, session.clone())),
            session,
        ))
    }

    /// Context over a fresh offline sandbox seeded from `fixture`.
    ///
    /// # Errors
    ///
    /// Returns an error if the demo customer cannot sign in.
    pub async fn offline(fixture: &CatalogFixture) -> Result<Self, AppInitError> {
        let session = Arc::new(Session::in_memory());
        let api = Arc::new(ShopClient::new(OfflineBackend::new(fixture), session.clone()));
        let mut ctx = Self::with_api(api, session);

        ctx.offline = true;

        match fixture.demo_customer() {
            Some(demo) => {
                let customer = ctx
                    .auth
                    .login(demo.email.clone(), demo.password.clone())
                    .await
                    .map_err(AppInitError::OfflineSignIn)?;

                info!(email = %customer.email, "offline sandbox, signed in as demo customer");
            }
            None => warn!("offline catalog seeds no customer, staying anonymous"),
        }

        Ok(ctx)
    }

    /// Wire every service over `api`.
    pub fn with_api(api: Arc<dyn ShopApi>, session: Arc<Session>) -> Self {
        Self {
            auth: Arc::new(ShopAuthService::new(api.clone(), session.clone())),
            catalog: Arc::new(ShopCatalogService::new(api.clone())),
            orders: Arc::new(ShopOrdersService::new(api.clone())),
            sandbox: Arc::new(ShopSandboxService::new(api.clone())),
            carts: Arc::new(CartManager::new(api.clone())),
            checkout: Arc::new(CheckoutSequencer::new(api.clone())),
            session,
            api,
            offline: false,
        }
    }

    pub const fn is_offline(&self) -> bool {
        self.offline
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("session", &self.session)
            .field("offline", &self.offline)
            .finish_non_exhaustive()
    }
}
