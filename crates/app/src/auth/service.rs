//! Auth service.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use mockall::automock;
use tracing::{info, warn};

use crate::{
    api::ShopApi,
    auth::{AccessToken, AuthServiceError, Customer, LoginRequest, RegisterRequest, Session},
};

#[derive(Clone)]
pub struct ShopAuthService {
    api: Arc<dyn ShopApi>,
    session: Arc<Session>,
}

impl ShopAuthService {
    #[must_use]
    pub fn new(api: Arc<dyn ShopApi>, session: Arc<Session>) -> Self {
        Self { api, session }
    }
}

impl fmt::Debug for ShopAuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopAuthService")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthService for ShopAuthService {
    async fn login(&self, email: String, password: String) -> Result<Customer, AuthServiceError> {
        let email = email.trim().to_string();

        if email.is_empty() || password.is_empty() {
            return Err(AuthServiceError::MissingCredentials);
        }

        let response = self.api.login(LoginRequest { email, password }).await?;
        let token = response.token.and_then(AccessToken::new);

        self.session.sign_in(token, response.customer.clone());

        Ok(response.customer)
    }

    async fn register(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> Result<Customer, AuthServiceError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthServiceError::MissingCredentials);
        }

        let customer = self
            .api
            .register(RegisterRequest {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                password,
            })
            .await?;

        info!(customer_id = customer.customer_id, "registered");

        Ok(customer)
    }

    async fn logout(&self) -> Result<(), AuthServiceError> {
        let result = self.api.logout().await;

        if let Err(error) = &result {
            warn!("server-side logout failed: {error}");
        }

        self.session.evict();

        result.map_err(AuthServiceError::from)
    }

    async fn current_customer(&self) -> Result<Option<Customer>, AuthServiceError> {
        Ok(self.api.me().await?)
    }
}

#[automock]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Sign in and remember the credential.
    async fn login(&self, email: String, password: String) -> Result<Customer, AuthServiceError>;

    /// Create an account. Does not sign in.
    async fn register(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> Result<Customer, AuthServiceError>;

    /// Sign out on the server, then forget the credential locally whatever the server said.
    async fn logout(&self) -> Result<(), AuthServiceError>;

    /// Customer the backend considers signed in, if any.
    async fn current_customer(&self) -> Result<Option<Customer>, AuthServiceError>;
}
