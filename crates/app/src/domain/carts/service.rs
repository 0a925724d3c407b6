//! Cart state manager.
//!
//! The cart lives on the server. The manager keeps a read-through copy and replaces it
//! wholesale after every successful mutation; it never adjusts quantities or totals itself.

use std::{
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use bookcart::prelude::*;
use tracing::{debug, warn};

use crate::{
    api::{ApiError, ShopApi},
    domain::carts::errors::CartsServiceError,
};

/// Freshness of the cached cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheStatus {
    #[default]
    NeverLoaded,

    /// The cart is the last one the server returned.
    Fresh,

    /// The last fetch failed; the cart is whatever was cached before it.
    FetchFailed { message: String },
}

/// Cached cart and its freshness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartCache {
    pub cart: Cart,
    pub status: CacheStatus,
}

#[derive(Debug, Default)]
struct Slot {
    cache: CartCache,
    applied: u64,
}

pub struct CartManager {
    api: Arc<dyn ShopApi>,
    slot: Mutex<Slot>,
    tickets: AtomicU64,
}

impl CartManager {
    #[must_use]
    pub fn new(api: Arc<dyn ShopApi>) -> Self {
        Self {
            api,
            slot: Mutex::new(Slot::default()),
            tickets: AtomicU64::new(0),
        }
    }

    /// Fetch the cart and replace the cache with it.
    ///
    /// On failure the cache keeps its previous cart (empty before the first load) and is marked
    /// [`CacheStatus::FetchFailed`].
    pub async fn load_cart(&self) -> Result<Cart, CartsServiceError> {
        self.fetch().await.map_err(CartsServiceError::Api)
    }

    /// Add copies of a book, then resync.
    pub async fn add_item(&self, book_id: BookId, quantity: u32) -> Result<Cart, CartsServiceError> {
        let quantity = Quantity::new(quantity)?;

        self.api.add_to_cart(book_id, quantity).await?;

        debug!(%book_id, quantity = quantity.get(), "added to cart");

        self.resync().await
    }

    /// Set a line's quantity, then resync. Removal is [`CartManager::remove_item`], so zero is
    /// refused without contacting the server.
    pub async fn update_quantity(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<Cart, CartsServiceError> {
        let quantity = Quantity::new(quantity)?;

        self.api.update_cart_item(book_id, quantity).await?;

        debug!(%book_id, quantity = quantity.get(), "cart line updated");

        self.resync().await
    }

    pub async fn remove_item(&self, book_id: BookId) -> Result<Cart, CartsServiceError> {
        self.api.remove_cart_item(book_id).await?;

        debug!(%book_id, "cart line removed");

        self.resync().await
    }

    pub async fn clear_cart(&self) -> Result<Cart, CartsServiceError> {
        self.api.clear_cart().await?;

        debug!("cart cleared");

        self.resync().await
    }

    /// Copy of the cache.
    pub fn snapshot(&self) -> CartCache {
        self.lock().cache.clone()
    }

    pub fn status(&self) -> CacheStatus {
        self.lock().cache.status.clone()
    }

    /// Whether clearing makes sense, i.e. the cached cart has lines.
    pub fn can_clear(&self) -> bool {
        !self.lock().cache.cart.is_empty()
    }

    async fn resync(&self) -> Result<Cart, CartsServiceError> {
        self.fetch().await.map_err(CartsServiceError::Resync)
    }

    async fn fetch(&self) -> Result<Cart, ApiError> {
        let ticket = self.issue_ticket();
        let result = self.api.get_cart().await;

        self.apply(ticket, result.as_ref());

        result
    }

    fn issue_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply a fetch outcome unless a fetch issued later has already been applied.
    fn apply(&self, ticket: u64, result: Result<&Cart, &ApiError>) {
        let mut slot = self.lock();

        if ticket <= slot.applied {
            debug!(ticket, applied = slot.applied, "stale cart fetch discarded");
            return;
        }

        slot.applied = ticket;

        match result {
            Ok(cart) => {
                if let Err(mismatch) = cart.verify_totals() {
                    warn!("server cart totals are inconsistent: {mismatch}");
                }

                slot.cache = CartCache {
                    cart: cart.clone(),
                    status: CacheStatus::Fresh,
                };
            }
            Err(error) => {
                warn!("cart fetch failed: {error}");

                slot.cache.status = CacheStatus::FetchFailed {
                    message: error.user_message(),
                };
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CartManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartManager")
            .field("cache", &self.snapshot())
            .finish_non_exhaustive()
    }
}
