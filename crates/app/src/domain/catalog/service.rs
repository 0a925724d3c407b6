//! Catalog service.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bookcart::prelude::*;
use mockall::automock;

use crate::{
    api::{BookQuery, ShopApi},
    domain::catalog::errors::CatalogServiceError,
};

#[derive(Clone)]
pub struct ShopCatalogService {
    api: Arc<dyn ShopApi>,
}

impl ShopCatalogService {
    #[must_use]
    pub fn new(api: Arc<dyn ShopApi>) -> Self {
        Self { api }
    }
}

impl fmt::Debug for ShopCatalogService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopCatalogService").finish_non_exhaustive()
    }
}

#[async_trait]
impl CatalogService for ShopCatalogService {
    async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>, CatalogServiceError> {
        let query = BookQuery {
            search: query.search.filter(|s| !s.trim().is_empty()),
            ordering: query.ordering.filter(|s| !s.trim().is_empty()),
        };

        Ok(self.api.list_books(query).await?)
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, CatalogServiceError> {
        Ok(self.api.get_book(book_id).await?)
    }
}

#[automock]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Books matching the query, in the requested order.
    async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>, CatalogServiceError>;

    /// A single book.
    async fn get_book(&self, book_id: BookId) -> Result<Book, CatalogServiceError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use crate::{api::{ApiError, MockShopApi}, test::TestContext};

    use super::*;

    #[tokio::test]
    async fn blank_filters_are_dropped() -> TestResult {
        let mut api = MockShopApi::new();

        api.expect_list_books()
            .withf(|query| query.search.is_none() && query.ordering.as_deref() == Some("Price"))
            .once()
            .returning(|_| Ok(Vec::new()));

        let service = ShopCatalogService::new(Arc::new(api));

        service
            .list_books(BookQuery {
                search: Some("  ".to_string()),
                ordering: Some("Price".to_string()),
            })
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn missing_book_is_not_found() {
        let mut api = MockShopApi::new();

        api.expect_get_book().once().returning(|_| {
            Err(ApiError::Rejected {
                status: 404,
                message: "Not found.".to_string(),
                body: json!({ "detail": "Not found." }),
            })
        });

        let result = ShopCatalogService::new(Arc::new(api))
            .get_book(BookId::new(404))
            .await;

        assert!(
            matches!(result, Err(CatalogServiceError::NotFound)),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn offline_catalog_supports_search_and_ordering() -> TestResult {
        let ctx = TestContext::new();

        let by_price = ctx
            .catalog
            .list_books(BookQuery {
                search: None,
                ordering: Some("-Price".to_string()),
            })
            .await?;

        assert!(
            by_price.windows(2).all(|pair| match pair {
                [first, second] => first.price >= second.price,
                _ => true,
            }),
            "books should be sorted by descending price"
        );

        let first = ctx.first_book();
        let book = ctx.catalog.get_book(first).await?;
        let found = ctx
            .catalog
            .list_books(BookQuery {
                search: Some(book.title.to_lowercase()),
                ordering: None,
            })
            .await?;

        assert!(
            found.iter().any(|candidate| candidate.id == first),
            "search by title should find the book"
        );

        Ok(())
    }
}
