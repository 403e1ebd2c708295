//! Offset-based paging over Redmine list endpoints.

use std::future::Future;

use serde::Deserialize;
use tracing::debug;

use super::error::{ApiError, Result};

/// One page of a list endpoint.
///
/// Redmine wraps list results as
/// `{ "<collection>": [...], "total_count": N, "offset": N, "limit": N }`;
/// the collection key differs per resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// The entities on this page, in server order.
    #[serde(
        rename = "items",
        alias = "issues",
        alias = "projects",
        alias = "memberships",
        default = "Vec::new"
    )]
    pub items: Vec<T>,
    /// Declared size of the whole collection.
    #[serde(default)]
    pub total_count: usize,
    /// Offset of the first item on this page.
    #[serde(default)]
    pub offset: usize,
    /// Page size the server applied.
    #[serde(default)]
    pub limit: usize,
}

/// Fetch every page of a collection, starting at offset zero.
///
/// `fetch_page` is called with the number of items collected so far as the
/// offset. Stops once the declared total has been collected. A failed page
/// aborts the whole fetch and drops everything collected before it.
///
/// An empty page before the total is reached is reported as
/// [`ApiError::PaginationStalled`] instead of being requested again forever.
pub async fn drain_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items: Vec<T> = Vec::new();

    loop {
        let offset = items.len();
        let page = fetch_page(offset).await?;
        let total = page.total_count;
        let received = page.items.len();

        items.extend(page.items);
        debug!(offset, received, total, "Fetched page");

        if total <= items.len() {
            return Ok(items);
        }
        if received == 0 {
            return Err(ApiError::PaginationStalled {
                fetched: items.len(),
                total,
            });
        }
    }
}
