//! Read side of the client: fetching through the cache with
//! stale-while-revalidate reads, and the users pager that keeps the
//! previous page on screen while the next one loads.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    api::BlogApi,
    cache::{CacheRead, CacheValue, FetchTicket, QueryKey},
    pagination::total_pages,
    service::CacheHandle,
    user::User,
    ApiError, PostboardResult,
};

#[derive(Clone)]
pub struct QueryClient {
    api: Arc<dyn BlogApi>,
    cache: CacheHandle,
}

impl QueryClient {
    pub fn new(api: Arc<dyn BlogApi>, cache: CacheHandle) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &CacheHandle {
        &self.cache
    }

    pub fn api(&self) -> &Arc<dyn BlogApi> {
        &self.api
    }

    /// Fetch `key` now, whatever the cache holds, and store the result.
    pub async fn fetch(&self, key: QueryKey) -> PostboardResult<Result<CacheValue, ApiError>> {
        let ticket = self.cache.begin_fetch(key).await?;
        self.run_fetch(ticket).await
    }

    async fn run_fetch(&self, ticket: FetchTicket) -> PostboardResult<Result<CacheValue, ApiError>> {
        let result = match ticket.key {
            QueryKey::Users { page, page_size } => self
                .api
                .fetch_users(page, page_size)
                .await
                .map(CacheValue::Users),
            QueryKey::UserCount => self.api.fetch_user_count().await.map(CacheValue::Count),
            QueryKey::Posts { user_id } => self
                .api
                .fetch_user_posts(user_id)
                .await
                .map(CacheValue::Posts),
        };
        if let Err(err) = &result {
            warn!(key = %ticket.key, %err, "Fetch failed");
        }
        let applied = self.cache.complete_fetch(ticket, result.clone()).await?;
        if !applied {
            debug!(key = %ticket.key, "Response arrived after a newer write, ignored");
        }
        Ok(result)
    }

    /// Read `key` with stale-while-revalidate semantics.
    ///
    /// A cached value is returned immediately; when it is stale a refetch is
    /// started in the background and `is_fetching` is set on the returned
    /// read. With nothing cached, the fetch is awaited and its outcome
    /// (value or error) returned.
    pub async fn read(&self, key: QueryKey) -> PostboardResult<CacheRead> {
        let mut read = self.cache.read(key).await?;
        if !read.should_fetch() {
            return Ok(read);
        }
        let ticket = self.cache.begin_fetch(key).await?;
        if read.value.is_some() {
            self.spawn_fetch(ticket);
            read.is_fetching = true;
            return Ok(read);
        }
        // The outcome, value or error, lands in the cache slot.
        let _fetched = self.run_fetch(ticket).await?;
        self.cache.read(key).await
    }

    fn spawn_fetch(&self, ticket: FetchTicket) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(err) = client.run_fetch(ticket).await {
                warn!(key = %ticket.key, %err, "Background revalidation failed");
            }
        })
    }

    /// Total number of users, cached under its own key.
    pub async fn user_count(&self) -> PostboardResult<Option<u64>> {
        let read = self.read(QueryKey::UserCount).await?;
        Ok(read.value.as_ref().and_then(CacheValue::as_count))
    }
}

/// What the users table shows for the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsersView {
    pub page: u32,
    pub page_size: u32,
    pub users: Vec<User>,
    /// `users` belongs to an earlier page and is shown while this one loads.
    pub is_placeholder: bool,
    pub is_fetching: bool,
    pub error: Option<ApiError>,
    pub total_count: Option<u64>,
    pub total_pages: u32,
}

/// Paged users list with keep-previous-data semantics: after a page
/// change, the last list shown stays visible until the new page's data or
/// an error arrives.
pub struct UsersPager {
    client: QueryClient,
    page: u32,
    page_size: u32,
    displayed: Option<Vec<User>>,
}

impl UsersPager {
    pub fn new(client: QueryClient, page_size: u32) -> Self {
        Self {
            client,
            page: 1,
            page_size: page_size.max(1),
            displayed: None,
        }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::users(self.page, self.page_size)
    }

    /// Move to `page`. Nothing is fetched until `load`/`spawn_load`.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Read (fetching when needed) the current page and the count, then
    /// build the view.
    pub async fn load(&mut self) -> PostboardResult<UsersView> {
        self.client.read(self.key()).await?;
        self.client.read(QueryKey::UserCount).await?;
        self.view().await
    }

    /// Start loading the current page in the background. The page may have
    /// changed by the time the response arrives; it is stored under the key
    /// it was requested for either way.
    pub fn spawn_load(&self) -> JoinHandle<PostboardResult<()>> {
        let client = self.client.clone();
        let key = self.key();
        tokio::spawn(async move {
            client.read(key).await?;
            client.read(QueryKey::UserCount).await?;
            Ok(())
        })
    }

    /// Build the view from what the cache holds right now, without fetching.
    pub async fn view(&mut self) -> PostboardResult<UsersView> {
        let read = self.client.cache().read(self.key()).await?;
        let count_read = self.client.cache().read(QueryKey::UserCount).await?;
        let total_count = count_read.value.as_ref().and_then(CacheValue::as_count);

        let (users, is_placeholder, error) = match read.value.and_then(CacheValue::into_users) {
            Some(users) => {
                self.displayed = Some(users.clone());
                (users, false, read.error)
            }
            None => match read.error {
                Some(err) => {
                    self.displayed = None;
                    (Vec::new(), false, Some(err))
                }
                None => {
                    let placeholder = self.displayed.clone();
                    let is_placeholder = placeholder.is_some();
                    (placeholder.unwrap_or_default(), is_placeholder, None)
                }
            },
        };

        Ok(UsersView {
            page: self.page,
            page_size: self.page_size,
            users,
            is_placeholder,
            is_fetching: read.is_fetching,
            error,
            total_count,
            total_pages: total_count.map_or(0, |count| total_pages(count, self.page_size)),
        })
    }
}
