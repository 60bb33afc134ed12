//! Terminal client of Postboard. [`Session`] wires the HTTP api, the list
//! cache and the mutation coordinator together and hands out the page
//! view-models.
mod error;
pub mod http;
pub mod pages;

pub use error::ClientError;

use std::sync::Arc;
use tokio::sync::mpsc;

use postboard_core::{
    api::BlogApi,
    cache::{CachePolicy, ListCache},
    config::ClientConfig,
    mutation::{MutationCoordinator, Notice},
    query::QueryClient,
    service::spawn_cache_service,
};

use pages::{UserPostsPage, UsersPage};

/// Everything one run of the client shares. Must be created inside a tokio
/// runtime, since it starts the cache service.
pub struct Session {
    client: QueryClient,
    coordinator: MutationCoordinator,
    notices: mpsc::UnboundedReceiver<Notice>,
    config: ClientConfig,
}

impl Session {
    pub fn new(api: Arc<dyn BlogApi>, config: ClientConfig) -> Self {
        let policy = CachePolicy::with_users_stale_time(config.users_stale_time());
        let (cache, _) = spawn_cache_service(ListCache::new(policy));
        let client = QueryClient::new(api.clone(), cache.clone());
        let (coordinator, notices) = MutationCoordinator::new(api, cache);
        Self {
            client,
            coordinator,
            notices,
            config,
        }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn users_page(&self) -> UsersPage {
        UsersPage::new(
            self.client.clone(),
            self.config.page_size,
            self.config.max_visible_pages,
        )
    }

    pub fn user_posts(&self, user_id: i64) -> UserPostsPage {
        UserPostsPage::new(user_id, self.client.clone(), self.coordinator.clone())
    }

    /// Notices raised since the last call, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut drained = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            drained.push(notice);
        }
        drained
    }
}
