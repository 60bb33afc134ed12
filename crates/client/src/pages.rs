//! View-models of the two screens: the paged users table and a user's
//! post list.

use postboard_core::{
    cache::{CacheRead, QueryKey},
    mutation::{MutationCoordinator, MutationOutcome},
    pagination::{total_pages, PaginationControl},
    post::{Post, PostDraft},
    query::{QueryClient, UsersPager, UsersView},
    PostboardResult,
};
use tracing::debug;

/// Users table with its pagination control.
pub struct UsersPage {
    pager: UsersPager,
    control: PaginationControl,
    view: Option<UsersView>,
}

impl UsersPage {
    pub fn new(client: QueryClient, page_size: u32, max_visible: u32) -> Self {
        Self {
            pager: UsersPager::new(client, page_size),
            control: PaginationControl::new(1, 0, max_visible),
            view: None,
        }
    }

    pub fn control(&self) -> &PaginationControl {
        &self.control
    }

    pub fn view(&self) -> Option<&UsersView> {
        self.view.as_ref()
    }

    /// Load the users count and size the control from it, without loading
    /// any page.
    pub async fn load_count(&mut self) -> PostboardResult<u32> {
        if let Some(count) = self.pager.client().user_count().await? {
            self.control.total_pages = total_pages(count, self.pager.page_size());
        }
        Ok(self.control.total_pages)
    }

    /// Load the current page and the count.
    pub async fn refresh(&mut self) -> PostboardResult<&UsersView> {
        self.control.is_loading = true;
        let view = match self.pager.load().await {
            Ok(view) => view,
            Err(err) => {
                self.control.is_loading = false;
                return Err(err);
            }
        };
        self.control.current_page = view.page;
        self.control.total_pages = view.total_pages;
        self.control.is_loading = view.is_placeholder;
        let view: &UsersView = self.view.insert(view);
        Ok(view)
    }

    /// Move to `target` when the control allows it. Returns false, loading
    /// nothing, when the control refuses the page.
    pub async fn go_to(&mut self, target: u32) -> PostboardResult<bool> {
        let Some(page) = self.control.request(target) else {
            debug!(target, current = self.control.current_page, "Page change ignored");
            return Ok(false);
        };
        self.pager.set_page(page);
        self.control.current_page = page;
        self.refresh().await?;
        Ok(true)
    }

    pub async fn next(&mut self) -> PostboardResult<bool> {
        match self.control.next() {
            Some(page) => self.go_to(page).await,
            None => Ok(false),
        }
    }

    pub async fn prev(&mut self) -> PostboardResult<bool> {
        match self.control.prev() {
            Some(page) => self.go_to(page).await,
            None => Ok(false),
        }
    }
}

/// The posts of one user and the actions on them.
pub struct UserPostsPage {
    user_id: i64,
    client: QueryClient,
    coordinator: MutationCoordinator,
}

impl UserPostsPage {
    pub fn new(user_id: i64, client: QueryClient, coordinator: MutationCoordinator) -> Self {
        Self {
            user_id,
            client,
            coordinator,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::posts(self.user_id)
    }

    /// Read the list. A cached list is returned right away and refreshed
    /// in the background.
    pub async fn read(&self) -> PostboardResult<CacheRead> {
        self.client.read(self.key()).await
    }

    /// The list, fetched from the server now.
    pub async fn posts(&self) -> PostboardResult<Vec<Post>> {
        match self.client.fetch(self.key()).await? {
            Ok(value) => Ok(value.into_posts().unwrap_or_default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Validate `draft` and submit it. Invalid drafts never reach the server.
    pub async fn create(&self, draft: PostDraft) -> PostboardResult<MutationOutcome> {
        let draft = draft.validate()?;
        self.coordinator
            .create_post(draft.into_new_post(self.user_id))
            .await
    }

    pub async fn edit(&self, post_id: i64, draft: PostDraft) -> PostboardResult<MutationOutcome> {
        let draft = draft.validate()?;
        self.coordinator
            .update_post(self.user_id, post_id, draft.into_changes())
            .await
    }

    pub async fn delete(&self, post_id: i64) -> PostboardResult<MutationOutcome> {
        self.coordinator.delete_post(self.user_id, post_id).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::http::HttpApi;
    use postboard_core::{cache::ListCache, service::spawn_cache_service};
    use std::{sync::Arc, time::Duration};

    #[tokio::test]
    async fn failed_refresh_releases_the_control() {
        let (cache, task) = spawn_cache_service(ListCache::default());
        task.abort();
        assert!(task.await.is_err());

        let api = HttpApi::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let client = QueryClient::new(Arc::new(api), cache);
        let mut users = UsersPage::new(client, 4, 5);

        assert!(users.refresh().await.is_err());
        assert!(!users.control().is_loading);
        assert!(users.view().is_none());
    }
}
