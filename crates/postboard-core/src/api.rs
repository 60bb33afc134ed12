//! The calls the client makes to the server. The cache and the mutation
//! coordinator only ever talk to the server through [`BlogApi`].

use async_trait::async_trait;

use crate::{
    post::{NewPost, Post, PostChanges},
    user::User,
    ApiError,
};

#[async_trait]
pub trait BlogApi: Send + Sync {
    /// One page of users; `page` is 1 based.
    async fn fetch_users(&self, page: u32, page_size: u32) -> Result<Vec<User>, ApiError>;
    async fn fetch_user_count(&self) -> Result<u64, ApiError>;
    async fn fetch_user_posts(&self, user_id: i64) -> Result<Vec<Post>, ApiError>;
    async fn create_post(&self, new_post: NewPost) -> Result<Post, ApiError>;
    async fn delete_post(&self, post_id: i64) -> Result<(), ApiError>;
    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<(), ApiError>;
}
