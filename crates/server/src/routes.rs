use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use postboard_core::{
    constant::DEFAULT_PAGE_SIZE,
    db,
    post::{NewPost, Post, PostChanges, PostDraft},
    user::User,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{AppState, ServerError};

/// Query of `GET /users`. Values that are missing or do not parse fall
/// back to the first page of `DEFAULT_PAGE_SIZE` users.
#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    #[serde(rename = "pageNumber")]
    page_number: Option<String>,
    #[serde(rename = "pageSize")]
    page_size: Option<String>,
}

impl UsersQuery {
    pub fn page_number(&self) -> u32 {
        self.page_number
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse<T> {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl MessageResponse<()> {
    fn text(message: &str) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Vec<User>>, ServerError> {
    let (page_number, page_size) = (query.page_number(), query.page_size());
    debug!(page_number, page_size, "Listing users");
    let users = state
        .db
        .run(move |conn| db::query_users(conn, page_number, page_size))
        .await
        .map_err(|err| ServerError::from_core("Failed to retrieve users", err))?;
    Ok(Json(users))
}

pub async fn count_users(State(state): State<AppState>) -> Result<Json<CountResponse>, ServerError> {
    let count = state
        .db
        .run(db::count_users)
        .await
        .map_err(|err| ServerError::from_core("Failed to retrieve users count", err))?;
    Ok(Json(CountResponse { count }))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<Vec<Post>>, ServerError> {
    const SUMMARY: &str = "Failed to retrieve posts";
    let user_id = match query.user_id.as_deref().map(str::trim) {
        None | Some("") => return Err(ServerError::bad_request(SUMMARY, "userId is required")),
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| ServerError::bad_request(SUMMARY, "Invalid user ID"))?,
    };
    let posts = state
        .db
        .run(move |conn| db::query_posts_by_user(conn, user_id))
        .await
        .map_err(|err| ServerError::from_core(SUMMARY, err))?;
    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<AppState>,
    payload: Result<Json<NewPost>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
    const SUMMARY: &str = "Failed to add post";
    let Json(new_post) = payload.map_err(|err| ServerError::bad_request(SUMMARY, err.body_text()))?;
    let user_id = new_post.user_id;
    let draft = PostDraft::from(new_post)
        .validate()
        .map_err(|err| ServerError::from_core(SUMMARY, err))?;

    let post = state
        .db
        .run(move |conn| db::insert_post(conn, user_id, draft))
        .await
        .map_err(|err| ServerError::from_core(SUMMARY, err))?;
    info!(post_id = post.id, user_id, "Post added");

    let body = MessageResponse {
        message: "Post added successfully".into(),
        data: Some(post),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn update_post(
    State(state): State<AppState>,
    post_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PostChanges>, JsonRejection>,
) -> Result<Json<MessageResponse<()>>, ServerError> {
    const SUMMARY: &str = "Failed to update post";
    let Path(post_id) = post_id.map_err(|_| ServerError::bad_request(SUMMARY, "Invalid post ID"))?;
    let Json(changes) = payload.map_err(|err| ServerError::bad_request(SUMMARY, err.body_text()))?;
    let draft = PostDraft::from(changes)
        .validate()
        .map_err(|err| ServerError::from_core(SUMMARY, err))?;

    state
        .db
        .run(move |conn| db::update_post(conn, post_id, draft))
        .await
        .map_err(|err| ServerError::from_core(SUMMARY, err))?;
    info!(post_id, "Post updated");
    Ok(Json(MessageResponse::text("Post updated successfully")))
}

pub async fn delete_post(
    State(state): State<AppState>,
    post_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse<()>>, ServerError> {
    const SUMMARY: &str = "Failed to delete post";
    let Path(post_id) = post_id.map_err(|_| ServerError::bad_request(SUMMARY, "Invalid post ID"))?;
    state
        .db
        .run(move |conn| db::delete_post_by_id(conn, post_id))
        .await
        .map_err(|err| ServerError::from_core(SUMMARY, err))?;
    info!(post_id, "Post deleted");
    Ok(Json(MessageResponse::text("Post deleted successfully")))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn users_query_falls_back() {
        let query = UsersQuery::default();
        assert_eq!((query.page_number(), query.page_size()), (0, DEFAULT_PAGE_SIZE));

        let query = UsersQuery {
            page_number: Some("two".into()),
            page_size: Some("0".into()),
        };
        assert_eq!((query.page_number(), query.page_size()), (0, DEFAULT_PAGE_SIZE));

        let query = UsersQuery {
            page_number: Some("2".into()),
            page_size: Some(" 5".into()),
        };
        assert_eq!((query.page_number(), query.page_size()), (2, 5));
    }
}
