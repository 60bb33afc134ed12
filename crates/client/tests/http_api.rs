//! End to end tests: the client's HTTP api and sessions against a real
//! server on a random port.

use std::{sync::Arc, time::Duration};

use client::{http::HttpApi, Session};
use postboard_core::{
    api::BlogApi,
    config::ClientConfig,
    db,
    mutation::{MutationState, NoticeLevel},
    post::{NewPost, PostChanges, PostDraft},
    ApiError, PostboardError,
};
use server::{router, AppState, Db};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Serve a seeded Db in a temp dir and return the base URL.
async fn spawn_server() -> (String, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = Db::open(&dir.path().join("postboard.db")).unwrap();
    store.call(db::seed_users).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(AppState::new(store)))
            .await
            .unwrap();
    });

    (format!("http://{addr}"), dir)
}

fn api(base_url: &str) -> HttpApi {
    HttpApi::new(base_url, Duration::from_secs(5)).unwrap()
}

fn session(base_url: &str) -> Session {
    let config = ClientConfig {
        api_url: base_url.to_string(),
        ..ClientConfig::default()
    };
    Session::new(Arc::new(api(base_url)), config)
}

#[tokio::test]
async fn users_pages_are_one_based() {
    let (url, _dir) = spawn_server().await;
    let api = api(&url);

    let first: Vec<i64> = api
        .fetch_users(1, 4)
        .await
        .unwrap()
        .iter()
        .map(|user| user.id)
        .collect();
    assert_eq!(first, vec![1, 2, 3, 4]);

    let third = api.fetch_users(3, 4).await.unwrap();
    assert_eq!(third.first().map(|user| user.id), Some(9));
    assert_eq!(api.fetch_user_count().await.unwrap(), 12);
}

#[tokio::test]
async fn post_calls_round_trip() {
    let (url, _dir) = spawn_server().await;
    let api = api(&url);

    let created = api
        .create_post(NewPost {
            title: "From the client".into(),
            body: "Sent over HTTP".into(),
            user_id: 5,
        })
        .await
        .unwrap();
    assert_eq!(created.user_id, 5);

    api.update_post(
        created.id,
        PostChanges {
            title: "Edited title".into(),
            body: "Edited over HTTP".into(),
        },
    )
    .await
    .unwrap();
    let posts = api.fetch_user_posts(5).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Edited title");

    api.delete_post(created.id).await.unwrap();
    let err = api.delete_post(created.id).await.unwrap_err();
    assert_eq!(err, ApiError::not_found("Post not found"));
}

#[tokio::test]
async fn server_validation_message_reaches_the_client() {
    let (url, _dir) = spawn_server().await;
    let err = api(&url)
        .create_post(NewPost {
            title: "Ok title".into(),
            body: "tiny".into(),
            user_id: 1,
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err.message().starts_with("Post content must be between"));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = api(&format!("http://{addr}"))
        .fetch_user_count()
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Network { .. }));
}

#[tokio::test]
async fn users_page_walks_through_the_control() {
    let (url, _dir) = spawn_server().await;
    let session = session(&url);
    let mut users = session.users_page();

    assert_eq!(users.load_count().await.unwrap(), 3);
    let view = users.refresh().await.unwrap();
    assert_eq!(view.users.len(), 4);
    assert!(!view.is_placeholder);

    assert!(users.go_to(3).await.unwrap());
    let view = users.view().unwrap();
    assert_eq!(view.page, 3);
    assert_eq!(view.users[0].id, 9);

    // Active and out of range pages are refused without a fetch.
    assert!(!users.go_to(3).await.unwrap());
    assert!(!users.go_to(4).await.unwrap());
    assert!(!users.next().await.unwrap());
    assert!(users.prev().await.unwrap());
    assert_eq!(users.control().current_page, 2);
}

#[tokio::test]
async fn user_posts_page_mutations() {
    let (url, _dir) = spawn_server().await;
    let mut session = session(&url);
    let posts = session.user_posts(2);

    let outcome = posts
        .create(PostDraft::new("  A new post ", "With a body"))
        .await
        .unwrap();
    assert!(outcome.is_committed());
    let created = outcome.post.unwrap();
    assert_eq!(created.title, "A new post");

    let outcome = posts
        .edit(created.id, PostDraft::new("A renamed post", "With a new body"))
        .await
        .unwrap();
    assert!(outcome.is_committed());
    let listed = posts.posts().await.unwrap();
    assert_eq!(listed[0].title, "A renamed post");

    let outcome = posts.delete(created.id).await.unwrap();
    assert!(outcome.is_committed());
    assert!(posts.posts().await.unwrap().is_empty());

    let outcome = posts.delete(created.id).await.unwrap();
    assert_eq!(outcome.state, MutationState::RolledBack);
    assert_eq!(outcome.message, "Post not found");

    let messages: Vec<(NoticeLevel, String)> = session
        .drain_notices()
        .into_iter()
        .map(|notice| (notice.level, notice.message))
        .collect();
    assert_eq!(
        messages,
        vec![
            (NoticeLevel::Success, "Post created".to_string()),
            (NoticeLevel::Success, "Post updated".to_string()),
            (NoticeLevel::Success, "Post deleted".to_string()),
            (NoticeLevel::Error, "Post not found".to_string()),
        ]
    );
}

#[tokio::test]
async fn invalid_drafts_are_not_sent() {
    let (url, _dir) = spawn_server().await;
    let session = session(&url);
    let err = session
        .user_posts(1)
        .create(PostDraft::new("   ", "Body text"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PostboardError>(),
        Some(PostboardError::EmptyTitle)
    ));
}
