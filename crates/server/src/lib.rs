//! HTTP server of Postboard: the users/posts REST API over SQLite.
mod error;
pub mod routes;

pub use error::ServerError;

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use postboard_core::{db, PostboardError, PostboardResult};
use sqlite::Connection;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// 10Kb request bodies at most.
pub const BODY_LIMIT: usize = 10240;

/// Shared handle to the one sqlite connection of the server.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn open(path: &Path) -> PostboardResult<Self> {
        Ok(Self::new(db::open(path)?))
    }

    pub fn in_memory() -> PostboardResult<Self> {
        Ok(Self::new(db::open_in_memory()?))
    }

    /// Run `f` with exclusive access to the connection.
    pub fn call<T>(&self, f: impl FnOnce(&Connection) -> PostboardResult<T>) -> PostboardResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| PostboardError::custom_error("Db connection lock poisoned".into()))?;
        f(&conn)
    }

    /// Run `f` on the blocking pool, keeping sqlite work off the async
    /// workers.
    pub async fn run<T, F>(&self, f: F) -> PostboardResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> PostboardResult<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.call(f))
            .await
            .map_err(|err| PostboardError::custom_error(format!("Db task failed: {err}")))?
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
}

impl AppState {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        .route("/users", get(routes::list_users))
        .route("/users/count", get(routes::count_users))
        .route("/posts", get(routes::list_posts).post(routes::create_post))
        .route(
            "/posts/:post_id",
            axum::routing::put(routes::update_post).delete(routes::delete_post),
        )
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
