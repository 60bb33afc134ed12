//! Welcome to documentation of Postboard. The core crate holds everything
//! the server and the terminal client share: the domain types, the SQLite
//! access layer, and the client side machinery that keeps paged lists and
//! post mutations consistent with the server.
mod error;
pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod mutation;
pub mod pagination;
pub mod post;
pub mod query;
pub mod service;
pub mod user;

pub use error::{ApiError, PostboardError, PostboardResult};

pub mod constant {
    pub const MIN_POST_TITLE: usize = 3;
    pub const MAX_POST_TITLE: usize = 200;
    pub const MIN_POST_BODY: usize = 5;
    pub const MAX_POST_BODY: usize = 1000;
    pub const CONFIG_DIR: &str = ".postboard";
    pub const CONFIG_FILE: &str = "postboard.toml";
    pub const CONFIG_ENV: &str = "POSTBOARDCONF";
    pub const DEFAULT_PAGE_SIZE: u32 = 4;
    pub const DEFAULT_MAX_VISIBLE_PAGES: u32 = 4;
    pub const DEFAULT_USERS_STALE_SECS: u64 = 60;
    pub const CACHE_CHANNEL_SIZE: usize = 32;
}

/// Used to send acknowledgements back from the cache service.
pub type Responder<T> = tokio::sync::oneshot::Sender<T>;
