//! [`BlogApi`] over HTTP, talking to the Postboard server.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;
use tracing::{debug, trace};

use postboard_core::{
    api::BlogApi,
    config::ClientConfig,
    post::{NewPost, Post, PostChanges},
    user::User,
    ApiError,
};

use crate::ClientError;

pub struct HttpApi {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct CountReply {
    count: u64,
}

#[derive(Deserialize)]
struct CreatedReply {
    data: Post,
}

/// Body of every failure reply of the server.
#[derive(Deserialize, Default)]
struct ErrorReply {
    message: Option<String>,
    error: Option<String>,
}

impl HttpApi {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(api_url).map_err(|err| ClientError::InvalidUrl {
            url: api_url.to_string(),
            msg: err.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: api_url.to_string(),
                msg: "not a base url".into(),
            });
        }
        // Without the trailing slash `join` would replace the last segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(&config.api_url, config.request_timeout())
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::network(format!("Invalid request url: {err}")))
    }

    /// Send the request and hand back the body of a successful reply.
    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|err| ApiError::network(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::network(err.to_string()))?;
        trace!(%status, bytes = body.len(), "Reply received");
        if !status.is_success() {
            return Err(error_from_reply(status, &body));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body)
            .map_err(|err| ApiError::remote(None, format!("Unexpected reply from server: {err}")))
    }
}

/// The server's own words when it gave any, the status otherwise.
fn error_from_reply(status: StatusCode, body: &str) -> ApiError {
    let reply = serde_json::from_str::<ErrorReply>(body).unwrap_or_default();
    let message = reply
        .error
        .or(reply.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
    match status {
        StatusCode::NOT_FOUND => ApiError::not_found(message),
        _ => ApiError::remote(Some(status.as_u16()), message),
    }
}

#[async_trait]
impl BlogApi for HttpApi {
    async fn fetch_users(&self, page: u32, page_size: u32) -> Result<Vec<User>, ApiError> {
        // The server counts pages from 0.
        let page_number = page.saturating_sub(1);
        debug!(page_number, page_size, "GET /users");
        let request = self
            .client
            .get(self.url("users")?)
            .query(&[("pageNumber", page_number), ("pageSize", page_size)]);
        self.send_json(request).await
    }

    async fn fetch_user_count(&self) -> Result<u64, ApiError> {
        let reply: CountReply = self.send_json(self.client.get(self.url("users/count")?)).await?;
        Ok(reply.count)
    }

    async fn fetch_user_posts(&self, user_id: i64) -> Result<Vec<Post>, ApiError> {
        debug!(user_id, "GET /posts");
        let request = self
            .client
            .get(self.url("posts")?)
            .query(&[("userId", user_id)]);
        self.send_json(request).await
    }

    async fn create_post(&self, new_post: NewPost) -> Result<Post, ApiError> {
        let request = self.client.post(self.url("posts")?).json(&new_post);
        let reply: CreatedReply = self.send_json(request).await?;
        Ok(reply.data)
    }

    async fn delete_post(&self, post_id: i64) -> Result<(), ApiError> {
        let request = self.client.delete(self.url(&format!("posts/{post_id}"))?);
        self.send(request).await.map(|_| ())
    }

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<(), ApiError> {
        let request = self
            .client
            .put(self.url(&format!("posts/{post_id}"))?)
            .json(&changes);
        self.send(request).await.map(|_| ())
    }
}
