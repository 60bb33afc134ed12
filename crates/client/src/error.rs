use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid api url {url}: {msg}")]
    InvalidUrl { url: String, msg: String },

    #[error("Unable to build http client: {0}")]
    Http(#[from] reqwest::Error),
}
