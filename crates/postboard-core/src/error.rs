use thiserror::Error;

pub type PostboardResult<T> = anyhow::Result<T>;

#[derive(Error, Debug)]
pub enum PostboardError {
    /// An empty title was provided for the post.
    #[error("Post title is required")]
    EmptyTitle,
    /// An empty body was provided for the post.
    #[error("Post content is required")]
    EmptyBody,
    /// The title length is outside the allowed range.
    #[error("Post title must be between {min_size} and {max_size} characters, current size: {curr_size}")]
    InvalidTitleLength {
        min_size: usize,
        max_size: usize,
        curr_size: usize,
    },
    /// The body length is outside the allowed range.
    #[error("Post content must be between {min_size} and {max_size} characters, current size: {curr_size}")]
    InvalidBodyLength {
        min_size: usize,
        max_size: usize,
        curr_size: usize,
    },
    /// The requested/specified post ID does not exist.
    #[error("Post not found")]
    PostNotFound { id: i64 },
    /// The requested/specified user ID does not exist.
    #[error("User not found")]
    UserNotFound { id: i64 },
    #[error("ERROR: {msg}")]
    SqliteError { msg: String },
    /// A mutation was asked to move to a state it cannot reach.
    #[error("Mutation cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    /// The cache service task is gone.
    #[error("Cache service is not running")]
    CacheClosed,
    #[error("Config error: {msg}")]
    ConfigError { msg: String },
    /// Custom Error type for errors not covered by the above errors.
    #[error("{msg}")]
    CustomError { msg: String },
}

impl PostboardError {
    pub fn custom_error(msg: String) -> Self {
        Self::CustomError { msg }
    }

    pub fn config_error(msg: String) -> Self {
        Self::ConfigError { msg }
    }

    /// True for the errors caused by a bad post title/body.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyTitle
                | Self::EmptyBody
                | Self::InvalidTitleLength { .. }
                | Self::InvalidBodyLength { .. }
        )
    }
}

impl From<sqlite::Error> for PostboardError {
    fn from(err: sqlite::Error) -> Self {
        Self::SqliteError {
            msg: err.to_string(),
        }
    }
}

/// Failure of a call across the client/server boundary. Every variant
/// carries a message that can be shown to the user as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never got a response.
    #[error("{message}")]
    Network { message: String },
    /// The server answered with a failure status.
    #[error("{message}")]
    Remote { status: Option<u16>, message: String },
    /// The target of the request does not exist on the server.
    #[error("{message}")]
    NotFound { message: String },
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Network { message } | Self::Remote { message, .. } | Self::NotFound { message } => {
                message
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { .. } => None,
            Self::Remote { status, .. } => *status,
            Self::NotFound { .. } => Some(404),
        }
    }
}
