//! Post mutations. Each create/update/delete runs through a small state
//! machine, `Idle -> Pending -> Committed | RolledBack`, and leaves exactly
//! one [`Notice`] for the user.
//!
//! Deletes are optimistic: the post disappears from the cached list before
//! the server answers, and the list is put back verbatim if the server
//! refuses. Creates and updates only touch the cache once they succeed.

use std::{fmt::Display, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    api::BlogApi,
    cache::{CacheValue, QueryKey},
    post::{NewPost, Post, PostChanges},
    service::CacheHandle,
    ApiError, PostboardError, PostboardResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Pending,
    Committed,
    RolledBack,
}

impl Display for MutationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MutationState::Idle => "idle",
            MutationState::Pending => "pending",
            MutationState::Committed => "committed",
            MutationState::RolledBack => "rolled back",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn success_message(&self) -> &'static str {
        match self {
            MutationKind::Create => "Post created",
            MutationKind::Update => "Post updated",
            MutationKind::Delete => "Post deleted",
        }
    }

    /// Shown when the server gave no message of its own.
    pub fn failure_fallback(&self) -> &'static str {
        match self {
            MutationKind::Create => "Failed to create post",
            MutationKind::Update => "Failed to update post",
            MutationKind::Delete => "Failed to delete post",
        }
    }
}

/// One in-flight mutation on the post list of `user_id`.
#[derive(Debug)]
pub struct Mutation {
    kind: MutationKind,
    user_id: i64,
    state: MutationState,
    // Outer `None`: nothing taken. `Some(None)`: the list was absent.
    snapshot: Option<Option<CacheValue>>,
}

impl Mutation {
    pub fn new(kind: MutationKind, user_id: i64) -> Self {
        Self {
            kind,
            user_id,
            state: MutationState::Idle,
            snapshot: None,
        }
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::posts(self.user_id)
    }

    pub fn begin(&mut self) -> PostboardResult<()> {
        self.transition(MutationState::Pending)
    }

    pub fn commit(&mut self) -> PostboardResult<()> {
        self.transition(MutationState::Committed)?;
        self.snapshot = None;
        Ok(())
    }

    pub fn roll_back(&mut self) -> PostboardResult<()> {
        self.transition(MutationState::RolledBack)
    }

    /// Keep the list as it was before the optimistic write.
    pub fn hold_snapshot(&mut self, snapshot: Option<CacheValue>) {
        self.snapshot = Some(snapshot);
    }

    pub fn take_snapshot(&mut self) -> Option<Option<CacheValue>> {
        self.snapshot.take()
    }

    fn transition(&mut self, to: MutationState) -> PostboardResult<()> {
        let allowed = matches!(
            (self.state, to),
            (MutationState::Idle, MutationState::Pending)
                | (MutationState::Pending, MutationState::Committed)
                | (MutationState::Pending, MutationState::RolledBack)
        );
        if !allowed {
            return Err(PostboardError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            }
            .into());
        }
        debug!(kind = ?self.kind, user_id = self.user_id, from = %self.state, %to, "Mutation state change");
        self.state = to;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient message for the user, the toast of the terminal client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            NoticeLevel::Success => write!(f, "✔ {}", self.message),
            NoticeLevel::Error => write!(f, "✘ {}", self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub kind: MutationKind,
    pub state: MutationState,
    /// The stored post, for a committed create.
    pub post: Option<Post>,
    pub error: Option<ApiError>,
    /// The text of the notice that was sent.
    pub message: String,
}

impl MutationOutcome {
    pub fn is_committed(&self) -> bool {
        self.state == MutationState::Committed
    }
}

/// Runs post mutations against the server and keeps the cached post lists
/// in step with them.
#[derive(Clone)]
pub struct MutationCoordinator {
    api: Arc<dyn BlogApi>,
    cache: CacheHandle,
    notices: mpsc::UnboundedSender<Notice>,
}

impl MutationCoordinator {
    /// The receiver gets one notice per finished mutation.
    pub fn new(
        api: Arc<dyn BlogApi>,
        cache: CacheHandle,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, rx) = mpsc::unbounded_channel();
        (Self { api, cache, notices }, rx)
    }

    pub async fn create_post(&self, new_post: NewPost) -> PostboardResult<MutationOutcome> {
        let mut mutation = Mutation::new(MutationKind::Create, new_post.user_id);
        mutation.begin()?;
        match self.api.create_post(new_post).await {
            Ok(post) => self.commit(mutation, Some(post)).await,
            Err(err) => self.roll_back(mutation, err).await,
        }
    }

    pub async fn update_post(
        &self,
        user_id: i64,
        post_id: i64,
        changes: PostChanges,
    ) -> PostboardResult<MutationOutcome> {
        let mut mutation = Mutation::new(MutationKind::Update, user_id);
        mutation.begin()?;
        match self.api.update_post(post_id, changes).await {
            Ok(()) => self.commit(mutation, None).await,
            Err(err) => self.roll_back(mutation, err).await,
        }
    }

    /// Remove the post from the cached list of `user_id` right away, then ask
    /// the server. A refusal puts the list back exactly as it was.
    pub async fn delete_post(&self, user_id: i64, post_id: i64) -> PostboardResult<MutationOutcome> {
        let mut mutation = Mutation::new(MutationKind::Delete, user_id);
        mutation.begin()?;
        let snapshot = self
            .cache
            .update(mutation.key(), move |current| {
                current.map(|value| match value {
                    CacheValue::Posts(posts) => CacheValue::Posts(
                        posts.iter().filter(|post| post.id != post_id).cloned().collect(),
                    ),
                    other => other.clone(),
                })
            })
            .await?;
        mutation.hold_snapshot(snapshot);

        match self.api.delete_post(post_id).await {
            Ok(()) => self.commit(mutation, None).await,
            Err(err) => self.roll_back(mutation, err).await,
        }
    }

    async fn commit(
        &self,
        mut mutation: Mutation,
        post: Option<Post>,
    ) -> PostboardResult<MutationOutcome> {
        self.cache.invalidate(mutation.key()).await?;
        mutation.commit()?;
        let message = mutation.kind().success_message().to_string();
        info!(key = %mutation.key(), "{message}");
        self.notify(NoticeLevel::Success, &message);
        Ok(MutationOutcome {
            kind: mutation.kind(),
            state: mutation.state(),
            post,
            error: None,
            message,
        })
    }

    async fn roll_back(&self, mut mutation: Mutation, err: ApiError) -> PostboardResult<MutationOutcome> {
        if let Some(snapshot) = mutation.take_snapshot() {
            self.cache.restore(mutation.key(), snapshot).await?;
        }
        mutation.roll_back()?;
        let message = match err.message() {
            "" => mutation.kind().failure_fallback().to_string(),
            message => message.to_string(),
        };
        warn!(key = %mutation.key(), kind = ?mutation.kind(), %err, "Mutation failed");
        self.notify(NoticeLevel::Error, &message);
        Ok(MutationOutcome {
            kind: mutation.kind(),
            state: mutation.state(),
            post: None,
            error: Some(err),
            message,
        })
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        // Nobody listening is fine; the outcome still carries the message.
        let _ = self.notices.send(Notice {
            level,
            message: message.to_string(),
        });
    }
}
