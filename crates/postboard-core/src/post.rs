//! This module defines the `Post` struct and the payloads used to create
//! and edit one.

use crate::{constant, PostboardError, PostboardResult};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use textwrap::core::display_width;
use textwrap::{self, wrap};

/// A post as stored by the server. Every post belongs to exactly one user
/// and its `id` never changes once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub created_at: String,
}

/// Payload for `POST /posts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub user_id: i64,
}

/// Payload for `PUT /posts/:postId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostChanges {
    pub title: String,
    pub body: String,
}

/// The title/body pair shared by both payloads, validated the same way on
/// the client (before submitting) and on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub body: String,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Trim both fields and check their lengths. Returns the trimmed draft.
    pub fn validate(self) -> PostboardResult<Self> {
        let title = self.title.trim().to_string();
        let body = self.body.trim().to_string();
        verify_title(&title)?;
        verify_body(&body)?;
        Ok(Self { title, body })
    }

    pub fn into_new_post(self, user_id: i64) -> NewPost {
        NewPost {
            title: self.title,
            body: self.body,
            user_id,
        }
    }

    pub fn into_changes(self) -> PostChanges {
        PostChanges {
            title: self.title,
            body: self.body,
        }
    }
}

impl From<NewPost> for PostDraft {
    fn from(value: NewPost) -> Self {
        Self::new(value.title, value.body)
    }
}

impl From<PostChanges> for PostDraft {
    fn from(value: PostChanges) -> Self {
        Self::new(value.title, value.body)
    }
}

impl Post {
    /// Build a post for a freshly inserted row.
    pub fn new(id: i64, user_id: i64, draft: PostDraft) -> Self {
        Post {
            id,
            user_id,
            title: draft.title,
            body: draft.body,
            created_at: timestamp_now(),
        }
    }

    pub(crate) fn parse_sqlite_row(record: &sqlite::Statement) -> PostboardResult<Self> {
        Ok(Post {
            id: record.read::<i64, _>("id").map_err(PostboardError::from)?,
            user_id: record.read::<i64, _>("user_id").map_err(PostboardError::from)?,
            title: record.read::<String, _>("title").map_err(PostboardError::from)?,
            body: record.read::<String, _>("body").map_err(PostboardError::from)?,
            created_at: record
                .read::<String, _>("created_at")
                .map_err(PostboardError::from)?,
        })
    }
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Some necessary checks for post's title.
fn verify_title(title: &str) -> PostboardResult<()> {
    let len = title.chars().count();
    if len == 0 {
        return Err(PostboardError::EmptyTitle.into());
    }
    if !(constant::MIN_POST_TITLE..=constant::MAX_POST_TITLE).contains(&len) {
        return Err(PostboardError::InvalidTitleLength {
            min_size: constant::MIN_POST_TITLE,
            max_size: constant::MAX_POST_TITLE,
            curr_size: len,
        }
        .into());
    }
    Ok(())
}

/// Some necessary checks for post's body.
fn verify_body(body: &str) -> PostboardResult<()> {
    let len = body.chars().count();
    if len == 0 {
        return Err(PostboardError::EmptyBody.into());
    }
    if !(constant::MIN_POST_BODY..=constant::MAX_POST_BODY).contains(&len) {
        return Err(PostboardError::InvalidBodyLength {
            min_size: constant::MIN_POST_BODY,
            max_size: constant::MAX_POST_BODY,
            curr_size: len,
        }
        .into());
    }
    Ok(())
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:-<54}", "")?;
        writeln!(f, "\\ {:^50} /", self.title)?;
        writeln!(f, "/ {:<50} \\", format!("#{} {}", self.id, self.created_at))?;
        let content_width = 50;
        let wrapping_config = textwrap::Options::new(content_width).break_words(true);
        for (count, line) in wrap(&self.body, wrapping_config).into_iter().enumerate() {
            let (left_closure, right_closure) = if count % 2 == 0 {
                ("\\ ", " /")
            } else {
                ("/ ", " \\")
            };
            let whitespace = content_width.saturating_sub(display_width(&line));
            writeln!(
                f,
                "{left_closure}{}{}{right_closure}",
                line,
                " ".repeat(whitespace)
            )?;
        }
        write!(f, "{:-<54}", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_of(draft: PostDraft) -> PostboardError {
        draft
            .validate()
            .unwrap_err()
            .downcast::<PostboardError>()
            .unwrap()
    }

    #[test]
    fn validate_trims_fields() {
        let draft = PostDraft::new("  Test Post ", "\tThis is a test post content\n")
            .validate()
            .unwrap();
        assert_eq!(draft.title, "Test Post");
        assert_eq!(draft.body, "This is a test post content");
    }

    #[test]
    fn validate_rejects_short_and_empty_fields() {
        assert!(matches!(
            error_of(PostDraft::new("   ", "valid body")),
            PostboardError::EmptyTitle
        ));
        assert!(matches!(
            error_of(PostDraft::new("AB", "valid body")),
            PostboardError::InvalidTitleLength { curr_size: 2, .. }
        ));
        assert!(matches!(
            error_of(PostDraft::new("Title", "")),
            PostboardError::EmptyBody
        ));
        assert!(matches!(
            error_of(PostDraft::new("Title", "Test")),
            PostboardError::InvalidBodyLength { curr_size: 4, .. }
        ));
    }

    #[test]
    fn validate_rejects_long_fields() {
        let title = "t".repeat(constant::MAX_POST_TITLE + 1);
        assert!(matches!(
            error_of(PostDraft::new(title, "valid body")),
            PostboardError::InvalidTitleLength { .. }
        ));
        let body = "b".repeat(constant::MAX_POST_BODY + 1);
        assert!(matches!(
            error_of(PostDraft::new("Title", body)),
            PostboardError::InvalidBodyLength { .. }
        ));
    }

    #[test]
    fn lengths_are_counted_in_characters() {
        // Three characters, nine bytes.
        let draft = PostDraft::new("日本語", "ðŸ˜ƒðŸ˜ƒ body").validate();
        assert!(draft.is_ok());
    }

    #[test]
    fn post_formatting_using_display() {
        let post = Post::new(
            7,
            1,
            PostDraft::new(
                "First Post",
                "This is a demo post with emojis to test formatting ðŸ˜ƒðŸ˜ƒ and a line long enough to wrap",
            ),
        );
        let rendered = post.to_string();
        assert!(rendered.contains("First Post"));
        assert!(rendered.contains("#7"));
        assert!(rendered.lines().count() >= 5);
    }

    #[test]
    fn timestamps_are_rfc3339_utc() {
        let stamp = timestamp_now();
        assert!(stamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
