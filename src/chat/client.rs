//! Outbound chat contract.
//!
//! The bot only needs a narrow slice of the chat platform: direct
//! messages, channel messages, in-place message edits, and file
//! uploads. All sends are fire-and-forget from the workflow's point of
//! view — a delivery failure is logged by the caller, never rolled
//! back into request state.

use async_trait::async_trait;

use crate::error::ChatError;

/// Profile of a chat user, as reported by the platform.
#[derive(Debug, Clone, Default)]
pub struct UserInfo {
    pub id: String,
    /// Display name (real name when available).
    pub name: String,
    /// Profile email; empty when the workspace hides it.
    pub email: String,
}

/// Narrow client for the chat platform's outbound surface.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Post a Markdown message. Returns the platform's message id
    /// (timestamp), used later for in-place edits.
    async fn post_message(&self, channel: &str, text: &str) -> Result<String, ChatError>;

    /// Edit a previously posted message in place.
    async fn update_message(
        &self,
        channel: &str,
        message_ts: &str,
        text: &str,
    ) -> Result<(), ChatError>;

    /// Open (or look up) a DM channel with a user.
    async fn open_dm(&self, user_id: &str) -> Result<String, ChatError>;

    /// Fetch a user's profile.
    async fn user_info(&self, user_id: &str) -> Result<UserInfo, ChatError>;

    /// Upload a file into a channel with a short comment.
    async fn upload_file(
        &self,
        channel: &str,
        filename: &str,
        bytes: Vec<u8>,
        comment: &str,
    ) -> Result<(), ChatError>;
}
