//! Inbound chat events.
//!
//! The event intake (slash-command dispatch, interaction payloads,
//! socket-mode plumbing) lives outside this crate; whatever drives the
//! bot translates platform payloads into these typed events and hands
//! them to the router.

use serde::{Deserialize, Serialize};

/// A parsed inbound event from the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Admin slash command starting onboarding for a target user.
    OnboardCommand { actor_id: String, target_id: String },

    /// The subject submitted the structured onboarding form.
    ProfileSubmitted {
        subject_id: String,
        github_handle: String,
        #[serde(default)]
        raw_bio: String,
        #[serde(default)]
        website_url: String,
    },

    /// The subject uploaded a profile photo in their DM.
    PhotoUploaded {
        subject_id: String,
        image: Vec<u8>,
    },

    /// Admin approved a request, with the chosen team assignment set.
    ApprovalAction {
        actor_id: String,
        subject_id: String,
        #[serde(default)]
        team_ids: Vec<u64>,
    },

    /// Admin rejected a request.
    RejectionAction { actor_id: String, subject_id: String },

    /// Admin sent the request back with free-text feedback.
    RequestChangesAction {
        actor_id: String,
        subject_id: String,
        feedback: String,
    },

    /// Offboarding slash command (self-service when `target_id` is
    /// absent or equals the actor).
    OffboardCommand {
        actor_id: String,
        #[serde(default)]
        target_id: Option<String>,
    },

    /// Admin confirmed offboarding with the revoke checkboxes.
    OffboardConfirm {
        actor_id: String,
        subject_id: String,
        #[serde(default)]
        revoke_org_access: bool,
        #[serde(default)]
        revoke_calendar_access: bool,
    },

    /// Offboarding cancelled.
    OffboardCancel { actor_id: String, subject_id: String },

    /// A free-text message from the workflow-builder tool, forwarded
    /// for correlation.
    WorkflowMessage {
        channel_id: String,
        text: String,
        #[serde(default)]
        from_bot: bool,
    },
}
