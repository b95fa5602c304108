//! Onboarding request entity and its status state machine.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapters::calendar::Permission;

/// Status of an onboarding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    /// Waiting for the member to provide their info.
    PendingInfo,
    /// Waiting for admin approval.
    PendingApproval,
    /// Approved; org invitation in flight.
    GithubPending,
    /// Calendar invites being sent.
    CalendarPending,
    /// External grants attempted; website material may still be missing.
    ReadyForWebsite,
    Completed,
    Rejected,
    Error,
}

impl OnboardingStatus {
    /// Whether this status ends the request's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Error)
    }

    /// Check if a transition from `self` to `target` is valid.
    ///
    /// `Rejected` and `Error` are reachable from any non-terminal
    /// status; `PendingApproval` can return to `PendingInfo` when the
    /// admin requests changes. `CalendarPending` is skipped when no
    /// calendar integration is configured.
    pub fn can_transition_to(&self, target: OnboardingStatus) -> bool {
        use OnboardingStatus::*;
        if self.is_terminal() {
            return false;
        }
        if matches!(target, Rejected | Error) {
            return true;
        }
        matches!(
            (self, target),
            (PendingInfo, PendingApproval)
                | (PendingApproval, GithubPending)
                | (PendingApproval, PendingInfo)
                | (GithubPending, CalendarPending)
                | (GithubPending, ReadyForWebsite)
                | (CalendarPending, ReadyForWebsite)
                | (ReadyForWebsite, Completed)
        )
    }
}

impl std::fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PendingInfo => "pending_info",
            Self::PendingApproval => "pending_approval",
            Self::GithubPending => "github_pending",
            Self::CalendarPending => "calendar_pending",
            Self::ReadyForWebsite => "ready_for_website",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// An onboarding request for a new lab member.
///
/// One per subject, keyed by the subject's chat user id; a second
/// request for the same subject is rejected while this one is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingRequest {
    /// Chat user id of the member being onboarded (store key).
    pub subject_id: String,
    /// DM channel used for all messages to the member.
    pub reply_channel_id: String,

    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub github_handle: String,
    /// Team ids chosen by the admin at approval time.
    #[serde(default)]
    pub team_selections: Vec<u64>,
    #[serde(default)]
    pub org_invite_sent: bool,

    /// Calendar name -> permission granted, filled from the default
    /// policy at approval time.
    #[serde(default)]
    pub calendar_grants: BTreeMap<String, Permission>,
    #[serde(default)]
    pub calendar_invites_sent: bool,

    #[serde(default)]
    pub raw_bio: String,
    #[serde(default)]
    pub edited_bio: String,
    #[serde(default)]
    pub website_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_photo_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_photo_path: Option<PathBuf>,

    pub status: OnboardingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_error: String,

    /// Timestamp of the approval prompt message, for in-place edits.
    #[serde(default)]
    pub approval_message_ts: String,
    #[serde(default)]
    pub approving_admin_id: String,
}

impl OnboardingRequest {
    pub fn new(subject_id: impl Into<String>, reply_channel_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            subject_id: subject_id.into(),
            reply_channel_id: reply_channel_id.into(),
            name: String::new(),
            email: String::new(),
            github_handle: String::new(),
            team_selections: Vec::new(),
            org_invite_sent: false,
            calendar_grants: BTreeMap::new(),
            calendar_invites_sent: false,
            raw_bio: String::new(),
            edited_bio: String::new(),
            website_url: String::new(),
            original_photo_path: None,
            processed_photo_path: None,
            status: OnboardingStatus::PendingInfo,
            created_at: now,
            updated_at: now,
            last_error: String::new(),
            approval_message_ts: String::new(),
            approving_admin_id: String::new(),
        }
    }

    /// Update the status and touch `updated_at`.
    pub fn set_status(&mut self, status: OnboardingStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Transition to `Error` with the failure text recorded.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = message.into();
        self.set_status(OnboardingStatus::Error);
    }

    /// Website readiness: a pure predicate, never a write. Ready iff
    /// both an edited bio and a processed photo exist.
    pub fn website_ready(&self) -> bool {
        !self.edited_bio.is_empty() && self.processed_photo_path.is_some()
    }

    /// Which website artifacts are still missing.
    pub fn missing_artifacts(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.edited_bio.is_empty() {
            missing.push("edited bio");
        }
        if self.processed_photo_path.is_none() {
            missing.push("processed photo");
        }
        missing
    }

    /// Short human-readable summary for admin-facing messages.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("*Name:* {}", or_not_provided(&self.name)),
            format!("*Email:* {}", or_not_provided(&self.email)),
            format!("*GitHub:* {}", or_not_provided(&self.github_handle)),
            format!("*Status:* {}", self.status),
        ];
        if !self.raw_bio.is_empty() {
            lines.push(format!("*Bio:* {}", preview(&self.raw_bio, 100)));
        }
        if !self.website_url.is_empty() {
            lines.push(format!("*Website:* {}", self.website_url));
        }
        lines.join("\n")
    }
}

fn or_not_provided(value: &str) -> &str {
    if value.is_empty() { "Not provided" } else { value }
}

/// Truncate to `max` chars with an ellipsis.
pub(crate) fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}
