//! Offboarding checklist flow.
//!
//! Deliberately asymmetric with onboarding: nothing here calls a
//! destructive external operation. Confirming an offboarding only
//! composes a manual checklist for the admin — actual removal happens
//! in the external admin consoles, by a human.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AdminGate;
use crate::chat::ChatClient;
use crate::error::Error;
use crate::store::MemoryStore;

/// An offboarding request awaiting admin confirmation.
///
/// No status enum: presence in the store means "awaiting confirmation",
/// removal means cancelled. Confirmed requests stay for audit display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffboardingRequest {
    pub subject_id: String,
    pub name: String,
    /// Who started the flow (the subject, self-service, or the admin).
    pub initiated_by: String,
    #[serde(default)]
    pub github_handle: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub revoke_org_access: bool,
    #[serde(default)]
    pub revoke_calendar_access: bool,
    pub created_at: DateTime<Utc>,
    /// Timestamp of the admin confirmation prompt, for in-place edits.
    #[serde(default)]
    pub prompt_message_ts: String,
}

impl OffboardingRequest {
    pub fn new(
        subject_id: impl Into<String>,
        name: impl Into<String>,
        initiated_by: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            name: name.into(),
            initiated_by: initiated_by.into(),
            github_handle: String::new(),
            email: String::new(),
            revoke_org_access: false,
            revoke_calendar_access: false,
            created_at: Utc::now(),
            prompt_message_ts: String::new(),
        }
    }
}

/// Drives the offboarding confirmation flow.
pub struct OffboardingService {
    chat: Arc<dyn ChatClient>,
    gate: AdminGate,
    requests: Arc<MemoryStore<OffboardingRequest>>,
    /// Org name shown in the manual-removal checklist link.
    org_name: String,
    /// Calendar names listed in the checklist.
    calendar_names: Vec<String>,
}

impl OffboardingService {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        gate: AdminGate,
        requests: Arc<MemoryStore<OffboardingRequest>>,
        org_name: String,
        calendar_names: Vec<String>,
    ) -> Self {
        Self {
            chat,
            gate,
            requests,
            org_name,
            calendar_names,
        }
    }

    async fn dm(&self, channel: &str, text: &str) {
        if let Err(e) = self.chat.post_message(channel, text).await {
            tracing::error!(channel = %channel, "Failed to send message: {e}");
        }
    }

    /// Start offboarding. Members can only offboard themselves; a
    /// target other than the actor is honored only for the admin.
    /// Either way the flow routes to the admin for confirmation;
    /// self-service never acts directly.
    pub async fn start(&self, actor_id: &str, target_id: Option<&str>) -> Result<(), Error> {
        let is_admin = self.gate.permits(actor_id);
        let subject_id = match target_id {
            Some(target) if is_admin => target,
            _ => actor_id,
        };

        let info = match self.chat.user_info(subject_id).await {
            Ok(info) => info,
            Err(e) => {
                tracing::error!("Error getting user info for {subject_id}: {e}");
                return Ok(());
            }
        };

        let mut request = OffboardingRequest::new(subject_id, &info.name, actor_id);
        request.email = info.email;

        let prompt = confirmation_prompt(&request, &self.calendar_names);
        match self.chat.post_message(self.gate.admin_id(), &prompt).await {
            Ok(ts) => request.prompt_message_ts = ts,
            Err(e) => tracing::error!("Failed to send offboarding prompt: {e}"),
        }
        self.requests.upsert(subject_id, request).await;

        if !is_admin {
            if let Ok(channel) = self.chat.open_dm(actor_id).await {
                self.dm(
                    &channel,
                    "Your offboarding request has been sent to the lab admin. They will \
                     confirm what access should be revoked or retained.",
                )
                .await;
            }
        }

        tracing::info!(subject = %subject_id, initiated_by = %actor_id, "Offboarding requested");
        Ok(())
    }

    /// Admin confirmation: record the revoke intents, send the manual
    /// checklist to the admin and a farewell to the subject.
    pub async fn confirm(
        &self,
        actor_id: &str,
        subject_id: &str,
        revoke_org_access: bool,
        revoke_calendar_access: bool,
    ) -> Result<(), Error> {
        if !self.gate.permits(actor_id) {
            return Ok(());
        }

        let request = match self
            .requests
            .update(subject_id, |r| {
                r.revoke_org_access = revoke_org_access;
                r.revoke_calendar_access = revoke_calendar_access;
            })
            .await
        {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(subject = %subject_id, "No offboarding request: {e}");
                return Ok(());
            }
        };

        let checklist = checklist_message(&request, &self.org_name, &self.calendar_names);
        self.dm(self.gate.admin_id(), &checklist).await;

        if !request.prompt_message_ts.is_empty()
            && let Err(e) = self
                .chat
                .update_message(
                    self.gate.admin_id(),
                    &request.prompt_message_ts,
                    &processed_notice(&request),
                )
                .await
        {
            tracing::warn!("Failed to update offboarding prompt: {e}");
        }

        if let Ok(channel) = self.chat.open_dm(subject_id).await {
            self.dm(&channel, &farewell_notice()).await;
        }

        tracing::info!(
            subject = %subject_id,
            revoke_org = revoke_org_access,
            revoke_calendars = revoke_calendar_access,
            "Offboarding checklist sent"
        );
        Ok(())
    }

    /// Cancel a pending offboarding and drop the record.
    pub async fn cancel(&self, actor_id: &str, subject_id: &str) -> Result<(), Error> {
        if !self.gate.permits(actor_id) {
            return Ok(());
        }

        let Some(request) = self.requests.remove(subject_id).await else {
            return Ok(());
        };

        if !request.prompt_message_ts.is_empty()
            && let Err(e) = self
                .chat
                .update_message(
                    self.gate.admin_id(),
                    &request.prompt_message_ts,
                    ":x: Offboarding cancelled. No changes were made.",
                )
                .await
        {
            tracing::warn!("Failed to update offboarding prompt: {e}");
        }

        tracing::info!(subject = %subject_id, "Offboarding cancelled");
        Ok(())
    }
}

/// Confirmation prompt for the admin, listing the revoke options.
fn confirmation_prompt(request: &OffboardingRequest, calendar_names: &[String]) -> String {
    format!(
        ":wave: *Offboarding Request*\n\n\
         *{}* (<@{}>) has initiated the offboarding process.\n\n\
         *Select what access to revoke:*\n\
         • Remove from the GitHub organization\n\
         • Remove calendar access ({})\n\n\
         _Note: Some lab members may continue to collaborate on projects after \
         leaving. Only revoke access that is no longer needed._\n\n\
         :information_source: Website profile removal must be done manually.",
        request.name,
        request.subject_id,
        calendar_names.join(", "),
    )
}

/// The manual checklist, with line items conditional on the intents.
/// The website line is always present: that step has no automation.
fn checklist_message(
    request: &OffboardingRequest,
    org_name: &str,
    calendar_names: &[String],
) -> String {
    let mut items = Vec::new();

    if request.revoke_org_access {
        let handle = if request.github_handle.is_empty() {
            &request.name
        } else {
            &request.github_handle
        };
        items.push(format!(
            ":octocat: *GitHub:* Please manually remove `{handle}` from the \
             {org_name} organization at:\nhttps://github.com/orgs/{org_name}/people"
        ));
    }

    if request.revoke_calendar_access {
        let calendars = calendar_names
            .iter()
            .map(|name| format!("• {name}"))
            .collect::<Vec<_>>()
            .join("\n");
        items.push(format!(
            ":calendar: *Calendars:* Please remove `{}` from the following calendars:\n{calendars}",
            request.email
        ));
    }

    items.push(format!(
        ":globe_with_meridians: *Website:* Please remove {}'s profile from the \
         lab website's people page.",
        request.name
    ));

    format!(
        "*Offboarding Checklist: {}*\n\nPlease complete the following manual steps:\n\n{}",
        request.name,
        items.join("\n\n")
    )
}

/// In-place edit of the confirmation prompt once processed.
fn processed_notice(request: &OffboardingRequest) -> String {
    let mut actions = Vec::new();
    if request.revoke_org_access {
        actions.push("GitHub access");
    }
    if request.revoke_calendar_access {
        actions.push("Calendar access");
    }
    let actions_text = if actions.is_empty() {
        "No access revoked".to_string()
    } else {
        actions.join(", ")
    };

    format!(
        ":white_check_mark: *Offboarding Processed: {}*\n\n\
         Actions to take: {actions_text}\n\
         A checklist has been sent with manual steps to complete.",
        request.name
    )
}

/// Fixed farewell DM for the departing member.
fn farewell_notice() -> String {
    ":wave: *Offboarding Confirmed*\n\n\
     The lab admin has been notified and will process your offboarding. \
     Thank you for your contributions to the lab!\n\n\
     If you have any questions or need continued access for ongoing \
     collaborations, please contact the lab admin."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> OffboardingRequest {
        let mut r = OffboardingRequest::new("U9", "Grace Hopper", "U9");
        r.github_handle = "graceh".to_string();
        r.email = "grace@example.edu".to_string();
        r
    }

    #[test]
    fn checklist_lines_follow_intents() {
        let calendars = vec!["Lab Calendar".to_string(), "Out of Office".to_string()];

        let mut r = request();
        let msg = checklist_message(&r, "the-lab", &calendars);
        assert!(!msg.contains("GitHub:"));
        assert!(!msg.contains("Calendars:"));
        assert!(msg.contains("Website:"), "website line must always be present");

        r.revoke_org_access = true;
        let msg = checklist_message(&r, "the-lab", &calendars);
        assert!(msg.contains("`graceh`"));
        assert!(msg.contains("github.com/orgs/the-lab/people"));
        assert!(!msg.contains("Calendars:"));

        r.revoke_calendar_access = true;
        let msg = checklist_message(&r, "the-lab", &calendars);
        assert!(msg.contains("grace@example.edu"));
        assert!(msg.contains("• Lab Calendar"));
        assert!(msg.contains("Website:"));
    }

    #[test]
    fn checklist_falls_back_to_name_without_handle() {
        let mut r = request();
        r.github_handle = String::new();
        r.revoke_org_access = true;
        let msg = checklist_message(&r, "the-lab", &[]);
        assert!(msg.contains("`Grace Hopper`"));
    }

    #[test]
    fn processed_notice_reports_no_actions() {
        let r = request();
        let msg = processed_notice(&r);
        assert!(msg.contains("No access revoked"));

        let mut r = request();
        r.revoke_org_access = true;
        r.revoke_calendar_access = true;
        let msg = processed_notice(&r);
        assert!(msg.contains("GitHub access, Calendar access"));
    }

    #[test]
    fn serde_roundtrip() {
        let mut r = request();
        r.revoke_org_access = true;
        let json = serde_json::to_string(&r).unwrap();
        let parsed: OffboardingRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.subject_id, r.subject_id);
        assert_eq!(parsed.name, r.name);
        assert_eq!(parsed.initiated_by, r.initiated_by);
        assert!(parsed.revoke_org_access);
        assert!(!parsed.revoke_calendar_access);
        assert_eq!(parsed.created_at, r.created_at);
    }
}
