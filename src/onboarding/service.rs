//! OnboardingService — owns the request lifecycle and coordinates the
//! chat platform, org, calendar, rewrite, and photo adapters.
//!
//! Info collection lives here; the admin approval actions and the
//! orchestration procedure live in `approval.rs` on the same type.

use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::border::{PhotoBorderer, seed_for};
use crate::adapters::calendar::{CalendarAdapter, Permission};
use crate::adapters::org::OrgAdapter;
use crate::adapters::rewrite::RewriteAdapter;
use crate::auth::AdminGate;
use crate::chat::ChatClient;
use crate::error::{Error, StoreError};
use crate::store::MemoryStore;

use super::correlator::PartialSubmission;
use super::messages;
use super::model::{OnboardingRequest, OnboardingStatus};

/// External collaborators, injected at construction.
pub struct Deps {
    pub chat: Arc<dyn ChatClient>,
    pub org: Arc<dyn OrgAdapter>,
    /// `None` when the calendar integration is not configured.
    pub calendar: Option<Arc<dyn CalendarAdapter>>,
    /// `None` when no rewrite API key is configured.
    pub rewriter: Option<Arc<dyn RewriteAdapter>>,
}

/// Policy and local-storage settings.
pub struct Settings {
    /// Team name pre-selected in approval prompts.
    pub default_team: String,
    /// Fixed calendar grant policy applied at approval time.
    pub default_grants: Vec<(String, Permission)>,
    pub borderer: PhotoBorderer,
    /// Where original and processed photos are written.
    pub output_dir: PathBuf,
}

/// Values from the subject's onboarding form.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub github_handle: String,
    pub raw_bio: String,
    pub website_url: String,
}

/// Coordinates the onboarding flow end to end.
pub struct OnboardingService {
    pub(crate) chat: Arc<dyn ChatClient>,
    pub(crate) org: Arc<dyn OrgAdapter>,
    pub(crate) calendar: Option<Arc<dyn CalendarAdapter>>,
    pub(crate) rewriter: Option<Arc<dyn RewriteAdapter>>,
    pub(crate) gate: AdminGate,
    pub(crate) requests: Arc<MemoryStore<OnboardingRequest>>,
    pub(crate) partials: Arc<MemoryStore<PartialSubmission>>,
    pub(crate) settings: Settings,
}

impl OnboardingService {
    pub fn new(
        deps: Deps,
        settings: Settings,
        gate: AdminGate,
        requests: Arc<MemoryStore<OnboardingRequest>>,
        partials: Arc<MemoryStore<PartialSubmission>>,
    ) -> Self {
        Self {
            chat: deps.chat,
            org: deps.org,
            calendar: deps.calendar,
            rewriter: deps.rewriter,
            gate,
            requests,
            partials,
            settings,
        }
    }

    /// Persist a working copy of a request.
    pub(crate) async fn save(&self, request: &OnboardingRequest) {
        self.requests
            .upsert(&request.subject_id, request.clone())
            .await;
    }

    /// DM a user, logging (not propagating) delivery failures.
    pub(crate) async fn dm(&self, channel: &str, text: &str) {
        if let Err(e) = self.chat.post_message(channel, text).await {
            tracing::error!(channel = %channel, "Failed to send message: {e}");
        }
    }

    /// Start onboarding a target user. Admin-only command; the actor is
    /// told when they lack permission (commands respond, unlike the
    /// silent approval-action gate).
    pub async fn start_onboarding(&self, actor_id: &str, target_id: &str) -> Result<(), Error> {
        let actor_dm = match self.chat.open_dm(actor_id).await {
            Ok(channel) => channel,
            Err(e) => {
                tracing::error!("Failed to open DM with {actor_id}: {e}");
                return Ok(());
            }
        };

        if !self.gate.permits(actor_id) {
            self.dm(&actor_dm, "Only the lab admin can start onboarding.")
                .await;
            return Ok(());
        }

        if let Some(existing) = self.requests.get(target_id).await {
            self.dm(
                &actor_dm,
                &format!(
                    "<@{target_id}> already has an active onboarding request (status: {}).",
                    existing.status
                ),
            )
            .await;
            return Ok(());
        }

        let info = match self.chat.user_info(target_id).await {
            Ok(info) => info,
            Err(e) => {
                self.dm(&actor_dm, &format!("Error getting user info: {e}"))
                    .await;
                return Ok(());
            }
        };

        let reply_channel = match self.chat.open_dm(target_id).await {
            Ok(channel) => channel,
            Err(e) => {
                self.dm(&actor_dm, &format!("Error opening DM with user: {e}"))
                    .await;
                return Ok(());
            }
        };

        let mut request = OnboardingRequest::new(target_id, &reply_channel);
        request.name = info.name.clone();
        request.email = info.email;

        if let Err(StoreError::AlreadyExists { .. }) =
            self.requests.insert_new(target_id, request).await
        {
            // Lost a race with another create; the original wins.
            self.dm(
                &actor_dm,
                &format!("<@{target_id}> already has an active onboarding request."),
            )
            .await;
            return Ok(());
        }

        self.dm(&reply_channel, &messages::welcome(&info.name)).await;
        self.dm(
            &actor_dm,
            &format!("Started onboarding for <@{target_id}>. They've been sent the welcome message."),
        )
        .await;

        tracing::info!(subject = %target_id, "Onboarding started");
        Ok(())
    }

    /// Handle the subject's onboarding form.
    ///
    /// Handle validation failures are surfaced to the subject and leave
    /// the request untouched. A failed bio rewrite never blocks the
    /// move to `PendingApproval`; the missing edited bio is reported
    /// later as a website-content gap.
    pub async fn submit_profile(&self, subject_id: &str, form: ProfileForm) -> Result<(), Error> {
        let Some(request) = self.requests.get(subject_id).await else {
            tracing::warn!(subject = %subject_id, "Form submitted without an active request");
            return Ok(());
        };

        if let Err(e) = self.org.validate_handle(&form.github_handle).await {
            tracing::warn!(subject = %subject_id, "Handle validation failed: {e}");
            self.dm(
                &request.reply_channel_id,
                &messages::handle_not_found(&form.github_handle),
            )
            .await;
            return Ok(());
        }

        let mut edited_bio = String::new();
        if let Some(rewriter) = &self.rewriter
            && !form.raw_bio.trim().is_empty()
        {
            match rewriter.rewrite(&form.raw_bio, &request.name).await {
                Ok(edited) => edited_bio = edited,
                Err(e) => tracing::warn!(subject = %subject_id, "Bio rewrite failed: {e}"),
            }
        }

        let request = self
            .requests
            .update(subject_id, |r| {
                r.github_handle = form.github_handle.clone();
                r.raw_bio = form.raw_bio.clone();
                r.website_url = form.website_url.clone();
                if !edited_bio.is_empty() {
                    r.edited_bio = edited_bio.clone();
                }
                r.set_status(OnboardingStatus::PendingApproval);
            })
            .await?;

        self.dm(&request.reply_channel_id, &messages::info_received())
            .await;
        self.send_approval_prompt(&request).await;

        tracing::info!(subject = %subject_id, "Profile submitted; awaiting approval");
        Ok(())
    }

    /// Handle a photo upload in the subject's DM. Silently ignored for
    /// users without an active request (not an onboarding conversation).
    pub async fn attach_photo(&self, subject_id: &str, image: Vec<u8>) -> Result<(), Error> {
        let Some(request) = self.requests.get(subject_id).await else {
            return Ok(());
        };

        if let Err(e) = self.settings.borderer.validate(&image) {
            self.dm(
                &request.reply_channel_id,
                &format!("Image validation failed: {e}"),
            )
            .await;
            return Ok(());
        }

        let processed = self
            .settings
            .borderer
            .apply_border_bytes(&image, seed_for(subject_id))?;

        let ext = image::guess_format(&image)
            .ok()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("img");
        let original_path = self.settings.output_dir.join(format!("{subject_id}_original.{ext}"));
        let processed_path = self.settings.output_dir.join(format!("{subject_id}_bordered.png"));

        tokio::fs::write(&original_path, &image).await?;
        tokio::fs::write(&processed_path, &processed).await?;

        let request = self
            .requests
            .update(subject_id, |r| {
                r.original_photo_path = Some(original_path.clone());
                r.processed_photo_path = Some(processed_path.clone());
                r.updated_at = chrono::Utc::now();
            })
            .await?;

        if let Err(e) = self
            .chat
            .upload_file(
                &request.reply_channel_id,
                &format!("{subject_id}_bordered.png"),
                processed,
                ":camera: Here's how your photo will look on the website!",
            )
            .await
        {
            tracing::error!(subject = %subject_id, "Failed to upload photo preview: {e}");
        }
        self.dm(&request.reply_channel_id, &messages::photo_processed())
            .await;

        tracing::info!(subject = %subject_id, "Photo processed");
        Ok(())
    }

    /// Compose and post the approval prompt to the admin, recording the
    /// message timestamp for later in-place edits.
    pub(crate) async fn send_approval_prompt(&self, request: &OnboardingRequest) {
        let teams = match self.org.list_teams().await {
            Ok(teams) => teams,
            Err(e) => {
                tracing::warn!("Could not list org teams for approval prompt: {e}");
                Vec::new()
            }
        };

        let text = messages::approval_prompt(
            request,
            &teams,
            &self.settings.default_team,
            &self.settings.default_grants,
        );

        match self.chat.post_message(self.gate.admin_id(), &text).await {
            Ok(ts) => {
                if let Err(e) = self
                    .requests
                    .update(&request.subject_id, |r| r.approval_message_ts = ts.clone())
                    .await
                {
                    tracing::warn!("Could not record approval message ts: {e}");
                }
            }
            Err(e) => tracing::error!("Failed to send approval prompt: {e}"),
        }
    }
}
