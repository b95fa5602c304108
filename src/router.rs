//! Inbound event router.
//!
//! Translates typed chat events into service calls. This is the error
//! boundary for event handling: nothing is allowed to propagate out of
//! `dispatch` — failures are logged (and, for approval processing,
//! recorded on the request as `Error` status by the service itself).

use std::sync::Arc;

use crate::chat::ChatEvent;
use crate::offboarding::OffboardingService;
use crate::onboarding::{OnboardingService, ProfileForm};

/// Routes inbound events to the onboarding and offboarding services.
pub struct Router {
    onboarding: Arc<OnboardingService>,
    offboarding: Arc<OffboardingService>,
}

impl Router {
    pub fn new(onboarding: Arc<OnboardingService>, offboarding: Arc<OffboardingService>) -> Self {
        Self {
            onboarding,
            offboarding,
        }
    }

    /// Handle one inbound event to completion.
    pub async fn dispatch(&self, event: ChatEvent) {
        let result = match event {
            ChatEvent::OnboardCommand {
                actor_id,
                target_id,
            } => self.onboarding.start_onboarding(&actor_id, &target_id).await,

            ChatEvent::ProfileSubmitted {
                subject_id,
                github_handle,
                raw_bio,
                website_url,
            } => {
                self.onboarding
                    .submit_profile(
                        &subject_id,
                        ProfileForm {
                            github_handle,
                            raw_bio,
                            website_url,
                        },
                    )
                    .await
            }

            ChatEvent::PhotoUploaded { subject_id, image } => {
                self.onboarding.attach_photo(&subject_id, image).await
            }

            ChatEvent::ApprovalAction {
                actor_id,
                subject_id,
                team_ids,
            } => self
                .onboarding
                .approve(&actor_id, &subject_id, team_ids)
                .await
                .map(|_| ()),

            ChatEvent::RejectionAction {
                actor_id,
                subject_id,
            } => self.onboarding.reject(&actor_id, &subject_id).await,

            ChatEvent::RequestChangesAction {
                actor_id,
                subject_id,
                feedback,
            } => {
                self.onboarding
                    .request_changes(&actor_id, &subject_id, &feedback)
                    .await
            }

            ChatEvent::OffboardCommand {
                actor_id,
                target_id,
            } => {
                self.offboarding
                    .start(&actor_id, target_id.as_deref())
                    .await
            }

            ChatEvent::OffboardConfirm {
                actor_id,
                subject_id,
                revoke_org_access,
                revoke_calendar_access,
            } => {
                self.offboarding
                    .confirm(
                        &actor_id,
                        &subject_id,
                        revoke_org_access,
                        revoke_calendar_access,
                    )
                    .await
            }

            ChatEvent::OffboardCancel {
                actor_id,
                subject_id,
            } => self.offboarding.cancel(&actor_id, &subject_id).await,

            ChatEvent::WorkflowMessage {
                channel_id,
                text,
                from_bot,
            } => {
                self.onboarding
                    .handle_workflow_message(&channel_id, &text, from_bot)
                    .await
            }
        };

        if let Err(e) = result {
            tracing::error!("Event handling failed: {e}");
        }
    }
}
